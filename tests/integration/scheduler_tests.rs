use super::*;
use std::time::Duration;
use steam_watcher::SchedulerState;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn test_scheduled_passes_deliver_changes() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    app.fetcher.set_price("620", 1_000_000);
    app.fetcher.set_price("469", 2_000_000);
    app.manager
        .register_listing(create_test_listing("620", ListingKind::Single, "owner-a"))
        .await?;
    app.manager
        .register_listing(create_test_listing("469", ListingKind::Package, "owner-b"))
        .await?;

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let scheduler = app.scheduler.clone();
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });

    // Baseline pass after the initial delay.
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(app.engine.snapshot_of("620").await.is_some());
    assert!(app.notifier.changed_ids().is_empty());

    app.fetcher.set_sale("469", 2_000_000, 1_000_000, 50);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(app.notifier.changed_ids(), vec!["469"]);

    let change = app.notifier.changes.lock().unwrap()[0].clone();
    assert_eq!(change.item.owner_id, "owner-b");
    assert_eq!(change.item.delivery_target, "channel-1");

    // Nothing moves, nothing more is sent.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(app.notifier.changed_ids().len(), 1);

    cancel.cancel();
    handle.await?;
    assert_eq!(app.scheduler.state(), SchedulerState::Stopped);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_removed_listing_is_not_fetched_again() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    app.fetcher.set_price("620", 1000);
    app.manager
        .register_listing(create_test_listing("620", ListingKind::Single, "owner-a"))
        .await?;

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let scheduler = app.scheduler.clone();
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });

    tokio::time::sleep(Duration::from_secs(6)).await;
    let calls_after_first_pass = app.fetcher.calls();

    app.manager.unregister_listings("owner-a", &[0]).await?;
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(app.fetcher.calls(), calls_after_first_pass);

    cancel.cancel();
    handle.await?;
    Ok(())
}

#[tokio::test]
async fn test_sync_now_outside_the_loop() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    app.fetcher.set_price("620", 1000);
    app.manager
        .register_listing(create_test_listing("620", ListingKind::Single, "owner-a"))
        .await?;

    assert_eq!(app.scheduler.state(), SchedulerState::Idle);
    let report = app.scheduler.sync_now().await?;
    assert_eq!(report.checked, 1);
    assert!(report.changes.is_empty());

    app.fetcher.set_price("620", 800);
    let report = app.scheduler.sync_now().await?;
    assert_eq!(report.changes.len(), 1);
    assert_eq!(app.notifier.changed_ids(), vec!["620"]);
    assert_eq!(app.scheduler.state(), SchedulerState::Idle);
    Ok(())
}

#[tokio::test]
async fn test_fetch_failures_reach_the_operator() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    app.fetcher.set_price("620", 1000);
    app.manager
        .register_listing(create_test_listing("620", ListingKind::Single, "owner-a"))
        .await?;
    app.fetcher.fail("620");

    let report = app.scheduler.sync_now().await?;
    assert_eq!(report.failed, 1);
    assert_eq!(app.notifier.operator_count(), 1);
    assert!(app.notifier.changed_ids().is_empty());
    Ok(())
}
