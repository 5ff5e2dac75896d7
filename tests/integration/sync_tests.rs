use super::*;
use steam_watcher::AddOutcome;

#[tokio::test]
async fn test_two_listing_scenario() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    app.fetcher.set_price("620", 1_000_000);
    app.fetcher.set_price("469", 2_000_000);

    for (id, kind) in [("620", ListingKind::Single), ("469", ListingKind::Package)] {
        let outcome = app.manager.register_listing(create_test_listing(id, kind, "owner-a")).await?;
        assert!(matches!(outcome, AddOutcome::Added { .. }));
    }

    // First pass sets baselines only.
    assert!(app.engine.sync_all().await?.is_empty());

    app.fetcher.set_sale("620", 1_000_000, 500_000, 50);
    let changes = app.engine.sync_all().await?;

    assert_eq!(changes.len(), 1);
    let change = &changes[0];
    assert_eq!(change.external_id(), "620");
    assert_eq!(change.old.final_price_minor(), 1_000_000);
    assert_eq!(change.new.final_price_minor(), 500_000);
    assert!(change.new.on_sale());
    assert_eq!(change.new.discount_percent(), 50);

    let package = app.engine.snapshot_of("469").await.expect("baseline kept");
    assert_eq!(package.final_price_minor(), 2_000_000);

    Ok(())
}

#[tokio::test]
async fn test_unchanged_prices_produce_nothing() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    app.fetcher.set_price("620", 1_000_000);
    app.manager
        .register_listing(create_test_listing("620", ListingKind::Single, "owner-a"))
        .await?;

    for _ in 0..3 {
        assert!(app.engine.sync_all().await?.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn test_sale_flag_always_matches_discount() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    app.fetcher.set_sale("1", 1000, 900, 10);
    app.fetcher.set_sale("2", 1000, 1000, 0);
    app.fetcher.set_sale("3", 1000, 0, 150);
    for id in ["1", "2", "3"] {
        app.manager
            .register_listing(create_test_listing(id, ListingKind::Single, "owner-a"))
            .await?;
    }
    app.engine.sync_all().await?;

    for (item, snapshot) in app.manager.list_all(None).await {
        let snapshot = snapshot.expect("every listing fetched");
        assert_eq!(
            snapshot.on_sale(),
            snapshot.discount_percent() > 0,
            "listing {}",
            item.external_id
        );
        assert!(snapshot.discount_percent() <= 100);
    }
    Ok(())
}

#[tokio::test]
async fn test_failing_listing_is_isolated() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    app.fetcher.set_price("620", 1_000_000);
    app.fetcher.set_price("469", 2_000_000);
    for id in ["620", "469"] {
        app.manager
            .register_listing(create_test_listing(id, ListingKind::Single, "owner-a"))
            .await?;
    }
    app.engine.sync_all().await?;

    app.fetcher.fail("620");
    app.fetcher.set_price("469", 1_500_000);
    let report = app.engine.run_pass().await?;

    assert_eq!(report.failed, 1);
    assert_eq!(report.changes.len(), 1);
    assert_eq!(report.changes[0].external_id(), "469");

    let kept = app.engine.snapshot_of("620").await.expect("previous snapshot kept");
    assert_eq!(kept.final_price_minor(), 1_000_000);
    assert_eq!(app.engine.failure_count("620").await, 1);

    let messages = app.notifier.operator_messages.lock().unwrap().clone();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("620"));
    Ok(())
}

#[tokio::test]
async fn test_restart_sets_fresh_baselines() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    app.fetcher.set_price("620", 1_000_000);
    app.fetcher.set_price("469", 2_000_000);
    app.manager
        .register_listing(create_test_listing("620", ListingKind::Single, "owner-a"))
        .await?;
    app.manager
        .register_listing(create_test_listing("469", ListingKind::Package, "owner-b"))
        .await?;
    app.engine.sync_all().await?;

    // Prices move while the process is down.
    app.fetcher.set_price("620", 10);
    app.fetcher.set_price("469", 20);
    let app = app.restart().await?;

    let tracked = app.engine.tracked(|_| true).await;
    let ids: Vec<_> = tracked.iter().map(|i| i.external_id.as_str()).collect();
    assert_eq!(ids, vec!["620", "469"]);
    assert_eq!(tracked[1].kind, ListingKind::Package);

    assert!(app.engine.sync_all().await?.is_empty());
    assert_eq!(app.engine.snapshot_of("620").await.unwrap().final_price_minor(), 10);
    Ok(())
}

#[tokio::test]
async fn test_large_registry_keeps_order() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    let ids: Vec<String> = (1..=25).rev().map(|n| (n * 10).to_string()).collect();
    for id in &ids {
        app.fetcher.set_price(id, 1000);
        app.engine
            .track(create_test_listing(id, ListingKind::Single, "owner-a").into_item())
            .await?;
    }
    app.engine.sync_all().await?;

    for id in &ids {
        app.fetcher.set_price(id, 900);
    }
    let changed: Vec<String> = app
        .engine
        .sync_all()
        .await?
        .iter()
        .map(|c| c.external_id().to_string())
        .collect();
    assert_eq!(changed, ids);
    Ok(())
}
