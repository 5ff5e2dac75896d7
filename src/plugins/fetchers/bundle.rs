use reqwest::Client;
use reqwest::cookie::{CookieStore, Jar};
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::StorefrontConfig;
use crate::models::PriceSnapshot;
use crate::utils::currency::digits_to_minor;
use crate::utils::error::FetchError;

const AGE_GATE_FORM: [(&str, &str); 3] = [("ageDay", "1"), ("ageMonth", "January"), ("ageYear", "1990")];

/// A throwaway browsing session used for exactly one bundle lookup.
///
/// Bundle pages sit behind an age gate tied to a session cookie. Each lookup
/// gets its own cookie jar so a half-finished or rejected gate exchange can
/// never leak into a later request.
pub struct BundleSession {
    client: Client,
    jar: Arc<Jar>,
    base_url: String,
    timeout_secs: u64,
}

impl BundleSession {
    pub fn open(config: &StorefrontConfig) -> Result<Self, reqwest::Error> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout))
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        Ok(Self {
            client,
            jar,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.request_timeout,
        })
    }

    pub async fn fetch(self, external_id: &str) -> Result<PriceSnapshot, FetchError> {
        let page_url = format!("{}/bundle/{}/", self.base_url, external_id);

        // Landing on the page hands out the session cookie the gate form needs.
        self.get_page(&page_url).await?;
        let session_id = self.session_id(&page_url).ok_or_else(|| {
            FetchError::Shape(format!("bundle {} did not issue a session cookie", external_id))
        })?;

        self.confirm_age(external_id, &session_id).await?;

        let html = self.get_page(&page_url).await?;
        parse_bundle_page(&html, external_id)
    }

    async fn get_page(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| self.request_error(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16() });
        }
        response.text().await.map_err(|e| self.request_error(e))
    }

    async fn confirm_age(&self, external_id: &str, session_id: &str) -> Result<(), FetchError> {
        let url = format!("{}/agecheckset/bundle/{}/", self.base_url, external_id);
        let mut form = vec![("sessionid", session_id)];
        form.extend(AGE_GATE_FORM);

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16() });
        }
        tracing::debug!("Age gate confirmed for bundle {}", external_id);
        Ok(())
    }

    fn session_id(&self, page_url: &str) -> Option<String> {
        let url = Url::parse(page_url).ok()?;
        let header = self.jar.cookies(&url)?;
        let cookies = header.to_str().ok()?;
        cookies
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == "sessionid")
            .map(|(_, value)| value.to_string())
            .filter(|value| !value.is_empty())
    }

    fn request_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                seconds: self.timeout_secs,
            }
        } else {
            err.into()
        }
    }
}

fn first_text(root: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        root.select(&selector)
            .map(|element| element.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .find(|text| !text.is_empty())
    })
}

/// The bundle's own purchase box. Included items further down the page carry
/// their own discount blocks, so prices are only read inside this element.
fn purchase_block(document: &Html) -> ElementRef<'_> {
    [".game_area_purchase_game", ".game_purchase_action"]
        .iter()
        .filter_map(|raw| Selector::parse(raw).ok())
        .find_map(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element())
}

fn parse_failure(external_id: &str, field: &str) -> FetchError {
    FetchError::Parse {
        message: format!("bundle {} page has no {}", external_id, field),
    }
}

/// Extract a snapshot from a bundle store page.
pub fn parse_bundle_page(html: &str, external_id: &str) -> Result<PriceSnapshot, FetchError> {
    let document = Html::parse_document(html);

    let name = first_text(document.root_element(), &[".pageheader", ".page_title_area h2"])
        .ok_or_else(|| parse_failure(external_id, "name"))?;

    let purchase = purchase_block(&document);
    let final_formatted = first_text(purchase, &[".discount_final_price", ".game_purchase_price"])
        .ok_or_else(|| parse_failure(external_id, "final price"))?;
    let initial_formatted =
        first_text(purchase, &[".discount_original_price"]).unwrap_or_else(|| final_formatted.clone());

    let discount_percent = match first_text(purchase, &[".discount_pct"]) {
        Some(text) => digits_to_minor(&text).ok_or_else(|| parse_failure(external_id, "discount percentage"))?,
        None => 0,
    };

    let final_price = digits_to_minor(&final_formatted).ok_or_else(|| parse_failure(external_id, "numeric final price"))?;
    let initial_price =
        digits_to_minor(&initial_formatted).ok_or_else(|| parse_failure(external_id, "numeric original price"))?;

    Ok(PriceSnapshot::new(
        name,
        initial_price,
        final_price,
        initial_formatted,
        final_formatted,
        discount_percent,
    ))
}
