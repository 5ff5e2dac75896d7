use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use url::Url;

use crate::models::ListingKind;

/// A listing identity without any subscription attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingRef {
    pub external_id: String,
    pub kind: ListingKind,
}

fn store_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^/(app|sub|bundle)/([0-9]+)(?:/|$)").expect("static regex"))
}

impl ListingRef {
    pub fn new(external_id: impl Into<String>, kind: ListingKind) -> Self {
        Self {
            external_id: external_id.into(),
            kind,
        }
    }

    /// Parse a store page link such as
    /// `https://store.steampowered.com/app/620/Portal_2/`.
    pub fn from_store_url(input: &str) -> Option<Self> {
        let url = Url::parse(input.trim()).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        if url.host_str()? != "store.steampowered.com" {
            return None;
        }

        let captures = store_path_regex().captures(url.path())?;
        let kind = ListingKind::from_store_segment(captures.get(1)?.as_str())?;
        Some(Self::new(captures.get(2)?.as_str(), kind))
    }
}

/// A listing proposed by a search adapter for a free-text query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateListing {
    pub listing: ListingRef,
    pub title: String,
}
