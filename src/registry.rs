use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::models::{ListingKind, TrackedItem};
use crate::utils::error::RegistryError;

/// On-disk shape of one subscription, keyed by external id in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSubscription {
    #[serde(deserialize_with = "string_or_number")]
    user_id: String,
    #[serde(deserialize_with = "string_or_number")]
    channel: String,
    #[serde(rename = "type")]
    kind: ListingKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
}

/// Older stores wrote subscriber and channel ids as JSON numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

impl StoredSubscription {
    fn from_item(item: &TrackedItem) -> Self {
        Self {
            user_id: item.owner_id.clone(),
            channel: item.delivery_target.clone(),
            kind: item.kind,
            scope: item.scope_id.clone(),
        }
    }

    fn into_item(self, external_id: String) -> TrackedItem {
        TrackedItem {
            external_id,
            kind: self.kind,
            owner_id: self.user_id,
            delivery_target: self.channel,
            scope_id: self.scope,
        }
    }
}

/// Durable, insertion-ordered set of subscriptions, one per listing.
///
/// Every mutating call rewrites the backing file before it returns; if the
/// write fails the in-memory change is rolled back so memory and disk agree.
#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    items: IndexMap<String, TrackedItem>,
}

impl Registry {
    /// Load the store at `path`, creating an empty one when it does not exist.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref().to_path_buf();

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Registry {} not found, creating an empty one", path.display());
                let registry = Self {
                    path,
                    items: IndexMap::new(),
                };
                registry.save().await?;
                return Ok(registry);
            }
            Err(e) => return Err(e.into()),
        };

        let stored: IndexMap<String, StoredSubscription> =
            serde_json::from_str(&raw).map_err(|e| RegistryError::Corrupt {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let items: IndexMap<String, TrackedItem> = stored
            .into_iter()
            .map(|(id, sub)| (id.clone(), sub.into_item(id)))
            .collect();

        tracing::info!("Loaded {} tracked listings from {}", items.len(), path.display());
        Ok(Self { path, items })
    }

    /// Write the whole store through a sibling temp file and an atomic rename.
    pub async fn save(&self) -> Result<(), RegistryError> {
        let stored: IndexMap<&str, StoredSubscription> = self
            .items
            .iter()
            .map(|(id, item)| (id.as_str(), StoredSubscription::from_item(item)))
            .collect();
        let body = serde_json::to_string_pretty(&stored)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        tokio::fs::write(&tmp_path, body).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, external_id: &str) -> bool {
        self.items.contains_key(external_id)
    }

    pub fn get(&self, external_id: &str) -> Option<&TrackedItem> {
        self.items.get(external_id)
    }

    /// Items matching `predicate`, in registration order.
    pub fn list<F>(&self, predicate: F) -> Vec<TrackedItem>
    where
        F: Fn(&TrackedItem) -> bool,
    {
        self.items.values().filter(|item| predicate(item)).cloned().collect()
    }

    pub async fn add(&mut self, item: TrackedItem) -> Result<(), RegistryError> {
        if self.items.contains_key(&item.external_id) {
            return Err(RegistryError::AlreadyTracked {
                external_id: item.external_id,
            });
        }

        let external_id = item.external_id.clone();
        self.items.insert(external_id.clone(), item);

        if let Err(e) = self.save().await {
            self.items.shift_remove(&external_id);
            return Err(e);
        }
        Ok(())
    }

    pub async fn remove(&mut self, external_id: &str) -> Result<TrackedItem, RegistryError> {
        let (index, key, item) = self
            .items
            .shift_remove_full(external_id)
            .ok_or_else(|| RegistryError::not_found(format!("listing {}", external_id)))?;

        if let Err(e) = self.save().await {
            self.items.shift_insert(index, key, item);
            return Err(e);
        }
        Ok(item)
    }

    /// Remove several ids with a single write.
    ///
    /// The outer error is a failed write, in which case nothing was removed.
    /// Ids that are not tracked (including repeats) come back as `NotFound`.
    pub async fn remove_many(
        &mut self,
        external_ids: &[String],
    ) -> Result<Vec<Result<TrackedItem, RegistryError>>, RegistryError> {
        let mut removed = Vec::new();
        let mut outcomes = Vec::with_capacity(external_ids.len());

        for external_id in external_ids {
            match self.items.shift_remove_full(external_id.as_str()) {
                Some((index, key, item)) => {
                    outcomes.push(Ok(item.clone()));
                    removed.push((index, key, item));
                }
                None => outcomes.push(Err(RegistryError::not_found(format!("listing {}", external_id)))),
            }
        }

        if removed.is_empty() {
            return Ok(outcomes);
        }

        if let Err(e) = self.save().await {
            for (index, key, item) in removed.into_iter().rev() {
                self.items.shift_insert(index, key, item);
            }
            return Err(e);
        }
        Ok(outcomes)
    }
}
