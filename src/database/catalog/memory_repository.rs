use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, warn};

use super::model::{CatalogEntry, CatalogFilter, CatalogRepository, NewCatalogEntry};

/// catalog kept in memory and seeded from a json file on startup.
///
/// readers get clones of entries so a request never sees an entry half way through an edit
pub struct InMemoryCatalog {
    entries: RwLock<HashMap<String, CatalogEntry>>,
}

impl InMemoryCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self> {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            if map.contains_key(&entry.id) {
                anyhow::bail!("duplicate catalog id {}", entry.id);
            }
            map.insert(entry.id.clone(), entry);
        }

        Ok(Self {
            entries: RwLock::new(map),
        })
    }

    /// loads a json array of entries, a missing file is an empty catalog and not an error
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            warn!(
                "catalog file {} not found, starting with an empty catalog",
                path.display()
            );
            return Self::new(Vec::new());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog file {}", path.display()))?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse catalog file {}", path.display()))?;

        info!("loaded {} catalog entries from {}", entries.len(), path.display());

        Self::new(entries)
    }

    /// numeric ids are handed out as max + 1, anything non numeric is skipped
    fn next_id(entries: &HashMap<String, CatalogEntry>) -> String {
        entries
            .keys()
            .filter_map(|id| id.parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1)
            .to_string()
    }

    fn sort_key(id: &str) -> (u64, &str) {
        (id.parse::<u64>().unwrap_or(u64::MAX), id)
    }
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn get_by_id(&self, id: &str) -> Result<Option<CatalogEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("catalog lock poisoned"))?;

        Ok(entries.get(id).cloned())
    }

    async fn list(&self, filter: &CatalogFilter) -> Result<Vec<CatalogEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("catalog lock poisoned"))?;

        let mut matching: Vec<CatalogEntry> = entries
            .values()
            .filter(|entry| filter.accepts(entry))
            .cloned()
            .collect();
        matching.sort_by(|a, b| Self::sort_key(&a.id).cmp(&Self::sort_key(&b.id)));

        debug!("catalog list matched {} of {} entries", matching.len(), entries.len());

        Ok(matching)
    }

    async fn count(&self) -> Result<usize> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("catalog lock poisoned"))?;

        Ok(entries.len())
    }

    async fn insert(&self, entry: NewCatalogEntry) -> Result<CatalogEntry> {
        let entry = entry.normalized()?;

        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("catalog lock poisoned"))?;

        let id = Self::next_id(&entries);
        let entry = entry.into_entry(id.clone());
        entries.insert(id.clone(), entry.clone());

        info!("added catalog entry {}", id);

        Ok(entry)
    }

    async fn update(&self, id: &str, entry: NewCatalogEntry) -> Result<Option<CatalogEntry>> {
        let entry = entry.normalized()?;

        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("catalog lock poisoned"))?;

        let Some(existing) = entries.get_mut(id) else {
            return Ok(None);
        };
        *existing = entry.into_entry(id.to_string());

        info!("updated catalog entry {}", id);

        Ok(Some(existing.clone()))
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("catalog lock poisoned"))?;

        let removed = entries.remove(id).is_some();
        if removed {
            info!("removed catalog entry {}", id);
        }

        Ok(removed)
    }
}
