use anyhow::Result;
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// one video in the catalog. the relay only ever cares about `id` and `video_url`, everything
/// else is display metadata for whoever renders the pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub video_url: String,
    pub duration: String,
    pub category: String,
}

impl CatalogEntry {
    pub fn upstream_url(&self) -> &str {
        &self.video_url
    }

    fn matches(&self, filter: &CatalogFilter) -> bool {
        if let Some(category) = filter.category()
            && self.category != category
        {
            return false;
        }

        match filter.search() {
            Some(search) => {
                let search = search.to_lowercase();
                self.title.to_lowercase().contains(&search)
                    || self.description.to_lowercase().contains(&search)
            }
            None => true,
        }
    }
}

/// fields an admin supplies when adding or editing a video, the id is always assigned by the store
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCatalogEntry {
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub video_url: String,
    pub duration: String,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "adventure".to_string()
}

impl NewCatalogEntry {
    /// trims every field and rejects the entry if any required one ends up blank
    pub fn normalized(self) -> Result<Self> {
        let entry = Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            thumbnail: self.thumbnail.trim().to_string(),
            video_url: self.video_url.trim().to_string(),
            duration: self.duration.trim().to_string(),
            category: self.category.trim().to_string(),
        };

        if entry.title.is_empty()
            || entry.description.is_empty()
            || entry.thumbnail.is_empty()
            || entry.video_url.is_empty()
            || entry.duration.is_empty()
        {
            anyhow::bail!("all fields are required");
        }

        Ok(entry)
    }

    pub fn into_entry(self, id: String) -> CatalogEntry {
        CatalogEntry {
            id,
            title: self.title,
            description: self.description,
            thumbnail: self.thumbnail,
            video_url: self.video_url,
            duration: self.duration,
            category: self.category,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFilter {
    pub search: Option<String>,
    pub category: Option<String>,
}

impl CatalogFilter {
    /// "all" and blank both mean no category filter
    pub fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != "all")
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn accepts(&self, entry: &CatalogEntry) -> bool {
        entry.matches(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
}

pub const CATEGORIES: &[Category] = &[
    Category { id: "action", name: "Action", icon: "zap" },
    Category { id: "adventure", name: "Adventure", icon: "compass" },
    Category { id: "drama", name: "Drama", icon: "heart" },
    Category { id: "thriller", name: "Thriller", icon: "alert-circle" },
    Category { id: "comedy", name: "Comedy", icon: "smile" },
    Category { id: "scifi", name: "Sci-Fi", icon: "rocket" },
    Category { id: "horror", name: "Horror", icon: "moon" },
    Category { id: "romance", name: "Romance", icon: "heart" },
    Category { id: "documentary", name: "Documentary", icon: "film" },
];

pub fn category_by_id(id: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == id)
}

/// display name for a category id, unknown ids are just capitalized
pub fn category_name(id: &str) -> String {
    match category_by_id(id) {
        Some(category) => category.name.to_string(),
        None => {
            let mut chars = id.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        }
    }
}

pub type DynCatalogRepository = Arc<dyn CatalogRepository + Send + Sync>;

#[automock]
#[async_trait::async_trait]
pub trait CatalogRepository {
    async fn get_by_id(&self, id: &str) -> Result<Option<CatalogEntry>>;
    async fn list(&self, filter: &CatalogFilter) -> Result<Vec<CatalogEntry>>;
    async fn count(&self) -> Result<usize>;
    async fn insert(&self, entry: NewCatalogEntry) -> Result<CatalogEntry>;
    async fn update(&self, id: &str, entry: NewCatalogEntry) -> Result<Option<CatalogEntry>>;
    async fn remove(&self, id: &str) -> Result<bool>;
}
