use serde::Serialize;

use crate::database::{CatalogEntry, category_name};

/// what the listing api shows for a video. the upstream url stays server side, players get the
/// relay route instead
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoDto {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub duration: String,
    pub category: String,
    pub category_name: String,
    pub stream_url: String,
}

impl From<CatalogEntry> for VideoDto {
    fn from(entry: CatalogEntry) -> Self {
        Self {
            stream_url: format!("/stream/{}", urlencoding::encode(&entry.id)),
            category_name: category_name(&entry.category),
            id: entry.id,
            title: entry.title,
            description: entry.description,
            thumbnail: entry.thumbnail,
            duration: entry.duration,
            category: entry.category,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VideoListResponse {
    pub count: usize,
    pub videos: Vec<VideoDto>,
}
