use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    routing::get,
};

use crate::{
    database::{CATEGORIES, CatalogFilter, Category},
    server::{
        dtos::catalog_dto::{VideoDto, VideoListResponse},
        error::{AppResult, Error},
        services::AppServices,
    },
};

/// read only view of the catalog for the front end. editing happens elsewhere
pub struct CatalogController;

impl CatalogController {
    pub fn app() -> Router {
        Router::new()
            .route("/videos", get(Self::list_videos))
            .route("/videos/{video_id}", get(Self::get_video))
            .route("/categories", get(Self::list_categories))
    }

    async fn list_videos(
        Extension(services): Extension<AppServices>,
        Query(filter): Query<CatalogFilter>,
    ) -> AppResult<Json<VideoListResponse>> {
        let videos: Vec<VideoDto> = services
            .catalog
            .list(&filter)
            .await?
            .into_iter()
            .map(VideoDto::from)
            .collect();

        Ok(Json(VideoListResponse {
            count: videos.len(),
            videos,
        }))
    }

    async fn get_video(
        Extension(services): Extension<AppServices>,
        Path(video_id): Path<String>,
    ) -> AppResult<Json<VideoDto>> {
        let entry = services
            .catalog
            .get_by_id(&video_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("video {} not found", video_id)))?;

        Ok(Json(VideoDto::from(entry)))
    }

    async fn list_categories() -> Json<&'static [Category]> {
        Json(CATEGORIES)
    }
}
