pub mod catalog_controller;
pub mod health_controller;
pub mod stream_controller;

pub use catalog_controller::CatalogController;
pub use health_controller::health_endpoint;
pub use stream_controller::StreamController;
