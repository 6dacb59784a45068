pub mod app_services;
pub mod relay_services;
pub mod upstream_services;

pub use app_services::AppServices;
pub use relay_services::RelayService;
pub use upstream_services::DynUpstreamService;
