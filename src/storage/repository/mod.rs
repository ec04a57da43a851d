pub mod catalog_repo;
pub mod metrics_job_repo;
pub mod metrics_repo;
pub mod price_repo;
pub mod sync_run_repo;

pub use catalog_repo::{CatalogCounts, CatalogRepository, NewPlan, NewScheme};
pub use metrics_job_repo::MetricsJobRepository;
pub use metrics_repo::MetricsRepository;
pub use price_repo::{HistoryPoint, LastPrice, PriceRepository};
pub use sync_run_repo::SyncRunRepository;
