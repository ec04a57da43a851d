pub mod current_price;
pub mod fund_metrics;
pub mod metrics_job;
pub mod price_history;
pub mod provider;
pub mod scheme;
pub mod scheme_plan;
pub mod sync_run;

pub use current_price::Entity as CurrentPrice;
pub use fund_metrics::Entity as FundMetrics;
pub use metrics_job::Entity as MetricsJob;
pub use price_history::Entity as PriceHistory;
pub use provider::Entity as Provider;
pub use scheme::Entity as Scheme;
pub use scheme_plan::Entity as SchemePlan;
pub use sync_run::Entity as SyncRun;
