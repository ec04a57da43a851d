use chrono::NaiveTime;
use log::warn;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_FEED_URL: &str = "https://portal.amfiindia.com/spages/NAVAll.txt";
pub const DEFAULT_BENCHMARK_PLAN_ID: &str = "uti-mutual-fund-uti-nifty-50-index-fund-direct-growth";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub feed_url: String,
    pub feed_timeout: Duration,
    pub feed_proxy: Option<String>,
    pub sync_daily_at: NaiveTime,
    pub sync_max_attempts: u32,
    pub sync_retry_delay: Duration,
    pub history_batch_size: usize,
    pub history_chunk_size: usize,
    pub metrics_chunk_size: usize,
    pub benchmark_plan_id: String,
    pub risk_free_rate: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://fundsync.db?mode=rwc".to_string(),
            feed_url: DEFAULT_FEED_URL.to_string(),
            feed_timeout: Duration::from_secs(60),
            feed_proxy: None,
            sync_daily_at: NaiveTime::from_hms_opt(23, 30, 0).unwrap_or_default(),
            sync_max_attempts: 3,
            sync_retry_delay: Duration::from_secs(300),
            history_batch_size: 5000,
            history_chunk_size: 500,
            metrics_chunk_size: 200,
            benchmark_plan_id: DEFAULT_BENCHMARK_PLAN_ID.to_string(),
            risk_free_rate: 7.0,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            database_url: env_string("DATABASE_URL", d.database_url),
            feed_url: env_string("FEED_URL", d.feed_url),
            feed_timeout: Duration::from_secs(env_parse("FEED_TIMEOUT_SECS", 60u64)),
            feed_proxy: std::env::var("FEED_PROXY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            sync_daily_at: std::env::var("SYNC_DAILY_AT")
                .ok()
                .and_then(|raw| match NaiveTime::parse_from_str(raw.trim(), "%H:%M") {
                    Ok(t) => Some(t),
                    Err(_) => {
                        warn!("SYNC_DAILY_AT={} 无法解析，使用默认值", raw);
                        None
                    }
                })
                .unwrap_or(d.sync_daily_at),
            sync_max_attempts: env_parse("SYNC_MAX_ATTEMPTS", d.sync_max_attempts).max(1),
            sync_retry_delay: Duration::from_secs(env_parse("SYNC_RETRY_DELAY_SECS", 300u64)),
            history_batch_size: env_parse("HISTORY_BATCH_SIZE", d.history_batch_size).max(1),
            history_chunk_size: env_parse("HISTORY_CHUNK_SIZE", d.history_chunk_size).max(1),
            metrics_chunk_size: env_parse("METRICS_CHUNK_SIZE", d.metrics_chunk_size).max(1),
            benchmark_plan_id: env_string("BENCHMARK_PLAN_ID", d.benchmark_plan_id),
            risk_free_rate: env_parse("RISK_FREE_RATE", d.risk_free_rate),
        }
    }
}

fn env_string(key: &str, default: String) -> String {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default,
    }
}

fn env_parse<T: FromStr + Copy + std::fmt::Debug>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                warn!("{}={} 无法解析，使用默认值 {:?}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}
