use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 行业日度净值源中的一条记录（单个份额）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub house_name: String,
    pub scheme_name: String,
    pub scheme_type: String,
    pub category: String,
    pub scheme_code: String,
    pub isin_primary: Option<String>,
    pub isin_secondary: Option<String>,
    pub price: f64,
    pub price_date: NaiveDate,
}

impl FeedRecord {
    pub fn has_identifier(&self) -> bool {
        self.primary_identifier().is_some()
    }

    /// 第一个非空的唯一标识（主字段优先）
    pub fn primary_identifier(&self) -> Option<&str> {
        [self.isin_primary.as_deref(), self.isin_secondary.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    #[error("http error: {0}")]
    Http(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("invalid feed: {0}")]
    Parse(String),
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<FeedRecord>, FeedError>;
}

/// 测试使用的固定内容数据源
#[cfg(test)]
#[derive(Clone, Debug, Default)]
pub struct StaticFeed {
    records: Vec<FeedRecord>,
}

#[cfg(test)]
impl StaticFeed {
    pub fn new(records: Vec<FeedRecord>) -> Self {
        Self { records }
    }
}

#[cfg(test)]
#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self) -> Result<Vec<FeedRecord>, FeedError> {
        Ok(self.records.clone())
    }
}
