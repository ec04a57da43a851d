use crate::storage::repository::MetricsJobRepository;
use chrono::Utc;
use log::info;
use sea_orm::{DatabaseConnection, DbErr};
use std::sync::Arc;
use tokio::sync::Notify;

/// 指标重算触发器：把任务持久化到队列并唤醒 worker，不等待执行
#[derive(Clone)]
pub struct MetricsTrigger {
    db: Arc<DatabaseConnection>,
    notify: Arc<Notify>,
}

impl MetricsTrigger {
    pub fn new(db: Arc<DatabaseConnection>, notify: Arc<Notify>) -> Self {
        Self { db, notify }
    }

    pub fn job_key_now() -> String {
        format!("metrics-{}", Utc::now().timestamp())
    }

    /// 入队并通知；同一 job_key 只会入队一次，返回是否新入队
    pub async fn fire_with_key(&self, job_key: &str) -> Result<bool, DbErr> {
        let queued = MetricsJobRepository::enqueue(&self.db, job_key).await?;
        if queued {
            info!("指标重算任务已入队: {}", job_key);
            self.notify.notify_one();
        } else {
            info!("指标重算任务已存在，跳过: {}", job_key);
        }
        Ok(queued)
    }

    pub async fn fire(&self) -> Result<String, DbErr> {
        let key = Self::job_key_now();
        self.fire_with_key(&key).await?;
        Ok(key)
    }
}
