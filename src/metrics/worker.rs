use crate::app_state::AppEvent;
use crate::metrics::engine::{MetricsError, MetricsService, MetricsSummary};
use crate::storage::repository::MetricsJobRepository;
use chrono::Local;
use log::{error, info, warn};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};

/// 无通知时的兜底轮询间隔
const IDLE_POLL: Duration = Duration::from_secs(30);

/// 单并发的指标任务消费者
pub struct MetricsWorker {
    db: Arc<DatabaseConnection>,
    service: Arc<MetricsService>,
    notify: Arc<Notify>,
    evt_tx: mpsc::UnboundedSender<AppEvent>,
}

impl MetricsWorker {
    pub fn new(
        db: Arc<DatabaseConnection>,
        service: Arc<MetricsService>,
        notify: Arc<Notify>,
        evt_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            db,
            service,
            notify,
            evt_tx,
        }
    }

    /// 启动时把上次中断的 RUNNING 任务放回队列
    pub async fn recover(&self) {
        info!("正在执行指标任务恢复程序...");
        match MetricsJobRepository::reset_stale_jobs(&self.db).await {
            Ok(count) if count > 0 => {
                info!("✓ 成功恢复 {} 个中断的指标任务", count);
                let _ = self.evt_tx.send(AppEvent::Log(format!(
                    "✓ 系统恢复: {} 个指标任务重置为等待状态",
                    count
                )));
            }
            Ok(_) => info!("未发现需要恢复的指标任务"),
            Err(e) => error!("恢复指标任务时出错: {}", e),
        }
    }

    /// claim 并执行一个任务；队列为空时返回 Ok(None)
    pub async fn process_next(&self) -> Result<Option<MetricsSummary>, MetricsError> {
        let Some(job) = MetricsJobRepository::claim_next(&self.db).await? else {
            return Ok(None);
        };
        info!("▶ 开始指标任务 [{}] {}", job.id, job.job_key);

        let as_of = Local::now().date_naive();
        match self.service.recalculate_all(as_of).await {
            Ok(summary) => {
                let json = serde_json::to_string(&summary)
                    .map_err(|e| MetricsError::Job(format!("summary 序列化失败: {}", e)))?;
                MetricsJobRepository::mark_done(&self.db, job.id, json).await?;
                info!("✓ 指标任务完成 [{}]: {:?}", job.id, summary);
                let _ = self.evt_tx.send(AppEvent::Message(format!(
                    "✓ 指标重算完成：处理 {}，跳过 {}，失败 {}，评级 {}",
                    summary.processed, summary.skipped, summary.failed, summary.rated
                )));
                Ok(Some(summary))
            }
            Err(e) => {
                let msg = e.to_string();
                error!("✗ 指标任务失败 [{}]: {}", job.id, msg);
                MetricsJobRepository::mark_failed(&self.db, job.id, &msg).await?;
                let _ = self
                    .evt_tx
                    .send(AppEvent::Error(format!("✗ 指标重算失败: {}", msg)));
                Err(e)
            }
        }
    }

    /// 常驻消费循环；同一时刻只处理一个任务
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match self.process_next().await {
                    Ok(Some(_)) => continue,
                    Ok(None) => {
                        let _ = timeout(IDLE_POLL, self.notify.notified()).await;
                    }
                    Err(e) => {
                        warn!("⚠ 指标任务处理出错: {}", e);
                        sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        })
    }
}
