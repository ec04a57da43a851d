use crate::app_state::AppEvent;
use crate::catalog::{resolve_record, ResolutionContext};
use crate::config::AppConfig;
use crate::feed::{filter_records, FeedSource};
use crate::metrics::MetricsTrigger;
use crate::storage::repository::{PriceRepository, SyncRunRepository};
use crate::sync::history::HistoryWriter;
use crate::sync::model::{SyncError, SyncOutcome, SyncProgress, SyncState, SyncStatus};
use log::{debug, error, info, warn};
use sea_orm::DatabaseConnection;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

const PROGRESS_EVERY: usize = 2000;

/// 运行期间持有，离开作用域时恢复 Idle（包括出错提前返回）
struct RunGuard<'a> {
    state: &'a AtomicU8,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.state.store(SyncState::Idle as u8, Ordering::SeqCst);
    }
}

pub struct SyncService {
    db: Arc<DatabaseConnection>,
    feed: Arc<dyn FeedSource>,
    trigger: Option<MetricsTrigger>,
    evt_tx: mpsc::UnboundedSender<AppEvent>,
    state: AtomicU8,
    history_batch_size: usize,
    history_chunk_size: usize,
}

impl SyncService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        feed: Arc<dyn FeedSource>,
        trigger: Option<MetricsTrigger>,
        evt_tx: mpsc::UnboundedSender<AppEvent>,
        config: &AppConfig,
    ) -> Self {
        Self {
            db,
            feed,
            trigger,
            evt_tx,
            state: AtomicU8::new(SyncState::Idle as u8),
            history_batch_size: config.history_batch_size,
            history_chunk_size: config.history_chunk_size,
        }
    }

    pub fn state(&self) -> SyncState {
        SyncState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state() == SyncState::Running
    }

    fn try_begin(&self) -> Option<RunGuard<'_>> {
        self.state
            .compare_exchange(
                SyncState::Idle as u8,
                SyncState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .ok()
            .map(|_| RunGuard { state: &self.state })
    }

    /// 执行一次完整同步；已有同步在运行时立即返回 `AlreadyRunning`
    pub async fn run_once(&self) -> Result<SyncOutcome, SyncError> {
        let Some(_guard) = self.try_begin() else {
            info!("已有净值同步进行中，忽略本次请求");
            let _ = self
                .evt_tx
                .send(AppEvent::Message("已有净值同步进行中，忽略本次请求".to_string()));
            return Ok(SyncOutcome::already_running());
        };

        let db = self.db.as_ref();
        let run_id = SyncRunRepository::start(db).await?;
        info!("净值同步开始 [run {}]", run_id);
        let _ = self
            .evt_tx
            .send(AppEvent::Message(format!("净值同步开始 [run {}]", run_id)));

        let mut progress = SyncProgress::default();
        match self.execute(run_id, &mut progress).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let msg = e.to_string();
                error!("净值同步失败 [run {}]: {}", run_id, msg);
                if let Err(db_err) = SyncRunRepository::fail(
                    db,
                    run_id,
                    progress.total,
                    progress.synced,
                    progress.failed,
                    &msg,
                )
                .await
                {
                    error!("记录同步失败状态出错 [run {}]: {}", run_id, db_err);
                }
                let _ = self
                    .evt_tx
                    .send(AppEvent::Error(format!("净值同步失败: {}", msg)));
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        run_id: i32,
        progress: &mut SyncProgress,
    ) -> Result<SyncOutcome, SyncError> {
        let db = self.db.as_ref();

        let raw = self.feed.fetch().await?;
        let raw_len = raw.len();
        let records = filter_records(raw);
        progress.total = records.len();
        info!(
            "净值源: 原始 {} 条，过滤后 {} 条 [run {}]",
            raw_len,
            records.len(),
            run_id
        );

        // 假日/周末：净值源日期没有前进
        if let Some(first) = records.first() {
            if PriceRepository::latest_price_date(db).await? == Some(first.price_date) {
                let note = format!("no new prices for {}", first.price_date);
                info!("净值日期 {} 与库中最新日期相同，跳过本次同步", first.price_date);
                SyncRunRepository::complete(db, run_id, progress.total, 0, 0, Some(note)).await?;
                let _ = self.evt_tx.send(AppEvent::Message(format!(
                    "净值日期 {} 未更新（假日），跳过",
                    first.price_date
                )));
                return Ok(SyncOutcome {
                    run_id: Some(run_id),
                    status: SyncStatus::NoNewData,
                    total: progress.total,
                    synced: 0,
                    failed: 0,
                    history_inserted: 0,
                });
            }
        }

        let mut ctx = ResolutionContext::preload(db).await?;
        info!(
            "目录快照: 基金公司 {}，产品 {}，份额 {}，当前净值 {}",
            ctx.providers.len(),
            ctx.scheme_ids.len(),
            ctx.plan_ids.len(),
            ctx.last_prices.len()
        );

        let mut writer = HistoryWriter::new(self.history_batch_size, self.history_chunk_size);
        // 快照在循环中被原地修改，必须顺序处理
        for (idx, record) in records.iter().enumerate() {
            match resolve_record(db, &mut ctx, record).await {
                Ok(resolved) => {
                    progress.synced += 1;
                    if resolved.created_plan {
                        debug!(
                            "新增份额 {} [{}] 标识 {:?}",
                            resolved.plan_id, resolved.scheme_id, resolved.identifier
                        );
                    }
                    writer.push_and_flush_if_full(db, resolved.history).await?;
                }
                Err(e) => {
                    progress.failed += 1;
                    warn!(
                        "记录同步失败 [{} / {}]: {}",
                        record.scheme_code, record.scheme_name, e
                    );
                }
            }
            if (idx + 1) % PROGRESS_EVERY == 0 {
                let _ = self.evt_tx.send(AppEvent::Log(format!(
                    "同步进度: {}/{}，成功 {}，失败 {}",
                    idx + 1,
                    progress.total,
                    progress.synced,
                    progress.failed
                )));
            }
        }
        debug!("运行结束，刷新剩余历史净值 {} 条", writer.pending());
        writer.flush(db).await?;

        SyncRunRepository::complete(
            db,
            run_id,
            progress.total,
            progress.synced,
            progress.failed,
            None,
        )
        .await?;
        info!(
            "净值同步完成 [run {}]: 共 {}，成功 {}，失败 {}，新增历史 {}",
            run_id,
            progress.total,
            progress.synced,
            progress.failed,
            writer.inserted()
        );
        let _ = self.evt_tx.send(AppEvent::Message(format!(
            "净值同步完成：共 {}，成功 {}，失败 {}",
            progress.total, progress.synced, progress.failed
        )));

        if progress.synced > 0 {
            if let Some(trigger) = &self.trigger {
                if let Err(e) = trigger.fire().await {
                    warn!("指标重算任务入队失败: {}", e);
                }
            }
        }

        Ok(SyncOutcome {
            run_id: Some(run_id),
            status: SyncStatus::Completed,
            total: progress.total,
            synced: progress.synced,
            failed: progress.failed,
            history_inserted: writer.inserted(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedError, FeedRecord, StaticFeed};
    use crate::storage::connection::connect_in_memory;
    use crate::storage::entity::sync_run;
    use crate::storage::repository::{
        CatalogRepository, MetricsJobRepository, SyncRunRepository,
    };
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn record(name: &str, isin: &str, code: &str, date: NaiveDate) -> FeedRecord {
        FeedRecord {
            house_name: "ABC Mutual Fund".to_string(),
            scheme_name: name.to_string(),
            scheme_type: "Open Ended Schemes".to_string(),
            category: "Equity Scheme - Flexi Cap Fund".to_string(),
            scheme_code: code.to_string(),
            isin_primary: Some(isin.to_string()),
            isin_secondary: None,
            price: 25.5,
            price_date: date,
        }
    }

    fn feed_for(date: NaiveDate) -> Vec<FeedRecord> {
        vec![
            record("ABC Flexi Cap Fund - Direct Plan - Growth", "INF01", "1", date),
            record("ABC Flexi Cap Fund - Regular Plan - Growth", "INF02", "2", date),
            record("ABC Flexi Cap Fund - Direct Plan - IDCW", "INF03", "3", date),
        ]
    }

    fn service(db: Arc<DatabaseConnection>, feed: Arc<dyn FeedSource>) -> SyncService {
        let (tx, _rx) = mpsc::unbounded_channel();
        let trigger = MetricsTrigger::new(db.clone(), Arc::new(Notify::new()));
        let cfg = AppConfig {
            history_batch_size: 2,
            history_chunk_size: 2,
            ..AppConfig::default()
        };
        SyncService::new(db, feed, Some(trigger), tx, &cfg)
    }

    async fn latest_run(db: &DatabaseConnection) -> sync_run::Model {
        SyncRunRepository::latest(db).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn full_run_writes_catalog_history_and_queues_metrics() {
        let db = Arc::new(connect_in_memory().await);
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let svc = service(db.clone(), Arc::new(StaticFeed::new(feed_for(date))));

        let outcome = svc.run_once().await.unwrap();
        assert_eq!(outcome.status, SyncStatus::Completed);
        assert_eq!((outcome.total, outcome.synced, outcome.failed), (3, 3, 0));
        assert_eq!(outcome.history_inserted, 3);
        assert!(!svc.is_running());

        let counts = CatalogRepository::counts(db.as_ref()).await.unwrap();
        assert_eq!((counts.providers, counts.schemes, counts.plans), (1, 1, 3));
        assert_eq!(PriceRepository::history_count(db.as_ref()).await.unwrap(), 3);

        let run = latest_run(db.as_ref()).await;
        assert_eq!(run.status, "COMPLETED");
        assert_eq!((run.total, run.synced, run.failed), (3, 3, 0));
        assert_eq!(MetricsJobRepository::count_pending(db.as_ref()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn same_feed_date_is_a_noop() {
        let db = Arc::new(connect_in_memory().await);
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let svc = service(db.clone(), Arc::new(StaticFeed::new(feed_for(date))));
        svc.run_once().await.unwrap();
        let history_before = PriceRepository::history_count(db.as_ref()).await.unwrap();

        let outcome = svc.run_once().await.unwrap();
        assert_eq!(outcome.status, SyncStatus::NoNewData);
        assert_eq!((outcome.total, outcome.synced, outcome.failed), (3, 0, 0));
        assert_eq!(
            PriceRepository::history_count(db.as_ref()).await.unwrap(),
            history_before
        );
        let run = latest_run(db.as_ref()).await;
        assert_eq!(run.status, "COMPLETED");
        assert!(run.note.unwrap_or_default().contains("no new prices"));
    }

    #[tokio::test]
    async fn one_bad_record_does_not_abort_the_run() {
        let db = Arc::new(connect_in_memory().await);
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let mut records = feed_for(date);
        records.push(record("ABC Flexi Cap Fund - Regular Plan - IDCW", "INF04", "4", date));
        // 第 2 条：基金公司名无法生成 id，解析时报错
        records[1].house_name = "***".to_string();
        let n = records.len();

        let svc = service(db.clone(), Arc::new(StaticFeed::new(records)));
        let outcome = svc.run_once().await.unwrap();
        assert_eq!(outcome.status, SyncStatus::Completed);
        assert_eq!((outcome.synced, outcome.failed), (n - 1, 1));
        assert_eq!(latest_run(db.as_ref()).await.failed, 1);
    }

    struct BrokenFeed;

    #[async_trait]
    impl FeedSource for BrokenFeed {
        async fn fetch(&self) -> Result<Vec<FeedRecord>, FeedError> {
            Err(FeedError::Status(503))
        }
    }

    #[tokio::test]
    async fn feed_failure_marks_run_failed() {
        let db = Arc::new(connect_in_memory().await);
        let svc = service(db.clone(), Arc::new(BrokenFeed));
        let err = svc.run_once().await.unwrap_err();
        assert!(matches!(err, SyncError::Feed(FeedError::Status(503))));
        assert!(!svc.is_running());

        let run = latest_run(db.as_ref()).await;
        assert_eq!(run.status, "FAILED");
        assert!(run.error_message.unwrap().contains("503"));
    }

    struct SlowFeed(Vec<FeedRecord>);

    #[async_trait]
    impl FeedSource for SlowFeed {
        async fn fetch(&self) -> Result<Vec<FeedRecord>, FeedError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn concurrent_request_is_rejected() {
        let db = Arc::new(connect_in_memory().await);
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let svc = Arc::new(service(db.clone(), Arc::new(SlowFeed(feed_for(date)))));

        let first = {
            let svc = svc.clone();
            tokio::spawn(async move { svc.run_once().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(svc.state(), SyncState::Running);

        let second = svc.run_once().await.unwrap();
        assert_eq!(second, SyncOutcome::already_running());

        let first = first.await.unwrap().unwrap();
        assert_eq!(first.status, SyncStatus::Completed);
        assert_eq!(svc.state(), SyncState::Idle);
    }
}
