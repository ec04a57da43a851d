use crate::config::AppConfig;
use crate::sync::model::{SyncError, SyncOutcome};
use crate::sync::service::SyncService;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// 执行一次同步，失败时按固定间隔重试
///
/// `AlreadyRunning` 不算失败，直接返回。最后一次的错误原样返回给调用方。
pub async fn run_with_retry(
    service: &SyncService,
    max_attempts: u32,
    delay: Duration,
) -> Result<SyncOutcome, SyncError> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match service.run_once().await {
            Ok(outcome) => return Ok(outcome),
            Err(e) if attempt < max_attempts => {
                warn!(
                    "定时同步第 {}/{} 次失败: {}，{} 秒后重试",
                    attempt,
                    max_attempts,
                    e,
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!("定时同步 {} 次均失败，放弃本轮: {}", max_attempts, e);
                return Err(e);
            }
        }
    }
}

/// 严格晚于 `now` 的下一个 `at` 时刻
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

/// 每日定时同步（本地时间）
pub fn spawn_daily(service: Arc<SyncService>, config: &AppConfig) -> JoinHandle<()> {
    let at = config.sync_daily_at;
    let max_attempts = config.sync_max_attempts;
    let delay = config.sync_retry_delay;
    tokio::spawn(async move {
        loop {
            let now = Local::now().naive_local();
            let next = next_run_after(now, at);
            let wait = (next - now).to_std().unwrap_or(Duration::from_secs(60));
            info!("下次定时同步: {} (约 {} 秒后)", next, wait.as_secs());
            tokio::time::sleep(wait).await;

            match run_with_retry(&service, max_attempts, delay).await {
                Ok(outcome) => info!(
                    "定时同步结束: {:?}，共 {}，成功 {}，失败 {}",
                    outcome.status, outcome.total, outcome.synced, outcome.failed
                ),
                Err(e) => error!("定时同步最终失败: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedError, FeedRecord, FeedSource};
    use crate::storage::connection::connect_in_memory;
    use crate::storage::repository::SyncRunRepository;
    use crate::sync::model::SyncStatus;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use sea_orm::{EntityTrait, PaginatorTrait};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::mpsc;

    /// 前 `failures` 次返回错误，之后返回空列表
    struct FlakyFeed {
        calls: AtomicU32,
        failures: u32,
    }

    #[async_trait]
    impl FeedSource for FlakyFeed {
        async fn fetch(&self) -> Result<Vec<FeedRecord>, FeedError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                Err(FeedError::Http(format!("connection reset #{}", n)))
            } else {
                Ok(Vec::new())
            }
        }
    }

    async fn service_with(failures: u32) -> (SyncService, Arc<FlakyFeed>) {
        let db = Arc::new(connect_in_memory().await);
        let feed = Arc::new(FlakyFeed {
            calls: AtomicU32::new(0),
            failures,
        });
        let (tx, _rx) = mpsc::unbounded_channel();
        let svc = SyncService::new(db, feed.clone(), None, tx, &AppConfig::default());
        (svc, feed)
    }

    #[tokio::test]
    async fn retries_until_success() {
        let (svc, feed) = service_with(2).await;
        let outcome = run_with_retry(&svc, 3, Duration::ZERO).await.unwrap();
        assert_eq!(outcome.status, SyncStatus::Completed);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let (svc, feed) = service_with(10).await;
        let err = run_with_retry(&svc, 3, Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, SyncError::Feed(FeedError::Http(_))));
        assert_eq!(feed.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn every_attempt_is_recorded() {
        let db = Arc::new(connect_in_memory().await);
        let feed = Arc::new(FlakyFeed {
            calls: AtomicU32::new(0),
            failures: 1,
        });
        let (tx, _rx) = mpsc::unbounded_channel();
        let svc = SyncService::new(db.clone(), feed, None, tx, &AppConfig::default());
        run_with_retry(&svc, 2, Duration::ZERO).await.unwrap();

        let runs = crate::storage::entity::SyncRun::find()
            .count(db.as_ref())
            .await
            .unwrap();
        assert_eq!(runs, 2);
        let last = SyncRunRepository::latest(db.as_ref()).await.unwrap().unwrap();
        assert_eq!(last.status, "COMPLETED");
    }

    #[test]
    fn next_run_is_today_or_tomorrow() {
        let at = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        let before = day.and_hms_opt(8, 0, 0).unwrap();
        assert_eq!(next_run_after(before, at), day.and_time(at));

        let exactly = day.and_time(at);
        assert_eq!(
            next_run_after(exactly, at),
            day.succ_opt().unwrap().and_time(at)
        );

        let after = day.and_hms_opt(23, 45, 0).unwrap();
        assert_eq!(next_run_after(after, at), day.succ_opt().unwrap().and_time(at));
    }
}
