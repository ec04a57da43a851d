use crate::app_state::AppEvent;
use crate::storage::entity::sync_run;
use crate::storage::repository::{
    CatalogCounts, CatalogRepository, MetricsJobRepository, PriceRepository, SyncRunRepository,
};
use crate::sync::SyncState;
use chrono::{Local, TimeZone};
use sea_orm::{DatabaseConnection, DbErr};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// 只读状态快照，供运维查看
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub state: SyncState,
    pub last_run: Option<sync_run::Model>,
    pub counts: CatalogCounts,
    pub history_points: u64,
    pub pending_metrics_jobs: u64,
}

fn fmt_ts(ts: i64) -> String {
    Local
        .timestamp_opt(ts, 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            SyncState::Idle => "空闲",
            SyncState::Running => "同步中",
        };
        writeln!(f, "同步状态: {}", state)?;
        match &self.last_run {
            Some(run) => {
                write!(
                    f,
                    "最近一次同步: #{} {} 开始 {}",
                    run.id,
                    run.status,
                    fmt_ts(run.started_at)
                )?;
                if let Some(done) = run.completed_at {
                    write!(f, " 结束 {}", fmt_ts(done))?;
                }
                writeln!(
                    f,
                    " (共 {}，成功 {}，失败 {})",
                    run.total, run.synced, run.failed
                )?;
                if let Some(note) = &run.note {
                    writeln!(f, "  备注: {}", note)?;
                }
                if let Some(err) = &run.error_message {
                    writeln!(f, "  错误: {}", err)?;
                }
            }
            None => writeln!(f, "最近一次同步: 无")?,
        }
        writeln!(
            f,
            "基金公司 {}，产品 {}，份额 {}，历史净值 {}",
            self.counts.providers, self.counts.schemes, self.counts.plans, self.history_points
        )?;
        write!(f, "待处理指标任务: {}", self.pending_metrics_jobs)
    }
}

pub async fn collect_status(
    db: &Arc<DatabaseConnection>,
    state: SyncState,
) -> Result<StatusReport, DbErr> {
    let conn = db.as_ref();
    Ok(StatusReport {
        state,
        last_run: SyncRunRepository::latest(conn).await?,
        counts: CatalogRepository::counts(conn).await?,
        history_points: PriceRepository::history_count(conn).await?,
        pending_metrics_jobs: MetricsJobRepository::count_pending(conn).await?,
    })
}

pub async fn report_status(
    db: &Arc<DatabaseConnection>,
    state: SyncState,
    tx: &mpsc::UnboundedSender<AppEvent>,
) {
    match collect_status(db, state).await {
        Ok(report) => {
            let _ = tx.send(AppEvent::Status(Box::new(report)));
        }
        Err(e) => {
            let _ = tx.send(AppEvent::Error(format!("读取状态失败: {}", e)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::connection::connect_in_memory;

    #[tokio::test]
    async fn status_of_empty_store() {
        let db = Arc::new(connect_in_memory().await);
        let report = collect_status(&db, SyncState::Idle).await.unwrap();
        assert!(report.last_run.is_none());
        assert_eq!(report.counts.plans, 0);
        assert_eq!(report.history_points, 0);
        let text = report.to_string();
        assert!(text.contains("空闲"));
        assert!(text.contains("最近一次同步: 无"));
    }

    #[tokio::test]
    async fn status_includes_latest_run() {
        let db = Arc::new(connect_in_memory().await);
        let id = SyncRunRepository::start(db.as_ref()).await.unwrap();
        SyncRunRepository::fail(db.as_ref(), id, 10, 2, 0, "feed down")
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        report_status(&db, SyncState::Running, &tx).await;
        match rx.recv().await {
            Some(AppEvent::Status(report)) => {
                assert_eq!(report.state, SyncState::Running);
                let run = report.last_run.as_ref().unwrap();
                assert_eq!(run.status, "FAILED");
                let text = report.to_string();
                assert!(text.contains("feed down"));
                assert!(text.contains("同步中"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
