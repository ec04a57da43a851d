use crate::feed::FeedError;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SyncState {
    Idle = 0,
    Running = 1,
}

impl SyncState {
    pub fn from_u8(v: u8) -> Self {
        if v == SyncState::Running as u8 {
            SyncState::Running
        } else {
            SyncState::Idle
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    Completed,
    /// 净值源日期与库中最新日期相同（周末/假日）
    NoNewData,
    /// 已有同步在运行，本次请求被拒绝
    AlreadyRunning,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub run_id: Option<i32>,
    pub status: SyncStatus,
    pub total: usize,
    pub synced: usize,
    pub failed: usize,
    pub history_inserted: u64,
}

impl SyncOutcome {
    pub fn already_running() -> Self {
        Self {
            run_id: None,
            status: SyncStatus::AlreadyRunning,
            total: 0,
            synced: 0,
            failed: 0,
            history_inserted: 0,
        }
    }
}

/// 运行中的计数
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncProgress {
    pub total: usize,
    pub synced: usize,
    pub failed: usize,
}
