use crate::storage::entity::sync_run::{
    self, ActiveModel as SyncRunActiveModel, Entity as SyncRun, Model as SyncRunModel,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, QueryOrder, Set};

pub const STATUS_RUNNING: &str = "RUNNING";
pub const STATUS_COMPLETED: &str = "COMPLETED";
pub const STATUS_FAILED: &str = "FAILED";

pub struct SyncRunRepository;

impl SyncRunRepository {
    pub async fn start<C: ConnectionTrait>(db: &C) -> Result<i32, DbErr> {
        let am = SyncRunActiveModel {
            status: Set(STATUS_RUNNING.to_string()),
            started_at: Set(Utc::now().timestamp()),
            completed_at: Set(None),
            total: Set(0),
            synced: Set(0),
            failed: Set(0),
            note: Set(None),
            error_message: Set(None),
            ..Default::default()
        };
        let model = am.insert(db).await?;
        Ok(model.id)
    }

    pub async fn complete<C: ConnectionTrait>(
        db: &C,
        id: i32,
        total: usize,
        synced: usize,
        failed: usize,
        note: Option<String>,
    ) -> Result<(), DbErr> {
        let am = SyncRunActiveModel {
            id: Set(id),
            status: Set(STATUS_COMPLETED.to_string()),
            completed_at: Set(Some(Utc::now().timestamp())),
            total: Set(total as i32),
            synced: Set(synced as i32),
            failed: Set(failed as i32),
            note: Set(note),
            ..Default::default()
        };
        am.update(db).await?;
        Ok(())
    }

    pub async fn fail<C: ConnectionTrait>(
        db: &C,
        id: i32,
        total: usize,
        synced: usize,
        failed: usize,
        message: &str,
    ) -> Result<(), DbErr> {
        let am = SyncRunActiveModel {
            id: Set(id),
            status: Set(STATUS_FAILED.to_string()),
            completed_at: Set(Some(Utc::now().timestamp())),
            total: Set(total as i32),
            synced: Set(synced as i32),
            failed: Set(failed as i32),
            error_message: Set(Some(message.to_string())),
            ..Default::default()
        };
        am.update(db).await?;
        Ok(())
    }

    pub async fn latest<C: ConnectionTrait>(db: &C) -> Result<Option<SyncRunModel>, DbErr> {
        SyncRun::find()
            .order_by_desc(sync_run::Column::Id)
            .one(db)
            .await
    }
}
