use crate::storage::entity::metrics_job::{
    self, ActiveModel as MetricsJobActiveModel, Entity as MetricsJob, Model as MetricsJobModel,
};
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};

pub const JOB_QUEUED: &str = "QUEUED";
pub const JOB_RUNNING: &str = "RUNNING";
pub const JOB_DONE: &str = "DONE";
pub const JOB_FAILED: &str = "FAILED";

pub struct MetricsJobRepository;

impl MetricsJobRepository {
    /// 入队；job_key 已存在时不重复入队，返回 false
    pub async fn enqueue(db: &DatabaseConnection, job_key: &str) -> Result<bool, DbErr> {
        let now = Utc::now().timestamp();
        let am = MetricsJobActiveModel {
            job_key: Set(job_key.to_string()),
            status: Set(JOB_QUEUED.to_string()),
            summary_json: Set(None),
            last_error_message: Set(None),
            created_at: Set(now),
            started_at: Set(None),
            finished_at: Set(None),
            updated_at: Set(now),
            ..Default::default()
        };
        let inserted = MetricsJob::insert(am)
            .on_conflict(
                OnConflict::column(metrics_job::Column::JobKey)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
        Ok(inserted > 0)
    }

    /// 原子 claim 最早入队的任务
    pub async fn claim_next(db: &DatabaseConnection) -> Result<Option<MetricsJobModel>, DbErr> {
        let txn = db.begin().await?;

        let picked = MetricsJob::find()
            .filter(metrics_job::Column::Status.eq(JOB_QUEUED))
            .order_by_asc(metrics_job::Column::CreatedAt)
            .order_by_asc(metrics_job::Column::Id)
            .one(&txn)
            .await?;

        if let Some(job) = picked {
            let job_id = job.id;
            let now = Utc::now().timestamp();
            MetricsJob::update_many()
                .col_expr(metrics_job::Column::Status, Expr::value(JOB_RUNNING))
                .col_expr(metrics_job::Column::StartedAt, Expr::value(now))
                .col_expr(metrics_job::Column::UpdatedAt, Expr::value(now))
                .filter(metrics_job::Column::Id.eq(job_id))
                .exec(&txn)
                .await?;

            txn.commit().await?;
            return MetricsJob::find_by_id(job_id).one(db).await;
        }

        txn.commit().await?;
        Ok(None)
    }

    pub async fn mark_done(
        db: &DatabaseConnection,
        id: i32,
        summary_json: String,
    ) -> Result<(), DbErr> {
        let now = Utc::now().timestamp();
        MetricsJob::update_many()
            .col_expr(metrics_job::Column::Status, Expr::value(JOB_DONE))
            .col_expr(metrics_job::Column::SummaryJson, Expr::value(summary_json))
            .col_expr(metrics_job::Column::FinishedAt, Expr::value(now))
            .col_expr(metrics_job::Column::UpdatedAt, Expr::value(now))
            .filter(metrics_job::Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(())
    }

    pub async fn mark_failed(db: &DatabaseConnection, id: i32, message: &str) -> Result<(), DbErr> {
        let now = Utc::now().timestamp();
        MetricsJob::update_many()
            .col_expr(metrics_job::Column::Status, Expr::value(JOB_FAILED))
            .col_expr(
                metrics_job::Column::LastErrorMessage,
                Expr::value(message.to_string()),
            )
            .col_expr(metrics_job::Column::FinishedAt, Expr::value(now))
            .col_expr(metrics_job::Column::UpdatedAt, Expr::value(now))
            .filter(metrics_job::Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(())
    }

    /// 进程重启后，把中断的 RUNNING 任务放回队列
    pub async fn reset_stale_jobs(db: &DatabaseConnection) -> Result<u64, DbErr> {
        let now = Utc::now().timestamp();
        let res = MetricsJob::update_many()
            .col_expr(metrics_job::Column::Status, Expr::value(JOB_QUEUED))
            .col_expr(metrics_job::Column::UpdatedAt, Expr::value(now))
            .filter(metrics_job::Column::Status.eq(JOB_RUNNING))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    pub async fn count_pending(db: &DatabaseConnection) -> Result<u64, DbErr> {
        MetricsJob::find()
            .filter(
                metrics_job::Column::Status
                    .eq(JOB_QUEUED)
                    .or(metrics_job::Column::Status.eq(JOB_RUNNING)),
            )
            .count(db)
            .await
    }

    #[cfg(test)]
    pub async fn find(db: &DatabaseConnection, id: i32) -> Result<Option<MetricsJobModel>, DbErr> {
        MetricsJob::find_by_id(id).one(db).await
    }
}
