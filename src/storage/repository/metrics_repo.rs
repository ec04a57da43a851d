use crate::storage::entity::fund_metrics::{
    self, ActiveModel as FundMetricsActiveModel, Entity as FundMetrics, Model as FundMetricsModel,
};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel, QueryFilter};

const WRITE_CHUNK: usize = 200;

pub struct MetricsRepository;

impl MetricsRepository {
    /// 整行覆盖写入指标（包括把星级清空，等待评级阶段重新赋值）
    pub async fn replace_all<C: ConnectionTrait>(
        db: &C,
        rows: Vec<FundMetricsModel>,
    ) -> Result<u64, DbErr> {
        let mut written = 0u64;
        for chunk in rows.chunks(WRITE_CHUNK) {
            let models: Vec<FundMetricsActiveModel> = chunk
                .iter()
                .cloned()
                .map(|m| m.into_active_model())
                .collect();
            written += FundMetrics::insert_many(models)
                .on_conflict(
                    OnConflict::column(fund_metrics::Column::PlanId)
                        .update_columns([
                            fund_metrics::Column::Return1w,
                            fund_metrics::Column::Return1m,
                            fund_metrics::Column::Return3m,
                            fund_metrics::Column::Return6m,
                            fund_metrics::Column::Return1y,
                            fund_metrics::Column::Return3y,
                            fund_metrics::Column::Return5y,
                            fund_metrics::Column::ReturnSinceInception,
                            fund_metrics::Column::Volatility,
                            fund_metrics::Column::SharpeRatio,
                            fund_metrics::Column::SortinoRatio,
                            fund_metrics::Column::Alpha,
                            fund_metrics::Column::Beta,
                            fund_metrics::Column::MaxDrawdown,
                            fund_metrics::Column::RiskRating,
                            fund_metrics::Column::StarRating,
                            fund_metrics::Column::HistoryPoints,
                            fund_metrics::Column::FirstDate,
                            fund_metrics::Column::LastDate,
                            fund_metrics::Column::CalculatedAt,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(db)
                .await?;
        }
        Ok(written)
    }

    pub async fn find<C: ConnectionTrait>(
        db: &C,
        plan_id: &str,
    ) -> Result<Option<FundMetricsModel>, DbErr> {
        FundMetrics::find_by_id(plan_id.to_string()).one(db).await
    }

    pub async fn clear_star_ratings<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
        let res = FundMetrics::update_many()
            .col_expr(fund_metrics::Column::StarRating, Expr::value(Option::<i32>::None))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    /// 同一星级的份额一次性批量更新
    pub async fn set_star_rating<C: ConnectionTrait>(
        db: &C,
        stars: i32,
        plan_ids: &[String],
    ) -> Result<u64, DbErr> {
        let mut affected = 0u64;
        for chunk in plan_ids.chunks(WRITE_CHUNK * 2) {
            let res = FundMetrics::update_many()
                .col_expr(fund_metrics::Column::StarRating, Expr::value(stars))
                .filter(fund_metrics::Column::PlanId.is_in(chunk.iter().cloned()))
                .exec(db)
                .await?;
            affected += res.rows_affected;
        }
        Ok(affected)
    }
}
