use crate::storage::entity::current_price::{
    self, ActiveModel as CurrentPriceActiveModel, Entity as CurrentPrice,
};
use crate::storage::entity::price_history::{
    self, ActiveModel as PriceHistoryActiveModel, Entity as PriceHistory,
};
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, FromQueryResult, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::collections::HashMap;

/// 一条待写入的历史净值
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPoint {
    pub plan_id: String,
    pub price_date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastPrice {
    pub price: f64,
    pub price_date: NaiveDate,
}

#[derive(Debug, Clone, FromQueryResult)]
pub struct PlanHistoryCount {
    pub plan_id: String,
    pub points: i64,
}

pub struct PriceRepository;

impl PriceRepository {
    /// 当前价格表中最新的净值日期
    pub async fn latest_price_date<C: ConnectionTrait>(db: &C) -> Result<Option<NaiveDate>, DbErr> {
        let latest = CurrentPrice::find()
            .order_by_desc(current_price::Column::PriceDate)
            .one(db)
            .await?;
        Ok(latest.map(|m| m.price_date))
    }

    pub async fn last_prices<C: ConnectionTrait>(
        db: &C,
    ) -> Result<HashMap<String, LastPrice>, DbErr> {
        let rows = CurrentPrice::find().all(db).await?;
        Ok(rows
            .into_iter()
            .map(|m| {
                (
                    m.plan_id,
                    LastPrice {
                        price: m.price,
                        price_date: m.price_date,
                    },
                )
            })
            .collect())
    }

    pub async fn upsert_current_price<C: ConnectionTrait>(
        db: &C,
        plan_id: &str,
        price: f64,
        price_date: NaiveDate,
        day_change: f64,
        day_change_pct: f64,
    ) -> Result<(), DbErr> {
        let am = CurrentPriceActiveModel {
            plan_id: Set(plan_id.to_string()),
            price: Set(price),
            price_date: Set(price_date),
            day_change: Set(day_change),
            day_change_pct: Set(day_change_pct),
            updated_at: Set(Utc::now().timestamp()),
        };
        CurrentPrice::insert(am)
            .on_conflict(
                OnConflict::column(current_price::Column::PlanId)
                    .update_columns([
                        current_price::Column::Price,
                        current_price::Column::PriceDate,
                        current_price::Column::DayChange,
                        current_price::Column::DayChangePct,
                        current_price::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
        Ok(())
    }

    pub async fn find_current_price<C: ConnectionTrait>(
        db: &C,
        plan_id: &str,
    ) -> Result<Option<current_price::Model>, DbErr> {
        CurrentPrice::find_by_id(plan_id.to_string()).one(db).await
    }

    /// 批量插入历史净值；(plan_id, price_date) 已存在的行直接跳过
    ///
    /// 返回实际插入的行数。
    pub async fn insert_history_ignoring_duplicates<C: ConnectionTrait>(
        db: &C,
        points: &[HistoryPoint],
    ) -> Result<u64, DbErr> {
        if points.is_empty() {
            return Ok(0);
        }
        let models = points.iter().map(|p| PriceHistoryActiveModel {
            id: NotSet,
            plan_id: Set(p.plan_id.clone()),
            price_date: Set(p.price_date),
            price: Set(p.price),
        });
        PriceHistory::insert_many(models)
            .on_conflict(
                OnConflict::columns([
                    price_history::Column::PlanId,
                    price_history::Column::PriceDate,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await
    }

    pub async fn history_counts<C: ConnectionTrait>(
        db: &C,
    ) -> Result<Vec<PlanHistoryCount>, DbErr> {
        PriceHistory::find()
            .select_only()
            .column(price_history::Column::PlanId)
            .column_as(Expr::cust("COUNT(*)"), "points")
            .group_by(price_history::Column::PlanId)
            .into_model::<PlanHistoryCount>()
            .all(db)
            .await
    }

    /// 按 plan_id 批量读取历史，按 (plan_id, price_date) 升序
    pub async fn history_for_plans<C: ConnectionTrait>(
        db: &C,
        plan_ids: &[String],
    ) -> Result<Vec<price_history::Model>, DbErr> {
        if plan_ids.is_empty() {
            return Ok(Vec::new());
        }
        PriceHistory::find()
            .filter(price_history::Column::PlanId.is_in(plan_ids.iter().cloned()))
            .order_by_asc(price_history::Column::PlanId)
            .order_by_asc(price_history::Column::PriceDate)
            .all(db)
            .await
    }

    pub async fn history_for_plan<C: ConnectionTrait>(
        db: &C,
        plan_id: &str,
    ) -> Result<Vec<price_history::Model>, DbErr> {
        PriceHistory::find()
            .filter(price_history::Column::PlanId.eq(plan_id.to_string()))
            .order_by_asc(price_history::Column::PriceDate)
            .all(db)
            .await
    }

    pub async fn history_count<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
        PriceHistory::find().count(db).await
    }
}
