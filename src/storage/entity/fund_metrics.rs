use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fund_metrics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub plan_id: String,

    // 区间收益（%）
    #[sea_orm(nullable)]
    pub return_1w: Option<f64>,
    #[sea_orm(nullable)]
    pub return_1m: Option<f64>,
    #[sea_orm(nullable)]
    pub return_3m: Option<f64>,
    #[sea_orm(nullable)]
    pub return_6m: Option<f64>,
    #[sea_orm(nullable)]
    pub return_1y: Option<f64>,
    #[sea_orm(nullable)]
    pub return_3y: Option<f64>,
    #[sea_orm(nullable)]
    pub return_5y: Option<f64>,
    #[sea_orm(nullable)]
    pub return_since_inception: Option<f64>,

    // 风险指标
    #[sea_orm(nullable)]
    pub volatility: Option<f64>,
    #[sea_orm(nullable)]
    pub sharpe_ratio: Option<f64>,
    #[sea_orm(nullable)]
    pub sortino_ratio: Option<f64>,
    #[sea_orm(nullable)]
    pub alpha: Option<f64>,
    #[sea_orm(nullable)]
    pub beta: Option<f64>,
    #[sea_orm(nullable)]
    pub max_drawdown: Option<f64>,
    #[sea_orm(nullable)]
    pub risk_rating: Option<i32>,
    #[sea_orm(nullable)]
    pub star_rating: Option<i32>,

    pub history_points: i32,
    pub first_date: Date,
    pub last_date: Date,
    pub calculated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
