use crate::config::AppConfig;
use crate::metrics::rating::{assign_ratings, RatingInput};
use crate::metrics::stats::{self, ComputedMetrics, PricePoint};
use crate::storage::entity::fund_metrics;
use crate::storage::repository::{CatalogRepository, MetricsRepository, PriceRepository};
use chrono::{NaiveDate, Utc};
use log::{info, warn};
use sea_orm::{DatabaseConnection, DbErr};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

#[derive(thiserror::Error, Debug)]
pub enum MetricsError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    #[error("job error: {0}")]
    Job(String),
}

/// 一次重算的结果摘要，序列化后存入任务行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub as_of: Option<NaiveDate>,
    pub eligible: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub rated: usize,
    pub benchmark_found: bool,
    pub elapsed_ms: u128,
}

pub struct MetricsService {
    db: Arc<DatabaseConnection>,
    benchmark_plan_id: String,
    risk_free_rate: f64,
    chunk_size: usize,
}

impl MetricsService {
    pub fn new(db: Arc<DatabaseConnection>, config: &AppConfig) -> Self {
        Self {
            db,
            benchmark_plan_id: config.benchmark_plan_id.clone(),
            risk_free_rate: config.risk_free_rate,
            chunk_size: config.metrics_chunk_size.max(1),
        }
    }

    async fn load_benchmark(&self) -> Result<Option<Vec<PricePoint>>, DbErr> {
        let db = self.db.as_ref();
        if CatalogRepository::find_plan(db, &self.benchmark_plan_id)
            .await?
            .is_none()
        {
            warn!(
                "基准份额 {} 不存在，本轮不计算 alpha/beta",
                self.benchmark_plan_id
            );
            return Ok(None);
        }
        let rows = PriceRepository::history_for_plan(db, &self.benchmark_plan_id).await?;
        Ok(Some(
            rows.into_iter()
                .map(|r| PricePoint::new(r.price_date, r.price))
                .collect(),
        ))
    }

    /// 重算全部份额的指标，再做类内星级评定
    pub async fn recalculate_all(&self, as_of: NaiveDate) -> Result<MetricsSummary, MetricsError> {
        let started = Instant::now();
        let db = self.db.as_ref();
        let mut summary = MetricsSummary {
            as_of: Some(as_of),
            ..Default::default()
        };

        let categories = CatalogRepository::plan_categories(db).await?;
        let mut eligible: Vec<String> = PriceRepository::history_counts(db)
            .await?
            .into_iter()
            .filter(|c| c.points >= stats::MIN_HISTORY_POINTS as i64)
            .map(|c| c.plan_id)
            .filter(|id| categories.contains_key(id))
            .collect();
        eligible.sort();
        summary.eligible = eligible.len();
        summary.skipped = categories.len().saturating_sub(eligible.len());
        info!(
            "指标重算开始: 份额 {}，历史足够 {}，基准日 {}",
            categories.len(),
            eligible.len(),
            as_of
        );

        let benchmark = self.load_benchmark().await?;
        summary.benchmark_found = benchmark.is_some();

        let calculated_at = Utc::now().timestamp();
        let mut rating_inputs: Vec<RatingInput> = Vec::with_capacity(eligible.len());

        for (chunk_idx, ids) in eligible.chunks(self.chunk_size).enumerate() {
            let rows = PriceRepository::history_for_plans(db, ids).await?;
            let mut grouped: HashMap<String, Vec<PricePoint>> = HashMap::with_capacity(ids.len());
            for r in rows {
                grouped
                    .entry(r.plan_id)
                    .or_default()
                    .push(PricePoint::new(r.price_date, r.price));
            }

            let mut models = Vec::with_capacity(ids.len());
            for id in ids {
                let history = grouped.get(id).map(Vec::as_slice).unwrap_or(&[]);
                let Some(m) =
                    stats::compute(history, benchmark.as_deref(), as_of, self.risk_free_rate)
                else {
                    summary.skipped += 1;
                    continue;
                };
                let model = to_model(id, &m, calculated_at);
                if let Some(category) = categories.get(id) {
                    rating_inputs.push(RatingInput {
                        plan_id: id.clone(),
                        category_id: category.clone(),
                        first_date: m.first_date,
                        return_3y: m.return_3y,
                        return_5y: m.return_5y,
                        volatility: m.volatility,
                        sharpe_ratio: m.sharpe_ratio,
                        sortino_ratio: m.sortino_ratio,
                    });
                }
                models.push(model);
            }

            let n = models.len();
            match MetricsRepository::replace_all(db, models).await {
                Ok(_) => summary.processed += n,
                Err(e) => {
                    warn!("指标写入失败 [chunk {}]: {}", chunk_idx + 1, e);
                    summary.failed += n;
                    rating_inputs.retain(|r| !ids.contains(&r.plan_id));
                }
            }
        }

        summary.rated = self.apply_ratings(&rating_inputs, as_of).await?;
        summary.elapsed_ms = started.elapsed().as_millis();
        info!(
            "指标重算完成: 处理 {}，跳过 {}，失败 {}，评级 {}，耗时 {}ms",
            summary.processed, summary.skipped, summary.failed, summary.rated, summary.elapsed_ms
        );
        Ok(summary)
    }

    /// 先清空旧星级，再按星级分组批量写入
    async fn apply_ratings(&self, inputs: &[RatingInput], as_of: NaiveDate) -> Result<usize, DbErr> {
        let db = self.db.as_ref();
        let ratings: BTreeMap<i32, Vec<String>> =
            assign_ratings(inputs, as_of, self.risk_free_rate);
        MetricsRepository::clear_star_ratings(db).await?;
        let mut rated = 0usize;
        for (stars, ids) in &ratings {
            MetricsRepository::set_star_rating(db, *stars, ids).await?;
            rated += ids.len();
        }
        Ok(rated)
    }
}

fn to_model(plan_id: &str, m: &ComputedMetrics, calculated_at: i64) -> fund_metrics::Model {
    fund_metrics::Model {
        plan_id: plan_id.to_string(),
        return_1w: m.return_1w,
        return_1m: m.return_1m,
        return_3m: m.return_3m,
        return_6m: m.return_6m,
        return_1y: m.return_1y,
        return_3y: m.return_3y,
        return_5y: m.return_5y,
        return_since_inception: m.return_since_inception,
        volatility: m.volatility,
        sharpe_ratio: m.sharpe_ratio,
        sortino_ratio: m.sortino_ratio,
        alpha: m.alpha,
        beta: m.beta,
        max_drawdown: m.max_drawdown,
        risk_rating: m.risk_rating,
        star_rating: None,
        history_points: i32::try_from(m.history_points).unwrap_or(i32::MAX),
        first_date: m.first_date,
        last_date: m.last_date,
        calculated_at,
    }
}
