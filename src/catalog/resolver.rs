use crate::catalog::category::resolve_category;
use crate::catalog::naming::{plan_id, provider_short_name, scheme_id, slugify, split_scheme_name};
use crate::feed::FeedRecord;
use crate::storage::repository::{
    CatalogRepository, HistoryPoint, LastPrice, NewPlan, NewScheme, PriceRepository,
};
use crate::sync::SyncError;
use log::debug;
use sea_orm::{ConnectionTrait, DbErr, SqlErr};
use std::collections::{HashMap, HashSet};

/// 一次同步内复用的目录快照
///
/// 由编排器在运行开始时加载一次，逐条记录解析时原地更新；
/// 只能被顺序访问。
#[derive(Debug, Default, Clone)]
pub struct ResolutionContext {
    /// provider id -> 当前保存的名称
    pub providers: HashMap<String, String>,
    pub scheme_ids: HashSet<String>,
    pub plan_ids: HashSet<String>,
    pub identifiers: HashSet<String>,
    pub last_prices: HashMap<String, LastPrice>,
}

impl ResolutionContext {
    pub async fn preload<C: ConnectionTrait>(db: &C) -> Result<Self, DbErr> {
        let providers = CatalogRepository::provider_names(db).await?;
        let scheme_ids = CatalogRepository::scheme_ids(db).await?;
        let mut plan_ids = HashSet::new();
        let mut identifiers = HashSet::new();
        for (id, isin) in CatalogRepository::plan_identifiers(db).await? {
            plan_ids.insert(id);
            identifiers.insert(isin);
        }
        let last_prices = PriceRepository::last_prices(db).await?;
        Ok(Self {
            providers,
            scheme_ids,
            plan_ids,
            identifiers,
            last_prices,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecord {
    pub plan_id: String,
    pub scheme_id: String,
    pub created_plan: bool,
    pub identifier: Option<String>,
    pub history: HistoryPoint,
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// 首选主字段，其次副字段，都没有时用外部代码合成临时标识
fn base_identifier(record: &FeedRecord) -> String {
    match record.primary_identifier() {
        Some(id) => id.to_string(),
        None => format!("TEMP-{}", record.scheme_code.trim()),
    }
}

async fn insert_plan_with_fallback<C: ConnectionTrait>(
    db: &C,
    ctx: &mut ResolutionContext,
    mut plan: NewPlan,
) -> Result<String, SyncError> {
    let base = plan.isin.clone();
    let first = if ctx.identifiers.contains(&base) {
        format!("{}-{}", base, plan.scheme_code.trim())
    } else {
        base.clone()
    };

    plan.isin = first.clone();
    let chosen = match CatalogRepository::insert_plan(db, plan.clone()).await {
        Ok(()) => first,
        Err(e) if is_unique_violation(&e) => {
            // 复合标识仍然冲突，退到完整 plan id
            let second = format!("{}-{}", base, plan.id);
            debug!("标识冲突: {} -> {}", plan.isin, second);
            plan.isin = second.clone();
            CatalogRepository::insert_plan(db, plan).await?;
            second
        }
        Err(e) => return Err(e.into()),
    };
    ctx.identifiers.insert(chosen.clone());
    Ok(chosen)
}

/// 把一条已过滤的记录写成目录变更，返回待写入的历史净值
pub async fn resolve_record<C: ConnectionTrait>(
    db: &C,
    ctx: &mut ResolutionContext,
    record: &FeedRecord,
) -> Result<ResolvedRecord, SyncError> {
    if !record.price.is_finite() || record.price <= 0.0 {
        return Err(SyncError::MalformedRecord(format!(
            "invalid price {} for {}",
            record.price, record.scheme_name
        )));
    }

    // 1. 基金公司
    let provider_id = slugify(&record.house_name);
    if provider_id.is_empty() {
        return Err(SyncError::MalformedRecord(format!(
            "empty fund house for {}",
            record.scheme_name
        )));
    }
    // 名称变化但 slug 不变时也要更新
    let house_name = record.house_name.trim();
    if ctx.providers.get(&provider_id).map(String::as_str) != Some(house_name) {
        CatalogRepository::upsert_provider(
            db,
            &provider_id,
            house_name,
            &provider_short_name(house_name),
        )
        .await?;
        ctx.providers.insert(provider_id.clone(), house_name.to_string());
    }

    // 2. 类别
    let category = resolve_category(&record.category);
    debug!(
        "类别: {:?} -> {} / {} ({})",
        record.category,
        category.parent.as_str(),
        category.id,
        category.name
    );

    // 3. 基金产品
    let parsed = split_scheme_name(&record.scheme_name);
    let base_name = parsed.base;
    if slugify(&base_name).is_empty() {
        return Err(SyncError::MalformedRecord(format!(
            "cannot derive scheme name from {:?}",
            record.scheme_name
        )));
    }
    let scheme_id = scheme_id(&provider_id, &base_name);
    if !ctx.scheme_ids.contains(&scheme_id) {
        CatalogRepository::upsert_scheme(
            db,
            NewScheme {
                id: scheme_id.clone(),
                provider_id: provider_id.clone(),
                name: base_name.clone(),
                category_id: category.id.to_string(),
                risk_level: category.risk_level.to_string(),
                scheme_code: record.scheme_code.trim().to_string(),
            },
        )
        .await?;
        ctx.scheme_ids.insert(scheme_id.clone());
    }

    // 4. 份额
    let plan_type = parsed.plan_type;
    let option_type = parsed.option_type;
    let plan_id = plan_id(&scheme_id, plan_type, option_type);

    // 5/6. 唯一标识 + 份额写入
    let (created_plan, identifier) = if ctx.plan_ids.contains(&plan_id) {
        CatalogRepository::update_plan_details(
            db,
            &plan_id,
            record.scheme_name.trim(),
            record.scheme_code.trim(),
        )
        .await?;
        (false, None)
    } else {
        let identifier = insert_plan_with_fallback(
            db,
            ctx,
            NewPlan {
                id: plan_id.clone(),
                scheme_id: scheme_id.clone(),
                plan_type: plan_type.to_string(),
                option_type: option_type.to_string(),
                isin: base_identifier(record),
                name: record.scheme_name.trim().to_string(),
                scheme_code: record.scheme_code.trim().to_string(),
            },
        )
        .await?;
        ctx.plan_ids.insert(plan_id.clone());
        (true, Some(identifier))
    };

    // 7. 当前净值：只在日期前进时更新
    let previous = ctx.last_prices.get(&plan_id).copied();
    let advances = previous
        .map(|p| record.price_date > p.price_date)
        .unwrap_or(true);
    if advances {
        let prev_price = previous.map(|p| p.price).unwrap_or(record.price);
        let day_change = record.price - prev_price;
        let day_change_pct = if prev_price > 0.0 {
            day_change / prev_price * 100.0
        } else {
            0.0
        };
        PriceRepository::upsert_current_price(
            db,
            &plan_id,
            record.price,
            record.price_date,
            day_change,
            day_change_pct,
        )
        .await?;
        ctx.last_prices.insert(
            plan_id.clone(),
            LastPrice {
                price: record.price,
                price_date: record.price_date,
            },
        );
    }

    // 8. 历史净值交给编排器批量写入
    Ok(ResolvedRecord {
        history: HistoryPoint {
            plan_id: plan_id.clone(),
            price_date: record.price_date,
            price: record.price,
        },
        plan_id,
        scheme_id,
        created_plan,
        identifier,
    })
}
