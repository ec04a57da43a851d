use crate::storage::entity::provider::{self, ActiveModel as ProviderActiveModel, Entity as Provider};
use crate::storage::entity::scheme::{self, ActiveModel as SchemeActiveModel, Entity as Scheme};
use crate::storage::entity::scheme_plan::{
    self, ActiveModel as SchemePlanActiveModel, Entity as SchemePlan,
};
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
    Set,
};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct NewScheme {
    pub id: String,
    pub provider_id: String,
    pub name: String,
    pub category_id: String,
    pub risk_level: String,
    pub scheme_code: String,
}

#[derive(Debug, Clone)]
pub struct NewPlan {
    pub id: String,
    pub scheme_id: String,
    pub plan_type: String,
    pub option_type: String,
    pub isin: String,
    pub name: String,
    pub scheme_code: String,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogCounts {
    pub providers: u64,
    pub schemes: u64,
    pub plans: u64,
}

pub struct CatalogRepository;

impl CatalogRepository {
    /// provider id -> name
    pub async fn provider_names<C: ConnectionTrait>(
        db: &C,
    ) -> Result<HashMap<String, String>, DbErr> {
        let rows: Vec<(String, String)> = Provider::find()
            .select_only()
            .column(provider::Column::Id)
            .column(provider::Column::Name)
            .into_tuple()
            .all(db)
            .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn scheme_ids<C: ConnectionTrait>(db: &C) -> Result<HashSet<String>, DbErr> {
        let ids: Vec<String> = Scheme::find()
            .select_only()
            .column(scheme::Column::Id)
            .into_tuple()
            .all(db)
            .await?;
        Ok(ids.into_iter().collect())
    }

    /// (plan_id, isin)
    pub async fn plan_identifiers<C: ConnectionTrait>(
        db: &C,
    ) -> Result<Vec<(String, String)>, DbErr> {
        SchemePlan::find()
            .select_only()
            .column(scheme_plan::Column::Id)
            .column(scheme_plan::Column::Isin)
            .into_tuple()
            .all(db)
            .await
    }

    pub async fn upsert_provider<C: ConnectionTrait>(
        db: &C,
        id: &str,
        name: &str,
        short_name: &str,
    ) -> Result<(), DbErr> {
        let now = Utc::now().timestamp();
        let am = ProviderActiveModel {
            id: Set(id.to_string()),
            name: Set(name.to_string()),
            short_name: Set(short_name.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Provider::insert(am)
            .on_conflict(
                OnConflict::column(provider::Column::Id)
                    .update_columns([
                        provider::Column::Name,
                        provider::Column::ShortName,
                        provider::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
        Ok(())
    }

    pub async fn upsert_scheme<C: ConnectionTrait>(db: &C, s: NewScheme) -> Result<(), DbErr> {
        let now = Utc::now().timestamp();
        let am = SchemeActiveModel {
            id: Set(s.id),
            provider_id: Set(s.provider_id),
            name: Set(s.name),
            category_id: Set(s.category_id),
            risk_level: Set(s.risk_level),
            scheme_code: Set(s.scheme_code),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Scheme::insert(am)
            .on_conflict(
                OnConflict::column(scheme::Column::Id)
                    .update_columns([
                        scheme::Column::Name,
                        scheme::Column::CategoryId,
                        scheme::Column::RiskLevel,
                        scheme::Column::SchemeCode,
                        scheme::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
        Ok(())
    }

    /// 插入新份额；isin 冲突时由调用方捕获唯一约束错误
    pub async fn insert_plan<C: ConnectionTrait>(db: &C, p: NewPlan) -> Result<(), DbErr> {
        let now = Utc::now().timestamp();
        let am = SchemePlanActiveModel {
            id: Set(p.id),
            scheme_id: Set(p.scheme_id),
            plan_type: Set(p.plan_type),
            option_type: Set(p.option_type),
            isin: Set(p.isin),
            name: Set(p.name),
            scheme_code: Set(p.scheme_code),
            created_at: Set(now),
            updated_at: Set(now),
        };
        SchemePlan::insert(am).exec_without_returning(db).await?;
        Ok(())
    }

    pub async fn update_plan_details<C: ConnectionTrait>(
        db: &C,
        id: &str,
        name: &str,
        scheme_code: &str,
    ) -> Result<(), DbErr> {
        let now = Utc::now().timestamp();
        SchemePlan::update_many()
            .col_expr(scheme_plan::Column::Name, Expr::value(name.to_string()))
            .col_expr(
                scheme_plan::Column::SchemeCode,
                Expr::value(scheme_code.to_string()),
            )
            .col_expr(scheme_plan::Column::UpdatedAt, Expr::value(now))
            .filter(scheme_plan::Column::Id.eq(id.to_string()))
            .exec(db)
            .await?;
        Ok(())
    }

    pub async fn find_plan<C: ConnectionTrait>(
        db: &C,
        id: &str,
    ) -> Result<Option<scheme_plan::Model>, DbErr> {
        SchemePlan::find_by_id(id.to_string()).one(db).await
    }

    #[cfg(test)]
    pub async fn find_scheme<C: ConnectionTrait>(
        db: &C,
        id: &str,
    ) -> Result<Option<scheme::Model>, DbErr> {
        Scheme::find_by_id(id.to_string()).one(db).await
    }

    #[cfg(test)]
    pub async fn find_provider<C: ConnectionTrait>(
        db: &C,
        id: &str,
    ) -> Result<Option<provider::Model>, DbErr> {
        Provider::find_by_id(id.to_string()).one(db).await
    }

    /// plan_id -> category_id
    pub async fn plan_categories<C: ConnectionTrait>(
        db: &C,
    ) -> Result<HashMap<String, String>, DbErr> {
        let schemes: Vec<(String, String)> = Scheme::find()
            .select_only()
            .column(scheme::Column::Id)
            .column(scheme::Column::CategoryId)
            .into_tuple()
            .all(db)
            .await?;
        let scheme_category: HashMap<String, String> = schemes.into_iter().collect();

        let plans: Vec<(String, String)> = SchemePlan::find()
            .select_only()
            .column(scheme_plan::Column::Id)
            .column(scheme_plan::Column::SchemeId)
            .into_tuple()
            .all(db)
            .await?;

        Ok(plans
            .into_iter()
            .filter_map(|(plan_id, scheme_id)| {
                scheme_category
                    .get(&scheme_id)
                    .map(|category| (plan_id, category.clone()))
            })
            .collect())
    }

    pub async fn counts<C: ConnectionTrait>(db: &C) -> Result<CatalogCounts, DbErr> {
        Ok(CatalogCounts {
            providers: Provider::find().count(db).await?,
            schemes: Scheme::find().count(db).await?,
            plans: SchemePlan::find().count(db).await?,
        })
    }
}
