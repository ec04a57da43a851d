use crate::storage::entity::{
    CurrentPrice, FundMetrics, MetricsJob, PriceHistory, Provider, Scheme, SchemePlan, SyncRun,
};
use log::info;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
    Statement,
};
use std::time::Duration;

pub async fn establish_connection(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());
    opt.max_connections(10)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Info);

    let db = Database::connect(opt).await?;

    // 启用 WAL 模式
    if db.get_database_backend() == sea_orm::DatabaseBackend::Sqlite {
        db.execute(Statement::from_string(
            sea_orm::DatabaseBackend::Sqlite,
            "PRAGMA journal_mode=WAL;".to_string(),
        ))
        .await?;
    }

    init_schema(&db).await?;

    info!("Database connection established with WAL mode and tables initialized.");

    Ok(db)
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let stmt = builder.build(schema.create_table_from_entity(entity).if_not_exists());
    db.execute(stmt).await?;
    Ok(())
}

/// 创建表与索引（如果不存在）
pub async fn init_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, Provider).await?;
    create_table(db, Scheme).await?;
    create_table(db, SchemePlan).await?;
    create_table(db, CurrentPrice).await?;
    create_table(db, PriceHistory).await?;
    create_table(db, FundMetrics).await?;
    create_table(db, SyncRun).await?;
    create_table(db, MetricsJob).await?;

    let backend = db.get_database_backend();
    // 唯一索引：同一份额同一日期只保留一条净值
    db.execute(Statement::from_string(
        backend,
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_price_history_plan_date ON price_history(plan_id, price_date);".to_string(),
    ))
    .await?;
    db.execute(Statement::from_string(
        backend,
        "CREATE INDEX IF NOT EXISTS idx_scheme_plans_scheme ON scheme_plans(scheme_id);"
            .to_string(),
    ))
    .await?;

    Ok(())
}

#[cfg(test)]
pub async fn connect_in_memory() -> DatabaseConnection {
    // 内存库每个连接独立，测试只用单连接
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("open in-memory sqlite");
    init_schema(&db).await.expect("init schema");
    db
}
