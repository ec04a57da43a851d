mod app_service;
mod app_state;
mod catalog;
mod commands;
mod config;
mod feed;
mod metrics;
mod storage;
mod sync;

use anyhow::Context;
use chrono::Local;
use log::{error, info};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Notify};

use crate::app_service::report_status;
use crate::app_state::AppEvent;
use crate::commands::{AppCommand, HELP_TEXT};
use crate::config::AppConfig;
use crate::feed::{AmfiFeedSource, FeedSource};
use crate::metrics::{MetricsService, MetricsTrigger, MetricsWorker};
use crate::sync::{spawn_daily, SyncService, SyncStatus};

fn init_logging() -> anyhow::Result<()> {
    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let log_dir = std::path::PathBuf::from("logs");
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join(format!("app-{}.log", ts));
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("无法创建日志文件 {}", log_path.display()))?;
    env_logger::Builder::new()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Warn)
        .filter_module("fundsync", log::LevelFilter::Info)
        .filter_module("sqlx", log::LevelFilter::Error)
        .filter_module("sea_orm", log::LevelFilter::Error)
        .parse_default_env()
        .init();
    Ok(())
}

fn print_event(evt: AppEvent) {
    match evt {
        AppEvent::Log(s) | AppEvent::Message(s) => println!("{}", s),
        AppEvent::Error(s) => eprintln!("{}", s),
        AppEvent::Status(report) => println!("{}", report),
    }
}

/// 各命令共用的服务句柄
struct Services {
    db: Arc<DatabaseConnection>,
    sync: Arc<SyncService>,
    trigger: MetricsTrigger,
    worker: Arc<MetricsWorker>,
    evt_tx: mpsc::UnboundedSender<AppEvent>,
}

impl Services {
    async fn enqueue_metrics(&self) {
        match self.trigger.fire().await {
            Ok(key) => {
                let _ = self
                    .evt_tx
                    .send(AppEvent::Message(format!("指标重算任务已入队: {}", key)));
            }
            Err(e) => {
                let _ = self
                    .evt_tx
                    .send(AppEvent::Error(format!("指标任务入队失败: {}", e)));
            }
        }
    }

    /// 单次模式下同步执行队列中的全部指标任务
    async fn drain_metrics(&self) {
        loop {
            match self.worker.process_next().await {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(e) => {
                    error!("指标任务执行失败: {}", e);
                    break;
                }
            }
        }
    }
}

/// 命令行参数模式：执行一条命令后退出
async fn run_once(
    line: &str,
    services: &Services,
    evt_rx: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> anyhow::Result<()> {
    let cmd: AppCommand = line.parse().unwrap_or(AppCommand::Unknown(line.to_string()));
    info!("单次执行命令: {:?}", cmd);
    let result = match cmd {
        AppCommand::Sync => match services.sync.run_once().await {
            Ok(outcome) => {
                if outcome.status == SyncStatus::Completed && outcome.synced > 0 {
                    services.drain_metrics().await;
                }
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("净值同步失败")),
        },
        AppCommand::Metrics => {
            services.enqueue_metrics().await;
            services.drain_metrics().await;
            Ok(())
        }
        AppCommand::Status => {
            report_status(&services.db, services.sync.state(), &services.evt_tx).await;
            Ok(())
        }
        AppCommand::Help | AppCommand::Quit => {
            println!("{}", HELP_TEXT);
            Ok(())
        }
        AppCommand::Unknown(msg) => {
            eprintln!("{}\n{}", msg, HELP_TEXT);
            Ok(())
        }
    };

    while let Ok(evt) = evt_rx.try_recv() {
        print_event(evt);
    }
    result
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    match dotenv::dotenv() {
        Ok(path) => info!("✓ 已加载 .env 文件: {}", path.display()),
        Err(_) => info!("未找到 .env 文件，从系统环境变量读取配置"),
    }
    let config = AppConfig::from_env();
    info!("配置: {:?}", config);

    let db = Arc::new(
        storage::establish_connection(&config.database_url)
            .await
            .with_context(|| format!("数据库连接失败: {}", config.database_url))?,
    );
    info!("✓ 数据库连接成功");

    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<AppEvent>();
    let notify = Arc::new(Notify::new());
    let trigger = MetricsTrigger::new(db.clone(), notify.clone());

    let feed: Arc<dyn FeedSource> = Arc::new(
        AmfiFeedSource::new(
            config.feed_url.clone(),
            config.feed_timeout,
            config.feed_proxy.as_deref(),
        )
        .context("无法创建净值源 HTTP 客户端")?,
    );
    let sync_service = Arc::new(SyncService::new(
        db.clone(),
        feed,
        Some(trigger.clone()),
        evt_tx.clone(),
        &config,
    ));
    let metrics_service = Arc::new(MetricsService::new(db.clone(), &config));
    let worker = Arc::new(MetricsWorker::new(
        db.clone(),
        metrics_service,
        notify,
        evt_tx.clone(),
    ));
    worker.recover().await;

    let services = Services {
        db: db.clone(),
        sync: sync_service.clone(),
        trigger,
        worker: worker.clone(),
        evt_tx: evt_tx.clone(),
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        return run_once(&args.join(" "), &services, &mut evt_rx).await;
    }

    // 常驻模式
    tokio::spawn(async move {
        while let Some(evt) = evt_rx.recv().await {
            print_event(evt);
        }
    });
    let _worker_handle = worker.start();
    let _daily_handle = spawn_daily(sync_service.clone(), &config);

    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<AppCommand>();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            let cmd = line.parse().unwrap_or(AppCommand::Unknown(line.clone()));
            if cmd_tx.send(cmd).is_err() {
                break;
            }
        }
    });

    let _ = evt_tx.send(AppEvent::Message(format!(
        "fundsync 已启动，每日 {} 自动同步。输入 help 查看命令",
        config.sync_daily_at.format("%H:%M")
    )));

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            AppCommand::Sync => {
                // 同步在后台执行，命令循环不阻塞
                let svc = sync_service.clone();
                tokio::spawn(async move {
                    if let Err(e) = svc.run_once().await {
                        error!("手动同步失败: {}", e);
                    }
                });
            }
            AppCommand::Metrics => services.enqueue_metrics().await,
            AppCommand::Status => {
                report_status(&db, sync_service.state(), &evt_tx).await;
            }
            AppCommand::Help => {
                let _ = evt_tx.send(AppEvent::Message(HELP_TEXT.to_string()));
            }
            AppCommand::Quit => {
                info!("收到退出命令");
                break;
            }
            AppCommand::Unknown(msg) => {
                let _ = evt_tx.send(AppEvent::Error(format!("{}\n{}", msg, HELP_TEXT)));
            }
        }
    }

    info!("fundsync 退出");
    Ok(())
}
