//! 通知调度服务入口
//!
//! 装配存储、渠道、调度器与轮询器，启动后台轮询任务，
//! 监听 Ctrl+C / SIGTERM 优雅关闭。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;

use notify_shared::{config::AppConfig, database::Database, observability};

use notification_dispatch::{
    channel::{ChannelRegistry, EmailChannel, PushChannel, SmsChannel},
    dispatcher::NotificationDispatcher,
    poller::NotificationPoller,
    provider::{MockEmailProvider, MockPushProvider, MockSmsProvider},
    repository::{
        EndpointRepository, NotificationRepository, PreferenceRepository, UserRepository,
    },
    retry::RetryProperties,
    service::NotificationService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载配置：config/*.toml + NOTIFY_ 环境变量覆盖
    let config = AppConfig::load("notification-dispatch-service").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    // 2. 初始化日志
    observability::init(&config.observability)?;

    info!("Starting notification-dispatch-service...");
    info!(environment = %config.environment, "Configuration loaded");

    // 3. 初始化数据库连接
    let db = Database::connect(&config.database).await?;
    db.health_check().await?;
    let pool = db.pool().clone();
    info!("Database connection established");

    // 4. 创建仓储
    let notification_repo = Arc::new(NotificationRepository::new(pool.clone()));
    let endpoint_repo = Arc::new(EndpointRepository::new(pool.clone()));
    let user_repo = Arc::new(UserRepository::new(pool.clone()));
    let preference_gate = Arc::new(PreferenceRepository::new(pool.clone()));
    info!("Repositories initialized");

    // 5. 装配渠道：mock 传输 + 渠道能力 + 注册表
    let registry = Arc::new(ChannelRegistry::new(vec![
        Arc::new(EmailChannel::new(
            Arc::new(MockEmailProvider::default()),
            endpoint_repo.clone(),
        )),
        Arc::new(SmsChannel::new(
            Arc::new(MockSmsProvider::default()),
            endpoint_repo.clone(),
        )),
        Arc::new(PushChannel::new(
            Arc::new(MockPushProvider::default()),
            endpoint_repo.clone(),
        )),
    ]));
    info!("Channel registry initialized");

    // 6. 创建调度器与接入服务
    let dispatcher = Arc::new(NotificationDispatcher::new(
        notification_repo.clone(),
        registry.clone(),
        Duration::from_secs(config.dispatch.send_timeout_seconds),
    ));

    let retry = RetryProperties::from_config(&config.retry);
    let _service = Arc::new(NotificationService::new(
        notification_repo.clone(),
        user_repo,
        endpoint_repo,
        preference_gate,
        registry,
        retry,
        config.ingest.max_bulk_size,
    ));
    info!("Services initialized");

    // 7. 启动轮询器后台任务
    let poller = Arc::new(NotificationPoller::new(
        notification_repo,
        dispatcher,
        config.poller.batch_size,
        Duration::from_millis(config.poller.interval_ms),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller_handle = tokio::spawn(poller.run(shutdown_rx));
    info!("Notification poller started");

    // 8. 等待关闭信号
    shutdown_signal().await;

    let _ = shutdown_tx.send(true);
    let _ = poller_handle.await;

    db.close().await;
    info!("Service shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
///
/// 监听 Ctrl+C 和 SIGTERM 信号，用于 Kubernetes 优雅关闭
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
