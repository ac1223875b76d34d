//! 主应用程序入口
//!
//! 加载配置、连接存储并启动 Axum Web 服务。

use std::sync::Arc;

use anyhow::Context;
use application::SystemClock;
use config::AppConfig;
use infrastructure::{Infrastructure, InfrastructureConfig};
use tracing_subscriber::EnvFilter;
use web_api::{app, AppState, Ports};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(config = %config.sanitize(), "configuration loaded");

    let infrastructure = Infrastructure::connect(InfrastructureConfig::from(&config))
        .await
        .context("failed to initialise storage")?;

    let state = AppState::from_ports(Ports {
        user_repository: infrastructure.user_repository,
        topic_repository: infrastructure.topic_repository,
        room_repository: infrastructure.room_repository,
        message_repository: infrastructure.message_repository,
        password_hasher: infrastructure.password_hasher,
        clock: Arc::new(SystemClock),
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("topic rooms server listening on http://{addr}");
    axum::serve(listener, app(state, &config.session)).await?;

    Ok(())
}
