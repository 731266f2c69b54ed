use std::net::SocketAddr;

use anyhow::Context;
use app_server::{
    app, config::AppConfig, logger::Logger, middleware::recover, state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    let logger = Logger::init(&config.log)?;
    recover::install_panic_hook();

    let result = run(config).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "server exited with error");
    }

    logger.shutdown();
    result
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid APP_HOST/APP_PORT")?;

    let state = AppState::init(config).await?;
    app::serve(app::build_app(state), addr).await
}
