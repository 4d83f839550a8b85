use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tms_backend::{
    config::{AppState, Config},
    create_router,
    services::notify::{mail, sms},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tms_backend=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();

    let config = Config::from_env()?;
    let db_pool = config.connect().await?;

    sqlx::migrate!()
        .run(&db_pool)
        .await
        .context("failed to run database migrations")?;
    tracing::info!("database migrations applied");

    let mailer = mail::from_config(&config)?;
    let sms = sms::from_config(&config)?;

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(db_pool, config, mailer, sms);
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %listener.local_addr()?, "server listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
