use course_tests_backend::{
    config::init_config,
    database::pool::create_pool,
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let config = init_config()?;

    let pool = create_pool(config).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied");

    let app = routes::app(AppState::new(pool, config));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
