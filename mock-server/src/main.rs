use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;

    match std::env::var("BADGEKIT_SECRET") {
        Ok(secret) => {
            info!(%addr, "listening, requests must be signed");
            badgekit_mock::run_with_secret(listener, &secret).await
        }
        Err(_) => {
            info!(%addr, "listening");
            badgekit_mock::run(listener).await
        }
    }
}
