use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod response;
mod routes;
mod state;

mod models {
    pub mod email;
    pub mod file;
    pub mod folder;
    pub mod oauth;
    pub mod session;
    pub mod short;
    pub mod token;
}

mod repositories {
    pub mod token;
}

mod services {
    pub mod oauth;
    pub mod session;
}

mod upstream {
    pub mod client;
    pub mod relay;
}

mod handlers {
    pub mod account;
    pub mod email;
    pub mod files;
    pub mod folders;
    pub mod info;
    pub mod oauth;
    pub mod proxy;
    pub mod shorts;
}

mod middleware_layer {
    pub mod auth;
}

mod validation {
    pub mod proxy;
    pub mod requests;
}

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    if config.oauth_settings().is_none() {
        tracing::warn!("⚠️ OAuth client settings incomplete, /oauth/callback will fail");
    }

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    let app = routes::build_router(state);

    let addr = SocketAddr::new(config.server_host, config.server_port);
    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!("✅ All systems operational");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
