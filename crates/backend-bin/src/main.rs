use anyhow::Context;
use clap::Parser;
use secrets_backend::{
    config::{Settings, DEFAULT_CONFIG_FILE},
    create_router, AppState,
};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often expired sessions and lockouts are swept
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Secrets board server
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "SECRETS_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the bind address
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Override the data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load_from(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }
    if let Some(data_dir) = args.data_dir {
        settings.data_dir = data_dir;
    }

    init_tracing(&settings.log_level, args.log_json);

    let addr = settings.bind_addr;
    let state = Arc::new(AppState::from_settings(settings)?);

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sweeper.cleanup().await;
            if removed > 0 {
                tracing::debug!(removed, "expired sessions swept");
            }
        }
    });

    let app = create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
