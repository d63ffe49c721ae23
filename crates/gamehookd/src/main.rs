use clap::Parser;
use engine::GameHook;
use gamehookd::GameHookConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// The GameHook daemon: loads a mapper, runs the update loop, and exposes it
/// over HTTP/WebSocket.
#[derive(Parser, Debug)]
#[command(name = "gamehookd")]
struct Args {
    /// Path to the JSON config file (§6).
    #[arg(long, env = "GAMEHOOKD_CONFIG", default_value = "gamehookd.json")]
    config: PathBuf,

    /// Overrides the config file's `http.bind` address.
    #[arg(long, env = "GAMEHOOKD_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let file_config = if args.config.exists() {
        GameHookConfig::load(&args.config)?
    } else {
        tracing::warn!(path = %args.config.display(), "config file not found, using defaults");
        GameHookConfig::default()
    };
    let (engine_config, mut bind) = file_config.engine_config();
    if let Some(override_bind) = args.bind {
        bind = override_bind;
    }

    let gamehook = Arc::new(GameHook::new(engine_config));
    let app = gamehookd::app(gamehook.clone());

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(%bind, "gamehookd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    gamehook.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
