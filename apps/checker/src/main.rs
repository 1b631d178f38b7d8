use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use checker::{
    app::App,
    config::{Config, SessionBackendConfig},
    repl,
};
use stock::{
    KvBackend, QuoteClient, SessionStore,
    session::{FileBackend, MemoryBackend, RedisBackend},
};
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let client = Arc::new(QuoteClient::new(config.api_url.clone())?);
    info!(api = client.base_api(), "quote client ready");

    match config.session.clone() {
        SessionBackendConfig::File(path) => {
            info!(path = %path.display(), "using file session");
            run(client, FileBackend::new(path), config.export_dir).await?;
        }
        SessionBackendConfig::Redis { url, key_prefix } => {
            info!(%key_prefix, "using redis session");
            let backend = RedisBackend::new(&url, key_prefix).await?;
            run(client, backend, config.export_dir).await?;
        }
        SessionBackendConfig::Memory => {
            info!("using in-memory session");
            run(client, MemoryBackend::new(), config.export_dir).await?;
        }
    }

    info!("Shutdown complete.");
    Ok(())
}

async fn run<B: KvBackend>(client: Arc<QuoteClient>, backend: B, export_dir: PathBuf) -> Result<()> {
    let mut app = App::new(client, SessionStore::new(backend), export_dir);

    if let Err(e) = app.restore().await {
        error!(error = ?e, "session restore failed, starting empty");
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    repl::run(&mut app, stdin, &mut stdout, shutdown_signal()).await
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::{
            select,
            signal::unix::{SignalKind, signal},
        };
        let (Ok(mut sigterm), Ok(mut sigint)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) else {
            error!("failed to install signal handlers");
            return std::future::pending().await;
        };
        select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv()  => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
