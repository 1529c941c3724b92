use anyhow::Result;
use axum::Router;
use clap::Parser;
use search_core::store::open_or_warn;
use search_core::{replay_into, InvertedIndex, PageStore};
use server::{build_app, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Page store directory to bootstrap the index from
    #[arg(long, default_value = "./data/pages")]
    store: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();
    let args = Args::parse();

    let index = Arc::new(InvertedIndex::new());
    let store: Option<Arc<dyn PageStore>> = match open_or_warn(&args.store) {
        Some(store) => {
            if let Err(err) = replay_into(&store, &index) {
                tracing::warn!(error = %format!("{err:#}"), "failed to load stored pages");
            }
            Some(Arc::new(store) as Arc<dyn PageStore>)
        }
        None => None,
    };
    let app: Router = build_app(AppState::new(index, store));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
