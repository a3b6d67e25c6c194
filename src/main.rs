#![warn(unused_crate_dependencies)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

mod api;
mod cache;
mod config;
mod error;
mod fetch;
mod parse;

use std::{net::SocketAddr, str::FromStr, sync::Arc};

use tokio::net::TcpListener;

use crate::{
    cache::{RefreshTask, SubstitutionUpdater},
    config::Config,
    fetch::make_client,
};

pub use error::Result;

#[cfg(all(target_env = "musl", target_pointer_width = "64"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for ctrl-c: {e}");
    }
    log::info!("Shutting down");
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> core::result::Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let config = Config::load()?;
    log::debug!("{config:?}");
    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    let sweep_interval = config.sweep_interval();

    let client = make_client(&config)?;
    let updater = Arc::new(SubstitutionUpdater::new(client, config));
    let refresh_task = RefreshTask::spawn(Arc::clone(&updater), sweep_interval);

    let app = api::router(updater);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("failed to listen on {addr}: {e}"))?;
    log::info!("listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresh_task.stop().await;
    Ok(())
}
