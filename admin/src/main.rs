use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use codeloom_auth::TokenCodec;
use codeloom_controller::{CodespaceConfig, Controller};
use codeloom_orchestrator::{KubeOrchestrator, MockOrchestrator, Orchestrator};
use codeloom_store::StudentStore;
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

use crate::app::App;

mod app;
mod args;
mod auth;
mod routes;
mod server;
mod watch;

#[tokio::main]
pub async fn main() -> Result<()> {
    codeloom_common::init();
    let cli = args::Cli::parse();
    match cli.command {
        args::Commands::Server(args) => run(args).await,
    }
}

async fn run(args: args::ServerArgs) -> Result<()> {
    codeloom_common::metrics::maybe_spawn_metrics_server();

    let pool = codeloom_common::redis::init_redis(&args.redis).await;
    let store = StudentStore::new(pool, &args.students_dir);

    let orchestrator: Arc<dyn Orchestrator> = if args.codespace.mock_orchestrator {
        println!("{}", "running with the in-memory mock orchestrator".yellow());
        Arc::new(MockOrchestrator::new())
    } else {
        let client = kube::Client::try_default().await.context("failed to build kube client")?;
        Arc::new(KubeOrchestrator::new(
            client,
            args.codespace.codespace_namespace.clone(),
            PathBuf::from(&args.students_dir.students_dir),
        ))
    };

    let codespace_config = CodespaceConfig::from(&args.codespace);
    let tokens = TokenCodec::from_slice(args.token.api_key_secret.as_bytes()).context("invalid API_KEY_SECRET")?;
    let controller = Controller::new(store, orchestrator, codespace_config, tokens);
    let app_state = App::new(controller, args.admin_api_key.clone());

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        codeloom_common::shutdown::shutdown_signal().await;
        cancel_clone.cancel();
    });

    if args.embed_watcher {
        let watch_cancel = cancel.clone();
        let watch_app = app_state.clone();
        let interval = args.watch_interval_secs;
        let concurrency = args.watch_concurrency;
        tokio::spawn(async move {
            watch::run(watch_cancel, watch_app, interval, concurrency).await;
        });
    }

    server::run_server(cancel, args.port, app_state).await?;
    Ok(())
}
