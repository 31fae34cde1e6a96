use anyhow::{Context, Result};
use axum::middleware;
use codeloom_common::{access_log, cors};
use owo_colors::OwoColorize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::app::App;
use crate::routes;

pub async fn run_server(cancel: CancellationToken, port: u16, app_state: App) -> Result<()> {
    let router = routes::router(app_state)
        .layer(middleware::from_fn(access_log::public))
        .layer(cors::dev());
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| {
            eprintln!("{}", format!("failed to bind admin server to {}: {}", addr, e).red());
            e
        })
        .context("failed to bind admin server")?;
    println!(
        "{}{}",
        "starting admin server • port=".green(),
        port.to_string().green().dimmed(),
    );
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await
        .context("failed to run admin server")?;
    println!("{}", "admin server stopped gracefully.".red());
    Ok(())
}
