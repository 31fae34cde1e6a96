use std::time::Duration;

use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

use crate::app::App;

/// Periodically ticks every student's codespace, embedded as a
/// background task rather than a separate binary.
pub async fn run(cancel: CancellationToken, app: App, interval_secs: u64, concurrency: usize) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                println!("{}", "watcher loop stopped.".red());
                return;
            }
            _ = interval.tick() => {
                match app.controller.watch_all(concurrency).await {
                    Ok(results) => {
                        let failures: Vec<_> = results.iter().filter(|(_, r)| r.is_err()).collect();
                        if !failures.is_empty() {
                            println!(
                                "{}",
                                format!("watch tick: {}/{} students failed reconciliation", failures.len(), results.len()).yellow()
                            );
                        }
                    }
                    Err(e) => println!("{}", format!("watch tick failed: {e}").red()),
                }
            }
        }
    }
}
