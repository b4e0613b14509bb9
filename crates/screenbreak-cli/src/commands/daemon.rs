//! Foreground coordinator.
//!
//! Reads one JSON request per stdin line and writes one JSON response per
//! line to stdout, interleaved with events as they happen. Keeps running
//! after stdin closes; Ctrl-C stops it.

use std::sync::Arc;
use std::time::Duration;

use screenbreak_core::{Config, CoordinatorService, Request, Response};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use super::terminal::TerminalWindowHost;
use super::{open_coordinator, CliResult};

pub fn run() -> CliResult {
    let config = Config::load()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> CliResult {
    let mut coordinator = open_coordinator(&config, Arc::new(TerminalWindowHost::default()))?;
    coordinator.reconcile_alarms()?;

    let cancel = CancellationToken::new();
    let (handle, service) = CoordinatorService::spawn(
        coordinator,
        Duration::from_millis(config.runtime.poll_interval_ms),
        cancel.clone(),
    );
    tracing::info!(
        interval_min = config.breaks.interval_min,
        poll_interval_ms = config.runtime.poll_interval_ms,
        "daemon started"
    );

    // Single writer keeps response and event lines whole.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = out_rx.recv().await {
            let written = async {
                stdout.write_all(line.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await
            };
            if let Err(e) = written.await {
                tracing::warn!(error = %e, "stdout write failed");
            }
        }
    });

    let mut events = handle.subscribe();
    let event_out = out_tx.clone();
    let forwarder = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => {
                        let _ = event_out.send(line);
                    }
                    Err(e) => tracing::warn!(error = %e, "could not encode event"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event output fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let result: CliResult = loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("interrupted");
                break Ok(());
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let response = match Request::parse(&line) {
                        Ok(request) => match handle.send(request).await {
                            Ok(response) => response,
                            Err(e) => break Err(e.into()),
                        },
                        Err(e) => Response::failure(e),
                    };
                    match serde_json::to_string(&response) {
                        Ok(encoded) => {
                            let _ = out_tx.send(encoded);
                        }
                        Err(e) => break Err(e.into()),
                    }
                }
                Ok(None) => {
                    tracing::debug!("stdin closed, still serving alarms");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    stdin_open = false;
                }
            }
        }
    };

    cancel.cancel();
    let coordinator = service.await?;
    drop(coordinator);
    drop(handle);
    forwarder.await?;
    drop(out_tx);
    writer.await?;
    result
}
