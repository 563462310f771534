//! Serves FTP with users and backends read from `controlplane.json`. Send SIGHUP to reload it.

use ftpgate::ServerBuilder;
use ftpgate_cp_jsonfile::JsonFileControlPlane;
use slog::Drain;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let logger = slog::Logger::root(drain, slog::o!());

    let control_plane = Arc::new(JsonFileControlPlane::from_file("controlplane.json")?);

    let reloader = Arc::clone(&control_plane);
    let reload_logger = logger.clone();
    let mut hangups = signal(SignalKind::hangup())?;
    tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            match reloader.reload().await {
                Ok(()) => slog::info!(reload_logger, "Reloaded controlplane.json"),
                Err(err) => slog::warn!(reload_logger, "Keeping previous records: {}", err),
            }
        }
    });

    let server = ServerBuilder::new(control_plane)
        .bind_address("127.0.0.1:2121".parse()?)
        .passive_ports(50000..=50100)
        .logger(logger.clone())
        .build()?;

    slog::info!(logger, "Starting ftp server on {}", server.bind_address());
    server
        .listen(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
