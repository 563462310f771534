//! Contains the code that listens to control channel connections.

use super::ServerError;
use crate::server::{controlchan, shutdown};
use std::{future::Future, net::SocketAddr, time::Duration};
use tokio::{net::TcpListener, task::JoinSet};

// Listener listens for control channel connections on a TCP port and spawns a control channel loop
// in a new task for each incoming connection.
pub struct Listener {
    pub bind_address: SocketAddr,
    pub logger: slog::Logger,
    pub loop_config: controlchan::Config,
    pub shutdown_grace_period: Duration,
}

impl Listener {
    pub async fn listen<S>(self, shutdown_indicator: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()>,
    {
        let Listener {
            bind_address,
            logger,
            loop_config,
            shutdown_grace_period,
        } = self;
        let listener = TcpListener::bind(bind_address).await?;
        slog::info!(logger, "Listening on {}", bind_address);

        let notifier = shutdown::Notifier::new();
        let mut sessions: JoinSet<()> = JoinSet::new();
        tokio::pin!(shutdown_indicator);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((tcp_stream, socket_addr)) => {
                        while sessions.try_join_next().is_some() {}
                        slog::info!(logger, "Incoming control connection from {:?}", socket_addr);
                        let result = controlchan::spawn_loop(loop_config.clone(), tcp_stream, notifier.subscribe().await, &mut sessions).await;
                        if let Err(err) = result {
                            slog::error!(logger, "Could not spawn control channel loop for connection from {:?}: {:?}", socket_addr, err)
                        }
                    }
                    Err(err) => {
                        slog::error!(logger, "Error accepting incoming control connection {:?}", err);
                    }
                },
                _ = &mut shutdown_indicator => {
                    slog::info!(logger, "Shutting down, {} session(s) open", sessions.len());
                    break;
                }
            }
        }

        drop(listener);
        notifier.notify().await;
        let drained = tokio::time::timeout(shutdown_grace_period, async { while sessions.join_next().await.is_some() {} }).await;
        if drained.is_err() {
            slog::warn!(logger, "Grace period of {:?} passed, aborting {} session(s)", shutdown_grace_period, sessions.len());
            sessions.shutdown().await;
        }
        slog::info!(logger, "Shutdown complete");
        Ok(())
    }
}
