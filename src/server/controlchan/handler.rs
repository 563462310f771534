use crate::{
    auth::Resolver,
    options::PassiveHost,
    server::{
        chancomms::ControlChanMsg,
        controlchan::{Reply, error::ControlChanError},
        portalloc::PassivePortAllocator,
        session::SharedSession,
    },
    storage::BackendRegistry,
};
use async_trait::async_trait;
use std::{net::SocketAddr, result::Result, sync::Arc, time::Duration};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub(crate) trait CommandHandler: Send + Sync + std::fmt::Debug {
    async fn handle(&self, args: CommandContext) -> Result<Reply, ControlChanError>;
}

/// Convenience struct to group command args
#[derive(Debug)]
pub(crate) struct CommandContext {
    pub session: SharedSession,
    pub resolver: Arc<Resolver>,
    pub registry: Arc<BackendRegistry>,
    pub allocator: Arc<PassivePortAllocator>,
    pub passive_host: PassiveHost,
    pub passive_accept_timeout: Duration,
    pub tx_control_chan: UnboundedSender<ControlChanMsg>,
    pub local_addr: SocketAddr,
    // Cancelled when the session ends. Tasks spawned on behalf of the session stop with it.
    pub data_tasks: CancellationToken,
    pub logger: slog::Logger,
}
