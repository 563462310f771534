//! The RFC 959 Data Port (`PORT`) command, and the RFC 2428 `EPRT` that maps onto it.
//!
//! Only passive mode is served, so this always declines.

use crate::server::controlchan::{
    Reply, ReplyCode,
    error::ControlChanError,
    handler::{CommandContext, CommandHandler},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Port;

#[async_trait]
impl CommandHandler for Port {
    #[tracing_attributes::instrument]
    async fn handle(&self, _args: CommandContext) -> Result<Reply, ControlChanError> {
        Ok(Reply::new(ReplyCode::CommandNotImplemented, "Active mode is not supported, use PASV"))
    }
}
