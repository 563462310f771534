//! The RFC 2389 Feature (`FEAT`) command

use crate::server::controlchan::{
    Reply, ReplyCode,
    error::ControlChanError,
    handler::{CommandContext, CommandHandler},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Feat;

#[async_trait]
impl CommandHandler for Feat {
    #[tracing_attributes::instrument]
    async fn handle(&self, _args: CommandContext) -> Result<Reply, ControlChanError> {
        let feat_text = vec!["Extensions supported:", " MDTM", " SIZE", " UTF8", "END"];
        Ok(Reply::new_multiline(ReplyCode::SystemStatus, feat_text))
    }
}
