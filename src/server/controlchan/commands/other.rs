// Anything the parser did not recognize.

use crate::server::controlchan::{
    Reply, ReplyCode,
    error::ControlChanError,
    handler::{CommandContext, CommandHandler},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Other {
    command_name: String,
}

impl Other {
    pub fn new(command_name: String) -> Self {
        Other { command_name }
    }
}

#[async_trait]
impl CommandHandler for Other {
    #[tracing_attributes::instrument]
    async fn handle(&self, args: CommandContext) -> Result<Reply, ControlChanError> {
        slog::debug!(args.logger, "Unsupported command {}", self.command_name);
        Ok(Reply::new(ReplyCode::CommandSyntaxError, "Command not implemented"))
    }
}
