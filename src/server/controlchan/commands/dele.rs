//! The RFC 959 Delete (`DELE`) command
//
// This command causes the file specified in the pathname to be
// deleted at the server site.

use super::common::{prepare, storage_failure};
use crate::{
    auth::Permissions,
    server::{
        chancomms::ControlChanMsg,
        controlchan::{
            Reply,
            error::ControlChanError,
            handler::{CommandContext, CommandHandler},
        },
    },
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Dele {
    path: String,
}

impl Dele {
    pub fn new(path: String) -> Self {
        Dele { path }
    }
}

#[async_trait]
impl CommandHandler for Dele {
    #[tracing_attributes::instrument]
    async fn handle(&self, args: CommandContext) -> Result<Reply, ControlChanError> {
        let (path, storage) = match prepare(&args, &self.path, Permissions::DELETE).await {
            Ok(prepared) => prepared,
            Err(reply) => return Ok(reply),
        };
        match storage.del(&path).await {
            Ok(()) => {
                if let Err(err) = args.tx_control_chan.send(ControlChanMsg::DelFileSuccess { path }) {
                    slog::warn!(args.logger, "{}", err);
                }
                Ok(Reply::none())
            }
            Err(err) => Ok(storage_failure(&args.logger, "DELE", err)),
        }
    }
}
