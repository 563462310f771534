//! The RFC 959 Make Directory (`MKD`) command
//
// This command causes the directory specified in the pathname
// to be created as a directory (if the pathname is absolute)
// or as a subdirectory of the current working directory (if
// the pathname is relative).

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
pub struct Mkd {
    path: String,
}

impl Mkd {
    pub fn new(path: String) -> Self {
        Mkd { path }
    }
}

#[async_trait]
impl CommandHandler for Mkd {
    #[tracing_attributes::instrument]
    async fn handle(&self, args: CommandContext) -> Result<Reply, ControlChanError> {
        let (path, storage) = match prepare(&args, &self.path, Permissions::WRITE).await {
            Ok(prepared) => prepared,
            Err(reply) => return Ok(reply),
        };
        match storage.mkd(&path).await {
            Ok(()) => {
                if let Err(err) = args.tx_control_chan.send(ControlChanMsg::MkDirSuccess { path }) {
                    slog::warn!(args.logger, "{}", err);
                }
                Ok(Reply::none())
            }
            Err(err) => Ok(storage_failure(&args.logger, "MKD", err)),
        }
    }
}
