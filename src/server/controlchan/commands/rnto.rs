//! The RFC 959 Rename To (`RNTO`) command
//
// This command specifies the new pathname of the file
// specified in the immediately preceding "rename from"
// command.  Together the two commands cause a file to be
// renamed.

use super::common::{prepare, storage_failure};
use crate::{
    auth::Permissions,
    server::{
        chancomms::ControlChanMsg,
        controlchan::{
            Reply, ReplyCode,
            error::ControlChanError,
            handler::{CommandContext, CommandHandler},
        },
    },
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Rnto {
    file: String,
}

impl Rnto {
    pub fn new(file: String) -> Self {
        Rnto { file }
    }
}

#[async_trait]
impl CommandHandler for Rnto {
    #[tracing_attributes::instrument]
    async fn handle(&self, args: CommandContext) -> Result<Reply, ControlChanError> {
        let from = match args.session.lock().await.rename_from.take() {
            Some(from) => from,
            None => return Ok(Reply::new(ReplyCode::BadCommandSequence, "Please tell me what file you want to rename first")),
        };
        let (to, storage) = match prepare(&args, &self.file, Permissions::WRITE).await {
            Ok(prepared) => prepared,
            Err(reply) => return Ok(reply),
        };
        match storage.rename(&from, &to).await {
            Ok(()) => {
                let msg = ControlChanMsg::RenameSuccess { old_path: from, new_path: to };
                if let Err(err) = args.tx_control_chan.send(msg) {
                    slog::warn!(args.logger, "{}", err);
                }
                Ok(Reply::none())
            }
            Err(err) => Ok(storage_failure(&args.logger, "RNTO", err)),
        }
    }
}
