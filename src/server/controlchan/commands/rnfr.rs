//! The RFC 959 Rename From (`RNFR`) command
//
// This command specifies the old pathname of the file which is
// to be renamed.  This command must be immediately followed by
// a "rename to" command specifying the new file pathname.

use super::common::{prepare, storage_failure};
use crate::{
    auth::Permissions,
    server::controlchan::{
        Reply, ReplyCode,
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
    },
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Rnfr {
    file: String,
}

impl Rnfr {
    pub fn new(file: String) -> Self {
        Rnfr { file }
    }
}

#[async_trait]
impl CommandHandler for Rnfr {
    #[tracing_attributes::instrument]
    async fn handle(&self, args: CommandContext) -> Result<Reply, ControlChanError> {
        let (path, storage) = match prepare(&args, &self.file, Permissions::WRITE).await {
            Ok(prepared) => prepared,
            Err(reply) => return Ok(reply),
        };
        if let Err(err) = storage.metadata(&path).await {
            return Ok(storage_failure(&args.logger, "RNFR", err));
        }
        args.session.lock().await.rename_from = Some(path);
        Ok(Reply::new(ReplyCode::FileActionPending, "Tell me, what would you like the new name to be?"))
    }
}
