//! The RFC 3659 File Size (`SIZE`) command
//
// The FTP command, SIZE OF FILE (SIZE), is used to obtain the transfer
// size of a file from the server-FTP process.

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
pub struct Size {
    path: String,
}

impl Size {
    pub fn new(path: String) -> Self {
        Size { path }
    }
}

#[async_trait]
impl CommandHandler for Size {
    #[tracing_attributes::instrument]
    async fn handle(&self, args: CommandContext) -> Result<Reply, ControlChanError> {
        let (path, storage) = match prepare(&args, &self.path, Permissions::READ).await {
            Ok(prepared) => prepared,
            Err(reply) => return Ok(reply),
        };
        match storage.metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => Ok(Reply::new(ReplyCode::FileError, "Not a plain file")),
            Ok(metadata) => Ok(Reply::new_with_string(ReplyCode::FileStatus, metadata.len().to_string())),
            Err(err) => Ok(storage_failure(&args.logger, "SIZE", err)),
        }
    }
}
