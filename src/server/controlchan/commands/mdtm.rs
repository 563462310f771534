//! The RFC 3659 Modification Time (`MDTM`) command
//
// The FTP command, MODIFICATION TIME (MDTM), can be used to determine
// when a file in the server NVFS was last modified.

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
use chrono::{DateTime, offset::Utc};

const RFC3659_TIME: &str = "%Y%m%d%H%M%S";

#[derive(Debug)]
pub struct Mdtm {
    path: String,
}

impl Mdtm {
    pub fn new(path: String) -> Self {
        Mdtm { path }
    }
}

#[async_trait]
impl CommandHandler for Mdtm {
    #[tracing_attributes::instrument]
    async fn handle(&self, args: CommandContext) -> Result<Reply, ControlChanError> {
        let (path, storage) = match prepare(&args, &self.path, Permissions::READ).await {
            Ok(prepared) => prepared,
            Err(reply) => return Ok(reply),
        };
        let modified = storage.metadata(&path).await.and_then(|metadata| metadata.modified());
        match modified {
            Ok(mtime) => Ok(Reply::new_with_string(
                ReplyCode::FileStatus,
                DateTime::<Utc>::from(mtime).format(RFC3659_TIME).to_string(),
            )),
            Err(err) => Ok(storage_failure(&args.logger, "MDTM", err)),
        }
    }
}
