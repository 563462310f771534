//! The RFC 959 Change Working Directory (`CWD`) command
//
// This command allows the user to work with a different
// directory or dataset for file storage or retrieval without
// altering his login or accounting information.  Transfer
// parameters are similarly unchanged.  The argument is a
// pathname specifying a directory or other system dependent
// file group designator.

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
pub struct Cwd {
    path: String,
}

impl Cwd {
    pub fn new(path: String) -> Self {
        Cwd { path }
    }
}

#[async_trait]
impl CommandHandler for Cwd {
    #[tracing_attributes::instrument]
    async fn handle(&self, args: CommandContext) -> Result<Reply, ControlChanError> {
        change_dir(&args, &self.path).await
    }
}

// Shared with CDUP.
pub(super) async fn change_dir(args: &CommandContext, input: &str) -> Result<Reply, ControlChanError> {
    let (path, storage) = match prepare(args, input, Permissions::empty()).await {
        Ok(prepared) => prepared,
        Err(reply) => return Ok(reply),
    };
    if let Err(err) = storage.cwd(&path).await {
        return Ok(storage_failure(&args.logger, "CWD", err));
    }
    args.session.lock().await.cwd = path;
    Ok(Reply::new(ReplyCode::FileActionOkay, "Okay."))
}
