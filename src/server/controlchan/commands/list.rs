//! The RFC 959 List (`LIST`) command
//
// This command causes a list to be sent from the server to the
// passive DTP.  If the pathname specifies a directory or other
// group of files, the server should transfer a list of files
// in the specified directory.  If the pathname specifies a
// file then the server should send current information on the
// file.  A null argument implies the user's current working or
// default directory.

use super::transfer_common::start_transfer;
use crate::{
    auth::Permissions,
    server::{
        chancomms::DataChanCmd,
        controlchan::{
            Reply,
            error::ControlChanError,
            handler::{CommandContext, CommandHandler},
        },
    },
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct List {
    // `ls` style flags like `-la`. Accepted and ignored.
    options: Option<String>,
    path: Option<String>,
}

impl List {
    pub fn new(options: Option<String>, path: Option<String>) -> Self {
        List { options, path }
    }
}

#[async_trait]
impl CommandHandler for List {
    #[tracing_attributes::instrument]
    async fn handle(&self, args: CommandContext) -> Result<Reply, ControlChanError> {
        if let Some(options) = &self.options {
            slog::debug!(args.logger, "LIST options ignored: {}", options);
        }
        let path = self.path.as_deref().unwrap_or(".");
        start_transfer(args, path, Permissions::LIST, |path| DataChanCmd::List { path }).await
    }
}
