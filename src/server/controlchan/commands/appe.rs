//! The RFC 959 Append (`APPE`) command
//
// This command causes the server-DTP to accept the data
// transferred via the data connection and to store the data in
// a file at the server site.  If the file specified in the
// pathname exists at the server site, then the data shall be
// appended to that file; otherwise the file specified in the
// pathname shall be created at the server site.

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
pub struct Appe {
    path: String,
}

impl Appe {
    pub fn new(path: String) -> Self {
        Appe { path }
    }
}

#[async_trait]
impl CommandHandler for Appe {
    #[tracing_attributes::instrument]
    async fn handle(&self, args: CommandContext) -> Result<Reply, ControlChanError> {
        start_transfer(args, &self.path, Permissions::WRITE, |path| DataChanCmd::Appe { path }).await
    }
}
