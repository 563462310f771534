//! The RFC 959 Help (`HELP`) command
//
// This command shall cause the server to send helpful
// information regarding its implementation status over the
// control connection to the user.

use crate::server::controlchan::{
    Reply, ReplyCode,
    error::ControlChanError,
    handler::{CommandContext, CommandHandler},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Help;

#[async_trait]
impl CommandHandler for Help {
    #[tracing_attributes::instrument]
    async fn handle(&self, _args: CommandContext) -> Result<Reply, ControlChanError> {
        let text = vec![
            "Help:",
            "Login: USER PASS",
            "Navigation: PWD CWD CDUP",
            "Files: RETR STOR APPE DELE RNFR RNTO SIZE MDTM",
            "Directories: LIST NLST MKD RMD",
            "Transfer: PASV TYPE MODE STRU ABOR",
            "Other: SYST FEAT OPTS NOOP HELP QUIT",
            "Active mode (PORT, EPRT) is not supported.",
            "End of help.",
        ];
        Ok(Reply::new_multiline(ReplyCode::HelpMessage, text))
    }
}
