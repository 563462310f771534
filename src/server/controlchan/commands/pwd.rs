//! The RFC 959 Print Working Directory (`PWD`) command
//
// This command causes the name of the current working
// directory to be returned in the reply.

use crate::server::controlchan::{
    Reply, ReplyCode,
    error::ControlChanError,
    handler::{CommandContext, CommandHandler},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Pwd;

#[async_trait]
impl CommandHandler for Pwd {
    #[tracing_attributes::instrument]
    async fn handle(&self, args: CommandContext) -> Result<Reply, ControlChanError> {
        let session = args.session.lock().await;
        Ok(Reply::new_with_string(ReplyCode::DirCreated, quoted(session.cwd.as_str())))
    }
}

// RFC 959 appendix II: the name goes in double quotes, embedded quotes are doubled.
pub(super) fn quoted(path: &str) -> String {
    format!("\"{}\"", path.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::quoted;
    use pretty_assertions::assert_eq;

    #[test]
    fn embedded_quotes_are_doubled() {
        assert_eq!(quoted("/home/alice"), "\"/home/alice\"");
        assert_eq!(quoted("/say \"hi\""), "\"/say \"\"hi\"\"\"");
    }
}
