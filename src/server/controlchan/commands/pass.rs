//! The RFC 959 Password (`PASS`) command
//
// The argument field is a Telnet string specifying the user's
// password.  This command must be immediately preceded by the
// user name command, and, for some sites, completes the user's
// identification for access control.

use crate::server::{
    chancomms::ControlChanMsg,
    controlchan::{
        Reply, ReplyCode,
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
    },
    password::Password,
    session::SessionState,
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Pass {
    password: Password,
}

impl Pass {
    pub fn new(password: Password) -> Self {
        Pass { password }
    }
}

#[async_trait]
impl CommandHandler for Pass {
    #[tracing_attributes::instrument]
    async fn handle(&self, args: CommandContext) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        match session.state {
            SessionState::WaitPass => {
                let username = session.username.clone().unwrap_or_default();
                // Held across resolution so the state cannot change underneath it.
                let msg = match args.resolver.resolve(&username, self.password.as_ref()).await {
                    Ok(identity) => {
                        slog::info!(args.logger, "User {} logged in", identity.username; "home" => %identity.home, "backend" => %identity.backend);
                        session.login(identity);
                        ControlChanMsg::AuthSuccess {
                            username,
                            trace_id: session.trace_id,
                        }
                    }
                    Err(_) => {
                        session.state = SessionState::New;
                        session.username = None;
                        ControlChanMsg::AuthFailed
                    }
                };
                // Answered by the control loop before it reads the next command.
                if let Err(err) = args.tx_control_chan.send(msg) {
                    slog::warn!(args.logger, "Could not report login outcome: {}", err);
                }
                Ok(Reply::none())
            }
            SessionState::New => Ok(Reply::new(ReplyCode::BadCommandSequence, "Please supply a username first")),
            _ => Ok(Reply::new(ReplyCode::NotLoggedIn, "Already logged in")),
        }
    }
}
