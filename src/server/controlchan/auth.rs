use super::{Event, Reply, ReplyCode, command::Command, error::ControlChanError, middleware::ControlChanMiddleware};
use crate::server::session::SharedSession;

use async_trait::async_trait;

// AuthMiddleware ensures the user is authenticated before they can do much else.
pub struct AuthMiddleware<Next>
where
    Next: ControlChanMiddleware,
{
    pub session: SharedSession,
    pub next: Next,
}

#[async_trait]
impl<Next> ControlChanMiddleware for AuthMiddleware<Next>
where
    Next: ControlChanMiddleware,
{
    async fn handle(&mut self, event: Event) -> Result<Reply, ControlChanError> {
        match event {
            // internal messages and the below commands are exempt from auth checks.
            Event::InternalMsg(_)
            | Event::Command(Command::Help)
            | Event::Command(Command::User { .. })
            | Event::Command(Command::Pass { .. })
            | Event::Command(Command::Feat)
            | Event::Command(Command::Syst)
            | Event::Command(Command::Noop)
            | Event::Command(Command::Quit)
            | Event::Command(Command::Other { .. }) => self.next.handle(event).await,
            _ => {
                let logged_in = self.session.lock().await.state.is_logged_in();
                if logged_in {
                    self.next.handle(event).await
                } else {
                    Ok(Reply::new(ReplyCode::NotLoggedIn, "Please authenticate"))
                }
            }
        }
    }
}
