use super::{Event, Reply, error::ControlChanError, middleware::ControlChanMiddleware};
use crate::{
    notification::{DataEvent, DataListener, EventMeta, PresenceEvent, PresenceListener},
    server::{chancomms::ControlChanMsg, session::TraceId},
};

use async_trait::async_trait;
use std::sync::Arc;

// Control channel middleware that turns internal messages into notification events and hands
// them to the registered listeners.
pub struct EventDispatcherMiddleware<Next>
where
    Next: ControlChanMiddleware,
{
    data_listener: Arc<dyn DataListener>,
    presence_listener: Arc<dyn PresenceListener>,
    next: Next,
    sequence_nr: u64,
    // Set once PASS succeeded. Sessions that never logged in produce no events.
    username: Option<String>,
    trace_id: TraceId,
}

impl<Next> EventDispatcherMiddleware<Next>
where
    Next: ControlChanMiddleware,
{
    pub fn new(data_listener: Arc<dyn DataListener>, presence_listener: Arc<dyn PresenceListener>, trace_id: TraceId, next: Next) -> Self {
        EventDispatcherMiddleware {
            data_listener,
            presence_listener,
            next,
            sequence_nr: 0,
            username: None,
            trace_id,
        }
    }

    fn meta(&mut self, username: String) -> EventMeta {
        self.sequence_nr += 1;
        EventMeta {
            username,
            trace_id: self.trace_id.to_string(),
            sequence_number: self.sequence_nr,
        }
    }
}

fn data_event(msg: &ControlChanMsg) -> Option<DataEvent> {
    match msg {
        ControlChanMsg::SentData { path, bytes } => Some(DataEvent::Got {
            path: path.to_string(),
            bytes: *bytes,
        }),
        ControlChanMsg::WrittenData { path, bytes } => Some(DataEvent::Put {
            path: path.to_string(),
            bytes: *bytes,
        }),
        ControlChanMsg::RmDirSuccess { path } => Some(DataEvent::RemovedDir { path: path.to_string() }),
        ControlChanMsg::DelFileSuccess { path } => Some(DataEvent::Deleted { path: path.to_string() }),
        ControlChanMsg::MkDirSuccess { path } => Some(DataEvent::MadeDir { path: path.to_string() }),
        ControlChanMsg::RenameSuccess { old_path, new_path } => Some(DataEvent::Renamed {
            from: old_path.to_string(),
            to: new_path.to_string(),
        }),
        _ => None,
    }
}

#[async_trait]
impl<Next> ControlChanMiddleware for EventDispatcherMiddleware<Next>
where
    Next: ControlChanMiddleware,
{
    async fn handle(&mut self, event: Event) -> Result<Reply, ControlChanError> {
        if let Event::InternalMsg(msg) = &event {
            match msg {
                ControlChanMsg::AuthSuccess { username, trace_id } => {
                    self.username = Some(username.clone());
                    self.trace_id = *trace_id;
                    let m = self.meta(username.clone());
                    self.presence_listener.receive_presence_event(PresenceEvent::LoggedIn, m).await;
                }
                ControlChanMsg::ExitControlLoop => {
                    if let Some(username) = self.username.take() {
                        let m = self.meta(username);
                        self.presence_listener.receive_presence_event(PresenceEvent::LoggedOut, m).await;
                    }
                }
                msg => {
                    if let (Some(event), Some(username)) = (data_event(msg), self.username.clone()) {
                        let m = self.meta(username);
                        self.data_listener.receive_data_event(event, m).await;
                    }
                }
            }
        }
        self.next.handle(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::controlchan::ReplyCode;
    use ftpgate_core::path::VirtualPath;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, u64)>>,
    }

    #[async_trait]
    impl DataListener for Recorder {
        async fn receive_data_event(&self, e: DataEvent, m: EventMeta) {
            self.seen.lock().unwrap().push((format!("{:?}", e), m.sequence_number));
        }
    }

    #[async_trait]
    impl PresenceListener for Recorder {
        async fn receive_presence_event(&self, e: PresenceEvent, m: EventMeta) {
            self.seen.lock().unwrap().push((format!("{:?}", e), m.sequence_number));
        }
    }

    struct Ok200;

    #[async_trait]
    impl ControlChanMiddleware for Ok200 {
        async fn handle(&mut self, _: Event) -> Result<Reply, ControlChanError> {
            Ok(Reply::new(ReplyCode::CommandOkay, "OK"))
        }
    }

    fn dispatcher(recorder: &Arc<Recorder>) -> EventDispatcherMiddleware<Ok200> {
        let data: Arc<dyn DataListener> = recorder.clone();
        let presence: Arc<dyn PresenceListener> = recorder.clone();
        EventDispatcherMiddleware::new(data, presence, TraceId::new(), Ok200)
    }

    #[tokio::test]
    async fn events_are_numbered_per_session() {
        let recorder = Arc::new(Recorder::default());
        let mut chain = dispatcher(&recorder);
        let trace_id = TraceId::new();
        for msg in [
            ControlChanMsg::AuthSuccess {
                username: "alice".into(),
                trace_id,
            },
            ControlChanMsg::MkDirSuccess {
                path: VirtualPath::new("/home/alice/new"),
            },
            ControlChanMsg::ExitControlLoop,
        ] {
            chain.handle(Event::InternalMsg(msg)).await.unwrap();
        }
        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ("LoggedIn".to_string(), 1),
                (r#"MadeDir { path: "/home/alice/new" }"#.to_string(), 2),
                ("LoggedOut".to_string(), 3),
            ]
        );
    }

    #[tokio::test]
    async fn anonymous_disconnect_is_not_a_logout() {
        let recorder = Arc::new(Recorder::default());
        let mut chain = dispatcher(&recorder);
        chain.handle(Event::InternalMsg(ControlChanMsg::AuthFailed)).await.unwrap();
        chain.handle(Event::InternalMsg(ControlChanMsg::ExitControlLoop)).await.unwrap();
        assert!(recorder.seen.lock().unwrap().is_empty());
    }
}
