use crate::{
    auth::Resolver,
    notification::{DataListener, PresenceListener},
    options::PassiveHost,
    server::{
        chancomms::ControlChanMsg,
        controlchan::{
            Reply, ReplyCode,
            auth::AuthMiddleware,
            codecs::FtpCodec,
            command::Command,
            commands,
            error::{ControlChanError, ControlChanErrorKind},
            event::Event,
            handler::{CommandContext, CommandHandler},
            line_parser::error::{ParseError, ParseErrorKind},
            log::LoggingMiddleware,
            middleware::ControlChanMiddleware,
            notify::EventDispatcherMiddleware,
        },
        portalloc::PassivePortAllocator,
        session::{Session, SessionState, SharedSession, TraceId},
        shutdown,
    },
    storage::BackendRegistry,
};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    net::TcpStream,
    sync::{
        Mutex,
        mpsc::{self, UnboundedReceiver, UnboundedSender},
    },
    task::JoinSet,
};
use tokio_util::{
    codec::{Decoder, Framed},
    sync::CancellationToken,
};

// Everything a control loop needs from the server. Cloned for every accepted connection.
#[derive(Clone)]
pub struct Config {
    pub registry: Arc<BackendRegistry>,
    pub resolver: Arc<Resolver>,
    pub allocator: Arc<PassivePortAllocator>,
    pub greeting: String,
    pub passive_host: PassiveHost,
    pub idle_session_timeout: Duration,
    pub passive_accept_timeout: Duration,
    pub violation_threshold: u32,
    pub data_listener: Arc<dyn DataListener>,
    pub presence_listener: Arc<dyn PresenceListener>,
    pub logger: slog::Logger,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("greeting", &self.greeting)
            .field("passive_host", &self.passive_host)
            .field("idle_session_timeout", &self.idle_session_timeout)
            .field("passive_accept_timeout", &self.passive_accept_timeout)
            .field("violation_threshold", &self.violation_threshold)
            .finish()
    }
}

// Why a control loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Quit,
    ClientGone,
    TooManyViolations,
    Shutdown,
    Error(ControlChanErrorKind),
}

// Gives back what a session holds on the shared allocator, however its task ends. Aborted tasks
// included. The passive accept and data tasks of the session watch `data_tasks` and stop once it
// is cancelled, so none of them outlive the session or keep a socket on a port it handed back.
struct SessionCleanup {
    data_tasks: CancellationToken,
    allocator: Arc<PassivePortAllocator>,
    trace_id: TraceId,
}

impl Drop for SessionCleanup {
    fn drop(&mut self) {
        self.data_tasks.cancel();
        self.allocator.release_session(self.trace_id);
    }
}

/// Does TCP processing when an FTP client connects. The control loop runs as a task in `sessions`.
pub(crate) async fn spawn_loop(config: Config, tcp_stream: TcpStream, mut shutdown: shutdown::Listener, sessions: &mut JoinSet<()>) -> Result<(), ControlChanError> {
    let local_addr = tcp_stream.local_addr()?;
    let source = tcp_stream.peer_addr()?;
    let session = Session::new();
    let trace_id = session.trace_id;
    let logger = config.logger.new(slog::o!("trace-id" => format!("{}", trace_id), "source" => format!("{}", source)));
    let shared_session: SharedSession = Arc::new(Mutex::new(session));
    let (control_msg_tx, mut control_msg_rx): (UnboundedSender<ControlChanMsg>, UnboundedReceiver<ControlChanMsg>) = mpsc::unbounded_channel();
    let data_tasks = CancellationToken::new();

    let primary = PrimaryEventHandler {
        logger: logger.clone(),
        session: shared_session.clone(),
        resolver: Arc::clone(&config.resolver),
        registry: Arc::clone(&config.registry),
        allocator: Arc::clone(&config.allocator),
        passive_host: config.passive_host,
        passive_accept_timeout: config.passive_accept_timeout,
        tx_control_chan: control_msg_tx,
        local_addr,
        data_tasks: data_tasks.clone(),
    };
    let event_chain = EventDispatcherMiddleware::new(Arc::clone(&config.data_listener), Arc::clone(&config.presence_listener), trace_id, primary);
    let event_chain = AuthMiddleware {
        session: shared_session.clone(),
        next: event_chain,
    };
    let mut event_chain = LoggingMiddleware {
        logger: logger.clone(),
        sequence_nr: 0,
        next: event_chain,
    };

    let codec = FtpCodec::new();
    let mut framed: Framed<TcpStream, FtpCodec> = codec.framed(tcp_stream);
    framed.send(Reply::new(ReplyCode::ServiceReady, &config.greeting)).await?;

    let cleanup = SessionCleanup {
        data_tasks,
        allocator: Arc::clone(&config.allocator),
        trace_id,
    };

    sessions.spawn(async move {
        let _cleanup = cleanup;
        slog::info!(logger, "Starting control loop");
        let mut violations: u32 = 0;
        let exit = loop {
            let transferring = shared_session.lock().await.state == SessionState::Transferring;
            // The idle clock does not run while a transfer is in flight; the transfer itself may
            // take longer than the idle window.
            let idle = async {
                if transferring {
                    futures_util::future::pending::<()>().await
                } else {
                    tokio::time::sleep(config.idle_session_timeout).await
                }
            };

            // Messages a handler queued while running are answered before the next command is read,
            // so replies go out in the order the client sent its commands.
            let queued = match control_msg_rx.try_recv() {
                Ok(ControlChanMsg::ExitControlLoop) => break Exit::Quit,
                Ok(msg) => Some(Event::InternalMsg(msg)),
                Err(_) => None,
            };

            let event = match queued {
                Some(event) => event,
                None => tokio::select! {
                    incoming = framed.next() => match incoming {
                        None => break Exit::ClientGone,
                        Some(Err(err)) => {
                            slog::warn!(logger, "Control channel error: {}", err);
                            break Exit::Error(err.kind());
                        }
                        Some(Ok(Err(parse_error))) => {
                            let reply = parse_error_reply(&logger, parse_error);
                            violations += 1;
                            if let Some(exit) = send_or_exit(&mut framed, reply, violations, config.violation_threshold, &logger).await {
                                break exit;
                            }
                            continue;
                        }
                        Some(Ok(Ok(command))) => Event::Command(command),
                    },
                    Some(msg) = control_msg_rx.recv() => match msg {
                        ControlChanMsg::ExitControlLoop => break Exit::Quit,
                        msg => Event::InternalMsg(msg),
                    },
                    _ = idle => {
                        slog::info!(logger, "Control connection timed out");
                        let _ = framed.send(Reply::new(ReplyCode::ServiceNotAvailable, "Session timed out. Closing control connection")).await;
                        break Exit::Error(ControlChanErrorKind::ControlChannelTimeout);
                    },
                    _ = shutdown.listen(), if !shutdown.is_shutdown() => {
                        if transferring {
                            slog::info!(logger, "Shutdown requested, closing once the transfer completes");
                        } else {
                            let _ = framed.send(Reply::new(ReplyCode::ServiceNotAvailable, "Server is shutting down")).await;
                            break Exit::Shutdown;
                        }
                        continue;
                    },
                },
            };

            let reply = match event_chain.handle(event).await {
                Ok(reply) => reply,
                Err(err) => {
                    slog::warn!(logger, "Event handler chain error: {}", err);
                    let _ = framed.send(Reply::new(ReplyCode::LocalError, "Unknown internal server error, please try again later")).await;
                    break Exit::Error(err.kind());
                }
            };
            if reply.code().is_some_and(ReplyCode::is_protocol_violation) {
                violations += 1;
            }
            if let Some(exit) = send_or_exit(&mut framed, reply, violations, config.violation_threshold, &logger).await {
                break exit;
            }

            let state = shared_session.lock().await.state;
            if shutdown.is_shutdown() && state != SessionState::Transferring {
                let _ = framed.send(Reply::new(ReplyCode::ServiceNotAvailable, "Server is shutting down")).await;
                break Exit::Shutdown;
            }
        };

        match exit {
            Exit::Error(kind) => slog::info!(logger, "Closing control connection after error"; "kind" => ?kind, "violations" => violations),
            exit => slog::info!(logger, "Closing control connection: {:?}", exit; "violations" => violations),
        }
        if let Err(err) = event_chain.handle(Event::InternalMsg(ControlChanMsg::ExitControlLoop)).await {
            slog::warn!(logger, "Error while ending the session: {}", err);
        }
        drop(shutdown);
    });

    Ok(())
}

// Sends the reply and decides whether the connection must be closed afterwards.
async fn send_or_exit(framed: &mut Framed<TcpStream, FtpCodec>, reply: Reply, violations: u32, threshold: u32, logger: &slog::Logger) -> Option<Exit> {
    if let Err(err) = framed.send(reply).await {
        slog::warn!(logger, "Could not send reply to client: {}", err);
        return Some(Exit::ClientGone);
    }
    if violations > threshold {
        slog::warn!(logger, "Too many protocol violations ({})", violations);
        let _ = framed.send(Reply::new(ReplyCode::ServiceNotAvailable, "Too many errors, closing control connection")).await;
        return Some(Exit::TooManyViolations);
    }
    None
}

fn parse_error_reply(logger: &slog::Logger, error: ParseError) -> Reply {
    slog::info!(logger, "Could not parse command: {}", error);
    match error.kind() {
        ParseErrorKind::InvalidCommand => Reply::new(ReplyCode::ParameterSyntaxError, "Invalid Parameter"),
        ParseErrorKind::InvalidUtf8 => Reply::new(ReplyCode::CommandSyntaxError, "Invalid UTF8 in command"),
        ParseErrorKind::InvalidEol => Reply::new(ReplyCode::CommandSyntaxError, "Invalid end-of-line, use CRLF"),
        ParseErrorKind::LineTooLong => Reply::new(ReplyCode::CommandSyntaxError, "Line too long"),
    }
}

// The innermost middleware: runs command handlers and turns internal messages into replies.
struct PrimaryEventHandler {
    logger: slog::Logger,
    session: SharedSession,
    resolver: Arc<Resolver>,
    registry: Arc<BackendRegistry>,
    allocator: Arc<PassivePortAllocator>,
    passive_host: PassiveHost,
    passive_accept_timeout: Duration,
    tx_control_chan: UnboundedSender<ControlChanMsg>,
    local_addr: SocketAddr,
    data_tasks: CancellationToken,
}

impl PrimaryEventHandler {
    #[tracing_attributes::instrument(skip(self))]
    async fn handle_command(&self, cmd: Command) -> Result<Reply, ControlChanError> {
        // RNTO has to follow RNFR directly.
        if !matches!(cmd, Command::Rnfr { .. } | Command::Rnto { .. }) {
            self.session.lock().await.rename_from = None;
        }

        let args = CommandContext {
            session: self.session.clone(),
            resolver: Arc::clone(&self.resolver),
            registry: Arc::clone(&self.registry),
            allocator: Arc::clone(&self.allocator),
            passive_host: self.passive_host,
            passive_accept_timeout: self.passive_accept_timeout,
            tx_control_chan: self.tx_control_chan.clone(),
            local_addr: self.local_addr,
            data_tasks: self.data_tasks.clone(),
            logger: self.logger.clone(),
        };

        let handler: Box<dyn CommandHandler> = match cmd {
            Command::User { username } => Box::new(commands::User::new(username)),
            Command::Pass { password } => Box::new(commands::Pass::new(password)),
            Command::Syst => Box::new(commands::Syst),
            Command::Type { param } => Box::new(commands::Type::new(param)),
            Command::Stru { structure } => Box::new(commands::Stru::new(structure)),
            Command::Mode { mode } => Box::new(commands::Mode::new(mode)),
            Command::Help => Box::new(commands::Help),
            Command::Noop => Box::new(commands::Noop),
            Command::Pasv => Box::new(commands::Pasv),
            Command::Port => Box::new(commands::Port),
            Command::Retr { path } => Box::new(commands::Retr::new(path)),
            Command::Stor { path } => Box::new(commands::Stor::new(path)),
            Command::Appe { path } => Box::new(commands::Appe::new(path)),
            Command::List { options, path } => Box::new(commands::List::new(options, path)),
            Command::Nlst { path } => Box::new(commands::Nlst::new(path)),
            Command::Feat => Box::new(commands::Feat),
            Command::Pwd => Box::new(commands::Pwd),
            Command::Cwd { path } => Box::new(commands::Cwd::new(path)),
            Command::Cdup => Box::new(commands::Cdup),
            Command::Opts { option } => Box::new(commands::Opts::new(option)),
            Command::Dele { path } => Box::new(commands::Dele::new(path)),
            Command::Rmd { path } => Box::new(commands::Rmd::new(path)),
            Command::Quit => Box::new(commands::Quit),
            Command::Mkd { path } => Box::new(commands::Mkd::new(path)),
            Command::Allo => Box::new(commands::Allo),
            Command::Abor => Box::new(commands::Abor),
            Command::Rnfr { file } => Box::new(commands::Rnfr::new(file)),
            Command::Rnto { file } => Box::new(commands::Rnto::new(file)),
            Command::Size { file } => Box::new(commands::Size::new(file)),
            Command::Mdtm { file } => Box::new(commands::Mdtm::new(file)),
            Command::Other { command_name, .. } => Box::new(commands::Other::new(command_name)),
        };

        handler.handle(args).await
    }

    #[tracing_attributes::instrument(skip(self))]
    async fn handle_internal_msg(&mut self, msg: ControlChanMsg) -> Result<Reply, ControlChanError> {
        use ControlChanMsg::*;

        let reply = match msg {
            SentData { .. } => Reply::new(ReplyCode::ClosingDataConnection, "Successfully sent"),
            WrittenData { .. } => Reply::new(ReplyCode::ClosingDataConnection, "File successfully written"),
            DirectorySuccessfullyListed => Reply::new(ReplyCode::ClosingDataConnection, "Listed the directory"),
            StorageError(err) => {
                slog::warn!(self.logger, "Transfer failed: {}", err; "kind" => ?err.kind());
                Reply::from(err)
            }
            ConnectionReset => Reply::new(ReplyCode::ConnectionClosed, "Data connection unexpectedly closed"),
            DataConnectionTimedOut => {
                let mut session = self.session.lock().await;
                let waited_on = session.state == SessionState::Transferring;
                session.close_data_channel();
                return Ok(if waited_on {
                    Reply::new(ReplyCode::CantOpenDataConnection, "No data connection established")
                } else {
                    Reply::none()
                });
            }
            AuthSuccess { username, .. } => {
                self.logger = self.logger.new(slog::o!("username" => username));
                return Ok(Reply::new(ReplyCode::UserLoggedIn, "User logged in, proceed"));
            }
            AuthFailed => return Ok(Reply::new(ReplyCode::NotLoggedIn, "Authentication failed")),
            DelFileSuccess { .. } => return Ok(Reply::new(ReplyCode::FileActionOkay, "File successfully removed")),
            RmDirSuccess { .. } => return Ok(Reply::new(ReplyCode::FileActionOkay, "Folder successfully removed")),
            MkDirSuccess { path } => return Ok(Reply::new_with_string(ReplyCode::DirCreated, format!("\"{}\" created", path.as_str().replace('"', "\"\"")))),
            RenameSuccess { .. } => return Ok(Reply::new(ReplyCode::FileActionOkay, "Renamed")),
            CommandChannelReply(reply) => return Ok(reply),
            ExitControlLoop => return Ok(Reply::none()),
        };
        // Everything that gets here ended the transfer on the data channel.
        self.session.lock().await.close_data_channel();
        Ok(reply)
    }
}

#[async_trait]
impl ControlChanMiddleware for PrimaryEventHandler {
    async fn handle(&mut self, event: Event) -> Result<Reply, ControlChanError> {
        match event {
            Event::Command(cmd) => self.handle_command(cmd).await,
            Event::InternalMsg(msg) => self.handle_internal_msg(msg).await,
        }
    }
}

impl std::fmt::Debug for PrimaryEventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimaryEventHandler").field("local_addr", &self.local_addr).finish()
    }
}
