pub(crate) mod error;
mod listen;

use super::{controlchan, portalloc::PassivePortAllocator};
use crate::{
    auth::Resolver,
    notification::{DataListener, PresenceListener, nop::NopListener},
    options::{PassiveHost, PortRange, ServerConfig},
    storage::BackendRegistry,
};
pub use error::ServerError;
use ftpgate_core::controlplane::ControlPlane;
use slog::Drain;
use std::{fmt, future::Future, net::SocketAddr, ops::RangeInclusive, sync::Arc, time::Duration};

/// Used to create [`Server`]s.
///
/// Everything the server needs to know about users, their permissions and their storage is read
/// through the given [`ControlPlane`] while it runs. Everything else is set here, once.
///
/// # Example
///
/// ```no_run
/// use ftpgate::{ServerBuilder, controlplane::InMemoryControlPlane};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), ftpgate::ServerError> {
/// let server = ServerBuilder::new(Arc::new(InMemoryControlPlane::new()))
///     .greeting("Welcome to my FTP server")
///     .passive_ports(50000..=50100)
///     .passive_host([203, 0, 113, 7])
///     .build()?;
/// server.listen(async { let _ = tokio::signal::ctrl_c().await; }).await
/// # }
/// ```
pub struct ServerBuilder {
    control_plane: Arc<dyn ControlPlane>,
    config: ServerConfig,
    data_listener: Arc<dyn DataListener>,
    presence_listener: Arc<dyn PresenceListener>,
    logger: slog::Logger,
}

impl ServerBuilder {
    /// Starts out from the defaults in [`options`](crate::options).
    pub fn new(control_plane: Arc<dyn ControlPlane>) -> Self {
        ServerBuilder {
            control_plane,
            config: ServerConfig::default(),
            data_listener: Arc::new(NopListener),
            presence_listener: Arc::new(NopListener),
            logger: slog::Logger::root(slog_stdlog::StdLog {}.fuse(), slog::o!()),
        }
    }

    /// Replaces every option with the ones in `config`, for instance as read with
    /// [`ServerConfig::from_file`].
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address the control channel listens on.
    pub fn bind_address(mut self, bind_address: SocketAddr) -> Self {
        self.config.bind_address = bind_address;
        self
    }

    /// Set the greeting that will be sent to the client after connecting.
    pub fn greeting(mut self, greeting: impl Into<String>) -> Self {
        self.config.greeting = greeting.into();
        self
    }

    /// Sets the range of ports to listen on for passive data connections.
    pub fn passive_ports(mut self, range: RangeInclusive<u16>) -> Self {
        self.config.passive_ports = PortRange::from(range);
        self
    }

    /// Sets the IP address sent back to clients in the `PASV` reply. Use this when the server runs
    /// behind NAT or a load balancer.
    pub fn passive_host<H: Into<PassiveHost>>(mut self, host: H) -> Self {
        self.config.public_ip = match host.into() {
            PassiveHost::Ip(ip) => Some(ip),
            PassiveHost::FromConnection => None,
        };
        self
    }

    /// Sets the number of seconds a session may go without a command before it is closed.
    pub fn idle_session_timeout(mut self, secs: u64) -> Self {
        self.config.idle_session_timeout_secs = secs;
        self
    }

    /// Sets how long a client gets to connect to the port it was given with `PASV`.
    pub fn passive_accept_timeout(mut self, secs: u64) -> Self {
        self.config.passive_accept_timeout_secs = secs;
        self
    }

    /// Sets after how many seconds a passive port nobody connected to goes back to the pool. Must
    /// not be shorter than the accept timeout.
    pub fn passive_lease_timeout(mut self, secs: u64) -> Self {
        self.config.passive_lease_timeout_secs = secs;
        self
    }

    /// Sets how many protocol violations a session may commit before it is disconnected.
    pub fn violation_threshold(mut self, threshold: u32) -> Self {
        self.config.violation_threshold = threshold;
        self
    }

    /// Sets how long every failed login is held back.
    pub fn failed_login_delay(mut self, delay: Duration) -> Self {
        self.config.failed_login_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets how long sessions get to finish after shutdown was requested.
    pub fn shutdown_grace_period(mut self, secs: u64) -> Self {
        self.config.shutdown_grace_period_secs = secs;
        self
    }

    /// Registers a listener for file and directory changes made through the server.
    pub fn notify_data(mut self, listener: impl DataListener + 'static) -> Self {
        self.data_listener = Arc::new(listener);
        self
    }

    /// Registers a listener for logins and logouts.
    pub fn notify_presence(mut self, listener: impl PresenceListener + 'static) -> Self {
        self.presence_listener = Arc::new(listener);
        self
    }

    /// Sets the structured logger to use.
    pub fn logger<L: Into<Option<slog::Logger>>>(mut self, logger: L) -> Self {
        self.logger = logger.into().unwrap_or_else(|| slog::Logger::root(slog::Discard {}, slog::o!()));
        self
    }

    /// Validates the options and creates the [`Server`].
    pub fn build(self) -> Result<Server, ServerError> {
        let config = &self.config;
        if config.passive_ports.low > config.passive_ports.high {
            return Err(ServerError::config(format!(
                "passive port range {}-{} is empty",
                config.passive_ports.low, config.passive_ports.high
            )));
        }
        if config.passive_lease_timeout_secs < config.passive_accept_timeout_secs {
            return Err(ServerError::config("passive lease timeout is shorter than the passive accept timeout"));
        }
        if config.violation_threshold == 0 {
            return Err(ServerError::config("violation threshold must be at least 1"));
        }

        let range: RangeInclusive<u16> = config.passive_ports.into();
        let allocator = Arc::new(PassivePortAllocator::new(
            range,
            Duration::from_secs(config.passive_lease_timeout_secs),
            self.logger.new(slog::o!("component" => "portalloc")),
        ));
        let resolver = Arc::new(Resolver::new(
            Arc::clone(&self.control_plane),
            Duration::from_millis(config.failed_login_delay_ms),
            self.logger.new(slog::o!("component" => "resolver")),
        ));
        let registry = Arc::new(BackendRegistry::new(
            Arc::clone(&self.control_plane),
            self.logger.new(slog::o!("component" => "registry")),
        ));

        Ok(Server {
            bind_address: config.bind_address,
            shutdown_grace_period: Duration::from_secs(config.shutdown_grace_period_secs),
            loop_config: controlchan::Config {
                registry,
                resolver,
                allocator,
                greeting: config.greeting.clone(),
                passive_host: config.public_ip.into(),
                idle_session_timeout: Duration::from_secs(config.idle_session_timeout_secs),
                passive_accept_timeout: Duration::from_secs(config.passive_accept_timeout_secs),
                violation_threshold: config.violation_threshold,
                data_listener: self.data_listener,
                presence_listener: self.presence_listener,
                logger: self.logger.clone(),
            },
            logger: self.logger,
        })
    }
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("control_plane", &self.control_plane)
            .field("config", &self.config)
            .finish()
    }
}

/// An instance of an FTP server. Create one with a [`ServerBuilder`] and start it with
/// [`Server::listen`].
pub struct Server {
    bind_address: SocketAddr,
    shutdown_grace_period: Duration,
    loop_config: controlchan::Config,
    logger: slog::Logger,
}

impl Server {
    /// Binds the control port and serves clients until `shutdown` resolves.
    ///
    /// On shutdown no new connections are accepted. Idle sessions are told so with a `421` and
    /// closed right away, sessions with a transfer in flight close when it ends. Sessions still
    /// open after the grace period are dropped. Only failing to bind the control port is an error.
    pub async fn listen<S>(self, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()>,
    {
        listen::Listener {
            bind_address: self.bind_address,
            logger: self.logger,
            loop_config: self.loop_config,
            shutdown_grace_period: self.shutdown_grace_period,
        }
        .listen(shutdown)
        .await
    }

    /// The address [`listen`](Server::listen) will bind.
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("bind_address", &self.bind_address)
            .field("shutdown_grace_period", &self.shutdown_grace_period)
            .field("loop_config", &self.loop_config)
            .finish()
    }
}
