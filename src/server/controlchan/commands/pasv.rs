//! The RFC 959 Passive (`PASV`) command
//
// This command requests the server-DTP to "listen" on a data
// port (which is not its default data port) and to wait for a
// connection rather than initiate one upon receipt of a
// transfer command.  The response to this command includes the
// host and port address this server is listening on.

use crate::{
    options::PassiveHost,
    server::{
        chancomms::{ControlChanMsg, DataChanCmd},
        controlchan::{
            Reply, ReplyCode,
            error::ControlChanError,
            handler::{CommandContext, CommandHandler},
        },
        datachan,
        portalloc::PortLease,
        session::{SessionState, TraceId},
    },
};
use async_trait::async_trait;
use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};
use tokio::{
    net::{TcpListener, TcpSocket},
    sync::mpsc::{self, error::TryRecvError},
};

const BIND_RETRIES: u8 = 10;

#[derive(Debug)]
pub struct Pasv;

impl Pasv {
    // The address the client is told to connect to.
    fn advertised_ip(passive_host: &PassiveHost, local_addr: SocketAddr) -> Option<Ipv4Addr> {
        match (passive_host, local_addr.ip()) {
            (PassiveHost::Ip(ip), _) => Some(*ip),
            (PassiveHost::FromConnection, IpAddr::V4(ip)) => Some(ip),
            (PassiveHost::FromConnection, IpAddr::V6(ip)) => ip.to_ipv4_mapped(),
        }
    }

    // Leases ports until one can be bound. Ports that fail to bind are held until we are done so
    // that the allocator does not hand them straight back.
    fn bind_leased_port(args: &CommandContext, bind_ip: Ipv4Addr, trace_id: TraceId) -> Option<(TcpListener, PortLease)> {
        let mut unusable = Vec::new();
        for _ in 0..BIND_RETRIES {
            let lease = match args.allocator.lease(trace_id) {
                Ok(lease) => lease,
                Err(err) => {
                    slog::warn!(args.logger, "PASV: {}", err; "range" => ?args.allocator.range());
                    return None;
                }
            };
            match Self::listen(SocketAddr::new(bind_ip.into(), lease.port())) {
                Ok(listener) => return Some((listener, lease)),
                Err(err) => {
                    slog::debug!(args.logger, "PASV: could not bind port {}: {}", lease.port(), err);
                    unusable.push(lease);
                }
            }
        }
        slog::warn!(args.logger, "PASV: giving up after {} bind attempts", BIND_RETRIES);
        None
    }

    fn listen(addr: SocketAddr) -> io::Result<TcpListener> {
        let socket = TcpSocket::new_v4()?;
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        socket.listen(1)
    }
}

#[async_trait]
impl CommandHandler for Pasv {
    #[tracing_attributes::instrument]
    async fn handle(&self, args: CommandContext) -> Result<Reply, ControlChanError> {
        let Some(advertised) = Self::advertised_ip(&args.passive_host, args.local_addr) else {
            slog::warn!(args.logger, "PASV: control connection is IPv6 and no passive host is configured");
            return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No data connection established"));
        };
        let bind_ip = match args.local_addr.ip() {
            IpAddr::V4(ip) => ip,
            IpAddr::V6(ip) => ip.to_ipv4_mapped().unwrap_or(Ipv4Addr::UNSPECIFIED),
        };

        let mut session = args.session.lock().await;
        // A second PASV replaces the first. Dropping the old channels makes its task let go of
        // its port.
        session.close_data_channel();
        let Some((listener, lease)) = Self::bind_leased_port(&args, bind_ip, session.trace_id) else {
            return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No data connection established"));
        };
        let port = lease.port();

        let (cmd_tx, cmd_rx) = mpsc::channel::<DataChanCmd>(1);
        let (abort_tx, mut abort_rx) = mpsc::channel::<()>(1);
        session.data_cmd_tx = Some(cmd_tx);
        session.data_abort_tx = Some(abort_tx);
        session.state = SessionState::AwaitingDataConnection;
        drop(session);

        let session = args.session.clone();
        let tx = args.tx_control_chan.clone();
        let logger = args.logger.new(slog::o!("data-port" => port));
        let accept_timeout = args.passive_accept_timeout;
        let session_ended = args.data_tasks.clone();

        // We cannot await the client here since it first needs to know where to connect.
        tokio::spawn(async move {
            tokio::select! {
                accepted = tokio::time::timeout(accept_timeout, listener.accept()) => match accepted {
                    Ok(Ok((socket, peer))) => {
                        drop(listener);
                        if !lease.pin() {
                            slog::warn!(logger, "Passive port lease expired before {} connected", peer);
                        }
                        slog::debug!(logger, "Data connection accepted"; "peer" => %peer);
                        datachan::serve(socket, cmd_rx, abort_rx, session_ended, session, tx, logger).await;
                    }
                    Ok(Err(err)) => {
                        slog::warn!(logger, "Could not accept data connection: {}", err);
                        if let Err(err) = tx.send(ControlChanMsg::DataConnectionTimedOut) {
                            slog::warn!(logger, "{}", err);
                        }
                    }
                    Err(_) => {
                        // Only report if this PASV is still the current one.
                        if let Err(TryRecvError::Empty) = abort_rx.try_recv() {
                            slog::info!(logger, "No data connection within {:?}", accept_timeout);
                            if let Err(err) = tx.send(ControlChanMsg::DataConnectionTimedOut) {
                                slog::warn!(logger, "{}", err);
                            }
                        }
                    }
                },
                _ = abort_rx.recv() => {
                    slog::debug!(logger, "Passive listener abandoned");
                }
                _ = session_ended.cancelled() => {
                    slog::debug!(logger, "Session ended before the data connection was made");
                }
            }
            drop(lease);
        });

        let octets = advertised.octets();
        let p1 = port >> 8;
        let p2 = port - (p1 * 256);
        Ok(Reply::new_with_string(
            ReplyCode::EnteringPassiveMode,
            format!("Entering Passive Mode ({},{},{},{},{},{})", octets[0], octets[1], octets[2], octets[3], p1, p2),
        ))
    }
}
