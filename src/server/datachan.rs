//! Contains code pertaining to the FTP *data* channel

use super::{
    chancomms::{ControlChanMsg, DataChanCmd},
    controlchan::{Reply, ReplyCode},
    session::SharedSession,
};
use crate::storage::{self, ErrorKind, StorageBackend};
use ftpgate_core::path::VirtualPath;
use std::sync::Arc;
use tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    sync::mpsc::{Receiver, UnboundedSender},
};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct DataCommandExecutor {
    socket: TcpStream,
    control_msg_tx: UnboundedSender<ControlChanMsg>,
    storage: Arc<dyn StorageBackend>,
    logger: slog::Logger,
}

impl DataCommandExecutor {
    #[tracing_attributes::instrument]
    async fn execute(self, cmd: DataChanCmd) {
        match cmd {
            DataChanCmd::Retr { path } => self.exec_retr(path).await,
            DataChanCmd::Stor { path } => self.exec_stor(path, false).await,
            DataChanCmd::Appe { path } => self.exec_stor(path, true).await,
            DataChanCmd::List { path } => self.exec_list(path, false).await,
            DataChanCmd::Nlst { path } => self.exec_list(path, true).await,
        }
    }

    #[tracing_attributes::instrument]
    async fn exec_retr(mut self, path: VirtualPath) {
        let mut input = match self.storage.get(&path, 0).await {
            Ok(input) => input,
            Err(err) => return self.report(ControlChanMsg::StorageError(err)),
        };
        self.opening("Sending data");
        match tokio::io::copy(&mut input, &mut self.socket).await {
            Ok(bytes) => {
                if let Err(err) = self.socket.shutdown().await {
                    slog::warn!(self.logger, "Could not shutdown output stream after RETR: {}", err);
                }
                self.report(ControlChanMsg::SentData { path, bytes });
            }
            Err(err) => {
                slog::warn!(self.logger, "Error copying streams during RETR: {}", err; "path" => %path);
                self.report(ControlChanMsg::ConnectionReset);
            }
        }
    }

    #[tracing_attributes::instrument]
    async fn exec_stor(self, path: VirtualPath, append: bool) {
        self.opening("Ready to receive data");
        let DataCommandExecutor {
            socket,
            control_msg_tx,
            storage,
            logger,
        } = self;
        let msg = match storage.put(Box::new(socket), &path, append).await {
            Ok(bytes) => ControlChanMsg::WrittenData { path, bytes },
            Err(err) => ControlChanMsg::StorageError(err),
        };
        if let Err(err) = control_msg_tx.send(msg) {
            slog::error!(logger, "Could not notify control channel of STOR result: {}", err);
        }
    }

    #[tracing_attributes::instrument]
    async fn exec_list(mut self, path: VirtualPath, names_only: bool) {
        let listing = if names_only { self.storage.nlst(&path).await } else { self.storage.list_fmt(&path).await };
        let mut input = match listing {
            Ok(input) => input,
            Err(err) => return self.report(ControlChanMsg::StorageError(err)),
        };
        self.opening("Sending directory list");
        match tokio::io::copy(&mut input, &mut self.socket).await {
            Ok(_) => {
                if let Err(err) = self.socket.shutdown().await {
                    slog::warn!(self.logger, "Could not shutdown output stream during LIST: {}", err);
                }
                self.report(ControlChanMsg::DirectorySuccessfullyListed);
            }
            Err(err) => {
                slog::warn!(self.logger, "Failed to send directory list: {}", err; "path" => %path);
                self.report(ControlChanMsg::ConnectionReset);
            }
        }
    }

    // The 150 preliminary reply. Sent once storage is known to have something for us.
    fn opening(&self, msg: &str) {
        self.report(ControlChanMsg::CommandChannelReply(Reply::new(ReplyCode::FileStatusOkay, msg)));
    }

    fn report(&self, msg: ControlChanMsg) {
        if let Err(err) = self.control_msg_tx.send(msg) {
            slog::error!(self.logger, "Could not notify control channel: {}", err);
        }
    }
}

/// Serves an accepted passive data connection: waits for the one transfer command the control
/// channel hands over and executes it. An abort signal, the control channel dropping its end of
/// either channel, or the end of the session stops it at any point and closes the socket.
#[tracing_attributes::instrument(skip(socket, cmd_rx, abort_rx, session_ended, session, control_msg_tx))]
pub(crate) async fn serve(
    socket: TcpStream,
    mut cmd_rx: Receiver<DataChanCmd>,
    mut abort_rx: Receiver<()>,
    session_ended: CancellationToken,
    session: SharedSession,
    control_msg_tx: UnboundedSender<ControlChanMsg>,
    logger: slog::Logger,
) {
    let cmd = tokio::select! {
        cmd = cmd_rx.recv() => match cmd {
            Some(cmd) => cmd,
            None => {
                slog::debug!(logger, "Data channel closed before a transfer command arrived");
                return;
            }
        },
        _ = abort_rx.recv() => {
            slog::info!(logger, "Data channel abort received");
            return;
        }
        _ = session_ended.cancelled() => return,
    };

    slog::info!(logger, "Data command received: {:?}", cmd);
    let storage = session.lock().await.storage.clone();
    drop(session);
    let storage = match storage {
        Some(storage) => storage,
        None => {
            let err = storage::Error::from(ErrorKind::BackendUnavailable);
            if let Err(err) = control_msg_tx.send(ControlChanMsg::StorageError(err)) {
                slog::error!(logger, "Could not notify control channel: {}", err);
            }
            return;
        }
    };
    let executor = DataCommandExecutor {
        socket,
        control_msg_tx,
        storage,
        logger: logger.clone(),
    };

    tokio::select! {
        _ = executor.execute(cmd) => {},
        _ = abort_rx.recv() => {
            slog::info!(logger, "Transfer aborted");
        }
        _ = session_ended.cancelled() => {
            slog::info!(logger, "Session ended, transfer cancelled");
        }
    }
}
