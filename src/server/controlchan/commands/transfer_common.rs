use super::common::{authorize, storage_failure};
use crate::{
    auth::Permissions,
    server::{
        chancomms::DataChanCmd,
        controlchan::{Reply, ReplyCode, error::ControlChanError, handler::CommandContext},
        session::SessionState,
    },
};
use ftpgate_core::path::VirtualPath;

// Hands a RETR, STOR, APPE, LIST or NLST to the task that owns the passive data connection. The
// data channel task sends the 150 and the final reply.
pub(super) async fn start_transfer<F>(args: CommandContext, input: &str, required: Permissions, make_cmd: F) -> Result<Reply, ControlChanError>
where
    F: FnOnce(VirtualPath) -> DataChanCmd,
{
    let mut session = args.session.lock().await;
    let path = match authorize(&session, input, required) {
        Ok(path) => path,
        Err(reply) => return Ok(reply),
    };
    if let Err(err) = session.storage(&args.registry).await {
        return Ok(storage_failure(&args.logger, "Backend resolution", err));
    }
    let tx = match session.data_cmd_tx.take() {
        Some(tx) => tx,
        None => return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No data connection established, use PASV first")),
    };
    let cmd = make_cmd(path);
    slog::debug!(args.logger, "Handing {:?} to the data channel", cmd);
    if let Err(err) = tx.try_send(cmd) {
        slog::warn!(args.logger, "Data channel went away: {}", err);
        session.close_data_channel();
        return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "Data connection closed, use PASV again"));
    }
    session.state = SessionState::Transferring;
    Ok(Reply::none())
}
