//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::Sender;

use crate::backend_bridge::commands::BackendCommand;

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) {
    let cmd_name = cmd.name();

    // Effect batches (including stream releases) are never dropped; only a dead
    // worker can refuse them.
    match cmd_tx.send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued ui->backend command"),
        Err(_) => {
            tracing::error!(command = cmd_name, "backend command processor disconnected");
            *status =
                "Backend command processor disconnected (possible startup/runtime failure); restart the app"
                    .to_string();
        }
    }
}
