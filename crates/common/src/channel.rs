//! Async channel bridge between Tokio runtime and the session thread
//!
//! The device session is single-session and blocking, so it lives on one
//! dedicated thread. Any number of async callers reach it through a
//! cloneable [`SessionBridge`]; commands are handled one at a time in the
//! order they arrive.

use crate::error::{Error, Result};
use crate::session::SessionState;
use async_channel::{Receiver, Sender, bounded};
use protocol::{Command, Reply};
use tokio::sync::oneshot;

/// Commands from Tokio runtime to the session thread
#[derive(Debug)]
pub enum SessionCommand {
    /// Enumerate and open the first controller
    Connect {
        /// Channel to send the device count back
        response: oneshot::Sender<Result<u32>>,
    },

    /// Exchange one command/reply pair
    Send {
        /// Validated command
        command: Command,
        /// Channel to send the reply back
        response: oneshot::Sender<Result<Reply>>,
    },

    /// Flush the controller's buffers
    Flush {
        response: oneshot::Sender<Result<()>>,
    },

    /// Close the controller
    Disconnect {
        response: oneshot::Sender<Result<()>>,
    },

    /// Query the session state
    State {
        response: oneshot::Sender<SessionState>,
    },

    /// Shutdown the session thread gracefully
    Shutdown,
}

/// Handle for Tokio runtime (async)
#[derive(Clone)]
pub struct SessionBridge {
    cmd_tx: Sender<SessionCommand>,
}

impl SessionBridge {
    /// Send a command to the session thread
    pub async fn send_command(&self, cmd: SessionCommand) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|e| Error::Channel(e.to_string()))
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.send_command(make(tx)).await?;
        rx.await
            .map_err(|_| Error::Channel("session thread dropped the request".to_string()))
    }

    pub async fn connect(&self) -> Result<u32> {
        self.request(|response| SessionCommand::Connect { response })
            .await?
    }

    pub async fn send(&self, command: Command) -> Result<Reply> {
        self.request(|response| SessionCommand::Send { command, response })
            .await?
    }

    /// Validate `command` and send it
    pub async fn send_str(&self, command: &str) -> Result<Reply> {
        let command = Command::new(command)?;
        self.send(command).await
    }

    pub async fn flush(&self) -> Result<()> {
        self.request(|response| SessionCommand::Flush { response })
            .await?
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.request(|response| SessionCommand::Disconnect { response })
            .await?
    }

    pub async fn state(&self) -> Result<SessionState> {
        self.request(|response| SessionCommand::State { response })
            .await
    }

    /// Ask the session thread to stop
    pub async fn shutdown(&self) -> Result<()> {
        self.send_command(SessionCommand::Shutdown).await
    }
}

/// Handle for the session thread (blocking)
pub struct SessionWorker {
    cmd_rx: Receiver<SessionCommand>,
}

impl SessionWorker {
    /// Receive a command from Tokio runtime (blocking)
    pub fn recv_command(&self) -> Result<SessionCommand> {
        self.cmd_rx
            .recv_blocking()
            .map_err(|e| Error::Channel(e.to_string()))
    }
}

/// Create the channel bridge between Tokio and the session thread
///
/// Returns (SessionBridge for Tokio, SessionWorker for the session thread)
pub fn create_session_bridge() -> (SessionBridge, SessionWorker) {
    let (cmd_tx, cmd_rx) = bounded(64);

    (SessionBridge { cmd_tx }, SessionWorker { cmd_rx })
}
