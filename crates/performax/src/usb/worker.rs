//! Session worker thread
//!
//! Dedicated thread that owns the [`DeviceSession`] and executes commands
//! received from the Tokio runtime one at a time. This is what serializes
//! concurrent callers onto the single-session controller.

use common::{DeviceSession, PerformaxDriver, SessionCommand, SessionWorker};
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Session worker thread
pub struct SessionWorkerThread<D: PerformaxDriver> {
    /// Session owned by this thread
    session: DeviceSession<D>,
    /// Communication channel with Tokio runtime
    worker: SessionWorker,
}

impl<D: PerformaxDriver> SessionWorkerThread<D> {
    pub fn new(worker: SessionWorker, session: DeviceSession<D>) -> Self {
        Self { session, worker }
    }

    /// Run until a Shutdown command arrives or every bridge is dropped
    ///
    /// A session still connected at that point is disconnected.
    pub fn run(mut self) {
        info!("Session worker thread started");

        loop {
            match self.worker.recv_command() {
                Ok(SessionCommand::Shutdown) => {
                    info!("Session worker shutting down");
                    break;
                }
                Ok(cmd) => self.handle_command(cmd),
                Err(e) => {
                    debug!("Session bridge closed: {}", e);
                    break;
                }
            }
        }

        if self.session.is_connected() {
            if let Err(e) = self.session.disconnect() {
                warn!("Error disconnecting on shutdown: {}", e);
            }
        }

        info!("Session worker thread stopped");
    }

    /// Handle a command from the Tokio runtime
    fn handle_command(&mut self, cmd: SessionCommand) {
        // Keeps the thread alive after a panicking command. Release builds
        // use panic = "abort", so this only applies to unwinding builds.
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.handle_command_inner(cmd)
        }));

        if let Err(e) = result {
            error!("Panic in session command handler: {:?}", e);
        }
    }

    fn handle_command_inner(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Connect { response } => {
                let _ = response.send(self.session.connect());
            }

            SessionCommand::Send { command, response } => {
                let result = self.session.send(&command).cloned();
                let _ = response.send(result);
            }

            SessionCommand::Flush { response } => {
                let _ = response.send(self.session.flush());
            }

            SessionCommand::Disconnect { response } => {
                let _ = response.send(self.session.disconnect());
            }

            SessionCommand::State { response } => {
                let _ = response.send(self.session.state());
            }

            // Handled in run loop
            SessionCommand::Shutdown => {}
        }
    }
}

/// Spawn the session worker thread
pub fn spawn_session_worker<D>(
    worker: SessionWorker,
    session: DeviceSession<D>,
) -> std::io::Result<JoinHandle<()>>
where
    D: PerformaxDriver + Send + 'static,
    D::Handle: Send,
{
    std::thread::Builder::new()
        .name("performax-session".to_string())
        .spawn(move || SessionWorkerThread::new(worker, session).run())
}
