//! Controller bring-up
//!
//! Connecting is followed by flushing the controller's buffers, which can
//! fail for a while right after power-up, and then by an initialization
//! sequence that puts the drive into a known state.

use crate::config::StartupSettings;
use common::{ErrorKind, Result, SessionBridge};
use protocol::Command;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// One command of the initialization sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitStep {
    pub command: Command,
    /// Pause after sending, giving the controller time to apply it
    #[serde(default)]
    pub delay_ms: u64,
}

/// Stepper drive bring-up list: identification, absolute mode, I/O polarity,
/// run current, encoder settings and motion profile, ending with enabling
/// the motor power. Each entry is (command, delay after sending in ms).
const DEFAULT_INIT_SEQUENCE: &[(&str, u64)] = &[
    ("ID", 100),
    ("DN", 100),
    ("ABS", 100),
    ("DOBOOT=0", 100),
    ("EDIO=0", 100),
    ("POL=4", 100),
    ("POL=6", 100),
    ("POL=1", 100),
    ("SCV=0", 100),
    ("IERR=1", 100),
    ("MST", 100),
    ("RR", 2500),
    ("DRVRC=1500", 100),
    ("RW", 2000),
    ("SL=1", 1000),
    ("SLR=25", 2500),
    ("CLR", 100),
    ("LSPD=10", 100),
    ("HSPD=250", 100),
    ("ACC=70", 100),
    ("DEC=70", 100),
    ("EO=1", 100),
];

pub fn default_init_sequence() -> Vec<InitStep> {
    DEFAULT_INIT_SEQUENCE
        .iter()
        .filter_map(|&(command, delay_ms)| {
            Command::new(command)
                .ok()
                .map(|command| InitStep { command, delay_ms })
        })
        .collect()
}

/// Connect, then flush until the controller accepts it
///
/// Returns the enumerated device count. If every flush attempt fails the
/// last flush error is returned and the session is left connected.
pub async fn connect_and_flush(bridge: &SessionBridge, settings: &StartupSettings) -> Result<u32> {
    let count = bridge.connect().await?;
    let interval = Duration::from_millis(settings.flush_retry_interval_ms);

    let mut attempt = 1;
    loop {
        match bridge.flush().await {
            Ok(()) => {
                info!("Comms flushed after {} attempt(s)", attempt);
                return Ok(count);
            }
            Err(e) if e.kind() == ErrorKind::Flush && attempt < settings.flush_attempts => {
                warn!(
                    "Flush attempt {}/{} failed: {}",
                    attempt, settings.flush_attempts, e
                );
                attempt += 1;
                tokio::time::sleep(interval).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Result of one initialization step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub command: Command,
    /// Reply text, or the error message
    pub result: std::result::Result<String, String>,
}

/// Outcome of a whole initialization sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub steps: Vec<StepOutcome>,
}

impl InitReport {
    pub fn succeeded(&self) -> usize {
        self.steps.iter().filter(|s| s.result.is_ok()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.result.is_err())
    }

    pub fn is_success(&self) -> bool {
        self.steps.iter().all(|s| s.result.is_ok())
    }
}

/// Send every step in order, pausing after each
///
/// A command the controller fails to answer is recorded and the sequence
/// moves on. Losing the session (not connected, worker gone) aborts it.
pub async fn run_init_sequence(bridge: &SessionBridge, steps: &[InitStep]) -> Result<InitReport> {
    let mut report = InitReport::default();

    for step in steps {
        let result = match bridge.send(step.command.clone()).await {
            Ok(reply) => Ok(reply.text().into_owned()),
            Err(e) if e.kind() == ErrorKind::SendRecv => {
                warn!("Init step {} failed: {}", step.command, e);
                Err(e.to_string())
            }
            Err(e) => return Err(e),
        };
        report.steps.push(StepOutcome {
            command: step.command.clone(),
            result,
        });

        if step.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(step.delay_ms)).await;
        }
    }

    info!(
        "Init sequence finished: {}/{} steps succeeded",
        report.succeeded(),
        report.steps.len()
    );
    Ok(report)
}
