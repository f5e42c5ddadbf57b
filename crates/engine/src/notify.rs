//! Case-management notifier
//!
//! After a process changes status the upstream case-management system is
//! told about it through a fire-and-forget call. The contract is strict:
//! failures are logged and never retried, and a failed notification
//! never fails the operation that triggered it — the registry is the
//! source of truth, the case system only mirrors it.
//!
//! The transport is injected so the URL encoding and outcome handling
//! stay testable without a live endpoint.

use cadastre_core::{Process, ProcessStatus};
use tracing::{info, warn};

/// Result of one notification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The case system acknowledged the status change
    Ack,
    /// The case system does not know the process (logged, not an error)
    NotFound,
    /// Any other HTTP failure
    HttpError(u16),
}

/// Transport that actually delivers a notification URL
pub trait NotifyTransport {
    /// Deliver one notification; infrastructure failures map to
    /// `NotifyOutcome::HttpError`
    fn send(&self, url: &str) -> NotifyOutcome;
}

/// Build the notification path for a process status change
///
/// Plan-numbered processes encode as `{number}/{year}/{type}/{status}`.
/// Block-named process types have no plan number; they encode the block
/// zero-padded to 8 digits followed by the 2-digit sub-block, with year
/// fixed to 0.
pub fn notify_path(process: &Process, status: ProcessStatus) -> String {
    let ty = process.process_type;
    if ty.is_block_named() {
        format!(
            "{:08}{:02}/0/{}/{}",
            process.block.block,
            process.block.sub_block,
            ty.as_code(),
            status.as_code()
        )
    } else {
        format!(
            "{}/{}/{}/{}",
            process.name.first(),
            process.name.second(),
            ty.as_code(),
            status.as_code()
        )
    }
}

/// The notifier: base URL plus an injected transport
#[derive(Debug)]
pub struct Notifier<T: NotifyTransport> {
    base_url: String,
    transport: T,
}

impl<T: NotifyTransport> Notifier<T> {
    /// Create a notifier for a case-management base URL
    pub fn new(base_url: impl Into<String>, transport: T) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
        }
    }

    /// Notify the case system of a status change
    ///
    /// Never fails: every outcome is returned to the caller and logged,
    /// nothing is retried.
    pub fn notify(&self, process: &Process, status: ProcessStatus) -> NotifyOutcome {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            notify_path(process, status)
        );
        let outcome = self.transport.send(&url);
        match outcome {
            NotifyOutcome::Ack => info!(%url, "case system notified"),
            NotifyOutcome::NotFound => {
                warn!(%url, "case system does not know this process")
            }
            NotifyOutcome::HttpError(code) => {
                warn!(%url, code, "case system notification failed")
            }
        }
        outcome
    }
}

/// Transport that records every URL and answers with a fixed outcome
///
/// The stand-in used by tests and by deployments without a live case
/// system.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    outcome: Option<NotifyOutcome>,
    sent: std::sync::Mutex<Vec<String>>,
}

impl RecordingTransport {
    /// Record and acknowledge everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Record everything and answer with `outcome`
    pub fn answering(outcome: NotifyOutcome) -> Self {
        Self {
            outcome: Some(outcome),
            sent: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// URLs sent so far, in order
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl NotifyTransport for RecordingTransport {
    fn send(&self, url: &str) -> NotifyOutcome {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
        self.outcome.unwrap_or(NotifyOutcome::Ack)
    }
}
