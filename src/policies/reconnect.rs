//! # Reconnect policy for connection agents.
//!
//! [`ReconnectPolicy`] decides what an agent does once a session fails:
//!
//! ```text
//! Resolving ─► Connecting(0..n) ─► Receiving
//!     │              │                 │ read error / peer closed
//!     ▼              ▼                 ▼
//!   failed        exhausted     Never:     log, re-arm read on same socket
//!     │              │          OnFailure: end session
//!     └──────┬───────┘─────────────────────┘
//!            ▼
//!   Never     → Abandoned (terminal)
//!   OnFailure → backoff sleep → Resolving
//! ```

/// Policy controlling whether a sensor slot reconnects after a failed session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Never reconnect (default).
    ///
    /// Resolution failure or candidate exhaustion abandons the slot for the
    /// lifetime of the process. Read errors after a successful connect are
    /// logged and the read is re-armed on the same connection.
    #[default]
    Never,
    /// Reconnect after any failed session.
    ///
    /// Resolution failure, candidate exhaustion, read errors and peer close
    /// all lead back to `Resolving` after a backoff delay.
    OnFailure,
}

impl ReconnectPolicy {
    /// Returns `true` if a failed session should be retried.
    #[inline]
    pub fn retries(&self) -> bool {
        matches!(self, ReconnectPolicy::OnFailure)
    }
}

impl std::str::FromStr for ReconnectPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "never" => Ok(ReconnectPolicy::Never),
            "on-failure" | "on_failure" | "onfailure" => Ok(ReconnectPolicy::OnFailure),
            other => Err(format!("unknown reconnect policy {other:?} (never | on-failure)")),
        }
    }
}
