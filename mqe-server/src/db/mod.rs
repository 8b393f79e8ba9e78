//! Database access for mqe-server
//!
//! Every function takes a `&mut SqliteConnection` so the engine can run a
//! whole command (phase check, upsert, projection) inside one transaction.
//! Schema creation lives in `mqe_common::db`.

pub mod meetings;
pub mod participants;
pub mod submissions;
pub mod tasks;
pub mod transitions;
pub mod users;

use mqe_common::{Error, Phase, Result};
use uuid::Uuid;

/// Parse a TEXT uuid column
pub(crate) fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Failed to parse uuid '{}': {}", value, e)))
}

/// Parse a TEXT phase column
pub(crate) fn parse_phase(value: &str) -> Result<Phase> {
    value
        .parse::<Phase>()
        .map_err(|e| Error::Internal(format!("Corrupt phase column: {}", e)))
}
