//! Raw record admission control
//!
//! The transport layer forwards whatever the device radio produced; this
//! module keeps only records whose payload can possibly hold one packed
//! 20-byte frame. Dropping is silent but counted, so callers can audit drop
//! rates without log scraping.

use crate::types::{RawRecord, PAYLOAD_LEN};
use serde::{Deserialize, Serialize};

/// Outcome of admission control over one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Validated {
    /// Records with exactly 20 payload elements, input order preserved
    pub accepted: Vec<RawRecord>,
    /// Records dropped for a wrong payload shape
    pub dropped: usize,
}

/// Filter a batch down to records with a well-shaped payload.
///
/// Never fails: malformed records are dropped, not reported as errors.
pub fn validate(records: Vec<RawRecord>) -> Validated {
    let total = records.len();
    let accepted: Vec<RawRecord> = records
        .into_iter()
        .filter(|r| r.payload.field_count() == PAYLOAD_LEN)
        .collect();
    let dropped = total - accepted.len();
    Validated { accepted, dropped }
}
