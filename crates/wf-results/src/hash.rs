//! Content fingerprints and run ids.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::ResultsResult;

/// SHA-256 of the JSON encoding of `value`, as lowercase hex.
///
/// Pass a tuple to fingerprint several inputs together, e.g.
/// `&(&network, &controls)`.
pub fn compute_fingerprint<T: Serialize + ?Sized>(value: &T) -> ResultsResult<String> {
    let json = serde_json::to_vec(value)?;
    Ok(format!("{:x}", Sha256::digest(&json)))
}

/// Short id for one run of a fingerprinted input started at `started`.
pub fn compute_run_id(fingerprint: &str, started: &DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fingerprint.as_bytes());
    hasher.update(started.to_rfc3339().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}
