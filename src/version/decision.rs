//! Update decision: does a remote version supersede the pinned one?

use std::cmp::Ordering;

use crate::version::encoding::EncodedVersion;
use crate::version::types::RemoteVersionEntry;

/// Returns true when the latest remote version supersedes the current one.
///
/// The primary version decides on its own. The secondary version only
/// participates when both sides carry one; a secondary missing on either
/// side never triggers an update by itself.
pub fn needs_update(latest: &EncodedVersion, current: &EncodedVersion) -> bool {
    match latest.primary.cmp(&current.primary) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => match (&latest.secondary, &current.secondary) {
            (Some(latest), Some(current)) => latest > current,
            _ => false,
        },
    }
}

/// Pick the newest entry: stable ascending sort, last one wins.
///
/// Ties on (primary, secondary) keep last-seen order; equal versions are
/// never actionable so the choice among them does not matter.
pub fn select_latest(entries: &[RemoteVersionEntry]) -> Option<&RemoteVersionEntry> {
    let mut sorted: Vec<&RemoteVersionEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.version.cmp(&b.version));
    sorted.last().copied()
}
