//! Startup checks that run before the listener is bound.

use super::ServerError;
use tracing::{info, warn};

/// Effective uid of this process, read from `/proc/self/status`.
///
/// `None` where procfs is not mounted.
pub fn effective_uid() -> Option<u32> {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .as_deref()
        .and_then(parse_status_euid)
}

/// The `Uid:` line lists real, effective, saved and filesystem uids.
fn parse_status_euid(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Uid:"))
        .and_then(|ids| ids.split_whitespace().nth(1))
        .and_then(|euid| euid.parse().ok())
}

/// Refuse to run as root when `require_non_root` is set.
pub fn check_privileges(require_non_root: bool, uid: Option<u32>) -> Result<(), ServerError> {
    match (require_non_root, uid) {
        (false, Some(0)) => {
            warn!("Running as root; set REQUIRE_NON_ROOT=1 to forbid this");
            Ok(())
        }
        (false, _) => Ok(()),
        (true, Some(0)) => Err(ServerError::RunningAsRoot),
        (true, Some(uid)) => {
            info!(uid, "Running as non-root user");
            Ok(())
        }
        (true, None) => {
            warn!("Cannot determine the effective uid; skipping non-root check");
            Ok(())
        }
    }
}
