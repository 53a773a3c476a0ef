//! Epoch-time helpers. All timestamps in the relay workspace are integer
//! seconds since the Unix epoch, mirroring the original source's use of
//! `time.time()`.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as whole seconds since the Unix epoch.
///
/// Falls back to 0 if the clock reports a time before the epoch, which
/// should not happen on any real deployment target.
pub fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_plausible() {
        let ts = now_epoch_secs();
        assert!(ts > 1_700_000_000);
    }
}
