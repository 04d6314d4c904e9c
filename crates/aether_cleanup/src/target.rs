use std::time::Duration;

use crate::error::{CleanupError, Result};

/// Action timeout shared by every cleanup orchestrator (spec §4.5, §5).
pub const ACTION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Trim a single target and reject it if empty (spec §4.4 "trim; reject
/// empty").
pub fn clean_target(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CleanupError::Validation(
            "target must not be empty after trimming".into(),
        ));
    }
    Ok(trimmed.to_string())
}
