use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::CoreError;

/// Current wall-clock time in unix milliseconds.
pub fn now_millis() -> Result<i64, CoreError> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| CoreError::Clock)?;
    Ok(elapsed.as_millis() as i64)
}
