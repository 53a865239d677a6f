use serde::Serialize;
use tracing::{Level, debug};

/// Logs `value` as pretty JSON at DEBUG; serialization is skipped when DEBUG is off.
pub(crate) fn debug_json<T>(label: &str, value: &T)
where
    T: Serialize,
{
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }

    match serde_json::to_string_pretty(value) {
        Ok(pretty) => debug!(label, body = %pretty, "json payload"),
        Err(error) => debug!(label, %error, "pretty serialize failed"),
    }
}
