//! Wire formats for the ingest and browse endpoints
//!
//! Both endpoints exchange JSON text frames. Validation here never fails with
//! an [`Error`](crate::Error): an invalid ingest payload yields `None` and is
//! dropped, an invalid control message yields a [`ControlError`] that the
//! browse session turns into an `Errors` reply.

pub mod browse;
pub mod ingest;

pub use browse::{parse_control, ControlError, ControlMessage, ServerMessage};
pub use ingest::parse_position;

use serde_json::Value;

/// Read a JSON value as a finite number
///
/// Accepts JSON numbers and numeric strings (`"55.75"`), the same inputs a
/// lenient float conversion accepts. NaN and infinities are rejected.
pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    number.is_finite().then_some(number)
}
