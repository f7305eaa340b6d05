//! Ingest payload validation

use serde_json::Value;

use super::coerce_number;
use crate::positions::Position;

/// Parse one ingest frame into a position
///
/// Returns `None` for anything that is not a JSON object carrying a
/// non-empty string `busId`, numeric `lat` and `lng`, and a string `route`.
/// Unknown extra fields are ignored.
pub fn parse_position(payload: &[u8]) -> Option<Position> {
    let value: Value = serde_json::from_slice(payload).ok()?;
    let object = value.as_object()?;

    let bus_id = object.get("busId")?.as_str()?;
    if bus_id.is_empty() {
        return None;
    }

    let lat = coerce_number(object.get("lat")?)?;
    let lng = coerce_number(object.get("lng")?)?;
    let route = object.get("route")?.as_str()?;

    Some(Position::new(bus_id, lat, lng, route))
}
