//! Zone configuration persistence.
//!
//! The persisted form is a UTF-8 JSON array of objects with the fields
//! `name`, `left`, `top`, `width` and `height`. Loading is all-or-nothing:
//! the first malformed record fails the whole load.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::{Zone, ZoneSet};
use crate::error::{VlozyError, ZoneConfigError};

const FIELDS: [&str; 5] = ["name", "left", "top", "width", "height"];

/// Serialize a zone set to its persisted JSON form.
pub fn save_zones(zones: &ZoneSet) -> Result<Vec<u8>, VlozyError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    zones.as_slice().serialize(&mut ser)?;
    Ok(buf)
}

/// Parse and validate a persisted zone configuration.
pub fn load_zones(bytes: &[u8]) -> Result<ZoneSet, ZoneConfigError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ZoneConfigError::Syntax(e.to_string()))?;

    let records = value.as_array().ok_or(ZoneConfigError::NotAnArray)?;

    let mut zones = Vec::with_capacity(records.len());
    let mut seen = HashSet::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let zone = parse_record(index, record)?;
        if !seen.insert(zone.name().to_string()) {
            return Err(ZoneConfigError::DuplicateName {
                index,
                name: zone.name().to_string(),
            });
        }
        zones.push(zone);
    }

    debug!("Loaded {} zones", zones.len());

    // Uniqueness was checked above, so this cannot fail.
    ZoneSet::new(zones).map_err(|e| ZoneConfigError::Syntax(e.to_string()))
}

/// Write a zone set to a file.
pub fn save_zones_file(zones: &ZoneSet, path: &Path) -> Result<(), VlozyError> {
    let bytes = save_zones(zones)?;
    std::fs::write(path, bytes)?;
    debug!("Saved {} zones to {}", zones.len(), path.display());
    Ok(())
}

/// Read a zone set from a file.
pub fn load_zones_file(path: &Path) -> Result<ZoneSet, VlozyError> {
    let bytes = std::fs::read(path)?;
    Ok(load_zones(&bytes)?)
}

fn parse_record(index: usize, record: &Value) -> Result<Zone, ZoneConfigError> {
    let object = record.as_object().ok_or_else(|| ZoneConfigError::Record {
        index,
        name: None,
        reason: "expected an object".to_string(),
    })?;

    let name = object.get("name").and_then(Value::as_str).map(str::to_string);
    let fail = |reason: String| ZoneConfigError::Record {
        index,
        name: name.clone(),
        reason,
    };

    if let Some(missing) = FIELDS.iter().find(|f| !object.contains_key(**f)) {
        return Err(fail(format!("missing field '{missing}'")));
    }

    let name = match object.get("name") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => return Err(fail("'name' must not be empty".to_string())),
        _ => return Err(fail("'name' must be a string".to_string())),
    };

    let left = integer(object, "left").map_err(&fail)?;
    let top = integer(object, "top").map_err(&fail)?;
    let width = integer(object, "width").map_err(&fail)?;
    let height = integer(object, "height").map_err(&fail)?;

    if left < 0 || top < 0 {
        return Err(fail("'left' and 'top' must be non-negative".to_string()));
    }
    if width <= 0 || height <= 0 {
        return Err(fail(format!(
            "'width' and 'height' must be positive, got {width}x{height}"
        )));
    }

    let to_u32 = |field: &str, v: i64| {
        u32::try_from(v).map_err(|_| fail(format!("'{field}' is out of range")))
    };

    Zone::new(
        name,
        to_u32("left", left)?,
        to_u32("top", top)?,
        to_u32("width", width)?,
        to_u32("height", height)?,
    )
    .map_err(|e| fail(e.to_string()))
}

fn integer(object: &Map<String, Value>, field: &str) -> Result<i64, String> {
    object
        .get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| format!("'{field}' must be an integer"))
}
