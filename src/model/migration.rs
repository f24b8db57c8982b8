//! Versioned deserialization of band metadata documents.
//!
//! Older documents are upgraded on a [`serde_json::Value`] before they are
//! turned into a [`Band`], and the result always passes through
//! [`Band::validate`]. Upgrades handled:
//!
//! - v1 single `albums` array with a boolean `missing` flag per album
//! - string years (`"1972"`) and `name` instead of `album_name`
//! - absent `schema_version`

use serde_json::{Map, Value};

use super::band::{Band, CURRENT_SCHEMA_VERSION};
use crate::error::ValidationError;

/// Turn a raw JSON document of any known version into a validated [`Band`].
pub fn band_from_value(mut value: Value) -> Result<Band, ValidationError> {
    let Some(doc) = value.as_object_mut() else {
        return Err(ValidationError::Malformed {
            field: "band".to_string(),
            message: "expected a JSON object".to_string(),
        });
    };

    let version = doc
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(1);

    if version < 2 {
        upgrade_v1(doc)?;
    }
    doc.insert("schema_version".into(), Value::from(CURRENT_SCHEMA_VERSION));

    let band: Band = serde_json::from_value(value).map_err(|e| ValidationError::Malformed {
        field: "band".to_string(),
        message: e.to_string(),
    })?;
    band.validate()?;
    Ok(band)
}

/// True if the document predates the current schema.
pub fn needs_upgrade(value: &Value) -> bool {
    value
        .get("schema_version")
        .and_then(Value::as_u64)
        .is_none_or(|v| v < u64::from(CURRENT_SCHEMA_VERSION))
}

fn upgrade_v1(doc: &mut Map<String, Value>) -> Result<(), ValidationError> {
    let albums = take_array(doc, "albums")?;
    let mut missing = take_array(doc, "albums_missing")?;
    let mut local = Vec::with_capacity(albums.len());

    for (i, mut album) in albums.into_iter().enumerate() {
        let field = format!("albums[{i}]");
        let Some(obj) = album.as_object_mut() else {
            return Err(ValidationError::Malformed {
                field,
                message: "expected an album object".to_string(),
            });
        };
        normalize_album(obj, &field)?;
        let is_missing = obj
            .remove("missing")
            .and_then(|m| m.as_bool())
            .unwrap_or(false);
        if is_missing {
            missing.push(album);
        } else {
            local.push(album);
        }
    }

    for (i, album) in missing.iter_mut().enumerate() {
        if let Some(obj) = album.as_object_mut() {
            normalize_album(obj, &format!("albums_missing[{i}]"))?;
            obj.remove("missing");
        }
    }

    doc.insert("albums".into(), Value::Array(local));
    doc.insert("albums_missing".into(), Value::Array(missing));
    Ok(())
}

fn take_array(doc: &mut Map<String, Value>, key: &str) -> Result<Vec<Value>, ValidationError> {
    match doc.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ValidationError::Malformed {
            field: key.to_string(),
            message: "expected an array".to_string(),
        }),
    }
}

fn normalize_album(obj: &mut Map<String, Value>, field: &str) -> Result<(), ValidationError> {
    if !obj.contains_key("album_name")
        && let Some(name) = obj.remove("name")
    {
        obj.insert("album_name".into(), name);
    }

    if let Some(Value::String(year)) = obj.get("year").cloned() {
        let trimmed = year.trim();
        if trimmed.is_empty() {
            obj.remove("year");
        } else {
            let parsed: u16 = trimmed.parse().map_err(|_| ValidationError::Malformed {
                field: format!("{field}.year"),
                message: format!("'{trimmed}' is not a year"),
            })?;
            obj.insert("year".into(), Value::from(parsed));
        }
    }

    if let Some(Value::String(count)) = obj.get("track_count").cloned() {
        match count.trim().parse::<u32>() {
            Ok(n) => {
                obj.insert("track_count".into(), Value::from(n));
            }
            Err(_) => {
                obj.remove("track_count");
            }
        }
    }
    Ok(())
}
