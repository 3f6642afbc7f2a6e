//! Upgrades of older on-disk activity documents.
//!
//! Early records kept evidence in a per-stage `photos` list of paths (and
//! briefly a `mediaItems` list of `{path, type, timestamp}`). Both are folded
//! into the unified `media` list before the typed decode. The legacy fields
//! are dropped afterwards, so running the upgrade again on its own output
//! changes nothing.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use campcook_core::MediaKind;

/// Upgrade every stage record in an activity document in place.
/// Returns the number of media items created from legacy fields.
pub fn upgrade_activity(doc: &mut Value) -> usize {
    for field in ["startedAt", "endedAt"] {
        if let Some(value) = doc.get_mut(field) {
            *value = normalize_time(value.take());
        }
    }
    let mut converted = 0;
    if let Some(stages) = doc.get_mut("stages").and_then(Value::as_object_mut) {
        for stage in stages.values_mut() {
            if let Some(stage) = stage.as_object_mut() {
                converted += upgrade_stage(stage);
            }
        }
    }
    if let Some(superseded) = doc.get_mut("superseded").and_then(Value::as_array_mut) {
        for stage in superseded {
            if let Some(stage) = stage.as_object_mut() {
                converted += upgrade_stage(stage);
            }
        }
    }
    converted
}

fn upgrade_stage(stage: &mut Map<String, Value>) -> usize {
    for field in ["startedAt", "endedAt"] {
        if let Some(value) = stage.get_mut(field) {
            *value = normalize_time(value.take());
        }
    }
    let photos = take_array(stage, "photos");
    let legacy_items = take_array(stage, "mediaItems");

    let has_media = stage
        .get("media")
        .and_then(Value::as_array)
        .is_some_and(|m| !m.is_empty());
    if has_media {
        return 0;
    }

    let fallback_time = stage.get("startedAt").cloned().map(normalize_time);
    let mut media: Vec<Value> = legacy_items
        .into_iter()
        .filter_map(|item| legacy_item(item, fallback_time.as_ref()))
        .collect();
    if media.is_empty() {
        media = photos
            .into_iter()
            .filter_map(|p| {
                let reference = p.as_str()?.to_string();
                Some(json!({
                    "reference": reference,
                    "kind": MediaKind::Photo.as_str(),
                    "capturedAt": fallback_time.clone()?,
                }))
            })
            .collect();
    }

    let converted = media.len();
    if converted > 0 {
        stage.insert("media".to_string(), Value::Array(media));
    }
    converted
}

fn take_array(stage: &mut Map<String, Value>, field: &str) -> Vec<Value> {
    match stage.remove(field) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

fn legacy_item(item: Value, fallback_time: Option<&Value>) -> Option<Value> {
    let reference = item.get("path")?.as_str()?.to_string();
    let kind = item
        .get("type")
        .and_then(Value::as_str)
        .and_then(MediaKind::parse)
        .unwrap_or(MediaKind::Photo);
    let captured_at = match item.get("timestamp") {
        Some(ts) => normalize_time(ts.clone()),
        None => fallback_time?.clone(),
    };
    Some(json!({
        "reference": reference,
        "kind": kind.as_str(),
        "capturedAt": captured_at,
    }))
}

/// Epoch-millisecond numbers become RFC 3339 strings; anything else passes
/// through for the typed decode to judge.
fn normalize_time(value: Value) -> Value {
    match value.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis) {
        Some(at) => Value::String(at.to_rfc3339()),
        None => value,
    }
}
