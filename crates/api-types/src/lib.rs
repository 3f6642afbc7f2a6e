//! Wire types for the remote collector.
//!
//! The collector speaks camelCase JSON with epoch-millisecond timestamps and
//! keys stages by their upper-case names. These types are the only place that
//! shape is spelled out; conversions from the core records live here too.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use campcook_core::hash::json_sha256;
use campcook_core::{ActivityRecord, MediaItem, StageRecord, SummaryData, TeamDivision, TeamInfo};

pub const SUBMIT_PATH: &str = "/api/submit";
pub const STATUS_PATH: &str = "/api/status";

/// Header carrying [`SubmitRequest::content_hash`] so the collector can
/// deduplicate repeated submits of the same content.
pub const CONTENT_HASH_HEADER: &str = "X-Content-Sha256";

/// `/api/student/{team}/media/upload`, with the team id URL-encoded.
pub fn media_upload_path(team_id: &str) -> String {
    format!(
        "/api/student/{}/media/upload",
        urlencoding::encode(team_id)
    )
}

fn millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

// ─── Submit ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInfoPayload {
    pub school: String,
    pub grade: String,
    pub class_name: String,
    pub stove_number: String,
    pub member_count: u32,
    pub member_names: String,
}

impl From<&TeamInfo> for TeamInfoPayload {
    fn from(team: &TeamInfo) -> Self {
        Self {
            school: team.school.clone(),
            grade: team.grade.clone(),
            class_name: team.class_name.clone(),
            stove_number: team.stove_number.clone(),
            member_count: team.member_count,
            member_names: team.member_names_joined(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItemPayload {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: i64,
}

impl From<&MediaItem> for MediaItemPayload {
    fn from(item: &MediaItem) -> Self {
        Self {
            path: item.reference().to_string(),
            kind: item.kind().as_str().to_string(),
            timestamp: millis(item.timestamp()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagePayload {
    pub stage: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    /// Legacy photo list. Always empty: evidence travels in `media_items`.
    pub photos: Vec<String>,
    pub media_items: Vec<MediaItemPayload>,
    pub self_rating: u8,
    pub selected_tags: Vec<String>,
    pub notes: String,
    pub problem_notes: String,
    pub is_completed: bool,
}

impl From<&StageRecord> for StagePayload {
    fn from(record: &StageRecord) -> Self {
        Self {
            stage: record.stage().as_str().to_string(),
            start_time: millis(record.started_at()),
            end_time: record.ended_at().map(millis),
            photos: Vec::new(),
            media_items: record.media().iter().map(MediaItemPayload::from).collect(),
            self_rating: record.rating(),
            selected_tags: record.tags().iter().cloned().collect(),
            notes: record.notes().to_string(),
            problem_notes: record.problem_notes().to_string(),
            is_completed: record.is_completed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRecordPayload {
    pub start_time: i64,
    pub end_time: Option<i64>,
    /// Always present, possibly empty.
    pub stages: BTreeMap<String, StagePayload>,
    pub current_stage: String,
    pub overall_notes: String,
}

impl From<&ActivityRecord> for ProcessRecordPayload {
    fn from(record: &ActivityRecord) -> Self {
        Self {
            start_time: millis(record.started_at()),
            end_time: record.ended_at().map(millis),
            stages: record
                .stages()
                .map(|s| (s.stage().as_str().to_string(), StagePayload::from(s)))
                .collect(),
            current_stage: record.current_stage().as_str().to_string(),
            overall_notes: record.overall_notes().to_string(),
        }
    }
}

/// Body of `POST /api/submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub team_info: TeamInfoPayload,
    pub process_record: Option<ProcessRecordPayload>,
    pub summary_data: Option<SummaryData>,
    pub team_division: Option<BTreeMap<String, String>>,
    pub export_time: i64,
}

impl SubmitRequest {
    pub fn build(
        team: &TeamInfo,
        activity: Option<&ActivityRecord>,
        summary: Option<SummaryData>,
        division: Option<&TeamDivision>,
        exported_at: DateTime<Utc>,
    ) -> Self {
        Self {
            team_info: TeamInfoPayload::from(team),
            process_record: activity.map(ProcessRecordPayload::from),
            summary_data: summary.and_then(SummaryData::non_empty),
            team_division: division.and_then(TeamDivision::assigned),
            export_time: millis(exported_at),
        }
    }

    pub fn media_count(&self) -> usize {
        self.process_record
            .as_ref()
            .map(|p| p.stages.values().map(|s| s.media_items.len()).sum())
            .unwrap_or(0)
    }

    /// SHA-256 over the document with `exportTime` left out, so two exports
    /// of unchanged data hash the same.
    pub fn content_hash(&self) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("exportTime");
        }
        json_sha256(&value)
    }
}

/// Response of `POST /api/submit`. Every field is optional: the collector
/// is only required to answer 2xx.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitResponse {
    pub status: Option<String>,
    pub student_id: Option<String>,
    pub message: Option<String>,
}

// ─── Media upload ────────────────────────────────────────────────────────────

/// Non-file fields of the multipart media upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUploadFields {
    pub original_path: String,
    pub kind: &'static str,
    pub timestamp: i64,
}

impl From<&MediaItem> for MediaUploadFields {
    fn from(item: &MediaItem) -> Self {
        Self {
            original_path: item.reference().to_string(),
            kind: item.kind().as_str(),
            timestamp: millis(item.timestamp()),
        }
    }
}

impl MediaUploadFields {
    /// `(name, value)` pairs in the order the collector documents them.
    pub fn pairs(&self) -> [(&'static str, String); 3] {
        [
            ("original_path", self.original_path.clone()),
            ("type", self.kind.to_string()),
            ("timestamp", self.timestamp.to_string()),
        ]
    }
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatusResponse {
    pub status: Option<String>,
    pub students: Option<u64>,
    pub timestamp: Option<String>,
    pub server_ip: Option<String>,
    pub port: Option<u16>,
}

impl StatusResponse {
    pub fn is_running(&self) -> bool {
        self.status.as_deref() == Some("running")
    }
}
