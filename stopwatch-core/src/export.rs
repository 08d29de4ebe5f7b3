//! CSV and JSON renderings of the lap list, oldest lap first.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::format_hms_ms;
use crate::laps::LapRecorder;

const CSV_HEADER: &str = "Lap Number,Total Time,Lap Time (delta ms)";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to encode laps as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv;charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

/// A rendered export, ready to hand to whatever delivers files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub contents: String,
}

impl ExportFile {
    /// Renders `laps` in `format`. Nothing is produced for an empty list.
    pub fn render(
        format: ExportFormat,
        laps: &LapRecorder,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, ExportError> {
        if laps.is_empty() {
            return Ok(None);
        }
        let contents = match format {
            ExportFormat::Csv => to_csv(laps),
            ExportFormat::Json => to_json(laps, now)?,
        };
        let stamp = iso_timestamp(now).replace([':', '.'], "-");
        Ok(Some(Self {
            file_name: format!("laps_{}.{}", stamp, format.extension()),
            mime_type: format.mime_type(),
            contents,
        }))
    }
}

pub fn to_csv(laps: &LapRecorder) -> String {
    let mut lines = Vec::with_capacity(laps.len() + 1);
    lines.push(CSV_HEADER.to_string());
    for lap in laps.chronological() {
        lines.push(format!(
            "{},{},{}",
            lap.number,
            format_hms_ms(lap.total_ms as i64),
            lap.delta_ms
        ));
    }
    lines.join("\n")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonExport {
    generated_at: String,
    laps: Vec<JsonLap>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonLap {
    number: u32,
    total: String,
    delta_ms: i64,
}

pub fn to_json(laps: &LapRecorder, generated_at: DateTime<Utc>) -> Result<String, ExportError> {
    let doc = JsonExport {
        generated_at: iso_timestamp(generated_at),
        laps: laps
            .chronological()
            .map(|lap| JsonLap {
                number: lap.number,
                total: format_hms_ms(lap.total_ms as i64),
                delta_ms: lap.delta_ms,
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
