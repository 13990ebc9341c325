//! Spreadsheet (CSV) ingestion of weekly report rows.

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregation;
use crate::audit::{self, AuditEvent, INGESTION_ENTITY};
use crate::db::Store;
use crate::error::{Error, Result};
use crate::models::{
    Actor, Anomaly, AuditAction, IngestionLog, IngestionStatus, ReportInput, ReportStatus, Role,
    Severity,
};
use crate::validation::{canonical_branch_code, report_problems, UNKNOWN_BRANCH};

#[derive(Debug, Deserialize)]
struct SheetRow {
    #[serde(alias = "branch", alias = "Branch")]
    branch_code: String,
    #[serde(alias = "week", alias = "Week")]
    week_no: i32,
    #[serde(default)]
    sessions: Option<i32>,
    #[serde(alias = "attendance")]
    attendance_percent: String,
    #[serde(alias = "test_attendance")]
    test_attendance_percent: String,
    #[serde(alias = "test_pass", alias = "pass_percent")]
    test_pass_percent: String,
    #[serde(alias = "covered")]
    syllabus_covered: i32,
    #[serde(alias = "total")]
    syllabus_total: i32,
    #[serde(default)]
    status: Option<String>,
}

pub fn normalize_branch_code(raw: &str) -> String {
    let normalized = canonical_branch_code(raw);
    match normalized.as_str() {
        "" => UNKNOWN_BRANCH.to_string(),
        "ME" | "MECHANICAL" => "MECH".to_string(),
        "CE" => "CIVIL".to_string(),
        _ => normalized,
    }
}

/// Parses `85`, `85.5` or `85 %`; anything else is `None`.
pub fn normalize_percent(raw: &str) -> Option<f64> {
    raw.trim().trim_end_matches('%').trim().parse().ok()
}

fn parse_status(raw: Option<&str>) -> std::result::Result<Option<ReportStatus>, String> {
    match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(None),
        Some("draft") => Ok(Some(ReportStatus::Draft)),
        Some("finalized") | Some("final") => Ok(Some(ReportStatus::Finalized)),
        Some(other) => Err(format!("unknown status: {other}")),
    }
}

fn row_to_input(row: SheetRow) -> std::result::Result<ReportInput, String> {
    let percent = |label: &str, raw: &str| {
        normalize_percent(raw).ok_or_else(|| format!("unreadable {label} %: {raw:?}"))
    };

    Ok(ReportInput {
        branch_code: normalize_branch_code(&row.branch_code),
        week_no: row.week_no,
        sessions: row.sessions.unwrap_or(0),
        attendance_percent: percent("attendance", &row.attendance_percent)?,
        test_attendance_percent: percent("test attendance", &row.test_attendance_percent)?,
        test_pass_percent: percent("test pass", &row.test_pass_percent)?,
        syllabus_covered: row.syllabus_covered,
        syllabus_total: row.syllabus_total,
        status: parse_status(row.status.as_deref())?,
    })
}

/// Reads every data row; unreadable rows come back as their error message.
pub fn parse_sheet<R: Read>(reader: R) -> Vec<std::result::Result<ReportInput, String>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    reader
        .deserialize::<SheetRow>()
        .map(|result| result.map_err(|err| err.to_string()).and_then(row_to_input))
        .collect()
}

fn anomaly(row_index: usize, issue: String, severity: Severity) -> Anomaly {
    Anomaly {
        row_index,
        issue,
        severity,
    }
}

/// Validates and saves each row, logs the batch, and refreshes summaries when
/// anything landed.
pub async fn ingest<R: Read>(
    store: &dyn Store,
    filename: &str,
    reader: R,
    actor: &Actor,
) -> Result<IngestionLog> {
    if !matches!(actor.role, Role::Admin | Role::Faculty) {
        return Err(Error::Forbidden("only admin or faculty may upload sheets".to_string()));
    }

    let rows = parse_sheet(reader);
    let mut anomalies = Vec::new();
    let mut success = 0;

    for (index, row) in rows.iter().enumerate() {
        let row_index = index + 1;
        let input = match row {
            Ok(input) => input,
            Err(issue) => {
                anomalies.push(anomaly(row_index, issue.clone(), Severity::Critical));
                continue;
            }
        };

        let problems = report_problems(input);
        if !problems.is_empty() {
            anomalies.push(anomaly(row_index, problems.join(", "), Severity::Critical));
            continue;
        }

        match crate::reports::save_report(store, input, actor).await {
            Ok(_) => success += 1,
            Err(err) => anomalies.push(anomaly(row_index, err.to_string(), Severity::Warning)),
        }
    }

    let failed = anomalies.len();
    let status = match (success, failed) {
        (_, 0) => IngestionStatus::Completed,
        (0, _) => IngestionStatus::Failed,
        _ => IngestionStatus::PartialSuccess,
    };
    let log = IngestionLog {
        id: Uuid::new_v4(),
        filename: filename.to_string(),
        processed_rows: rows.len() as i32,
        success_count: success as i32,
        error_count: failed as i32,
        status,
        anomalies,
        created_at: Utc::now(),
    };
    store.insert_ingestion_log(&log).await?;

    if failed > 0 {
        warn!("{filename}: {failed} of {} rows rejected", rows.len());
    }
    info!("{filename}: saved {success} of {} rows", rows.len());

    if success > 0 {
        aggregation::refresh(store, None).await?;
    }

    audit::record(
        store,
        actor,
        AuditEvent::new(AuditAction::IngestFile, INGESTION_ENTITY, log.id.to_string()).details(
            json!({
                "filename": filename,
                "success": success,
                "failed": failed,
            }),
        ),
    )
    .await;

    Ok(log)
}

pub async fn ingest_path(store: &dyn Store, path: &Path, actor: &Actor) -> anyhow::Result<IngestionLog> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(ingest(store, &filename, file, actor).await?)
}
