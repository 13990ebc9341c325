//! Persistence for reports, summaries, the audit trail and the directory.
//!
//! `PgStore` is the production backend; `MemoryStore` keeps the same rules
//! (one report per branch and week, one summary per branch) in process.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{
    AggregateSummary, Announcement, AttendanceRecord, AuditEntry, Branch, IngestionLog,
    MitigationFilter, MitigationTask, ReportFilter, User, Week, WeeklyReport,
};

mod memory;
mod postgres;
mod seed;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use seed::seed;

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_report(&self, branch_code: &str, week_no: i32) -> Result<Option<WeeklyReport>>;
    /// Fails with `Error::Conflict` when the branch already has a report for the week.
    async fn insert_report(&self, report: &WeeklyReport) -> Result<()>;
    async fn update_report(&self, report: &WeeklyReport) -> Result<()>;
    /// Newest week first.
    async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<WeeklyReport>>;

    async fn get_summary(&self, branch_code: &str) -> Result<Option<AggregateSummary>>;
    async fn list_summaries(&self) -> Result<Vec<AggregateSummary>>;
    async fn upsert_summary(&self, summary: &AggregateSummary) -> Result<()>;

    async fn append_audit(&self, entry: &AuditEntry) -> Result<()>;
    /// Newest first.
    async fn audit_history(
        &self,
        entity_type: &str,
        entity_id: &str,
        limit: usize,
    ) -> Result<Vec<AuditEntry>>;

    async fn list_users(&self) -> Result<Vec<User>>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn upsert_user(&self, user: &User) -> Result<()>;

    async fn list_branches(&self) -> Result<Vec<Branch>>;
    async fn upsert_branch(&self, branch: &Branch) -> Result<()>;
    async fn list_weeks(&self) -> Result<Vec<Week>>;
    async fn upsert_week(&self, week: &Week) -> Result<()>;

    async fn list_active_announcements(&self) -> Result<Vec<Announcement>>;
    async fn insert_announcement(&self, announcement: &Announcement) -> Result<()>;

    async fn list_mitigations(&self, filter: &MitigationFilter) -> Result<Vec<MitigationTask>>;
    async fn get_mitigation(&self, id: Uuid) -> Result<Option<MitigationTask>>;
    async fn insert_mitigation(&self, task: &MitigationTask) -> Result<()>;
    async fn update_mitigation(&self, task: &MitigationTask) -> Result<()>;

    async fn upsert_attendance_record(&self, record: &AttendanceRecord) -> Result<()>;
    async fn list_attendance_records(&self, week_no: Option<i32>) -> Result<Vec<AttendanceRecord>>;

    async fn insert_ingestion_log(&self, log: &IngestionLog) -> Result<()>;
}

/// Text form of a serde enum, for TEXT columns.
pub(crate) fn enum_text<T: Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(text)) => Ok(text),
        Ok(other) => Err(Error::Internal(format!("expected a text enum, got {other}"))),
        Err(err) => Err(Error::Internal(err.to_string())),
    }
}

pub(crate) fn parse_enum<T: DeserializeOwned>(column: &str, text: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(text.to_string()))
        .map_err(|_| Error::Internal(format!("unexpected {column} value in store: {text}")))
}
