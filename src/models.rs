use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Draft,
    Finalized,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Finalized => "finalized",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Faculty,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Faculty => "faculty",
            Role::Viewer => "viewer",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "faculty" => Ok(Role::Faculty),
            "viewer" => Ok(Role::Viewer),
            other => Err(Error::Validation(format!("unknown role: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Healthy,
    #[serde(rename = "Needs Attention")]
    NeedsAttention,
    Critical,
}

/// Letter grade derived from an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
    D,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComputedScores {
    pub attendance_score: f64,
    pub test_score: f64,
    pub overall_score: f64,
    pub risk_level: RiskLevel,
}

/// One week of CRT training for one branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub id: Uuid,
    pub branch_code: String,
    pub week_no: i32,
    pub sessions: i32,
    pub attendance_percent: f64,
    pub test_attendance_percent: f64,
    pub test_pass_percent: f64,
    pub syllabus_covered: i32,
    pub syllabus_total: i32,
    pub computed: ComputedScores,
    pub status: ReportStatus,
    pub locked_at: Option<DateTime<Utc>>,
    pub finalized_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw report fields as submitted by staff or read from a sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportInput {
    pub branch_code: String,
    pub week_no: i32,
    #[serde(default)]
    pub sessions: i32,
    pub attendance_percent: f64,
    pub test_attendance_percent: f64,
    pub test_pass_percent: f64,
    pub syllabus_covered: i32,
    pub syllabus_total: i32,
    #[serde(default)]
    pub status: Option<ReportStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    pub branch_code: Option<String>,
    pub week_no: Option<i32>,
    pub status: Option<ReportStatus>,
    /// Restricts results to these branches when set.
    #[serde(skip)]
    pub branches: Option<Vec<String>>,
}

impl ReportFilter {
    pub fn matches(&self, report: &WeeklyReport) -> bool {
        self.branch_code
            .as_deref()
            .map_or(true, |code| code == report.branch_code)
            && self.week_no.map_or(true, |week| week == report.week_no)
            && self.status.map_or(true, |status| status == report.status)
            && self
                .branches
                .as_ref()
                .map_or(true, |allowed| allowed.contains(&report.branch_code))
    }
}

/// Summary fields staff may override by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditableField {
    AvgAttendance,
    AvgTestPass,
    SyllabusCompletionPercent,
}

impl EditableField {
    pub const ALL: [EditableField; 3] = [
        EditableField::AvgAttendance,
        EditableField::AvgTestPass,
        EditableField::SyllabusCompletionPercent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EditableField::AvgAttendance => "avg_attendance",
            EditableField::AvgTestPass => "avg_test_pass",
            EditableField::SyllabusCompletionPercent => "syllabus_completion_percent",
        }
    }
}

impl FromStr for EditableField {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        EditableField::ALL
            .into_iter()
            .find(|field| field.as_str() == value)
            .ok_or_else(|| Error::Validation(format!("field not allowed for editing: {value}")))
    }
}

pub type FieldValues = BTreeMap<EditableField, f64>;

/// Per-branch rollup of finalized weekly reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub branch_code: String,
    pub total_weeks: i32,
    pub avg_attendance: f64,
    pub avg_test_attendance: f64,
    pub avg_test_pass: f64,
    pub avg_overall_score: f64,
    pub syllabus_completion_percent: f64,
    pub performance_grade: Grade,
    pub risk_level: RiskLevel,
    /// Last values computed by the refresh job.
    pub ai_values: FieldValues,
    /// Hand-edited values; these win over `ai_values`.
    pub overrides: FieldValues,
    pub updated_at: DateTime<Utc>,
}

impl AggregateSummary {
    pub fn effective(&self, field: EditableField) -> f64 {
        match field {
            EditableField::AvgAttendance => self.avg_attendance,
            EditableField::AvgTestPass => self.avg_test_pass,
            EditableField::SyllabusCompletionPercent => self.syllabus_completion_percent,
        }
    }

    pub fn set_effective(&mut self, field: EditableField, value: f64) {
        match field {
            EditableField::AvgAttendance => self.avg_attendance = value,
            EditableField::AvgTestPass => self.avg_test_pass = value,
            EditableField::SyllabusCompletionPercent => self.syllabus_completion_percent = value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateReport,
    UpdateReport,
    ReopenReport,
    BulkUploadReports,
    ManualEdit,
    RevertEdit,
    RefreshSummaries,
    IngestFile,
    SaveAttendance,
    CreateMitigation,
    UpdateMitigationStatus,
    CreateAnnouncement,
    UpdateUserPermissions,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateReport => "CREATE_REPORT",
            AuditAction::UpdateReport => "UPDATE_REPORT",
            AuditAction::ReopenReport => "REOPEN_REPORT",
            AuditAction::BulkUploadReports => "BULK_UPLOAD_REPORTS",
            AuditAction::ManualEdit => "MANUAL_EDIT",
            AuditAction::RevertEdit => "REVERT_EDIT",
            AuditAction::RefreshSummaries => "REFRESH_SUMMARIES",
            AuditAction::IngestFile => "INGEST_FILE",
            AuditAction::SaveAttendance => "SAVE_ATTENDANCE",
            AuditAction::CreateMitigation => "CREATE_MITIGATION",
            AuditAction::UpdateMitigationStatus => "UPDATE_MITIGATION_STATUS",
            AuditAction::CreateAnnouncement => "CREATE_ANNOUNCEMENT",
            AuditAction::UpdateUserPermissions => "UPDATE_USER_PERMISSIONS",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub user_id: String,
    pub user_name: Option<String>,
    pub role: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// The caller of an operation, as vouched for by the auth gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: Option<String>,
    pub role: Role,
    /// Branches a faculty member is limited to; empty means unrestricted.
    pub branches: Vec<String>,
}

impl Actor {
    pub fn system() -> Self {
        Actor {
            id: "system".to_string(),
            name: Some("System".to_string()),
            role: Role::Admin,
            branches: Vec::new(),
        }
    }

    pub fn can_access_branch(&self, branch_code: &str) -> bool {
        self.role != Role::Faculty
            || self.branches.is_empty()
            || self.branches.iter().any(|code| code == branch_code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub branches: Vec<String>,
    pub active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub branch_code: String,
    pub branch_name: String,
    pub department: String,
    pub current_strength: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Week {
    pub week_no: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnouncementKind {
    General,
    Exam,
    Placement,
    Holiday,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnouncementPriority {
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub target_audience: Vec<String>,
    pub kind: AnnouncementKind,
    pub priority: AnnouncementPriority,
    pub created_by: String,
    pub expiry_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MitigationKind {
    Academic,
    Participation,
    Testing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MitigationStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MitigationPriority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MitigationTask {
    pub id: Uuid,
    pub branch_code: String,
    pub kind: MitigationKind,
    pub description: String,
    pub status: MitigationStatus,
    pub priority: MitigationPriority,
    pub assigned_to: Option<String>,
    pub created_by: String,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MitigationFilter {
    pub branch_code: Option<String>,
    pub status: Option<MitigationStatus>,
}

impl MitigationFilter {
    pub fn matches(&self, task: &MitigationTask) -> bool {
        self.branch_code
            .as_deref()
            .map_or(true, |code| code == task.branch_code)
            && self.status.map_or(true, |status| status == task.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoCrt {
    #[serde(rename = "No CRT")]
    NoCrt,
}

/// One day on an attendance sheet: a head count or a day without a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DayEntry {
    Count(i32),
    Skipped(NoCrt),
}

impl DayEntry {
    pub const NO_CRT: DayEntry = DayEntry::Skipped(NoCrt::NoCrt);

    pub fn count(&self) -> Option<i32> {
        match self {
            DayEntry::Count(value) => Some(*value),
            DayEntry::Skipped(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Improving,
    Dropping,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskFlag {
    Critical,
    #[serde(rename = "OK")]
    Ok,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub branch_code: String,
    pub week_no: i32,
    pub total_strength: i32,
    pub attended: Vec<DayEntry>,
    pub percents: Vec<DayEntry>,
    pub weekly_average_percent: i32,
    pub no_crt_days: i32,
    pub trend: Option<Trend>,
    pub performance_level: PerformanceLevel,
    pub risk_flag: RiskFlag,
    pub remarks: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngestionStatus {
    Completed,
    PartialSuccess,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub row_index: usize,
    pub issue: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionLog {
    pub id: Uuid,
    pub filename: String,
    pub processed_rows: i32,
    pub success_count: i32,
    pub error_count: i32,
    pub status: IngestionStatus,
    pub anomalies: Vec<Anomaly>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyTrend {
    pub week_no: i32,
    pub attendance: f64,
    pub test_pass: f64,
    pub overall_score: f64,
    pub report_count: usize,
}
