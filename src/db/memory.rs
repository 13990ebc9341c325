use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::error::{Error, Result};
use crate::models::{
    AggregateSummary, Announcement, AttendanceRecord, AuditEntry, Branch, IngestionLog,
    MitigationFilter, MitigationTask, ReportFilter, User, Week, WeeklyReport,
};

#[derive(Default)]
struct Tables {
    reports: BTreeMap<(String, i32), WeeklyReport>,
    summaries: BTreeMap<String, AggregateSummary>,
    audit: Vec<AuditEntry>,
    users: HashMap<Uuid, User>,
    branches: BTreeMap<String, Branch>,
    weeks: BTreeMap<i32, Week>,
    announcements: Vec<Announcement>,
    mitigations: Vec<MitigationTask>,
    attendance: BTreeMap<(String, i32), AttendanceRecord>,
    ingestion_logs: Vec<IngestionLog>,
}

/// Process-local store with the same uniqueness rules as Postgres.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn audit_len(&self) -> usize {
        self.tables.read().await.audit.len()
    }

    pub async fn ingestion_logs(&self) -> Vec<IngestionLog> {
        self.tables.read().await.ingestion_logs.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_report(&self, branch_code: &str, week_no: i32) -> Result<Option<WeeklyReport>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reports
            .get(&(branch_code.to_string(), week_no))
            .cloned())
    }

    async fn insert_report(&self, report: &WeeklyReport) -> Result<()> {
        let mut tables = self.tables.write().await;
        let key = (report.branch_code.clone(), report.week_no);
        if tables.reports.contains_key(&key) {
            return Err(Error::Conflict(format!(
                "report for {} week {} already exists",
                report.branch_code, report.week_no
            )));
        }
        tables.reports.insert(key, report.clone());
        Ok(())
    }

    async fn update_report(&self, report: &WeeklyReport) -> Result<()> {
        let mut tables = self.tables.write().await;
        let key = (report.branch_code.clone(), report.week_no);
        match tables.reports.get_mut(&key) {
            Some(existing) if existing.id == report.id => {
                *existing = report.clone();
                Ok(())
            }
            _ => Err(Error::NotFound(format!(
                "report for {} week {}",
                report.branch_code, report.week_no
            ))),
        }
    }

    async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<WeeklyReport>> {
        let tables = self.tables.read().await;
        let mut reports: Vec<WeeklyReport> = tables
            .reports
            .values()
            .filter(|report| filter.matches(report))
            .cloned()
            .collect();
        reports.sort_by(|a, b| {
            b.week_no
                .cmp(&a.week_no)
                .then_with(|| a.branch_code.cmp(&b.branch_code))
        });
        Ok(reports)
    }

    async fn get_summary(&self, branch_code: &str) -> Result<Option<AggregateSummary>> {
        Ok(self.tables.read().await.summaries.get(branch_code).cloned())
    }

    async fn list_summaries(&self) -> Result<Vec<AggregateSummary>> {
        let tables = self.tables.read().await;
        let mut summaries: Vec<AggregateSummary> = tables.summaries.values().cloned().collect();
        summaries.sort_by(|a, b| {
            a.performance_grade
                .as_str()
                .cmp(b.performance_grade.as_str())
                .then_with(|| a.branch_code.cmp(&b.branch_code))
        });
        Ok(summaries)
    }

    async fn upsert_summary(&self, summary: &AggregateSummary) -> Result<()> {
        self.tables
            .write()
            .await
            .summaries
            .insert(summary.branch_code.clone(), summary.clone());
        Ok(())
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.tables.write().await.audit.push(entry.clone());
        Ok(())
    }

    async fn audit_history(
        &self,
        entity_type: &str,
        entity_id: &str,
        limit: usize,
    ) -> Result<Vec<AuditEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .audit
            .iter()
            .rev()
            .filter(|entry| entry.entity_type == entity_type && entry.entity_id == entity_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|other| other.id != user.id && other.email == user.email)
        {
            return Err(Error::Conflict(format!("email {} already in use", user.email)));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn list_branches(&self) -> Result<Vec<Branch>> {
        Ok(self.tables.read().await.branches.values().cloned().collect())
    }

    async fn upsert_branch(&self, branch: &Branch) -> Result<()> {
        self.tables
            .write()
            .await
            .branches
            .insert(branch.branch_code.clone(), branch.clone());
        Ok(())
    }

    async fn list_weeks(&self) -> Result<Vec<Week>> {
        Ok(self.tables.read().await.weeks.values().cloned().collect())
    }

    async fn upsert_week(&self, week: &Week) -> Result<()> {
        self.tables
            .write()
            .await
            .weeks
            .insert(week.week_no, week.clone());
        Ok(())
    }

    async fn list_active_announcements(&self) -> Result<Vec<Announcement>> {
        let tables = self.tables.read().await;
        let mut announcements: Vec<Announcement> = tables
            .announcements
            .iter()
            .filter(|announcement| announcement.is_active)
            .cloned()
            .collect();
        announcements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(announcements)
    }

    async fn insert_announcement(&self, announcement: &Announcement) -> Result<()> {
        self.tables
            .write()
            .await
            .announcements
            .push(announcement.clone());
        Ok(())
    }

    async fn list_mitigations(&self, filter: &MitigationFilter) -> Result<Vec<MitigationTask>> {
        let tables = self.tables.read().await;
        let mut tasks: Vec<MitigationTask> = tables
            .mitigations
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn get_mitigation(&self, id: Uuid) -> Result<Option<MitigationTask>> {
        let tables = self.tables.read().await;
        Ok(tables.mitigations.iter().find(|task| task.id == id).cloned())
    }

    async fn insert_mitigation(&self, task: &MitigationTask) -> Result<()> {
        self.tables.write().await.mitigations.push(task.clone());
        Ok(())
    }

    async fn update_mitigation(&self, task: &MitigationTask) -> Result<()> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .mitigations
            .iter_mut()
            .find(|existing| existing.id == task.id)
            .ok_or_else(|| Error::NotFound(format!("mitigation task {}", task.id)))?;
        *existing = task.clone();
        Ok(())
    }

    async fn upsert_attendance_record(&self, record: &AttendanceRecord) -> Result<()> {
        self.tables
            .write()
            .await
            .attendance
            .insert((record.branch_code.clone(), record.week_no), record.clone());
        Ok(())
    }

    async fn list_attendance_records(&self, week_no: Option<i32>) -> Result<Vec<AttendanceRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .attendance
            .values()
            .filter(|record| week_no.map_or(true, |week| week == record.week_no))
            .cloned()
            .collect())
    }

    async fn insert_ingestion_log(&self, log: &IngestionLog) -> Result<()> {
        self.tables.write().await.ingestion_logs.push(log.clone());
        Ok(())
    }
}
