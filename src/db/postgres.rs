use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::{enum_text, parse_enum, Store};
use crate::error::{Error, Result};
use crate::models::{
    AggregateSummary, Announcement, Anomaly, AttendanceRecord, AuditEntry, Branch, ComputedScores,
    DayEntry, FieldValues, IngestionLog, MitigationFilter, MitigationTask, ReportFilter, User, Week,
    WeeklyReport,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Opens the process-wide pool; it lives until shutdown.
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to apply migrations")?;
        Ok(())
    }
}

const REPORT_COLUMNS: &str = "id, branch_code, week_no, sessions, attendance_percent, \
     test_attendance_percent, test_pass_percent, syllabus_covered, syllabus_total, \
     attendance_score, test_score, overall_score, risk_level, status, locked_at, \
     finalized_by, created_at, updated_at";

fn report_from_row(row: &PgRow) -> Result<WeeklyReport> {
    let risk_level: String = row.try_get("risk_level")?;
    let status: String = row.try_get("status")?;

    Ok(WeeklyReport {
        id: row.try_get("id")?,
        branch_code: row.try_get("branch_code")?,
        week_no: row.try_get("week_no")?,
        sessions: row.try_get("sessions")?,
        attendance_percent: row.try_get("attendance_percent")?,
        test_attendance_percent: row.try_get("test_attendance_percent")?,
        test_pass_percent: row.try_get("test_pass_percent")?,
        syllabus_covered: row.try_get("syllabus_covered")?,
        syllabus_total: row.try_get("syllabus_total")?,
        computed: ComputedScores {
            attendance_score: row.try_get("attendance_score")?,
            test_score: row.try_get("test_score")?,
            overall_score: row.try_get("overall_score")?,
            risk_level: parse_enum("risk_level", &risk_level)?,
        },
        status: parse_enum("status", &status)?,
        locked_at: row.try_get("locked_at")?,
        finalized_by: row.try_get("finalized_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn summary_from_row(row: &PgRow) -> Result<AggregateSummary> {
    let grade: String = row.try_get("performance_grade")?;
    let risk_level: String = row.try_get("risk_level")?;
    let ai_values: Json<FieldValues> = row.try_get("ai_values")?;
    let overrides: Json<FieldValues> = row.try_get("overrides")?;

    Ok(AggregateSummary {
        branch_code: row.try_get("branch_code")?,
        total_weeks: row.try_get("total_weeks")?,
        avg_attendance: row.try_get("avg_attendance")?,
        avg_test_attendance: row.try_get("avg_test_attendance")?,
        avg_test_pass: row.try_get("avg_test_pass")?,
        avg_overall_score: row.try_get("avg_overall_score")?,
        syllabus_completion_percent: row.try_get("syllabus_completion_percent")?,
        performance_grade: parse_enum("performance_grade", &grade)?,
        risk_level: parse_enum("risk_level", &risk_level)?,
        ai_values: ai_values.0,
        overrides: overrides.0,
        updated_at: row.try_get("updated_at")?,
    })
}

fn audit_from_row(row: &PgRow) -> Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        user_name: row.try_get("user_name")?,
        role: row.try_get("role")?,
        action: row.try_get("action")?,
        entity_type: row.try_get("entity_type")?,
        entity_id: row.try_get("entity_id")?,
        old_value: row.try_get("old_value")?,
        new_value: row.try_get("new_value")?,
        details: row.try_get("details")?,
        created_at: row.try_get("created_at")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        role: parse_enum("role", &role)?,
        branches: row.try_get("branches")?,
        active: row.try_get("active")?,
        last_login: row.try_get("last_login")?,
        created_at: row.try_get("created_at")?,
    })
}

fn announcement_from_row(row: &PgRow) -> Result<Announcement> {
    let kind: String = row.try_get("kind")?;
    let priority: String = row.try_get("priority")?;
    Ok(Announcement {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        target_audience: row.try_get("target_audience")?,
        kind: parse_enum("kind", &kind)?,
        priority: parse_enum("priority", &priority)?,
        created_by: row.try_get("created_by")?,
        expiry_date: row.try_get("expiry_date")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn mitigation_from_row(row: &PgRow) -> Result<MitigationTask> {
    let kind: String = row.try_get("kind")?;
    let status: String = row.try_get("status")?;
    let priority: String = row.try_get("priority")?;
    Ok(MitigationTask {
        id: row.try_get("id")?,
        branch_code: row.try_get("branch_code")?,
        kind: parse_enum("kind", &kind)?,
        description: row.try_get("description")?,
        status: parse_enum("status", &status)?,
        priority: parse_enum("priority", &priority)?,
        assigned_to: row.try_get("assigned_to")?,
        created_by: row.try_get("created_by")?,
        due_date: row.try_get("due_date")?,
        completed_at: row.try_get("completed_at")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn attendance_from_row(row: &PgRow) -> Result<AttendanceRecord> {
    let attended: Json<Vec<DayEntry>> = row.try_get("attended")?;
    let percents: Json<Vec<DayEntry>> = row.try_get("percents")?;
    let trend: Option<String> = row.try_get("trend")?;
    let performance_level: String = row.try_get("performance_level")?;
    let risk_flag: String = row.try_get("risk_flag")?;
    Ok(AttendanceRecord {
        branch_code: row.try_get("branch_code")?,
        week_no: row.try_get("week_no")?,
        total_strength: row.try_get("total_strength")?,
        attended: attended.0,
        percents: percents.0,
        weekly_average_percent: row.try_get("weekly_average_percent")?,
        no_crt_days: row.try_get("no_crt_days")?,
        trend: trend
            .map(|value| parse_enum("trend", &value))
            .transpose()?,
        performance_level: parse_enum("performance_level", &performance_level)?,
        risk_flag: parse_enum("risk_flag", &risk_flag)?,
        remarks: row.try_get("remarks")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn find_report(&self, branch_code: &str, week_no: i32) -> Result<Option<WeeklyReport>> {
        let row = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS} FROM crt_analytics.weekly_reports \
             WHERE branch_code = $1 AND week_no = $2"
        ))
        .bind(branch_code)
        .bind(week_no)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(report_from_row).transpose()
    }

    async fn insert_report(&self, report: &WeeklyReport) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO crt_analytics.weekly_reports
            (id, branch_code, week_no, sessions, attendance_percent, test_attendance_percent,
             test_pass_percent, syllabus_covered, syllabus_total, attendance_score, test_score,
             overall_score, risk_level, status, locked_at, finalized_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(report.id)
        .bind(&report.branch_code)
        .bind(report.week_no)
        .bind(report.sessions)
        .bind(report.attendance_percent)
        .bind(report.test_attendance_percent)
        .bind(report.test_pass_percent)
        .bind(report.syllabus_covered)
        .bind(report.syllabus_total)
        .bind(report.computed.attendance_score)
        .bind(report.computed.test_score)
        .bind(report.computed.overall_score)
        .bind(enum_text(&report.computed.risk_level)?)
        .bind(report.status.as_str())
        .bind(report.locked_at)
        .bind(&report.finalized_by)
        .bind(report.created_at)
        .bind(report.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_report(&self, report: &WeeklyReport) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE crt_analytics.weekly_reports
            SET sessions = $2, attendance_percent = $3, test_attendance_percent = $4,
                test_pass_percent = $5, syllabus_covered = $6, syllabus_total = $7,
                attendance_score = $8, test_score = $9, overall_score = $10, risk_level = $11,
                status = $12, locked_at = $13, finalized_by = $14, updated_at = $15
            WHERE id = $1
            "#,
        )
        .bind(report.id)
        .bind(report.sessions)
        .bind(report.attendance_percent)
        .bind(report.test_attendance_percent)
        .bind(report.test_pass_percent)
        .bind(report.syllabus_covered)
        .bind(report.syllabus_total)
        .bind(report.computed.attendance_score)
        .bind(report.computed.test_score)
        .bind(report.computed.overall_score)
        .bind(enum_text(&report.computed.risk_level)?)
        .bind(report.status.as_str())
        .bind(report.locked_at)
        .bind(&report.finalized_by)
        .bind(report.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "report for {} week {}",
                report.branch_code, report.week_no
            )));
        }
        Ok(())
    }

    async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<WeeklyReport>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {REPORT_COLUMNS} FROM crt_analytics.weekly_reports WHERE TRUE"
        ));

        if let Some(branch_code) = &filter.branch_code {
            query.push(" AND branch_code = ").push_bind(branch_code.clone());
        }
        if let Some(week_no) = filter.week_no {
            query.push(" AND week_no = ").push_bind(week_no);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(branches) = &filter.branches {
            query.push(" AND branch_code = ANY(").push_bind(branches.clone()).push(")");
        }
        query.push(" ORDER BY week_no DESC, branch_code");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(report_from_row).collect()
    }

    async fn get_summary(&self, branch_code: &str) -> Result<Option<AggregateSummary>> {
        let row = sqlx::query("SELECT * FROM crt_analytics.aggregate_summaries WHERE branch_code = $1")
            .bind(branch_code)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(summary_from_row).transpose()
    }

    async fn list_summaries(&self) -> Result<Vec<AggregateSummary>> {
        let rows = sqlx::query(
            "SELECT * FROM crt_analytics.aggregate_summaries ORDER BY performance_grade, branch_code",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }

    async fn upsert_summary(&self, summary: &AggregateSummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO crt_analytics.aggregate_summaries
            (branch_code, total_weeks, avg_attendance, avg_test_attendance, avg_test_pass,
             avg_overall_score, syllabus_completion_percent, performance_grade, risk_level,
             ai_values, overrides, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (branch_code) DO UPDATE
            SET total_weeks = EXCLUDED.total_weeks,
                avg_attendance = EXCLUDED.avg_attendance,
                avg_test_attendance = EXCLUDED.avg_test_attendance,
                avg_test_pass = EXCLUDED.avg_test_pass,
                avg_overall_score = EXCLUDED.avg_overall_score,
                syllabus_completion_percent = EXCLUDED.syllabus_completion_percent,
                performance_grade = EXCLUDED.performance_grade,
                risk_level = EXCLUDED.risk_level,
                ai_values = EXCLUDED.ai_values,
                overrides = EXCLUDED.overrides,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&summary.branch_code)
        .bind(summary.total_weeks)
        .bind(summary.avg_attendance)
        .bind(summary.avg_test_attendance)
        .bind(summary.avg_test_pass)
        .bind(summary.avg_overall_score)
        .bind(summary.syllabus_completion_percent)
        .bind(summary.performance_grade.as_str())
        .bind(enum_text(&summary.risk_level)?)
        .bind(Json(&summary.ai_values))
        .bind(Json(&summary.overrides))
        .bind(summary.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO crt_analytics.audit_log
            (id, user_id, user_name, role, action, entity_type, entity_id,
             old_value, new_value, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.user_id)
        .bind(&entry.user_name)
        .bind(&entry.role)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.old_value)
        .bind(&entry.new_value)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn audit_history(
        &self,
        entity_type: &str,
        entity_id: &str,
        limit: usize,
    ) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM crt_analytics.audit_log
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(audit_from_row).collect()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM crt_analytics.users ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM crt_analytics.users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO crt_analytics.users
            (id, email, name, role, branches, active, last_login, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email, name = EXCLUDED.name, role = EXCLUDED.role,
                branches = EXCLUDED.branches, active = EXCLUDED.active,
                last_login = EXCLUDED.last_login
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.branches)
        .bind(user.active)
        .bind(user.last_login)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_branches(&self) -> Result<Vec<Branch>> {
        let rows = sqlx::query("SELECT * FROM crt_analytics.branches ORDER BY branch_code")
            .fetch_all(&self.pool)
            .await?;

        let mut branches = Vec::new();
        for row in rows {
            branches.push(Branch {
                branch_code: row.try_get("branch_code")?,
                branch_name: row.try_get("branch_name")?,
                department: row.try_get("department")?,
                current_strength: row.try_get("current_strength")?,
            });
        }
        Ok(branches)
    }

    async fn upsert_branch(&self, branch: &Branch) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO crt_analytics.branches (branch_code, branch_name, department, current_strength)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (branch_code) DO UPDATE
            SET branch_name = EXCLUDED.branch_name, department = EXCLUDED.department,
                current_strength = EXCLUDED.current_strength
            "#,
        )
        .bind(&branch.branch_code)
        .bind(&branch.branch_name)
        .bind(&branch.department)
        .bind(branch.current_strength)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_weeks(&self) -> Result<Vec<Week>> {
        let rows = sqlx::query("SELECT * FROM crt_analytics.weeks ORDER BY week_no")
            .fetch_all(&self.pool)
            .await?;

        let mut weeks = Vec::new();
        for row in rows {
            weeks.push(Week {
                week_no: row.try_get("week_no")?,
                start_date: row.try_get("start_date")?,
                end_date: row.try_get("end_date")?,
                label: row.try_get("label")?,
            });
        }
        Ok(weeks)
    }

    async fn upsert_week(&self, week: &Week) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO crt_analytics.weeks (week_no, start_date, end_date, label)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (week_no) DO UPDATE
            SET start_date = EXCLUDED.start_date, end_date = EXCLUDED.end_date,
                label = EXCLUDED.label
            "#,
        )
        .bind(week.week_no)
        .bind(week.start_date)
        .bind(week.end_date)
        .bind(&week.label)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_active_announcements(&self) -> Result<Vec<Announcement>> {
        let rows = sqlx::query(
            "SELECT * FROM crt_analytics.announcements WHERE is_active ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(announcement_from_row).collect()
    }

    async fn insert_announcement(&self, announcement: &Announcement) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO crt_analytics.announcements
            (id, title, message, target_audience, kind, priority, created_by,
             expiry_date, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(announcement.id)
        .bind(&announcement.title)
        .bind(&announcement.message)
        .bind(&announcement.target_audience)
        .bind(enum_text(&announcement.kind)?)
        .bind(enum_text(&announcement.priority)?)
        .bind(&announcement.created_by)
        .bind(announcement.expiry_date)
        .bind(announcement.is_active)
        .bind(announcement.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_mitigations(&self, filter: &MitigationFilter) -> Result<Vec<MitigationTask>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM crt_analytics.mitigation_tasks WHERE TRUE");
        if let Some(branch_code) = &filter.branch_code {
            query.push(" AND branch_code = ").push_bind(branch_code.clone());
        }
        if let Some(status) = &filter.status {
            query.push(" AND status = ").push_bind(enum_text(status)?);
        }
        query.push(" ORDER BY created_at DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(mitigation_from_row).collect()
    }

    async fn get_mitigation(&self, id: Uuid) -> Result<Option<MitigationTask>> {
        let row = sqlx::query("SELECT * FROM crt_analytics.mitigation_tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(mitigation_from_row).transpose()
    }

    async fn insert_mitigation(&self, task: &MitigationTask) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO crt_analytics.mitigation_tasks
            (id, branch_code, kind, description, status, priority, assigned_to, created_by,
             due_date, completed_at, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(task.id)
        .bind(&task.branch_code)
        .bind(enum_text(&task.kind)?)
        .bind(&task.description)
        .bind(enum_text(&task.status)?)
        .bind(enum_text(&task.priority)?)
        .bind(&task.assigned_to)
        .bind(&task.created_by)
        .bind(task.due_date)
        .bind(task.completed_at)
        .bind(&task.notes)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_mitigation(&self, task: &MitigationTask) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE crt_analytics.mitigation_tasks
            SET status = $2, notes = $3, completed_at = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(task.id)
        .bind(enum_text(&task.status)?)
        .bind(&task.notes)
        .bind(task.completed_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_attendance_record(&self, record: &AttendanceRecord) -> Result<()> {
        let trend = record.trend.as_ref().map(enum_text).transpose()?;
        sqlx::query(
            r#"
            INSERT INTO crt_analytics.attendance_records
            (branch_code, week_no, total_strength, attended, percents, weekly_average_percent,
             no_crt_days, trend, performance_level, risk_flag, remarks, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (branch_code, week_no) DO UPDATE
            SET total_strength = EXCLUDED.total_strength, attended = EXCLUDED.attended,
                percents = EXCLUDED.percents,
                weekly_average_percent = EXCLUDED.weekly_average_percent,
                no_crt_days = EXCLUDED.no_crt_days, trend = EXCLUDED.trend,
                performance_level = EXCLUDED.performance_level,
                risk_flag = EXCLUDED.risk_flag, remarks = EXCLUDED.remarks,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.branch_code)
        .bind(record.week_no)
        .bind(record.total_strength)
        .bind(Json(&record.attended))
        .bind(Json(&record.percents))
        .bind(record.weekly_average_percent)
        .bind(record.no_crt_days)
        .bind(trend)
        .bind(enum_text(&record.performance_level)?)
        .bind(enum_text(&record.risk_flag)?)
        .bind(&record.remarks)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_attendance_records(&self, week_no: Option<i32>) -> Result<Vec<AttendanceRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM crt_analytics.attendance_records
            WHERE $1::INTEGER IS NULL OR week_no = $1
            ORDER BY branch_code, week_no
            "#,
        )
        .bind(week_no)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(attendance_from_row).collect()
    }

    async fn insert_ingestion_log(&self, log: &IngestionLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO crt_analytics.ingestion_logs
            (id, filename, processed_rows, success_count, error_count, status, anomalies, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(log.id)
        .bind(&log.filename)
        .bind(log.processed_rows)
        .bind(log.success_count)
        .bind(log.error_count)
        .bind(enum_text(&log.status)?)
        .bind(Json::<&Vec<Anomaly>>(&log.anomalies))
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
