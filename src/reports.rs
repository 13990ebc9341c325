//! Weekly report lifecycle: draft until finalized, then locked until reopened.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::audit::{self, AuditEvent, REPORT_ENTITY};
use crate::db::Store;
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::{
    Actor, AuditAction, ComputedScores, ReportFilter, ReportInput, ReportStatus, Role,
    WeeklyReport,
};
use crate::risk;
use crate::validation::{canonical_branch_code, validate_report};

pub fn compute_scores(input: &ReportInput) -> ComputedScores {
    let syllabus = metrics::syllabus_completion(
        f64::from(input.syllabus_covered),
        f64::from(input.syllabus_total),
    );
    let effectiveness =
        metrics::test_effectiveness(input.test_attendance_percent, input.test_pass_percent);

    ComputedScores {
        attendance_score: input.attendance_percent,
        test_score: effectiveness,
        overall_score: metrics::overall_score(input.attendance_percent, effectiveness, syllabus),
        risk_level: risk::risk_level(
            input.attendance_percent,
            input.test_pass_percent,
            risk::syllabus_lagging(syllabus),
        ),
    }
}

pub fn ensure_can_edit(actor: &Actor, branch_code: &str) -> Result<()> {
    if !matches!(actor.role, Role::Admin | Role::Faculty) {
        return Err(Error::Forbidden("only admin or faculty may edit reports".to_string()));
    }
    if !actor.can_access_branch(branch_code) {
        return Err(Error::Forbidden(format!("unauthorized for branch {branch_code}")));
    }
    Ok(())
}

fn with_canonical_branch(input: &ReportInput) -> ReportInput {
    ReportInput {
        branch_code: canonical_branch_code(&input.branch_code),
        ..input.clone()
    }
}

fn new_report(input: &ReportInput, actor: &Actor, now: DateTime<Utc>) -> WeeklyReport {
    let mut report = WeeklyReport {
        id: Uuid::new_v4(),
        branch_code: input.branch_code.clone(),
        week_no: input.week_no,
        sessions: input.sessions,
        attendance_percent: input.attendance_percent,
        test_attendance_percent: input.test_attendance_percent,
        test_pass_percent: input.test_pass_percent,
        syllabus_covered: input.syllabus_covered,
        syllabus_total: input.syllabus_total,
        computed: compute_scores(input),
        status: ReportStatus::Draft,
        locked_at: None,
        finalized_by: None,
        created_at: now,
        updated_at: now,
    };
    apply_status(&mut report, input.status, actor, now);
    report
}

fn apply_input(report: &mut WeeklyReport, input: &ReportInput, actor: &Actor, now: DateTime<Utc>) {
    report.sessions = input.sessions;
    report.attendance_percent = input.attendance_percent;
    report.test_attendance_percent = input.test_attendance_percent;
    report.test_pass_percent = input.test_pass_percent;
    report.syllabus_covered = input.syllabus_covered;
    report.syllabus_total = input.syllabus_total;
    report.computed = compute_scores(input);
    report.updated_at = now;
    apply_status(report, input.status, actor, now);
}

fn apply_status(
    report: &mut WeeklyReport,
    status: Option<ReportStatus>,
    actor: &Actor,
    now: DateTime<Utc>,
) {
    if status == Some(ReportStatus::Finalized) {
        report.status = ReportStatus::Finalized;
        report.locked_at = Some(now);
        report.finalized_by = Some(actor.id.clone());
    }
}

/// Inserts a new report; a second report for the same branch and week is a conflict.
pub async fn create_report(
    store: &dyn Store,
    input: &ReportInput,
    actor: &Actor,
) -> Result<WeeklyReport> {
    let input = &with_canonical_branch(input);
    ensure_can_edit(actor, &input.branch_code)?;
    validate_report(input)?;

    let report = new_report(input, actor, Utc::now());
    store.insert_report(&report).await?;

    audit::record(
        store,
        actor,
        AuditEvent::new(AuditAction::CreateReport, REPORT_ENTITY, report.id.to_string()).details(
            json!({
                "branch": report.branch_code,
                "week": report.week_no,
                "status": report.status,
            }),
        ),
    )
    .await;

    Ok(report)
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedReport {
    pub report: WeeklyReport,
    pub created: bool,
}

/// Creates or updates the report for the input's branch and week.
pub async fn save_report(store: &dyn Store, input: &ReportInput, actor: &Actor) -> Result<SavedReport> {
    let input = &with_canonical_branch(input);
    ensure_can_edit(actor, &input.branch_code)?;
    validate_report(input)?;

    let now = Utc::now();
    let existing = store.find_report(&input.branch_code, input.week_no).await?;
    let (report, created) = match existing {
        Some(report) if report.status == ReportStatus::Finalized => {
            return Err(Error::Forbidden(format!(
                "report for {} week {} is finalized and cannot be edited",
                report.branch_code, report.week_no
            )));
        }
        Some(mut report) => {
            apply_input(&mut report, input, actor, now);
            store.update_report(&report).await?;
            (report, false)
        }
        None => {
            let report = new_report(input, actor, now);
            store.insert_report(&report).await?;
            (report, true)
        }
    };

    let action = if created {
        AuditAction::CreateReport
    } else {
        AuditAction::UpdateReport
    };
    audit::record(
        store,
        actor,
        AuditEvent::new(action, REPORT_ENTITY, report.id.to_string()).details(json!({
            "branch": report.branch_code,
            "week": report.week_no,
            "status": report.status,
        })),
    )
    .await;

    Ok(SavedReport { report, created })
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkItemError {
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkOutcome {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<BulkItemError>,
}

/// Saves each report independently; failures are collected, not fatal.
pub async fn bulk_save(store: &dyn Store, inputs: &[ReportInput], actor: &Actor) -> Result<BulkOutcome> {
    if !matches!(actor.role, Role::Admin | Role::Faculty) {
        return Err(Error::Forbidden("only admin or faculty may upload reports".to_string()));
    }

    let mut outcome = BulkOutcome::default();
    for (index, input) in inputs.iter().enumerate() {
        match save_report(store, input, actor).await {
            Ok(_) => outcome.success += 1,
            Err(err) => {
                outcome.failed += 1;
                outcome.errors.push(BulkItemError {
                    index,
                    error: err.to_string(),
                });
            }
        }
    }

    if outcome.success > 0 {
        audit::record(
            store,
            actor,
            AuditEvent::new(AuditAction::BulkUploadReports, REPORT_ENTITY, "multiple")
                .details(json!({ "count": outcome.success, "failed": outcome.failed })),
        )
        .await;
    }
    info!(
        "bulk report upload: {} saved, {} failed",
        outcome.success, outcome.failed
    );

    Ok(outcome)
}

/// Unlocks a finalized report for editing. Admin only.
pub async fn reopen_report(
    store: &dyn Store,
    branch_code: &str,
    week_no: i32,
    actor: &Actor,
) -> Result<WeeklyReport> {
    if actor.role != Role::Admin {
        return Err(Error::Forbidden("only admin may reopen reports".to_string()));
    }

    let branch_code = canonical_branch_code(branch_code);
    let mut report = store
        .find_report(&branch_code, week_no)
        .await?
        .ok_or_else(|| Error::NotFound(format!("report for {branch_code} week {week_no}")))?;

    let previous = report.status;
    report.status = ReportStatus::Draft;
    report.locked_at = None;
    report.finalized_by = None;
    report.updated_at = Utc::now();
    store.update_report(&report).await?;

    audit::record(
        store,
        actor,
        AuditEvent::new(AuditAction::ReopenReport, REPORT_ENTITY, report.id.to_string())
            .change(json!(previous), json!(report.status))
            .details(json!({ "branch": branch_code, "week": week_no })),
    )
    .await;

    Ok(report)
}

/// Lists reports, narrowing faculty to their assigned branches.
pub async fn list_reports(
    store: &dyn Store,
    mut filter: ReportFilter,
    actor: &Actor,
) -> Result<Vec<WeeklyReport>> {
    if actor.role == Role::Faculty && !actor.branches.is_empty() {
        if let Some(branch_code) = &filter.branch_code {
            if !actor.can_access_branch(branch_code) {
                return Err(Error::Forbidden(format!("unauthorized for branch {branch_code}")));
            }
        }
        filter.branches = Some(actor.branches.clone());
    }

    store.list_reports(&filter).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::RiskLevel;

    fn input(branch_code: &str, week_no: i32) -> ReportInput {
        ReportInput {
            branch_code: branch_code.to_string(),
            week_no,
            sessions: 5,
            attendance_percent: 80.0,
            test_attendance_percent: 90.0,
            test_pass_percent: 70.0,
            syllabus_covered: 10,
            syllabus_total: 20,
            status: None,
        }
    }

    fn faculty(branches: &[&str]) -> Actor {
        Actor {
            id: "faculty-1".to_string(),
            name: Some("Faculty One".to_string()),
            role: Role::Faculty,
            branches: branches.iter().map(|b| b.to_string()).collect(),
        }
    }

    #[test]
    fn computed_block_follows_formulas() {
        let scores = compute_scores(&input("CSE-A", 1));
        assert_eq!(scores.attendance_score, 80.0);
        assert!((scores.test_score - 63.0).abs() < 1e-9);
        assert!((scores.overall_score - (32.0 + 25.2 + 10.0)).abs() < 1e-9);
        assert_eq!(scores.risk_level, RiskLevel::Healthy);
    }

    #[tokio::test]
    async fn duplicate_branch_week_insert_is_a_conflict() {
        let store = MemoryStore::new();
        let actor = Actor::system();

        create_report(&store, &input("CSE-A", 1), &actor).await.unwrap();
        let err = create_report(&store, &input("CSE-A", 1), &actor)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Conflict(_)));
        assert!(create_report(&store, &input("CSE-A", 2), &actor).await.is_ok());
    }

    #[tokio::test]
    async fn branch_codes_are_stored_uppercase() {
        let store = MemoryStore::new();
        let actor = faculty(&["CSE-A"]);

        let saved = save_report(&store, &input(" cse-a ", 1), &actor).await.unwrap();
        assert!(saved.created);
        assert_eq!(saved.report.branch_code, "CSE-A");

        let again = save_report(&store, &input("CSE-A", 1), &actor).await.unwrap();
        assert!(!again.created);
        assert_eq!(again.report.id, saved.report.id);

        let err = create_report(&store, &input("cse-a", 1), &Actor::system())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.list_reports(&ReportFilter::default()).await.unwrap().len(), 1);
    }

    async fn missing_report_update_is_not_found(store: &dyn Store) {
        let report = new_report(&input("CSE-A", 9_999), &Actor::system(), Utc::now());
        let err = store.update_report(&report).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn updating_an_unknown_report_is_not_found() {
        missing_report_update_is_not_found(&MemoryStore::new()).await;

        // Postgres is checked only when a database is configured.
        if let Ok(url) = std::env::var("DATABASE_URL") {
            let store = crate::db::PgStore::connect(&url, 1).await.unwrap();
            store.migrate().await.unwrap();
            missing_report_update_is_not_found(&store).await;
        }
    }

    #[tokio::test]
    async fn finalized_reports_reject_edits_until_reopened() {
        let store = MemoryStore::new();
        let actor = Actor::system();

        let mut finalize = input("CSE-A", 1);
        finalize.status = Some(ReportStatus::Finalized);
        let saved = save_report(&store, &finalize, &actor).await.unwrap();
        assert!(saved.created);
        assert_eq!(saved.report.status, ReportStatus::Finalized);
        assert!(saved.report.locked_at.is_some());
        assert_eq!(saved.report.finalized_by.as_deref(), Some("system"));

        let err = save_report(&store, &input("CSE-A", 1), &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let reopened = reopen_report(&store, "CSE-A", 1, &actor).await.unwrap();
        assert_eq!(reopened.status, ReportStatus::Draft);
        assert!(reopened.locked_at.is_none());

        let mut edit = input("CSE-A", 1);
        edit.attendance_percent = 95.0;
        let saved = save_report(&store, &edit, &actor).await.unwrap();
        assert!(!saved.created);
        assert_eq!(saved.report.attendance_percent, 95.0);
        assert_eq!(saved.report.id, reopened.id);
    }

    #[tokio::test]
    async fn reopen_requires_admin() {
        let store = MemoryStore::new();
        let err = reopen_report(&store, "CSE-A", 1, &faculty(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[tokio::test]
    async fn out_of_range_attendance_is_rejected() {
        let store = MemoryStore::new();
        let mut bad = input("CSE-A", 1);
        bad.attendance_percent = 110.0;

        let err = save_report(&store, &bad, &Actor::system()).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.find_report("CSE-A", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn faculty_limited_to_assigned_branches() {
        let store = MemoryStore::new();
        let actor = faculty(&["CSE-A"]);

        assert!(save_report(&store, &input("CSE-A", 1), &actor).await.is_ok());
        let err = save_report(&store, &input("ECE-A", 1), &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        save_report(&store, &input("ECE-A", 1), &Actor::system())
            .await
            .unwrap();
        let visible = list_reports(&store, ReportFilter::default(), &actor)
            .await
            .unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].branch_code, "CSE-A");

        let filter = ReportFilter {
            branch_code: Some("ECE-A".to_string()),
            ..ReportFilter::default()
        };
        assert!(list_reports(&store, filter, &actor).await.is_err());
    }

    #[tokio::test]
    async fn bulk_save_collects_item_failures() {
        let store = MemoryStore::new();
        let mut bad = input("ECE-A", 2);
        bad.test_pass_percent = 140.0;

        let outcome = bulk_save(
            &store,
            &[input("CSE-A", 1), bad, input("CSE-A", 2)],
            &Actor::system(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.success, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.errors[0].index, 1);
        assert!(outcome.errors[0].error.contains("test pass"));
    }
}
