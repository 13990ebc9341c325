//! Manual edits on branch summaries.
//!
//! An override replaces the effective value of one editable field until it is
//! reverted. `ai_values` belong to the refresh job and are never touched here.

use serde::Serialize;
use serde_json::json;

use crate::aggregation::regrade;
use crate::audit::{self, AuditEvent, SUMMARY_ENTITY};
use crate::db::Store;
use crate::error::{Error, Result};
use crate::models::{Actor, AggregateSummary, AuditAction, EditableField, Grade, Role};
use crate::validation::validate_percent;

#[derive(Debug, Clone, Serialize)]
pub struct FieldChange {
    pub field: EditableField,
    pub old_value: f64,
    pub new_value: f64,
    pub grade: Grade,
}

/// Sets an override and the effective value, then regrades.
pub fn apply_override(summary: &mut AggregateSummary, field: EditableField, value: f64) -> FieldChange {
    let old_value = summary.effective(field);
    summary.overrides.insert(field, value);
    summary.set_effective(field, value);
    regrade(summary);

    FieldChange {
        field,
        old_value,
        new_value: value,
        grade: summary.performance_grade,
    }
}

/// Drops an override and restores the last computed value, or 0 without one.
pub fn revert_override(summary: &mut AggregateSummary, field: EditableField) -> FieldChange {
    let old_value = summary.effective(field);
    summary.overrides.remove(&field);
    let restored = summary.ai_values.get(&field).copied().unwrap_or(0.0);
    summary.set_effective(field, restored);
    regrade(summary);

    FieldChange {
        field,
        old_value,
        new_value: restored,
        grade: summary.performance_grade,
    }
}

fn ensure_can_override(actor: &Actor, branch_code: &str) -> Result<()> {
    if actor.role == Role::Viewer {
        return Err(Error::Forbidden("viewers cannot edit summaries".to_string()));
    }
    if !actor.can_access_branch(branch_code) {
        return Err(Error::Forbidden(format!("unauthorized for branch {branch_code}")));
    }
    Ok(())
}

async fn load(store: &dyn Store, branch_code: &str) -> Result<AggregateSummary> {
    store
        .get_summary(branch_code)
        .await?
        .ok_or_else(|| Error::NotFound("branch summary".to_string()))
}

pub async fn update(
    store: &dyn Store,
    branch_code: &str,
    field: &str,
    value: f64,
    actor: &Actor,
) -> Result<AggregateSummary> {
    let field: EditableField = field.parse()?;
    validate_percent(field.as_str(), value)?;
    ensure_can_override(actor, branch_code)?;

    let mut summary = load(store, branch_code).await?;
    let change = apply_override(&mut summary, field, value);
    summary.updated_at = chrono::Utc::now();
    store.upsert_summary(&summary).await?;

    audit::record(
        store,
        actor,
        AuditEvent::new(AuditAction::ManualEdit, SUMMARY_ENTITY, branch_code)
            .change(json!(change.old_value), json!(change.new_value))
            .details(json!({
                "field": field.as_str(),
                "new_grade": change.grade,
                "user_name": actor.name,
            })),
    )
    .await;

    Ok(summary)
}

pub async fn revert(
    store: &dyn Store,
    branch_code: &str,
    field: &str,
    actor: &Actor,
) -> Result<AggregateSummary> {
    let field: EditableField = field.parse()?;
    ensure_can_override(actor, branch_code)?;

    let mut summary = load(store, branch_code).await?;
    let change = revert_override(&mut summary, field);
    summary.updated_at = chrono::Utc::now();
    store.upsert_summary(&summary).await?;

    audit::record(
        store,
        actor,
        AuditEvent::new(AuditAction::RevertEdit, SUMMARY_ENTITY, branch_code)
            .change(json!(change.old_value), json!(change.new_value))
            .details(json!({
                "field": field.as_str(),
                "new_grade": change.grade,
                "user_name": actor.name,
            })),
    )
    .await;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{reconcile, summary_score, BranchAverages};
    use crate::db::MemoryStore;
    use crate::metrics;

    fn summary() -> AggregateSummary {
        reconcile(
            &BranchAverages {
                branch_code: "CSE-A".to_string(),
                total_weeks: 4,
                avg_attendance: 72.5,
                avg_test_attendance: 88.0,
                avg_test_pass: 61.25,
                avg_overall_score: 60.0,
                avg_syllabus_covered: 7.0,
                avg_syllabus_total: 20.0,
            },
            None,
        )
    }

    #[test]
    fn override_then_revert_restores_computed_state() {
        let mut summary = summary();
        let before = summary.clone();

        let change = apply_override(&mut summary, EditableField::AvgAttendance, 99.0);
        assert_eq!(change.old_value, 72.5);
        assert_eq!(summary.avg_attendance, 99.0);
        assert_eq!(summary.overrides[&EditableField::AvgAttendance], 99.0);
        assert_eq!(summary.ai_values, before.ai_values);

        let change = revert_override(&mut summary, EditableField::AvgAttendance);
        assert_eq!(change.new_value, 72.5);
        assert_eq!(summary.avg_attendance, before.avg_attendance);
        assert!(summary.overrides.is_empty());

        let ai_only_score = summary.ai_values[&EditableField::AvgAttendance] * 0.4
            + summary.ai_values[&EditableField::AvgTestPass] * 0.4
            + summary.ai_values[&EditableField::SyllabusCompletionPercent] * 0.2;
        assert_eq!(summary.performance_grade, metrics::grade(ai_only_score));
        assert_eq!(summary.performance_grade, before.performance_grade);
    }

    #[test]
    fn override_regrades_from_effective_values() {
        let mut summary = summary();
        // 0.4*72.5 + 0.4*61.25 + 0.2*35 = 60.5
        assert_eq!(summary.performance_grade, Grade::B);

        apply_override(&mut summary, EditableField::SyllabusCompletionPercent, 100.0);
        assert!((summary_score(&summary) - 73.5).abs() < 1e-9);
        assert_eq!(summary.performance_grade, Grade::BPlus);
    }

    #[test]
    fn revert_without_snapshot_falls_back_to_zero() {
        let mut summary = summary();
        summary.ai_values.clear();
        apply_override(&mut summary, EditableField::AvgTestPass, 80.0);

        let change = revert_override(&mut summary, EditableField::AvgTestPass);
        assert_eq!(change.new_value, 0.0);
        assert_eq!(summary.avg_test_pass, 0.0);
    }

    #[tokio::test]
    async fn update_rejects_fields_outside_allow_list() {
        let store = MemoryStore::new();
        store.upsert_summary(&summary()).await.unwrap();

        let err = update(&store, "CSE-A", "avg_test_attendance", 50.0, &Actor::system())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn update_requires_existing_summary() {
        let store = MemoryStore::new();
        let err = update(&store, "NOPE", "avg_attendance", 50.0, &Actor::system())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn update_and_revert_are_audited() {
        let store = MemoryStore::new();
        store.upsert_summary(&summary()).await.unwrap();
        let actor = Actor::system();

        let edited = update(&store, "CSE-A", "avg_test_pass", 90.0, &actor).await.unwrap();
        assert_eq!(edited.avg_test_pass, 90.0);
        let reverted = revert(&store, "CSE-A", "avg_test_pass", &actor).await.unwrap();
        assert_eq!(reverted.avg_test_pass, 61.25);

        let history = audit::summary_history(&store, "CSE-A").await.unwrap();
        let actions: Vec<&str> = history.iter().map(|item| item.action.as_str()).collect();
        assert_eq!(actions, vec!["REVERT_EDIT", "MANUAL_EDIT"]);
        assert_eq!(history[1].new_value, Some(json!(90.0)));
    }

    #[tokio::test]
    async fn viewers_cannot_override() {
        let store = MemoryStore::new();
        store.upsert_summary(&summary()).await.unwrap();
        let viewer = Actor {
            id: "v-1".to_string(),
            name: None,
            role: Role::Viewer,
            branches: Vec::new(),
        };

        let err = update(&store, "CSE-A", "avg_attendance", 50.0, &viewer)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }
}
