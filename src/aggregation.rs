//! Rolls finalized weekly reports up into one summary per branch.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::info;

use crate::db::Store;
use crate::error::Result;
use crate::metrics;
use crate::models::{
    AggregateSummary, EditableField, FieldValues, ReportFilter, ReportStatus, RiskLevel,
    WeeklyReport,
};
use crate::risk;

/// Plain averages over one branch's finalized reports.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchAverages {
    pub branch_code: String,
    pub total_weeks: i32,
    pub avg_attendance: f64,
    pub avg_test_attendance: f64,
    pub avg_test_pass: f64,
    pub avg_overall_score: f64,
    pub avg_syllabus_covered: f64,
    pub avg_syllabus_total: f64,
}

impl BranchAverages {
    pub fn syllabus_completion_percent(&self) -> f64 {
        metrics::syllabus_completion(self.avg_syllabus_covered, self.avg_syllabus_total)
    }

    pub fn ai_values(&self) -> FieldValues {
        FieldValues::from([
            (EditableField::AvgAttendance, self.avg_attendance),
            (EditableField::AvgTestPass, self.avg_test_pass),
            (
                EditableField::SyllabusCompletionPercent,
                self.syllabus_completion_percent(),
            ),
        ])
    }
}

pub fn average_by_branch(reports: &[WeeklyReport]) -> Vec<BranchAverages> {
    let mut groups: BTreeMap<&str, Vec<&WeeklyReport>> = BTreeMap::new();
    for report in reports {
        groups.entry(report.branch_code.as_str()).or_default().push(report);
    }

    groups
        .into_iter()
        .map(|(branch_code, group)| {
            let count = group.len() as f64;
            let mean = |value: fn(&WeeklyReport) -> f64| {
                group.iter().map(|report| value(report)).sum::<f64>() / count
            };
            BranchAverages {
                branch_code: branch_code.to_string(),
                total_weeks: group.len() as i32,
                avg_attendance: mean(|r| r.attendance_percent),
                avg_test_attendance: mean(|r| r.test_attendance_percent),
                avg_test_pass: mean(|r| r.test_pass_percent),
                avg_overall_score: mean(|r| r.computed.overall_score),
                avg_syllabus_covered: mean(|r| f64::from(r.syllabus_covered)),
                avg_syllabus_total: mean(|r| f64::from(r.syllabus_total)),
            }
        })
        .collect()
}

/// Score used for a summary's grade, from its three effective values.
pub fn summary_score(summary: &AggregateSummary) -> f64 {
    summary.avg_attendance * metrics::ATTENDANCE_WEIGHT
        + summary.avg_test_pass * metrics::TEST_WEIGHT
        + summary.syllabus_completion_percent * metrics::SYLLABUS_WEIGHT
}

/// Recomputes grade and risk from the effective values currently on the summary.
pub fn regrade(summary: &mut AggregateSummary) {
    summary.performance_grade = metrics::grade(summary_score(summary));
    summary.risk_level = risk::risk_level(
        summary.avg_attendance,
        summary.avg_test_pass,
        risk::syllabus_lagging(summary.syllabus_completion_percent),
    );
}

/// Builds the refreshed summary. `ai_values` are always replaced; each
/// effective field keeps its override when one exists.
pub fn reconcile(averages: &BranchAverages, existing: Option<&AggregateSummary>) -> AggregateSummary {
    let overrides = existing
        .map(|summary| summary.overrides.clone())
        .unwrap_or_default();
    let ai_values = averages.ai_values();

    let mut summary = AggregateSummary {
        branch_code: averages.branch_code.clone(),
        total_weeks: averages.total_weeks,
        avg_attendance: 0.0,
        avg_test_attendance: averages.avg_test_attendance,
        avg_test_pass: 0.0,
        avg_overall_score: averages.avg_overall_score,
        syllabus_completion_percent: 0.0,
        performance_grade: metrics::grade(0.0),
        risk_level: RiskLevel::Healthy,
        ai_values,
        overrides,
        updated_at: Utc::now(),
    };

    for field in EditableField::ALL {
        let value = summary
            .overrides
            .get(&field)
            .or_else(|| summary.ai_values.get(&field))
            .copied()
            .unwrap_or(0.0);
        summary.set_effective(field, value);
    }
    regrade(&mut summary);
    summary
}

/// Recomputes summaries from finalized reports, for one branch or all of them.
pub async fn refresh(store: &dyn Store, branch_code: Option<&str>) -> Result<Vec<AggregateSummary>> {
    let filter = ReportFilter {
        branch_code: branch_code.map(str::to_string),
        status: Some(ReportStatus::Finalized),
        ..ReportFilter::default()
    };
    let reports = store.list_reports(&filter).await?;

    let mut refreshed = Vec::new();
    for averages in average_by_branch(&reports) {
        let existing = store.get_summary(&averages.branch_code).await?;
        let summary = reconcile(&averages, existing.as_ref());
        store.upsert_summary(&summary).await?;
        refreshed.push(summary);
    }

    info!(
        "refreshed {} branch summaries from {} finalized reports",
        refreshed.len(),
        reports.len()
    );
    Ok(refreshed)
}
