//! Range checks applied before any report reaches storage.
//!
//! Out-of-range percentages are rejected rather than clamped, so a data-entry
//! slip never reaches the grade formula.

use crate::error::{Error, Result};
use crate::metrics::is_percent;
use crate::models::ReportInput;

pub const UNKNOWN_BRANCH: &str = "UNKNOWN";

/// Branch codes are stored trimmed and uppercase.
pub fn canonical_branch_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub fn report_problems(input: &ReportInput) -> Vec<String> {
    let mut problems = Vec::new();

    if input.branch_code.trim().is_empty() || input.branch_code == UNKNOWN_BRANCH {
        problems.push("invalid branch code".to_string());
    }
    if input.week_no <= 0 {
        problems.push(format!("invalid week number: {}", input.week_no));
    }
    if input.sessions < 0 {
        problems.push(format!("invalid session count: {}", input.sessions));
    }

    for (label, value) in [
        ("attendance", input.attendance_percent),
        ("test attendance", input.test_attendance_percent),
        ("test pass", input.test_pass_percent),
    ] {
        if !is_percent(value) {
            problems.push(format!("impossible {label} %: {value}"));
        }
    }

    if input.syllabus_covered < 0 || input.syllabus_total < 0 {
        problems.push("syllabus counts cannot be negative".to_string());
    } else if input.syllabus_total > 0 && input.syllabus_covered > input.syllabus_total {
        problems.push(format!(
            "covered syllabus ({}) cannot exceed total ({})",
            input.syllabus_covered, input.syllabus_total
        ));
    }

    problems
}

pub fn validate_report(input: &ReportInput) -> Result<()> {
    let problems = report_problems(input);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(problems.join(", ")))
    }
}

pub fn validate_percent(label: &str, value: f64) -> Result<()> {
    if is_percent(value) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{label} must be between 0 and 100, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ReportInput {
        ReportInput {
            branch_code: "CSE-A".to_string(),
            week_no: 3,
            sessions: 5,
            attendance_percent: 82.0,
            test_attendance_percent: 90.0,
            test_pass_percent: 64.0,
            syllabus_covered: 6,
            syllabus_total: 20,
            status: None,
        }
    }

    #[test]
    fn accepts_well_formed_report() {
        assert!(report_problems(&input()).is_empty());
        assert!(validate_report(&input()).is_ok());
    }

    #[test]
    fn rejects_attendance_above_one_hundred() {
        let mut report = input();
        report.attendance_percent = 110.0;
        let problems = report_problems(&report);
        assert_eq!(problems, vec!["impossible attendance %: 110".to_string()]);
    }

    #[test]
    fn rejects_unknown_branch_and_bad_week() {
        let mut report = input();
        report.branch_code = UNKNOWN_BRANCH.to_string();
        report.week_no = 0;
        assert_eq!(report_problems(&report).len(), 2);
    }

    #[test]
    fn rejects_covered_beyond_total() {
        let mut report = input();
        report.syllabus_covered = 21;
        let err = validate_report(&report).unwrap_err();
        assert!(err.to_string().contains("cannot exceed total"));
    }

    #[test]
    fn empty_syllabus_is_allowed() {
        let mut report = input();
        report.syllabus_covered = 0;
        report.syllabus_total = 0;
        assert!(validate_report(&report).is_ok());
    }

    #[test]
    fn percent_check_names_the_field() {
        let err = validate_percent("avg_attendance", -1.0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "avg_attendance must be between 0 and 100, got -1"
        );
    }
}
