//! Score formulas for weekly reports and branch summaries.
//!
//! Weights are fixed: attendance 40%, test effectiveness 40%, syllabus 20%.

use crate::models::Grade;

pub const ATTENDANCE_WEIGHT: f64 = 0.4;
pub const TEST_WEIGHT: f64 = 0.4;
pub const SYLLABUS_WEIGHT: f64 = 0.2;

pub fn syllabus_completion(covered: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    covered / total * 100.0
}

pub fn test_effectiveness(test_attendance_percent: f64, test_pass_percent: f64) -> f64 {
    test_attendance_percent * test_pass_percent / 100.0
}

pub fn overall_score(attendance_percent: f64, test_effectiveness: f64, syllabus_percent: f64) -> f64 {
    attendance_percent * ATTENDANCE_WEIGHT
        + test_effectiveness * TEST_WEIGHT
        + syllabus_percent * SYLLABUS_WEIGHT
}

pub fn grade(score: f64) -> Grade {
    if score >= 90.0 {
        Grade::APlus
    } else if score >= 80.0 {
        Grade::A
    } else if score >= 70.0 {
        Grade::BPlus
    } else if score >= 60.0 {
        Grade::B
    } else if score >= 50.0 {
        Grade::C
    } else {
        Grade::D
    }
}

pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    part / whole * 100.0
}

pub fn is_percent(value: f64) -> bool {
    (0.0..=100.0).contains(&value)
}

/// Rounds to one decimal place for display series.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
