use serde::Serialize;

use crate::models::{AggregateSummary, RiskLevel};

pub const HIGH_RISK_PASS_BELOW: f64 = 50.0;
pub const HIGH_RISK_ATTENDANCE_BELOW: f64 = 65.0;
pub const CRITICAL_SYLLABUS_BELOW: f64 = 30.0;
pub const LAGGING_SYLLABUS_BELOW: f64 = 50.0;

pub fn risk_level(attendance_percent: f64, test_pass_percent: f64, syllabus_lagging: bool) -> RiskLevel {
    let points = attendance_points(attendance_percent)
        + pass_points(test_pass_percent)
        + u8::from(syllabus_lagging);

    match points {
        0 => RiskLevel::Healthy,
        1..=2 => RiskLevel::NeedsAttention,
        _ => RiskLevel::Critical,
    }
}

pub fn attendance_points(attendance_percent: f64) -> u8 {
    if attendance_percent < 65.0 {
        2
    } else if attendance_percent < 75.0 {
        1
    } else {
        0
    }
}

pub fn pass_points(test_pass_percent: f64) -> u8 {
    if test_pass_percent < 50.0 {
        2
    } else if test_pass_percent < 60.0 {
        1
    } else {
        0
    }
}

pub fn syllabus_lagging(completion_percent: f64) -> bool {
    completion_percent < LAGGING_SYLLABUS_BELOW
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskBoard {
    pub high_risk: Vec<AggregateSummary>,
    pub critical_syllabus: Vec<AggregateSummary>,
}

/// Splits summaries into the two watch lists, using effective values.
pub fn risk_board(summaries: &[AggregateSummary]) -> RiskBoard {
    let high_risk = summaries
        .iter()
        .filter(|summary| {
            summary.avg_test_pass < HIGH_RISK_PASS_BELOW
                || summary.avg_attendance < HIGH_RISK_ATTENDANCE_BELOW
        })
        .cloned()
        .collect();
    let critical_syllabus = summaries
        .iter()
        .filter(|summary| summary.syllabus_completion_percent < CRITICAL_SYLLABUS_BELOW)
        .cloned()
        .collect();

    RiskBoard {
        high_risk,
        critical_syllabus,
    }
}
