//! Weekly trends, rule-based insights and short-range projections.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::db::Store;
use crate::error::{Error, Result};
use crate::metrics::round1;
use crate::models::{AggregateSummary, ReportFilter, ReportStatus, WeeklyReport, WeeklyTrend};

pub const MAX_INSIGHTS: usize = 5;
pub const MAX_BRANCH_INSIGHTS: usize = 4;
pub const DEFAULT_HORIZON: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Trend,
    Anomaly,
    Attention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub sentiment: Sentiment,
}

impl Insight {
    fn new(
        id: impl Into<String>,
        kind: InsightKind,
        title: &str,
        description: String,
        sentiment: Sentiment,
    ) -> Self {
        Insight {
            id: id.into(),
            kind,
            title: title.to_string(),
            description,
            sentiment,
        }
    }
}

/// One week of a single branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub week_no: i32,
    pub attendance: f64,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Benchmark {
    pub attendance: f64,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub week_no: i32,
    pub label: String,
    pub attendance: f64,
    pub pass_rate: f64,
    pub projected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub trend: Vec<WeeklyTrend>,
    pub insights: Vec<Insight>,
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchAnalytics {
    pub branch_code: String,
    pub series: Vec<SeriesPoint>,
    pub benchmark: Option<Benchmark>,
    pub insights: Vec<Insight>,
    pub predictions: Vec<Prediction>,
}

/// Per-week means across branches, oldest week first.
pub fn weekly_trends(reports: &[WeeklyReport]) -> Vec<WeeklyTrend> {
    let mut weeks: BTreeMap<i32, Vec<&WeeklyReport>> = BTreeMap::new();
    for report in reports {
        weeks.entry(report.week_no).or_default().push(report);
    }

    weeks
        .into_iter()
        .map(|(week_no, group)| {
            let count = group.len() as f64;
            let mean = |value: fn(&WeeklyReport) -> f64| {
                round1(group.iter().map(|report| value(report)).sum::<f64>() / count)
            };
            WeeklyTrend {
                week_no,
                attendance: mean(|r| r.attendance_percent),
                test_pass: mean(|r| r.test_pass_percent),
                overall_score: mean(|r| r.computed.overall_score),
                report_count: group.len(),
            }
        })
        .collect()
}

pub fn branch_series(reports: &[WeeklyReport], branch_code: &str) -> Vec<SeriesPoint> {
    let mut series: Vec<SeriesPoint> = reports
        .iter()
        .filter(|report| report.branch_code == branch_code)
        .map(|report| SeriesPoint {
            week_no: report.week_no,
            attendance: report.attendance_percent,
            pass_rate: report.test_pass_percent,
        })
        .collect();
    series.sort_by_key(|point| point.week_no);
    series
}

/// Mean effective attendance and pass rate across all summaries.
pub fn benchmark(summaries: &[AggregateSummary]) -> Option<Benchmark> {
    if summaries.is_empty() {
        return None;
    }
    let count = summaries.len() as f64;
    Some(Benchmark {
        attendance: summaries.iter().map(|s| s.avg_attendance).sum::<f64>() / count,
        pass_rate: summaries.iter().map(|s| s.avg_test_pass).sum::<f64>() / count,
    })
}

pub fn rule_based_insights(trend: &[WeeklyTrend], summaries: &[AggregateSummary]) -> Vec<Insight> {
    let mut insights = Vec::new();

    if let [.., prev, last] = trend {
        let diff = last.attendance - prev.attendance;
        if diff.abs() > 2.0 {
            let (title, verb, sentiment) = if diff > 0.0 {
                ("Attendance Improving", "increased", Sentiment::Positive)
            } else {
                ("Attendance Declining", "dropped", Sentiment::Negative)
            };
            insights.push(Insight::new(
                "attendance-trend",
                InsightKind::Trend,
                title,
                format!(
                    "Overall attendance has {verb} by {:.1}% from week {} ({}%) to week {} ({}%).",
                    diff.abs(),
                    prev.week_no,
                    prev.attendance,
                    last.week_no,
                    last.attendance
                ),
                sentiment,
            ));
        }
    }

    let lowest = summaries
        .iter()
        .min_by(|a, b| a.avg_test_pass.total_cmp(&b.avg_test_pass));
    if let Some(branch) = lowest.filter(|branch| branch.avg_test_pass < 50.0) {
        insights.push(Insight::new(
            "low-perf-branch",
            InsightKind::Attention,
            "Critical Performance Issue",
            format!(
                "Branch {} has an average test pass rate of only {:.1}%.",
                branch.branch_code, branch.avg_test_pass
            ),
            Sentiment::Negative,
        ));
    }

    for branch in summaries
        .iter()
        .filter(|branch| branch.avg_attendance > 90.0 && branch.avg_test_pass < 60.0)
    {
        insights.push(Insight::new(
            format!("variance-{}", branch.branch_code),
            InsightKind::Anomaly,
            "Attendance-Performance Mismatch",
            format!(
                "{} has high attendance ({:.1}%) but low test scores ({:.1}%).",
                branch.branch_code, branch.avg_attendance, branch.avg_test_pass
            ),
            Sentiment::Negative,
        ));
    }

    let lagging: Vec<&str> = summaries
        .iter()
        .filter(|branch| branch.syllabus_completion_percent < 50.0)
        .map(|branch| branch.branch_code.as_str())
        .collect();
    if !lagging.is_empty() {
        insights.push(Insight::new(
            "syllabus-lag",
            InsightKind::Attention,
            "Syllabus Behind Schedule",
            format!(
                "{} branch(es) ({}) are less than 50% through their syllabus.",
                lagging.len(),
                lagging.join(", ")
            ),
            Sentiment::Negative,
        ));
    }

    insights.truncate(MAX_INSIGHTS);
    insights
}

pub fn branch_insights(series: &[SeriesPoint], benchmark: Option<Benchmark>) -> Vec<Insight> {
    let mut insights = Vec::new();
    let Some(latest) = series.last() else {
        return insights;
    };
    let prev = series.len().checked_sub(2).map(|index| &series[index]);

    if let Some(prev) = prev {
        let diff = latest.attendance - prev.attendance;
        if diff.abs() > 5.0 {
            let (title, verb, sentiment) = if diff > 0.0 {
                ("Surging Attendance", "increase", Sentiment::Positive)
            } else {
                ("Attendance Drop", "decrease", Sentiment::Negative)
            };
            insights.push(Insight::new(
                "sec-att-trend",
                InsightKind::Trend,
                title,
                format!("Attendance saw a {:.1}% {verb} this week.", diff.abs()),
                sentiment,
            ));
        }
    }

    if let Some(benchmark) = benchmark {
        let diff = latest.pass_rate - benchmark.pass_rate;
        if diff > 10.0 {
            insights.push(Insight::new(
                "sec-peer-high",
                InsightKind::Trend,
                "High Performance Lead",
                format!("Pass rate is {diff:.1}% above the department average."),
                Sentiment::Positive,
            ));
        } else if diff < -15.0 {
            insights.push(Insight::new(
                "sec-peer-low",
                InsightKind::Attention,
                "Below Benchmark",
                format!("Pass rate is {:.1}% below the department average.", diff.abs()),
                Sentiment::Negative,
            ));
        }
    }

    if latest.attendance > 90.0 && latest.pass_rate < 50.0 {
        insights.push(Insight::new(
            "sec-mismatch",
            InsightKind::Anomaly,
            "Performance Paradox",
            "Attendance is above 90% while the pass rate is below 50%.".to_string(),
            Sentiment::Negative,
        ));
    }

    if let Some(prev) = prev {
        let surge = latest.pass_rate - prev.pass_rate;
        if surge > 20.0 {
            insights.push(Insight::new(
                "sec-surge",
                InsightKind::Trend,
                "Remarkable Velocity",
                format!("Pass rate surged by {surge:.1}% this week."),
                Sentiment::Positive,
            ));
        }
    }

    insights.truncate(MAX_BRANCH_INSIGHTS);
    insights
}

/// Least-squares slope and intercept over x = 0, 1, 2, ...
fn regression(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    if values.len() < 2 {
        return (0.0, values.first().copied().unwrap_or(0.0));
    }

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x);
    let intercept = (sum_y - slope * sum_x) / n;
    (slope, intercept)
}

/// Projects attendance and pass rate `horizon` weeks past the last point.
/// Needs at least two points.
pub fn predictions(series: &[SeriesPoint], horizon: usize) -> Vec<Prediction> {
    let Some(last) = series.last() else {
        return Vec::new();
    };
    if series.len() < 2 {
        return Vec::new();
    }

    let attendance: Vec<f64> = series.iter().map(|point| point.attendance).collect();
    let pass: Vec<f64> = series.iter().map(|point| point.pass_rate).collect();
    let (att_slope, att_intercept) = regression(&attendance);
    let (pass_slope, pass_intercept) = regression(&pass);
    let project = |slope: f64, intercept: f64, x: f64| round1((slope * x + intercept).clamp(0.0, 100.0));

    (1..=horizon)
        .map(|step| {
            let x = (series.len() + step - 1) as f64;
            let week_no = last.week_no + step as i32;
            Prediction {
                week_no,
                label: format!("W{week_no} (P)"),
                attendance: project(att_slope, att_intercept, x),
                pass_rate: project(pass_slope, pass_intercept, x),
                projected: true,
            }
        })
        .collect()
}

fn trend_series(trend: &[WeeklyTrend]) -> Vec<SeriesPoint> {
    trend
        .iter()
        .map(|week| SeriesPoint {
            week_no: week.week_no,
            attendance: week.attendance,
            pass_rate: week.test_pass,
        })
        .collect()
}

async fn finalized_reports(store: &dyn Store, branch_code: Option<&str>) -> Result<Vec<WeeklyReport>> {
    let filter = ReportFilter {
        branch_code: branch_code.map(str::to_string),
        status: Some(ReportStatus::Finalized),
        ..ReportFilter::default()
    };
    store.list_reports(&filter).await
}

pub async fn overview(store: &dyn Store) -> Result<Overview> {
    let reports = finalized_reports(store, None).await?;
    let summaries = store.list_summaries().await?;
    let trend = weekly_trends(&reports);

    Ok(Overview {
        insights: rule_based_insights(&trend, &summaries),
        predictions: predictions(&trend_series(&trend), DEFAULT_HORIZON),
        trend,
    })
}

pub async fn for_branch(store: &dyn Store, branch_code: &str) -> Result<BranchAnalytics> {
    let reports = finalized_reports(store, Some(branch_code)).await?;
    if reports.is_empty() {
        return Err(Error::NotFound(format!("finalized reports for {branch_code}")));
    }
    let summaries = store.list_summaries().await?;
    let series = branch_series(&reports, branch_code);
    let benchmark = benchmark(&summaries);

    Ok(BranchAnalytics {
        branch_code: branch_code.to_string(),
        insights: branch_insights(&series, benchmark),
        predictions: predictions(&series, DEFAULT_HORIZON),
        benchmark,
        series,
    })
}
