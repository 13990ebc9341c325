use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::aggregation::summary_score;
use crate::db::Store;
use crate::error::Result;
use crate::insights::{self, Insight};
use crate::models::{AggregateSummary, WeeklyTrend};
use crate::risk;

pub fn build_report(
    generated_at: DateTime<Utc>,
    summaries: &[AggregateSummary],
    trend: &[WeeklyTrend],
    insights: &[Insight],
) -> String {
    let mut ranked = summaries.to_vec();
    ranked.sort_by(|a, b| {
        summary_score(b)
            .total_cmp(&summary_score(a))
            .then_with(|| a.branch_code.cmp(&b.branch_code))
    });
    let board = risk::risk_board(summaries);

    let mut output = String::new();
    let _ = writeln!(output, "# CRT Branch Performance Report");
    let _ = writeln!(output, "Generated {}", generated_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Branch Standings");

    if ranked.is_empty() {
        let _ = writeln!(output, "No finalized reports yet.");
    } else {
        for summary in &ranked {
            let edited = if summary.overrides.is_empty() {
                ""
            } else {
                " (manually adjusted)"
            };
            let _ = writeln!(
                output,
                "- {}: grade {}, attendance {:.1}%, pass {:.1}%, syllabus {:.1}% over {} weeks, {}{}",
                summary.branch_code,
                summary.performance_grade,
                summary.avg_attendance,
                summary.avg_test_pass,
                summary.syllabus_completion_percent,
                summary.total_weeks,
                risk_label(summary),
                edited
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Trend");

    if trend.is_empty() {
        let _ = writeln!(output, "No finalized weeks yet.");
    } else {
        for week in trend {
            let _ = writeln!(
                output,
                "- Week {}: attendance {:.1}%, pass {:.1}%, score {:.1} ({} branches)",
                week.week_no, week.attendance, week.test_pass, week.overall_score, week.report_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Watch List");

    if board.high_risk.is_empty() && board.critical_syllabus.is_empty() {
        let _ = writeln!(output, "No branches below the risk thresholds.");
    } else {
        for summary in &board.high_risk {
            let _ = writeln!(
                output,
                "- {} is high risk (attendance {:.1}%, pass {:.1}%)",
                summary.branch_code, summary.avg_attendance, summary.avg_test_pass
            );
        }
        for summary in &board.critical_syllabus {
            let _ = writeln!(
                output,
                "- {} syllabus critically behind at {:.1}%",
                summary.branch_code, summary.syllabus_completion_percent
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Insights");

    if insights.is_empty() {
        let _ = writeln!(output, "Nothing unusual this period.");
    } else {
        for insight in insights {
            let _ = writeln!(output, "- **{}**: {}", insight.title, insight.description);
        }
    }

    output
}

fn risk_label(summary: &AggregateSummary) -> String {
    serde_json::to_value(summary.risk_level)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Loads everything the markdown report needs from the store.
pub async fn render(store: &dyn Store) -> Result<String> {
    let overview = insights::overview(store).await?;
    let summaries = store.list_summaries().await?;
    Ok(build_report(
        Utc::now(),
        &summaries,
        &overview.trend,
        &overview.insights,
    ))
}
