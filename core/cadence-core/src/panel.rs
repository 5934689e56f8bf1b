//! Snapshot presentation shared by the CLI status view and the popup.
//!
//! [`Panel::build`] turns a raw snapshot into display rows with percentages
//! and band colors already resolved, so clients only lay the rows out.

use serde::Serialize;

use cadence_daemon_protocol::{Metric, Snapshot};

use crate::progress::{self, metric_percent, ProgressBand, DAILY_METRICS};

#[derive(Debug, Clone, Serialize)]
pub struct MetricRow {
    pub metric: &'static str,
    pub count: u32,
    pub goal: Option<u32>,
    pub percent: u8,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Panel {
    pub daily_key: Option<String>,
    pub weekly_key: Option<String>,
    pub daily_percent: u8,
    pub daily_color: &'static str,
    pub weekly_percent: u8,
    pub weekly_color: &'static str,
    pub daily_rows: Vec<MetricRow>,
    pub weekly_rows: Vec<MetricRow>,
}

fn row(metric: &'static str, count: u32, goal: Option<u32>) -> MetricRow {
    let percent = metric_percent(count, goal);
    MetricRow {
        metric,
        count,
        goal,
        percent,
        color: ProgressBand::for_percent(percent).hex(),
    }
}

impl Panel {
    pub fn build(snapshot: &Snapshot) -> Self {
        let state = &snapshot.state;
        let goals = &snapshot.goals;

        let daily_rows = DAILY_METRICS
            .iter()
            .map(|metric| {
                let count = state.daily.get(*metric).unwrap_or(0);
                row(metric.as_str(), count, goals.get(*metric).daily)
            })
            .collect();

        // The weekly section tracks media against its floor and threads
        // against their ceiling.
        let weekly_rows = vec![
            row(
                Metric::Media.as_str(),
                state.weekly.media,
                goals.media.weekly_min,
            ),
            row(
                Metric::Threads.as_str(),
                state.weekly.threads,
                goals.threads.weekly_max,
            ),
        ];

        let daily_percent = progress::daily_completion(&state.daily, goals);
        let weekly_percent = progress::weekly_completion(&state.weekly, goals);

        Panel {
            daily_key: state.daily_key.clone(),
            weekly_key: state.weekly_key.clone(),
            daily_percent,
            daily_color: ProgressBand::for_percent(daily_percent).hex(),
            weekly_percent,
            weekly_color: ProgressBand::for_percent(weekly_percent).hex(),
            daily_rows,
            weekly_rows,
        }
    }

    /// Plain-text rendering for terminal status output.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let daily_label = self.daily_key.as_deref().unwrap_or("today");
        let weekly_label = self.weekly_key.as_deref().unwrap_or("this week");

        out.push_str(&format!(
            "── Daily {} ({}%) ─────────────────────\n",
            daily_label, self.daily_percent
        ));
        for row in &self.daily_rows {
            out.push_str(&render_row(row));
        }
        out.push_str(&format!(
            "── Weekly {} ({}%) ────────────────────\n",
            weekly_label, self.weekly_percent
        ));
        for row in &self.weekly_rows {
            out.push_str(&render_row(row));
        }
        out
    }
}

fn render_row(row: &MetricRow) -> String {
    let goal = match row.goal {
        Some(goal) => goal.to_string(),
        None => "-".to_string(),
    };
    format!(
        "  {:<8} {:>4}/{:<4} {:>3}%\n",
        row.metric, row.count, goal, row.percent
    )
}
