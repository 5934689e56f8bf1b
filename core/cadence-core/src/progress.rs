//! Completion math for the popup panel and CLI status view.
//!
//! Completion is the mean of per-metric ratios, each capped at 1.0 so one
//! overperforming metric cannot mask the others. A zero or missing goal
//! counts as met rather than dividing by zero.

use cadence_daemon_protocol::{DailyCounts, Goals, Metric, WeeklyCounts};

/// Daily metrics in display order.
pub const DAILY_METRICS: [Metric; 5] = [
    Metric::Tweets,
    Metric::Replies,
    Metric::Likes,
    Metric::Quotes,
    Metric::Media,
];

/// How far along a count is toward its goal, capped at 1.0.
pub fn goal_ratio(count: u32, goal: Option<u32>) -> f64 {
    match goal {
        Some(goal) if goal > 0 => (f64::from(count) / f64::from(goal)).min(1.0),
        _ => 1.0,
    }
}

/// Per-row percentage, 0..=100.
pub fn metric_percent(count: u32, goal: Option<u32>) -> u8 {
    (goal_ratio(count, goal) * 100.0).round() as u8
}

/// Overall daily completion: the mean ratio across the five daily metrics,
/// as a rounded percentage.
pub fn daily_completion(counts: &DailyCounts, goals: &Goals) -> u8 {
    let total: f64 = DAILY_METRICS
        .iter()
        .map(|metric| {
            let count = counts.get(*metric).unwrap_or(0);
            goal_ratio(count, goals.get(*metric).daily)
        })
        .sum();
    (total / DAILY_METRICS.len() as f64 * 100.0).round() as u8
}

/// Overall weekly completion: the mean of the media ratio (against its
/// weekly floor) and the thread ratio (against its weekly ceiling).
pub fn weekly_completion(counts: &WeeklyCounts, goals: &Goals) -> u8 {
    let media = goal_ratio(counts.media, goals.media.weekly_min);
    let threads = goal_ratio(counts.threads, goals.threads.weekly_max);
    ((media + threads) / 2.0 * 100.0).round() as u8
}

/// Display band for a completion percentage. Bands carry the panel colors,
/// so every client renders the same palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressBand {
    Complete,
    OnTrack,
    Halfway,
    Behind,
    Stalled,
}

impl ProgressBand {
    pub fn for_percent(percent: u8) -> Self {
        match percent {
            100.. => ProgressBand::Complete,
            75..=99 => ProgressBand::OnTrack,
            50..=74 => ProgressBand::Halfway,
            25..=49 => ProgressBand::Behind,
            _ => ProgressBand::Stalled,
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            ProgressBand::Complete => "#4CAF50",
            ProgressBand::OnTrack => "#8BC34A",
            ProgressBand::Halfway => "#FFC107",
            ProgressBand::Behind => "#FF9800",
            ProgressBand::Stalled => "#F44336",
        }
    }
}
