//! The stdin event loop.
//!
//! Reads one JSON page event per line and feeds the tracker. Malformed
//! lines are logged and skipped; the collector on the other end of the pipe
//! is not trusted to stay well-formed across page redesigns.

use std::io::{self, BufRead};

use chrono::Utc;

use crate::daemon_client::DaemonSink;
use crate::event::PageEvent;
use crate::tracker::{CounterSink, Tracker};

pub fn run() -> Result<(), String> {
    let sink = DaemonSink::from_env()?;
    let mut tracker = Tracker::new(sink);
    tracing::info!("watch loop started");
    run_loop(io::stdin().lock(), &mut tracker);
    tracing::info!("watch loop ended");
    Ok(())
}

fn run_loop<R: BufRead, S: CounterSink>(reader: R, tracker: &mut Tracker<S>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "stdin read failed, stopping");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<PageEvent>(&line) {
            Ok(event) => tracker.observe(&event, Utc::now()),
            Err(err) => {
                tracing::debug!(error = %err, "skipping malformed event line");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_daemon_protocol::{Metric, Scope};
    use std::io::Cursor;

    #[derive(Default)]
    struct CollectingSink {
        bumps: Vec<(Metric, i64, Scope)>,
    }

    impl CounterSink for CollectingSink {
        fn bump(&mut self, metric: Metric, amount: i64, scope: Scope) -> Result<(), String> {
            self.bumps.push((metric, amount, scope));
            Ok(())
        }
    }

    #[test]
    fn loop_counts_valid_lines_and_skips_garbage() {
        let input = concat!(
            r#"{"event":"click","control":"tweetButton","container":{"item_id":"1"}}"#,
            "\n",
            "not json at all\n",
            "\n",
            r#"{"event":"click","control":"like","container":{"item_id":"2"}}"#,
            "\n",
            r#"{"event":"scroll"}"#,
            "\n",
        );
        let mut tracker = Tracker::with_session(CollectingSink::default(), "s1".to_string());
        run_loop(Cursor::new(input), &mut tracker);

        let bumps = tracker_bumps(&tracker);
        assert_eq!(
            bumps,
            &vec![
                (Metric::Tweets, 1, Scope::Daily),
                (Metric::Likes, 1, Scope::Daily),
            ]
        );
    }

    #[test]
    fn loop_handles_empty_input() {
        let mut tracker = Tracker::with_session(CollectingSink::default(), "s1".to_string());
        run_loop(Cursor::new(""), &mut tracker);
        assert!(tracker_bumps(&tracker).is_empty());
    }

    fn tracker_bumps(tracker: &Tracker<CollectingSink>) -> &Vec<(Metric, i64, Scope)> {
        &tracker.sink().bumps
    }
}
