//! Counting policy on top of classification.
//!
//! The tracker turns classified actions into counter bumps, owning the
//! pieces classification cannot see: duplicate suppression, the quote-menu
//! window a repost arms, the media-settle window a post opens, and the
//! once-per-container thread rule.
//!
//! ```text
//! Post        → tweets +1 daily, open media window,
//!               threads +1 weekly when several composers were open
//! Reply       → replies +1 daily
//! Like/Unlike → likes +1 / -1 daily (undo only within this session)
//! Repost      → nothing; arms the quote-menu window
//! Quote       → quotes +1 daily while the window is open
//! PageSettle  → media +1 daily and weekly when markers match
//! ```
//!
//! A sink failure is logged and dropped; watching must outlive a daemon
//! restart.

use cadence_daemon_protocol::{Metric, Scope};
use chrono::{DateTime, Duration, Utc};

use crate::classify::{self, ActionKind, Classifier, HeuristicClassifier};
use crate::dedup::{self, SessionCache};
use crate::event::{ContainerRef, PageEvent};

const QUOTE_WINDOW_SECS: i64 = 3;
const MEDIA_SETTLE_SECS: i64 = 3;

/// Where counted actions go. The production sink talks to the daemon;
/// tests record.
pub trait CounterSink {
    fn bump(&mut self, metric: Metric, amount: i64, scope: Scope) -> Result<(), String>;
}

struct PendingWindow {
    container: Option<ContainerRef>,
    opened_at: DateTime<Utc>,
}

impl PendingWindow {
    fn is_open(&self, now: DateTime<Utc>, window_secs: i64) -> bool {
        now.signed_duration_since(self.opened_at) <= Duration::seconds(window_secs)
    }
}

pub struct Tracker<S> {
    sink: S,
    classifier: Box<dyn Classifier>,
    cache: SessionCache,
    session: String,
    pending_quote: Option<PendingWindow>,
    pending_media: Option<PendingWindow>,
}

impl<S: CounterSink> Tracker<S> {
    pub fn new(sink: S) -> Self {
        Self::with_session(sink, dedup::session_token())
    }

    pub fn with_session(sink: S, session: String) -> Self {
        Self {
            sink,
            classifier: Box::new(HeuristicClassifier),
            cache: SessionCache::new(),
            session,
            pending_quote: None,
            pending_media: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn sink(&self) -> &S {
        &self.sink
    }

    pub fn observe(&mut self, event: &PageEvent, now: DateTime<Utc>) {
        if let Some(kind) = self.classifier.classify(event) {
            self.apply(kind, event, now);
            return;
        }
        if let PageEvent::PageSettle { markers } = event {
            self.settle(markers, now);
        }
    }

    fn apply(&mut self, kind: ActionKind, event: &PageEvent, now: DateTime<Utc>) {
        let container = match event {
            PageEvent::Click { container, .. } => container.as_ref(),
            _ => None,
        };
        match kind {
            ActionKind::Post => self.track_post(event, container, now),
            ActionKind::Reply => self.track_once(ActionKind::Reply, Metric::Replies, container, now),
            ActionKind::Like => self.track_like(container, now),
            ActionKind::Unlike => self.track_unlike(container, now),
            ActionKind::Repost => {
                // The repost itself counts nothing; the quote, if the user
                // picks it from the menu, does.
                self.pending_quote = Some(PendingWindow {
                    container: container.cloned(),
                    opened_at: now,
                });
            }
            ActionKind::Quote => self.track_quote(now),
        }
    }

    fn track_post(
        &mut self,
        event: &PageEvent,
        container: Option<&ContainerRef>,
        now: DateTime<Utc>,
    ) {
        let id = dedup::action_id(&self.session, ActionKind::Post.as_str(), container);
        if !self.cache.insert(&id, now) {
            tracing::debug!(action = %id, "duplicate post ignored");
            return;
        }
        self.submit(Metric::Tweets, 1, Scope::Daily);
        self.pending_media = Some(PendingWindow {
            container: container.cloned(),
            opened_at: now,
        });

        let composer_count = match event {
            PageEvent::Click { composer_count, .. } => composer_count.unwrap_or(0),
            _ => 0,
        };
        if composer_count > 1 {
            let thread_id = dedup::action_id(&self.session, "thread", container);
            if self.cache.insert(&thread_id, now) {
                self.submit(Metric::Threads, 1, Scope::Weekly);
            }
        }
    }

    fn track_once(
        &mut self,
        kind: ActionKind,
        metric: Metric,
        container: Option<&ContainerRef>,
        now: DateTime<Utc>,
    ) {
        let id = dedup::action_id(&self.session, kind.as_str(), container);
        if !self.cache.insert(&id, now) {
            tracing::debug!(action = %id, "duplicate action ignored");
            return;
        }
        self.submit(metric, 1, Scope::Daily);
    }

    fn track_like(&mut self, container: Option<&ContainerRef>, now: DateTime<Utc>) {
        let id = dedup::action_id(&self.session, ActionKind::Like.as_str(), container);
        if self.cache.insert(&id, now) {
            self.submit(Metric::Likes, 1, Scope::Daily);
        }
    }

    fn track_unlike(&mut self, container: Option<&ContainerRef>, now: DateTime<Utc>) {
        // Unlike shares the like identifier: it can only undo a like this
        // session recorded.
        let id = dedup::action_id(&self.session, ActionKind::Like.as_str(), container);
        if self.cache.remove(&id) {
            self.submit(Metric::Likes, -1, Scope::Daily);
        }
    }

    fn track_quote(&mut self, now: DateTime<Utc>) {
        let Some(window) = self.pending_quote.take() else {
            return;
        };
        if !window.is_open(now, QUOTE_WINDOW_SECS) {
            tracing::debug!("quote menu selection after the window closed, ignored");
            return;
        }
        let id = dedup::action_id(
            &self.session,
            ActionKind::Quote.as_str(),
            window.container.as_ref(),
        );
        if self.cache.insert(&id, now) {
            self.submit(Metric::Quotes, 1, Scope::Daily);
        }
    }

    fn settle(&mut self, markers: &[String], now: DateTime<Utc>) {
        let Some(window) = self.pending_media.take() else {
            return;
        };
        if !window.is_open(now, MEDIA_SETTLE_SECS) {
            return;
        }
        if !classify::has_media_markers(markers) {
            return;
        }
        // Media counts toward both periods, once per composer submit.
        self.submit(Metric::Media, 1, Scope::Daily);
        self.submit(Metric::Media, 1, Scope::Weekly);
    }

    fn submit(&mut self, metric: Metric, amount: i64, scope: Scope) {
        if let Err(err) = self.sink.bump(metric, amount, scope) {
            tracing::warn!(
                error = %err,
                metric = metric.as_str(),
                amount,
                "failed to record bump"
            );
        }
    }
}
