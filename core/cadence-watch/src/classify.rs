//! Heuristic classification of page events into action kinds.
//!
//! Control descriptors and labels come from a page we do not control, so
//! matching is deliberately loose: substring checks on descriptors, a
//! case-insensitive pattern for the quote menu label. First match wins.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::event::PageEvent;

static QUOTE_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)quote").unwrap());

/// Page markers that indicate attached media on a composer submit. Matched
/// as case-insensitive substrings.
pub const MEDIA_MARKERS: [&str; 5] = ["attachments", "image", "video", "videoPlayer", "media"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Post,
    Reply,
    Like,
    Unlike,
    Repost,
    Quote,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Post => "post",
            ActionKind::Reply => "reply",
            ActionKind::Like => "like",
            ActionKind::Unlike => "unlike",
            ActionKind::Repost => "repost",
            ActionKind::Quote => "quote",
        }
    }
}

pub trait Classifier {
    fn classify(&self, event: &PageEvent) -> Option<ActionKind>;
}

pub struct HeuristicClassifier;

impl Classifier for HeuristicClassifier {
    fn classify(&self, event: &PageEvent) -> Option<ActionKind> {
        match event {
            PageEvent::Click {
                control,
                label,
                pressed,
                ..
            } => {
                let labeled_post = control.contains("tweet")
                    && label
                        .as_deref()
                        .map(|label| label.contains("Post"))
                        .unwrap_or(false);
                if control.contains("tweetButton") || labeled_post {
                    return Some(ActionKind::Post);
                }
                if control == "reply" {
                    return Some(ActionKind::Reply);
                }
                if control == "like" || control == "unlike" {
                    // An un-pressed or stateless control is a like in
                    // progress; a pressed one is being un-done.
                    return Some(if *pressed == Some(true) {
                        ActionKind::Unlike
                    } else {
                        ActionKind::Like
                    });
                }
                if control == "retweet" {
                    return Some(ActionKind::Repost);
                }
                None
            }
            PageEvent::MenuSelect { label } => {
                if QUOTE_LABEL.is_match(label) {
                    Some(ActionKind::Quote)
                } else {
                    None
                }
            }
            PageEvent::PageSettle { .. } => None,
        }
    }
}

pub fn has_media_markers(markers: &[String]) -> bool {
    markers.iter().any(|marker| {
        let marker = marker.to_lowercase();
        MEDIA_MARKERS
            .iter()
            .any(|known| marker.contains(&known.to_lowercase()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(control: &str) -> PageEvent {
        PageEvent::Click {
            control: control.to_string(),
            label: None,
            pressed: None,
            container: None,
            composer_count: None,
        }
    }

    fn classify(event: &PageEvent) -> Option<ActionKind> {
        HeuristicClassifier.classify(event)
    }

    #[test]
    fn tweet_button_descriptors_classify_as_post() {
        assert_eq!(classify(&click("tweetButton")), Some(ActionKind::Post));
        assert_eq!(
            classify(&click("tweetButtonInline")),
            Some(ActionKind::Post)
        );
    }

    #[test]
    fn tweet_control_with_post_label_classifies_as_post() {
        let event = PageEvent::Click {
            control: "tweetComposer".to_string(),
            label: Some("Post".to_string()),
            pressed: None,
            container: None,
            composer_count: None,
        };
        assert_eq!(classify(&event), Some(ActionKind::Post));
        // Without the label the composer control is not a post.
        assert_eq!(classify(&click("tweetComposer")), None);
    }

    #[test]
    fn reply_control_classifies_as_reply() {
        assert_eq!(classify(&click("reply")), Some(ActionKind::Reply));
    }

    #[test]
    fn pressed_state_splits_like_and_unlike() {
        let like = PageEvent::Click {
            control: "like".to_string(),
            label: None,
            pressed: Some(false),
            container: None,
            composer_count: None,
        };
        assert_eq!(classify(&like), Some(ActionKind::Like));

        // Absent pressed state still reads as a like in progress.
        assert_eq!(classify(&click("like")), Some(ActionKind::Like));

        let unlike = PageEvent::Click {
            control: "unlike".to_string(),
            label: None,
            pressed: Some(true),
            container: None,
            composer_count: None,
        };
        assert_eq!(classify(&unlike), Some(ActionKind::Unlike));
    }

    #[test]
    fn retweet_classifies_as_repost() {
        assert_eq!(classify(&click("retweet")), Some(ActionKind::Repost));
    }

    #[test]
    fn quote_menu_label_matches_case_insensitively() {
        let quote = PageEvent::MenuSelect {
            label: "Quote post".to_string(),
        };
        assert_eq!(classify(&quote), Some(ActionKind::Quote));

        let lower = PageEvent::MenuSelect {
            label: "quote".to_string(),
        };
        assert_eq!(classify(&lower), Some(ActionKind::Quote));

        let repost = PageEvent::MenuSelect {
            label: "Repost".to_string(),
        };
        assert_eq!(classify(&repost), None);
    }

    #[test]
    fn unrelated_controls_classify_as_nothing() {
        assert_eq!(classify(&click("bookmark")), None);
        assert_eq!(classify(&click("share")), None);
        let settle = PageEvent::PageSettle { markers: vec![] };
        assert_eq!(classify(&settle), None);
    }

    #[test]
    fn media_markers_match_substrings_case_insensitively() {
        let markers = vec!["VideoPlayer-main".to_string()];
        assert!(has_media_markers(&markers));
        assert!(has_media_markers(&["attachments".to_string()]));
        assert!(has_media_markers(&["profile Image preview".to_string()]));
        assert!(!has_media_markers(&["poll".to_string()]));
        assert!(!has_media_markers(&[]));
    }
}
