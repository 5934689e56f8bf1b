//! Page interaction events emitted by the browser-side collector.
//!
//! One JSON object per stdin line, tagged by `event`. Fields beyond the tag
//! are optional so a collector running against a shifted page layout still
//! produces parseable lines.

use serde::{Deserialize, Serialize};

/// Reference to the content item enclosing a click, in decreasing order of
/// stability: an explicit item id, a permalink, or the item's leading text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerRef {
    pub item_id: Option<String>,
    pub permalink: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PageEvent {
    /// A click on an interactive control.
    Click {
        /// Raw control descriptor (the page's `data-testid`-style name).
        control: String,
        #[serde(default)]
        label: Option<String>,
        /// Toggle state (`aria-pressed`) at click time, when the control
        /// carries one.
        #[serde(default)]
        pressed: Option<bool>,
        #[serde(default)]
        container: Option<ContainerRef>,
        /// Number of composer textareas open at click time.
        #[serde(default)]
        composer_count: Option<u32>,
    },
    /// A transient menu item selected shortly after a click.
    MenuSelect { label: String },
    /// Page observations reported a short delay after a composer submit.
    PageSettle {
        #[serde(default)]
        markers: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_click_with_full_container() {
        let event: PageEvent = serde_json::from_str(
            r#"{"event":"click","control":"like","pressed":false,
                "container":{"item_id":"1842","permalink":null,"text":"hello"}}"#,
        )
        .unwrap();
        match event {
            PageEvent::Click {
                control,
                pressed,
                container,
                ..
            } => {
                assert_eq!(control, "like");
                assert_eq!(pressed, Some(false));
                let container = container.unwrap();
                assert_eq!(container.item_id.as_deref(), Some("1842"));
                assert_eq!(container.text.as_deref(), Some("hello"));
            }
            other => panic!("expected click, got {:?}", other),
        }
    }

    #[test]
    fn optional_click_fields_default() {
        let event: PageEvent =
            serde_json::from_str(r#"{"event":"click","control":"tweetButton"}"#).unwrap();
        match event {
            PageEvent::Click {
                label,
                pressed,
                container,
                composer_count,
                ..
            } => {
                assert_eq!(label, None);
                assert_eq!(pressed, None);
                assert_eq!(container, None);
                assert_eq!(composer_count, None);
            }
            other => panic!("expected click, got {:?}", other),
        }
    }

    #[test]
    fn parses_menu_select_and_page_settle() {
        let menu: PageEvent =
            serde_json::from_str(r#"{"event":"menu_select","label":"Quote post"}"#).unwrap();
        assert_eq!(
            menu,
            PageEvent::MenuSelect {
                label: "Quote post".to_string()
            }
        );

        let settle: PageEvent =
            serde_json::from_str(r#"{"event":"page_settle","markers":["videoPlayer"]}"#).unwrap();
        assert_eq!(
            settle,
            PageEvent::PageSettle {
                markers: vec!["videoPlayer".to_string()]
            }
        );
    }

    #[test]
    fn unknown_event_tag_is_an_error() {
        assert!(serde_json::from_str::<PageEvent>(r#"{"event":"scroll"}"#).is_err());
    }
}
