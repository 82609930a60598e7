//! Progress notifications emitted while refreshing descriptor files.

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

/// A lifecycle event for the run or one of its items.
///
/// Serializes with a `type` tag, e.g. `{"type":"success","file":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event<'a> {
    /// Number of governed items about to be fetched.
    Before { size: usize },
    Requesting { file: &'a Path, url: &'a str },
    Success { file: &'a Path },
    /// The server answered with a status of 300 or above; the file is untouched.
    Warning {
        file: &'a Path,
        url: &'a str,
        code: u16,
    },
    /// Transport, write or resolution failure for a single item.
    Failed {
        file: &'a Path,
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<&'a str>,
        error: String,
    },
}

/// Observer for run progress.
pub trait Notifier {
    fn notify(&self, event: &Event<'_>);
}

impl<F> Notifier for F
where
    F: Fn(&Event<'_>),
{
    fn notify(&self, event: &Event<'_>) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: &Event<'_>) {}
}

/// Reports events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &Event<'_>) {
        match event {
            Event::Before { size } => info!(size, "refreshing descriptor files"),
            Event::Requesting { file, url } => {
                info!(file = %file.display(), url, "requesting")
            }
            Event::Success { file } => info!(file = %file.display(), "updated"),
            Event::Warning { file, url, code } => {
                warn!(file = %file.display(), url, status = code, "unexpected response status")
            }
            Event::Failed { file, url, error } => {
                warn!(file = %file.display(), url = url.unwrap_or_default(), error = %error, "refresh failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_events_serialize_with_type_tag() {
        let before = serde_json::to_value(Event::Before { size: 2 }).unwrap();
        assert_eq!(before, serde_json::json!({"type": "before", "size": 2}));

        let warning = serde_json::to_value(Event::Warning {
            file: Path::new("/r/a.json"),
            url: "http://example.com/a",
            code: 404,
        })
        .unwrap();
        assert_eq!(
            warning,
            serde_json::json!({
                "type": "warning",
                "file": "/r/a.json",
                "url": "http://example.com/a",
                "code": 404
            })
        );
    }

    #[test]
    fn test_failed_without_url_omits_field() {
        let failed = serde_json::to_value(Event::Failed {
            file: Path::new("/r/a.json"),
            url: None,
            error: "boom".into(),
        })
        .unwrap();

        assert!(failed.get("url").is_none());
        assert_eq!(failed["error"], "boom");
    }

    #[test]
    fn test_closure_is_a_notifier() {
        let seen = RefCell::new(Vec::new());
        let notifier = |event: &Event<'_>| {
            if let Event::Before { size } = event {
                seen.borrow_mut().push(*size);
            }
        };

        notifier.notify(&Event::Before { size: 3 });
        assert_eq!(*seen.borrow(), [3]);
    }
}
