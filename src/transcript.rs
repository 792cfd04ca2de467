use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Append-only JSON-lines record of one client session
pub struct Transcript {
    pub path: PathBuf,
    session_id: String,
    base_url: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    session_id: &'a str,
    base_url: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl Transcript {
    pub fn new(path: &Path, session_id: &str, base_url: &str) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open transcript {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            session_id: session_id.to_string(),
            base_url: base_url.to_string(),
            file,
        })
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            session_id: &self.session_id,
            base_url: &self.base_url,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }
}

/// Shared handle to the session transcript.
///
/// Cloned into every component that records activity. A disabled log
/// swallows events so callers never branch on whether logging is on.
#[derive(Clone, Default)]
pub struct ActivityLog {
    inner: Option<Rc<RefCell<Transcript>>>,
}

impl ActivityLog {
    pub fn new(transcript: Transcript) -> Self {
        Self {
            inner: Some(Rc::new(RefCell::new(transcript))),
        }
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.inner.as_ref().map(|t| t.borrow().path.clone())
    }

    fn log(&self, event_type: &str, data: serde_json::Value) {
        if let Some(transcript) = &self.inner {
            if let Err(e) = transcript.borrow_mut().log(event_type, data) {
                eprintln!("Warning: failed to write transcript: {}", e);
            }
        }
    }

    pub fn session_start(&self) {
        self.log("session_start", serde_json::json!({}))
    }

    pub fn request(&self, method: &str, url: &str) {
        self.log(
            "request",
            serde_json::json!({ "method": method, "url": url }),
        )
    }

    pub fn response(&self, url: &str, status: u16) {
        self.log(
            "response",
            serde_json::json!({ "url": url, "status": status }),
        )
    }

    pub fn transport_error(&self, url: &str, error: &str) {
        self.log(
            "transport_error",
            serde_json::json!({ "url": url, "error": error }),
        )
    }

    /// Log a notice shown to the user
    pub fn notice(&self, level: &str, text: &str) {
        self.log("notice", serde_json::json!({ "level": level, "text": text }))
    }

    /// Log a form submission and how it ended
    pub fn submission(&self, form: &str, outcome: &str) {
        self.log(
            "submission",
            serde_json::json!({ "form": form, "outcome": outcome }),
        )
    }

    /// Log a click routed through the dispatcher
    pub fn click(&self, region: &str, record_id: i64, action: Option<&str>) {
        self.log(
            "click",
            serde_json::json!({
                "region": region,
                "record_id": record_id,
                "action": action,
            }),
        )
    }
}
