use crate::config::Config;
use serde::Serialize;
use std::error::Error;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub const STOP: &str = "cf dev stop";

const ANALYTICS_DIR: &str = "analytics";
const EVENTS_FILE: &str = "events.jsonl";
const USER_ID_FILE: &str = "user-id";

/// Fire-and-forget usage telemetry.
pub trait Analytics {
    fn event(&self, name: &str);
}

#[derive(Debug, Serialize)]
struct EventRecord<'a> {
    event: &'a str,
    user_id: String,
    os: &'static str,
    timestamp: u64,
}

/// Appends events as JSON lines under the cfdev home directory.
pub struct EventLog {
    dir: PathBuf,
    enabled: bool,
}

impl EventLog {
    pub fn new(config: &Config) -> Self {
        EventLog {
            dir: config.home_dir.join(ANALYTICS_DIR),
            enabled: config.analytics,
        }
    }

    fn record(&self, name: &str) -> Result<(), Box<dyn Error>> {
        fs::create_dir_all(&self.dir)?;
        let record = EventRecord {
            event: name,
            user_id: user_id(&self.dir.join(USER_ID_FILE))?,
            os: std::env::consts::OS,
            timestamp: SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs(),
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(EVENTS_FILE))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl Analytics for EventLog {
    fn event(&self, name: &str) {
        if !self.enabled {
            log::debug!("Analytics disabled, not recording '{}'", name);
            return;
        }
        if let Err(err) = self.record(name) {
            log::warn!("Failed to record analytics event '{}': {}", name, err);
        }
    }
}

/// Anonymous id, generated on first use.
fn user_id(path: &Path) -> Result<String, Box<dyn Error>> {
    if let Ok(existing) = fs::read_to_string(path) {
        let existing = existing.trim();
        if Uuid::parse_str(existing).is_ok() {
            return Ok(existing.to_string());
        }
    }
    let id = Uuid::new_v4().to_string();
    fs::write(path, format!("{id}\n"))?;
    Ok(id)
}
