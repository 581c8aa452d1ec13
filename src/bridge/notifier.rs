/// User-facing alerts for the `showMessage` port

use std::io::Write;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Presents a message to the user, blocking until it has been shown
pub trait Notifier: Send + Sync {
    fn alert(&self, text: &str);
}

/// Writes alerts to stderr
#[derive(Debug, Default)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn alert(&self, text: &str) {
        let mut stderr = std::io::stderr().lock();
        if let Err(e) = writeln!(stderr, "{}", text).and_then(|_| stderr.flush()) {
            warn!("Failed to present message: {}", e);
        }
    }
}

/// Keeps alerts in memory, in the order they were shown
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    shown: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything shown so far
    pub fn messages(&self) -> Vec<String> {
        self.shown
            .lock()
            .map(|shown| shown.clone())
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn alert(&self, text: &str) {
        debug!("Alert: {}", text);
        match self.shown.lock() {
            Ok(mut shown) => shown.push(text.to_string()),
            Err(_) => warn!("Alert store poisoned, dropping message"),
        }
    }
}
