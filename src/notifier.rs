//! Transient user notifications via notify-rust (D-Bus), always mirrored to the log.

use notify_rust::Notification;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct Notifier {
    enabled: bool,
}

impl Notifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn notify(&self, summary: &str, body: &str) {
        info!("{summary}: {body}");
        self.show(summary, body);
    }

    pub fn notify_error(&self, summary: &str, body: &str) {
        warn!("{summary}: {body}");
        self.show(summary, body);
    }

    fn show(&self, summary: &str, body: &str) {
        if !self.enabled {
            return;
        }

        debug!("Notification: {summary}");

        if let Err(e) = Notification::new()
            .summary(summary)
            .body(body)
            .icon("accessories-dictionary")
            .timeout(3000)
            .show()
        {
            warn!("Failed to show notification: {e}");
        }
    }
}
