//! Fixed pause between successive archive requests.

use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

/// Sleeps a fixed interval before every call except the first.
#[derive(Debug)]
pub(crate) struct Pacer {
    interval: Duration,
    started: bool,
}

impl Pacer {
    pub(crate) const fn new(interval: Duration) -> Self {
        Self {
            interval,
            started: false,
        }
    }

    pub(crate) async fn wait(&mut self) {
        if self.started && !self.interval.is_zero() {
            debug!("Pacing: waiting {}ms", self.interval.as_millis());
            sleep(self.interval).await;
        }
        self.started = true;
    }
}
