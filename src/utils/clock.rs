use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Source of wall-clock time and of the monotonic instants used to schedule ticks. Both the focus
/// session and the live simulator go through it so tests can run on paused tokio time.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: Instant);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

/// Clock whose wall time is derived from a fixed start plus the tokio instant elapsed since
/// creation. Under `start_paused` tests both advance together.
#[derive(Debug, Clone)]
pub struct OffsetClock {
    start_time: DateTime<Utc>,
    reference: Instant,
}

impl OffsetClock {
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            reference: Instant::now(),
        }
    }
}

#[async_trait]
impl Clock for OffsetClock {
    fn time(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.reference.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.start_time + elapsed
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

/// Period of every ticking loop in the application.
pub const TICK: Duration = Duration::from_secs(1);
