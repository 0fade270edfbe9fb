use std::time::Duration as StdDuration;

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::utils::clock::Clock;

use super::{AppCategory, AppUsage};

/// A uniformly drawn value above this switches the active app, roughly one switch every seven
/// seconds.
const SWITCH_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveUsageEvent {
    pub app: AppUsage,
    pub start: DateTime<Utc>,
    /// `None` while the app is still active.
    pub end: Option<DateTime<Utc>>,
}

impl LiveUsageEvent {
    /// Duration of the event, measuring an open event up to `now`.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        self.end.unwrap_or(now) - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiveState {
    #[default]
    Idle,
    Active,
    Analyzing,
    Result,
}

/// Simulated live session. Randomness comes from the caller so runs can be replayed from a seed.
pub struct LiveSession<R> {
    apps: Vec<AppUsage>,
    rng: R,
    log: Vec<LiveUsageEvent>,
    started_at: Option<DateTime<Utc>>,
    state: LiveState,
}

impl<R: Rng> LiveSession<R> {
    pub fn new(apps: Vec<AppUsage>, rng: R) -> Result<Self> {
        if apps.is_empty() {
            bail!("Live simulation needs at least one app");
        }
        Ok(Self {
            apps,
            rng,
            log: vec![],
            started_at: None,
            state: LiveState::Idle,
        })
    }

    pub fn state(&self) -> LiveState {
        self.state
    }

    pub fn log(&self) -> &[LiveUsageEvent] {
        &self.log
    }

    pub fn current_app(&self) -> Option<&AppUsage> {
        self.log.last().map(|v| &v.app)
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        self.started_at
            .map(|start| now - start)
            .unwrap_or_else(Duration::zero)
    }

    /// Starts, or restarts, the session with a freshly drawn app.
    pub fn start(&mut self, now: DateTime<Utc>) {
        let app = self.random_app();
        info!("Live session started on {}", app.name);
        self.started_at = Some(now);
        self.log = vec![LiveUsageEvent {
            app,
            start: now,
            end: None,
        }];
        self.state = LiveState::Active;
    }

    /// Called once per second while active. Returns the newly opened event when the active app
    /// switched. The new app may be the same as the old one.
    pub fn step(&mut self, now: DateTime<Utc>) -> Option<&LiveUsageEvent> {
        if self.state != LiveState::Active {
            return None;
        }
        if self.rng.gen::<f64>() <= SWITCH_THRESHOLD {
            return None;
        }

        if let Some(last) = self.log.last_mut() {
            last.end = Some(now);
        }
        let app = self.random_app();
        debug!("Switched to {}", app.name);
        self.log.push(LiveUsageEvent {
            app,
            start: now,
            end: None,
        });
        self.log.last()
    }

    /// Closes the open event and moves to analysis. Returns the closed log.
    pub fn stop(&mut self, now: DateTime<Utc>) -> &[LiveUsageEvent] {
        if self.state == LiveState::Active {
            if let Some(last) = self.log.last_mut() {
                last.end = Some(now);
            }
            self.state = LiveState::Analyzing;
            info!("Live session stopped with {} events", self.log.len());
        }
        &self.log
    }

    pub fn finish_analysis(&mut self) {
        if self.state == LiveState::Analyzing {
            self.state = LiveState::Result;
        }
    }

    /// Whole seconds spent per category, in first-seen order. Open events count up to `now`.
    pub fn category_totals(&self, now: DateTime<Utc>) -> Vec<(AppCategory, i64)> {
        let mut totals = Vec::<(AppCategory, i64)>::new();
        for event in &self.log {
            let millis = event.duration(now).num_milliseconds();
            match totals.iter_mut().find(|(category, _)| *category == event.app.category) {
                Some((_, sum)) => *sum += millis,
                None => totals.push((event.app.category, millis)),
            }
        }
        totals
            .into_iter()
            .map(|(category, millis)| (category, (millis + 500).div_euclid(1000)))
            .collect()
    }

    fn random_app(&mut self) -> AppUsage {
        let index = self.rng.gen_range(0..self.apps.len());
        self.apps[index].clone()
    }
}

/// What the live view renders on every tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSnapshot {
    pub elapsed: Duration,
    pub current_app: Option<AppUsage>,
    pub category_totals: Vec<(AppCategory, i64)>,
    pub events: usize,
}

/// Drives a [LiveSession] once per period until `shutdown` fires, then stops it.
pub struct LiveCollector<R> {
    session: LiveSession<R>,
    clock: Box<dyn Clock>,
    shutdown: CancellationToken,
    period: StdDuration,
    updates: watch::Sender<LiveSnapshot>,
}

impl<R: Rng> LiveCollector<R> {
    pub fn new(
        session: LiveSession<R>,
        clock: Box<dyn Clock>,
        shutdown: CancellationToken,
        period: StdDuration,
    ) -> (Self, watch::Receiver<LiveSnapshot>) {
        let (updates, receiver) = watch::channel(LiveSnapshot::default());
        (
            Self {
                session,
                clock,
                shutdown,
                period,
                updates,
            },
            receiver,
        )
    }

    /// Executes the simulation loop. Returns the stopped session, ready for analysis.
    pub async fn run(mut self) -> Result<LiveSession<R>> {
        self.session.start(self.clock.time());
        self.publish();

        let mut collection_point = self.clock.instant();
        loop {
            collection_point += self.period;

            let stopped = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => true,
                _ = self.clock.sleep_until(collection_point) => false,
            };
            if stopped {
                break;
            }

            self.session.step(self.clock.time());
            self.publish();
        }

        self.session.stop(self.clock.time());
        self.publish();
        Ok(self.session)
    }

    fn publish(&self) {
        let now = self.clock.time();
        self.updates.send_replace(LiveSnapshot {
            elapsed: self.session.elapsed(now),
            current_app: self.session.current_app().cloned(),
            category_totals: self.session.category_totals(now),
            events: self.session.log().len(),
        });
    }
}
