use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::utils::clock::Clock;

use super::{
    config::SessionConfig,
    environment::{Environment, Permission},
    phase::{PhaseController, PhaseNotice, TimerState},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A single session ran out on its own.
    Completed,
    /// The user ended the session. Holds the state right before it was reset.
    EndedEarly { at: TimerState },
}

/// Control side of a running [FocusSession]. Cloning it is cheap and every clone observes the
/// same session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    end_request: CancellationToken,
    updates: watch::Receiver<TimerState>,
}

impl SessionHandle {
    /// Requests End Session. Calling it again, or after the session finished, does nothing.
    pub fn end(&self) {
        self.end_request.cancel();
    }

    pub fn end_token(&self) -> CancellationToken {
        self.end_request.clone()
    }

    pub fn state(&self) -> TimerState {
        *self.updates.borrow()
    }

    /// Waits for the next published state. Fails once the session has been dropped.
    pub async fn changed(&mut self) -> Result<TimerState> {
        self.updates.changed().await?;
        Ok(*self.updates.borrow_and_update())
    }
}

/// The session clock: owns the [PhaseController] and ticks it once per period while the session
/// is not idle. The tick loop lives inside [run](Self::run), so leaving it, or dropping the future,
/// is what cancels the pending tick.
pub struct FocusSession {
    controller: PhaseController,
    environment: Box<dyn Environment>,
    clock: Box<dyn Clock>,
    end_request: CancellationToken,
    updates: watch::Sender<TimerState>,
    tick_period: Duration,
    distraction_free: bool,
}

impl FocusSession {
    pub fn new(
        environment: Box<dyn Environment>,
        clock: Box<dyn Clock>,
        tick_period: Duration,
    ) -> (Self, SessionHandle) {
        let end_request = CancellationToken::new();
        let (updates, receiver) = watch::channel(TimerState::default());
        let handle = SessionHandle {
            end_request: end_request.clone(),
            updates: receiver,
        };
        (
            Self {
                controller: PhaseController::new(),
                environment,
                clock,
                end_request,
                updates,
                tick_period,
                distraction_free: false,
            },
            handle,
        )
    }

    /// Runs a whole session for `config` and returns once it is back to idle.
    pub async fn run(mut self, config: SessionConfig) -> Result<SessionOutcome> {
        if config.block_notifications {
            // The transition is committed only after both requests resolve.
            self.prepare_environment()
                .instrument(info_span!("Preparing environment"))
                .await;
        }

        if self.end_request.is_cancelled() {
            info!("Session ended before it started");
            self.release_environment().await;
            return Ok(SessionOutcome::EndedEarly {
                at: self.controller.state(),
            });
        }

        self.controller.start(config)?;
        self.publish();

        let end_request = self.end_request.clone();
        let mut deadline = self.clock.instant();
        loop {
            deadline += self.tick_period;

            let ended = tokio::select! {
                biased;
                _ = end_request.cancelled() => true,
                _ = self.clock.sleep_until(deadline) => false,
            };

            if ended {
                let at = self.controller.state();
                if self.controller.end() {
                    self.release_environment().await;
                }
                self.publish();
                return Ok(SessionOutcome::EndedEarly { at });
            }

            let notice = self.controller.tick();
            debug!("Tick {:?}", self.controller.state());
            self.publish();

            if let Some(notice) = notice {
                if notice.is_terminal() {
                    // The notice goes to the normal screen.
                    self.release_environment().await;
                    self.show_notice(notice);
                    return Ok(SessionOutcome::Completed);
                }
                self.show_notice(notice);
            }
        }
    }

    async fn prepare_environment(&mut self) {
        match self.environment.request_distraction_free_mode().await {
            Ok(()) => {
                info!("Entered distraction-free mode");
                self.distraction_free = true;
            }
            Err(e) => warn!("Could not enter distraction-free mode {e:?}"),
        }

        if self.environment.notification_permission() != Permission::Granted {
            match self.environment.request_notification_permission().await {
                Ok(permission) => debug!("Notification permission is now {permission:?}"),
                Err(e) => warn!("Could not request notification permission {e:?}"),
            }
        }
    }

    async fn release_environment(&mut self) {
        if !self.distraction_free {
            return;
        }
        self.distraction_free = false;
        if let Err(e) = self.environment.release_distraction_free_mode().await {
            warn!("Could not leave distraction-free mode {e:?}");
        }
    }

    fn show_notice(&self, notice: PhaseNotice) {
        if self.environment.notification_permission() != Permission::Granted {
            debug!("Skipping notice {notice:?}, notifications are not permitted");
            return;
        }
        if let Err(e) = self.environment.notify(notice.title(), notice.body()) {
            warn!("Failed to show notice {notice:?}: {e:?}");
        }
    }

    fn publish(&self) {
        self.updates.send_replace(self.controller.state());
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use mockall::Sequence;
    use tokio::time::Instant;

    use super::*;
    use crate::{
        focus::{
            config::FocusDuration,
            environment::MockEnvironment,
            phase::SessionPhase,
        },
        utils::{clock::DefaultClock, logging::TEST_LOGGING},
    };

    fn session(environment: MockEnvironment) -> (FocusSession, SessionHandle) {
        FocusSession::new(
            Box::new(environment),
            Box::new(DefaultClock),
            Duration::from_secs(1),
        )
    }

    fn quiet_environment() -> MockEnvironment {
        let mut environment = MockEnvironment::new();
        environment
            .expect_notification_permission()
            .return_const(Permission::Granted);
        environment.expect_request_distraction_free_mode().never();
        environment.expect_release_distraction_free_mode().never();
        environment
    }

    #[tokio::test(start_paused = true)]
    async fn single_session_completes_after_its_duration() -> Result<()> {
        *TEST_LOGGING;
        let mut environment = quiet_environment();
        environment
            .expect_notify()
            .withf(|title, _| title.starts_with("Session Complete"))
            .times(1)
            .returning(|_, _| Ok(()));

        let (session, handle) = session(environment);
        let started = Instant::now();

        let outcome = session
            .run(SessionConfig::single(FocusDuration::TwentyFive))
            .await?;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(started.elapsed().as_secs(), 1500);
        assert!(handle.state().is_idle());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn pomodoro_cycles_until_ended() -> Result<()> {
        *TEST_LOGGING;
        let mut environment = MockEnvironment::new();
        environment
            .expect_notification_permission()
            .return_const(Permission::Granted);
        environment
            .expect_request_distraction_free_mode()
            .times(1)
            .returning(|| Ok(()));
        environment.expect_request_notification_permission().never();
        environment
            .expect_release_distraction_free_mode()
            .times(1)
            .returning(|| Ok(()));
        environment
            .expect_notify()
            .withf(|title, _| title.starts_with("Break") || title.starts_with("Focus"))
            .times(2)
            .returning(|_, _| Ok(()));

        let (session, handle) = session(environment);
        let task = tokio::spawn(session.run(SessionConfig::pomodoro().with_block_notifications(true)));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(
            handle.state(),
            TimerState {
                phase: SessionPhase::Focus,
                seconds_remaining: 1500,
                cycle_count: 1
            }
        );

        tokio::time::sleep(Duration::from_secs(1500)).await;
        assert_eq!(
            handle.state(),
            TimerState {
                phase: SessionPhase::Break,
                seconds_remaining: 300,
                cycle_count: 1
            }
        );

        tokio::time::sleep(Duration::from_secs(300)).await;
        let expected = TimerState {
            phase: SessionPhase::Focus,
            seconds_remaining: 1500,
            cycle_count: 2,
        };
        assert_eq!(handle.state(), expected);

        handle.end();
        let outcome = task.await??;
        assert_eq!(outcome, SessionOutcome::EndedEarly { at: expected });
        assert_eq!(handle.state(), TimerState::default());

        handle.end();
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn no_tick_after_end() -> Result<()> {
        *TEST_LOGGING;
        let mut environment = quiet_environment();
        environment.expect_notify().never();

        let (session, mut handle) = session(environment);
        let task = tokio::spawn(session.run(SessionConfig::single(FocusDuration::Fifteen)));

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(handle.state().seconds_remaining, 890);
        handle.end();
        task.await??;

        let last = handle.state();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(handle.state(), last);
        // The session is gone: once the last update is drained the channel reports closure.
        let _ = handle.changed().await;
        assert!(handle.changed().await.is_err());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn refused_capabilities_do_not_block_start() -> Result<()> {
        *TEST_LOGGING;
        let mut environment = MockEnvironment::new();
        environment
            .expect_request_distraction_free_mode()
            .times(1)
            .returning(|| Err(anyhow!("full screen is unsupported")));
        environment
            .expect_notification_permission()
            .return_const(Permission::Default);
        environment
            .expect_request_notification_permission()
            .times(1)
            .returning(|| Ok(Permission::Denied));
        environment.expect_release_distraction_free_mode().never();
        environment.expect_notify().never();

        let (session, handle) = session(environment);
        let outcome = session
            .run(SessionConfig::single(FocusDuration::Fifteen).with_block_notifications(true))
            .await?;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert!(handle.state().is_idle());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn completion_notice_follows_release() -> Result<()> {
        *TEST_LOGGING;
        let mut environment = MockEnvironment::new();
        let mut order = Sequence::new();
        environment
            .expect_request_distraction_free_mode()
            .times(1)
            .in_sequence(&mut order)
            .returning(|| Ok(()));
        environment
            .expect_notification_permission()
            .return_const(Permission::Granted);
        environment
            .expect_release_distraction_free_mode()
            .times(1)
            .in_sequence(&mut order)
            .returning(|| Ok(()));
        environment
            .expect_notify()
            .withf(|title, _| title.starts_with("Session Complete"))
            .times(1)
            .in_sequence(&mut order)
            .returning(|_, _| Ok(()));

        let (session, handle) = session(environment);
        session
            .run(SessionConfig::single(FocusDuration::Fifteen).with_block_notifications(true))
            .await?;

        // Ending an idle session must not repeat cleanup; the mock would panic on a second release.
        handle.end();
        handle.end();
        Ok(())
    }

    /// Takes five seconds to enter distraction-free mode and counts what the session asks of it.
    #[derive(Default, Clone)]
    struct SlowEnvironment {
        releases: Arc<AtomicUsize>,
        notices: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Environment for SlowEnvironment {
        async fn request_distraction_free_mode(&self) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }

        async fn release_distraction_free_mode(&self) -> Result<()> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn notification_permission(&self) -> Permission {
            Permission::Granted
        }

        async fn request_notification_permission(&self) -> Result<Permission> {
            Ok(Permission::Granted)
        }

        fn notify(&self, _title: &str, _body: &str) -> Result<()> {
            self.notices.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn end_while_preparing_releases_without_starting() -> Result<()> {
        *TEST_LOGGING;
        let environment = SlowEnvironment::default();
        let (session, handle) = FocusSession::new(
            Box::new(environment.clone()),
            Box::new(DefaultClock),
            Duration::from_secs(1),
        );
        let task = tokio::spawn(
            session.run(SessionConfig::single(FocusDuration::Fifteen).with_block_notifications(true)),
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(handle.state().is_idle());
        handle.end();

        let outcome = task.await??;
        assert_eq!(
            outcome,
            SessionOutcome::EndedEarly {
                at: TimerState::default()
            }
        );
        assert_eq!(environment.releases.load(Ordering::SeqCst), 1);
        assert_eq!(environment.notices.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(handle.state().is_idle());
        Ok(())
    }
}
