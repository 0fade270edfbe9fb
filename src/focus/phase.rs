use std::fmt::Display;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::{debug, info};

use super::config::{SessionConfig, SessionType};

pub const POMODORO_FOCUS_MINUTES: u32 = 25;
pub const POMODORO_BREAK_MINUTES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SessionPhase {
    #[default]
    Idle,
    Focus,
    Break,
}

impl Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "Idle"),
            SessionPhase::Focus => write!(f, "Focus Time"),
            SessionPhase::Break => write!(f, "Break Time"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TimerState {
    pub phase: SessionPhase,
    pub seconds_remaining: u32,
    /// Only meaningful for Pomodoro. Stays 0 for single sessions.
    pub cycle_count: u32,
}

impl TimerState {
    pub fn is_idle(&self) -> bool {
        self.phase == SessionPhase::Idle
    }
}

/// Notices emitted by transitions that happen on expiry. Early termination emits nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseNotice {
    BreakStarted,
    FocusResumed,
    SessionComplete,
}

impl PhaseNotice {
    pub fn title(&self) -> &'static str {
        match self {
            PhaseNotice::BreakStarted => "Break Time!",
            PhaseNotice::FocusResumed => "Focus Time!",
            PhaseNotice::SessionComplete => "Session Complete!",
        }
    }

    pub fn body(&self) -> &'static str {
        match self {
            PhaseNotice::BreakStarted => "Time to relax for 5 minutes.",
            PhaseNotice::FocusResumed => "Let's start the next session.",
            PhaseNotice::SessionComplete => {
                "Great work! You've completed your focus session."
            }
        }
    }

    /// Whether the notice ends the session, requiring the same cleanup as an early end.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PhaseNotice::SessionComplete)
    }
}

/// Focus session state machine. Purely reactive: state only changes through [start](Self::start),
/// [tick](Self::tick) and [end](Self::end).
#[derive(Debug, Default)]
pub struct PhaseController {
    config: Option<SessionConfig>,
    state: TimerState,
}

impl PhaseController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Configuration of the running session. `None` while idle.
    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    /// Idle -> Focus.
    pub fn start(&mut self, config: SessionConfig) -> Result<TimerState> {
        if !self.state.is_idle() {
            bail!("session already running");
        }

        self.state = match config.session_type {
            SessionType::Single => TimerState {
                phase: SessionPhase::Focus,
                seconds_remaining: config.single_duration.seconds(),
                cycle_count: 0,
            },
            SessionType::Pomodoro => TimerState {
                phase: SessionPhase::Focus,
                seconds_remaining: POMODORO_FOCUS_MINUTES * 60,
                cycle_count: 1,
            },
        };
        info!(
            "Started {} session with {}s on the clock",
            config.session_type, self.state.seconds_remaining
        );
        self.config = Some(config);
        Ok(self.state)
    }

    /// Advances the countdown by one second. When the countdown reaches zero the phase transition
    /// happens within the same tick, so a state with zero seconds is never observed outside of
    /// Idle.
    pub fn tick(&mut self) -> Option<PhaseNotice> {
        let session_type = match (&self.config, self.state.phase) {
            (_, SessionPhase::Idle) | (None, _) => return None,
            (Some(config), _) => config.session_type,
        };

        self.state.seconds_remaining = self.state.seconds_remaining.saturating_sub(1);
        if self.state.seconds_remaining > 0 {
            return None;
        }

        let notice = match (session_type, self.state.phase) {
            (SessionType::Pomodoro, SessionPhase::Focus) => {
                self.state.phase = SessionPhase::Break;
                self.state.seconds_remaining = POMODORO_BREAK_MINUTES * 60;
                PhaseNotice::BreakStarted
            }
            (SessionType::Pomodoro, SessionPhase::Break) => {
                self.state.phase = SessionPhase::Focus;
                self.state.seconds_remaining = POMODORO_FOCUS_MINUTES * 60;
                self.state.cycle_count += 1;
                PhaseNotice::FocusResumed
            }
            (SessionType::Single, _) => {
                self.reset();
                PhaseNotice::SessionComplete
            }
            (_, SessionPhase::Idle) => unreachable!("idle phase returns before counting down"),
        };
        info!("Phase transition: {:?} -> {:?}", notice, self.state);
        Some(notice)
    }

    /// Focus/Break -> Idle. Returns false, without touching anything, when already idle so that
    /// callers don't repeat cleanup.
    pub fn end(&mut self) -> bool {
        if self.state.is_idle() {
            debug!("End requested while idle");
            return false;
        }
        info!("Session ended early at {:?}", self.state);
        self.reset();
        true
    }

    fn reset(&mut self) {
        self.state = TimerState::default();
        self.config = None;
    }
}
