//! Focus sessions: a draft configuration is frozen into a [config::SessionConfig], the
//! [phase::PhaseController] decides transitions and the [session::FocusSession] ticks it once per
//! second while talking to the host through [environment::Environment].

pub mod config;
pub mod environment;
pub mod phase;
pub mod session;
