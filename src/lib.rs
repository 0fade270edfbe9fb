//! Terminal dashboard for digital wellbeing. Runs focus sessions with Pomodoro cycling, keeps
//! usage goals and detox challenges, simulates live app switching and asks a hosted language
//! model for tips and reports.
//!

pub mod cli;
pub mod focus;
pub mod insights;
pub mod storage;
pub mod usage;
pub mod utils;
