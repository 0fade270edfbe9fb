use std::{collections::BTreeSet, fmt::Display, str::FromStr, sync::Arc};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    #[default]
    Single,
    Pomodoro,
}

impl Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionType::Single => write!(f, "Single Session"),
            SessionType::Pomodoro => write!(f, "Pomodoro"),
        }
    }
}

/// Lengths offered for a single session. Pomodoro ignores this and always uses
/// [POMODORO_FOCUS_MINUTES](super::phase::POMODORO_FOCUS_MINUTES).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FocusDuration {
    Fifteen,
    #[default]
    TwentyFive,
    FortyFive,
    Sixty,
}

impl FocusDuration {
    pub const ALL: [FocusDuration; 4] = [
        FocusDuration::Fifteen,
        FocusDuration::TwentyFive,
        FocusDuration::FortyFive,
        FocusDuration::Sixty,
    ];

    pub fn minutes(self) -> u32 {
        match self {
            FocusDuration::Fifteen => 15,
            FocusDuration::TwentyFive => 25,
            FocusDuration::FortyFive => 45,
            FocusDuration::Sixty => 60,
        }
    }

    pub fn seconds(self) -> u32 {
        self.minutes() * 60
    }
}

impl Display for FocusDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.minutes())
    }
}

impl FromStr for FocusDuration {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let minutes = s.trim().trim_end_matches('m').parse::<u32>()?;
        FocusDuration::ALL
            .into_iter()
            .find(|v| v.minutes() == minutes)
            .ok_or_else(|| anyhow!("Session duration must be one of 15, 25, 45 or 60 minutes"))
    }
}

/// Frozen session settings. Once handed to the controller nothing mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub session_type: SessionType,
    pub single_duration: FocusDuration,
    /// Empty means every app is allowed.
    pub allowed_app_ids: BTreeSet<Arc<str>>,
    pub block_notifications: bool,
}

impl SessionConfig {
    pub fn single(duration: FocusDuration) -> Self {
        Self {
            session_type: SessionType::Single,
            single_duration: duration,
            allowed_app_ids: BTreeSet::new(),
            block_notifications: false,
        }
    }

    pub fn pomodoro() -> Self {
        Self {
            session_type: SessionType::Pomodoro,
            ..Self::single(FocusDuration::default())
        }
    }

    pub fn with_block_notifications(self, block_notifications: bool) -> Self {
        Self {
            block_notifications,
            ..self
        }
    }

    pub fn is_restricted(&self) -> bool {
        !self.allowed_app_ids.is_empty()
    }
}

/// Mutable draft edited before a session starts.
#[derive(Debug, Clone)]
pub struct SessionConfigurator {
    draft: SessionConfig,
}

impl Default for SessionConfigurator {
    fn default() -> Self {
        Self {
            draft: SessionConfig {
                session_type: SessionType::Single,
                single_duration: FocusDuration::TwentyFive,
                allowed_app_ids: BTreeSet::new(),
                block_notifications: true,
            },
        }
    }
}

impl SessionConfigurator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &SessionConfig {
        &self.draft
    }

    pub fn set_session_type(&mut self, session_type: SessionType) -> &mut Self {
        self.draft.session_type = session_type;
        self
    }

    pub fn set_duration(&mut self, duration: FocusDuration) -> &mut Self {
        self.draft.single_duration = duration;
        self
    }

    pub fn set_block_notifications(&mut self, block: bool) -> &mut Self {
        self.draft.block_notifications = block;
        self
    }

    pub fn toggle_app(&mut self, app_id: impl Into<Arc<str>>) -> &mut Self {
        let app_id = app_id.into();
        if !self.draft.allowed_app_ids.remove(&app_id) {
            self.draft.allowed_app_ids.insert(app_id);
        }
        self
    }

    /// Adds an app to the whitelist. Already allowed apps stay allowed.
    pub fn allow_app(&mut self, app_id: impl Into<Arc<str>>) -> &mut Self {
        self.draft.allowed_app_ids.insert(app_id.into());
        self
    }

    /// Selects every app unless all of them already are, in which case the whitelist is cleared.
    pub fn toggle_select_all<I, S>(&mut self, all_app_ids: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let all = all_app_ids
            .into_iter()
            .map(Into::into)
            .collect::<BTreeSet<Arc<str>>>();
        if !all.is_empty() && all.is_subset(&self.draft.allowed_app_ids) {
            self.draft.allowed_app_ids.clear();
        } else {
            self.draft.allowed_app_ids = all;
        }
        self
    }

    pub fn freeze(&self) -> SessionConfig {
        self.draft.clone()
    }
}
