use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::utils::percentage::{ratio_percentage, Percentage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetoxChallenge {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub duration_days: u32,
}

pub static CHALLENGES: [DetoxChallenge; 3] = [
    DetoxChallenge {
        id: "c1",
        title: "The Weekend Unplug",
        description: "Disconnect from social media for the entire weekend (Saturday & Sunday). Reconnect with the world around you.",
        duration_days: 2,
    },
    DetoxChallenge {
        id: "c2",
        title: "Mindful Mornings",
        description: "Avoid using your phone for the first hour after waking up for 5 consecutive days. Start your day with intention.",
        duration_days: 5,
    },
    DetoxChallenge {
        id: "c3",
        title: "Social Media Sabbatical",
        description: "Take a 3-day break from all social media applications to reset your digital habits.",
        duration_days: 3,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveChallenge {
    pub id: Arc<str>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_date: DateTime<Utc>,
}

pub fn find_challenge(id: &str) -> Option<&'static DetoxChallenge> {
    CHALLENGES.iter().find(|c| c.id == id)
}

/// Starts a catalog challenge. Unknown and already active challenges are left alone. Returns
/// whether the challenge was started.
pub fn start_challenge(active: &mut Vec<ActiveChallenge>, id: &str, now: DateTime<Utc>) -> bool {
    if find_challenge(id).is_none() || active.iter().any(|c| &*c.id == id) {
        return false;
    }
    info!("Started challenge {id}");
    active.push(ActiveChallenge {
        id: id.into(),
        start_date: now,
    });
    true
}

/// Day number of a challenge, starting at 1 on the day it was started.
pub fn day_of_challenge(start: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let days = (now - start).num_milliseconds().div_euclid(24 * 60 * 60 * 1000) + 1;
    days.clamp(1, i64::from(u32::MAX)) as u32
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeProgress {
    pub challenge: &'static DetoxChallenge,
    pub start_date: DateTime<Utc>,
    pub day: u32,
    /// Not capped; the view caps it when drawing.
    pub progress: Percentage,
}

/// Progress of active challenges that exist in the catalog, in the order they were started.
pub fn active_progress(active: &[ActiveChallenge], now: DateTime<Utc>) -> Vec<ChallengeProgress> {
    active
        .iter()
        .filter_map(|a| {
            let challenge = find_challenge(&a.id)?;
            let day = day_of_challenge(a.start_date, now);
            Some(ChallengeProgress {
                challenge,
                start_date: a.start_date,
                day,
                progress: ratio_percentage(day, challenge.duration_days),
            })
        })
        .collect()
}

pub fn available_challenges(active: &[ActiveChallenge]) -> Vec<&'static DetoxChallenge> {
    CHALLENGES
        .iter()
        .filter(|c| !active.iter().any(|a| &*a.id == c.id))
        .collect()
}
