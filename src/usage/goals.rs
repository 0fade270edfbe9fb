use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::utils::percentage::{ratio_percentage, Percentage};

use super::{find_by_id, find_by_name, AppUsage};

/// Daily limit for one app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: Arc<str>,
    pub app_id: Arc<str>,
    /// Minutes per day.
    #[serde(rename = "limit")]
    pub limit_minutes: u32,
}

/// A limit proposed by the language model. The app is referenced by display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedGoal {
    pub app_name: String,
    #[serde(deserialize_with = "whole_minutes")]
    pub suggested_limit: u32,
    pub reasoning: String,
}

/// Model replies use plain JSON numbers, so `45.0` has to be accepted as 45 minutes.
fn whole_minutes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let minutes = f64::deserialize(deserializer)?;
    Ok(minutes.round().clamp(0., f64::from(u32::MAX)) as u32)
}

pub fn default_goals() -> Vec<Goal> {
    vec![
        Goal {
            id: "g1".into(),
            app_id: "1".into(),
            limit_minutes: 90,
        },
        Goal {
            id: "g2".into(),
            app_id: "3".into(),
            limit_minutes: 60,
        },
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalProgress {
    pub goal: Goal,
    pub app: AppUsage,
    pub percentage: Percentage,
}

impl GoalProgress {
    pub fn is_exceeded(&self) -> bool {
        self.app.usage_minutes > self.goal.limit_minutes
    }

    /// Minutes over the limit, zero when within it.
    pub fn exceeded_by(&self) -> u32 {
        self.app.usage_minutes.saturating_sub(self.goal.limit_minutes)
    }
}

/// Progress for every goal whose app is present in `usage`. Goals pointing at unknown apps are
/// skipped.
pub fn goal_progress(goals: &[Goal], usage: &[AppUsage]) -> Vec<GoalProgress> {
    goals
        .iter()
        .filter_map(|goal| {
            let app = find_by_id(usage, &goal.app_id)?;
            Some(GoalProgress {
                goal: goal.clone(),
                app: app.clone(),
                percentage: limit_percentage(app.usage_minutes, goal.limit_minutes),
            })
        })
        .collect()
}

/// Any use of a zero-minute limit is over it.
fn limit_percentage(usage_minutes: u32, limit_minutes: u32) -> Percentage {
    if limit_minutes == 0 && usage_minutes > 0 {
        return Percentage::unbounded();
    }
    ratio_percentage(usage_minutes, limit_minutes)
}

/// Adds a goal from a suggestion when the suggested app exists and has no goal yet. Returns
/// whether a goal was added.
pub fn add_suggested_goal(
    goals: &mut Vec<Goal>,
    usage: &[AppUsage],
    suggestion: &SuggestedGoal,
    now: DateTime<Utc>,
) -> bool {
    let Some(app) = find_by_name(usage, &suggestion.app_name) else {
        debug!("Suggested app {} is not in the usage data", suggestion.app_name);
        return false;
    };
    if goals.iter().any(|g| g.app_id == app.id) {
        debug!("{} already has a goal", app.name);
        return false;
    }

    let goal = Goal {
        id: format!("g-{}", now.timestamp_millis()).into(),
        app_id: app.id.clone(),
        limit_minutes: suggestion.suggested_limit,
    };
    info!("Added goal {} for {}", goal.id, app.name);
    goals.push(goal);
    true
}

/// Removes the goal with `id`. Returns whether anything was removed.
pub fn remove_goal(goals: &mut Vec<Goal>, id: &str) -> bool {
    let before = goals.len();
    goals.retain(|g| &*g.id != id);
    before != goals.len()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::usage::sample_usage;

    fn suggestion(app_name: &str, limit: u32) -> SuggestedGoal {
        SuggestedGoal {
            app_name: app_name.into(),
            suggested_limit: limit,
            reasoning: "Less scrolling".into(),
        }
    }

    #[test]
    fn progress_for_default_goals() {
        let progress = goal_progress(&default_goals(), &sample_usage());
        assert_eq!(progress.len(), 2);

        let instagram = &progress[0];
        assert_eq!(&*instagram.app.name, "Instagram");
        assert!(instagram.is_exceeded());
        assert_eq!(instagram.exceeded_by(), 5);

        let vs_code = &progress[1];
        assert!((*vs_code.percentage - 250.).abs() < f64::EPSILON);
        assert_eq!(vs_code.exceeded_by(), 90);
    }

    #[test]
    fn within_limit_is_not_exceeded() {
        let goals = vec![Goal {
            id: "g".into(),
            app_id: "8".into(),
            limit_minutes: 35,
        }];
        let progress = goal_progress(&goals, &sample_usage());
        assert!(!progress[0].is_exceeded());
        assert_eq!(progress[0].exceeded_by(), 0);
    }

    #[test]
    fn zero_limit_is_exceeded_by_any_use() {
        let goals = vec![Goal {
            id: "g".into(),
            app_id: "4".into(),
            limit_minutes: 0,
        }];
        let progress = goal_progress(&goals, &sample_usage());
        assert!(progress[0].is_exceeded());
        assert_eq!(progress[0].exceeded_by(), 80);
        assert_eq!(*progress[0].percentage.capped(), 100.);

        let mut unused = sample_usage();
        unused[3].usage_minutes = 0;
        let progress = goal_progress(&goals, &unused);
        assert!(!progress[0].is_exceeded());
        assert_eq!(*progress[0].percentage, 0.);
    }

    #[test]
    fn goals_for_missing_apps_are_skipped() {
        let goals = vec![Goal {
            id: "g".into(),
            app_id: "404".into(),
            limit_minutes: 10,
        }];
        assert!(goal_progress(&goals, &sample_usage()).is_empty());
    }

    #[test]
    fn suggested_goal_is_added_once() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let mut goals = default_goals();

        assert!(add_suggested_goal(&mut goals, &sample_usage(), &suggestion("TikTok", 45), now));
        let added = goals.last().unwrap();
        assert_eq!(&*added.app_id, "4");
        assert_eq!(added.limit_minutes, 45);
        assert_eq!(&*added.id, format!("g-{}", now.timestamp_millis()));

        assert!(!add_suggested_goal(&mut goals, &sample_usage(), &suggestion("TikTok", 30), now));
        assert!(!add_suggested_goal(&mut goals, &sample_usage(), &suggestion("Instagram", 30), now));
        assert!(!add_suggested_goal(&mut goals, &sample_usage(), &suggestion("MySpace", 30), now));
        assert_eq!(goals.len(), 3);
    }

    #[test]
    fn remove_goal_by_id() {
        let mut goals = default_goals();
        assert!(remove_goal(&mut goals, "g1"));
        assert!(!remove_goal(&mut goals, "g1"));
        assert_eq!(goals.len(), 1);
    }

    #[test]
    fn suggestion_accepts_fractional_limits() {
        let suggestion = serde_json::from_str::<SuggestedGoal>(
            r#"{"appName":"YouTube","suggestedLimit":89.6,"reasoning":"Evenings"}"#,
        )
        .unwrap();
        assert_eq!(suggestion.suggested_limit, 90);
    }

    #[test]
    fn goal_json_shape() {
        let json = serde_json::to_string(&default_goals()[0]).unwrap();
        assert_eq!(json, r#"{"id":"g1","appId":"1","limit":90}"#);
    }
}
