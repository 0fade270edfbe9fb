//! Usage statistics shown by the dashboard. Nothing here is measured from the OS: the data is
//! either the bundled sample or a JSON file supplied by the user.

pub mod challenges;
pub mod goals;
pub mod live;

use std::{fmt::Display, path::Path, str::FromStr, sync::Arc};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AppCategory {
    Social,
    Productivity,
    Entertainment,
    Utilities,
    Creativity,
    Learning,
    Other,
}

impl AppCategory {
    pub const ALL: [AppCategory; 7] = [
        AppCategory::Social,
        AppCategory::Productivity,
        AppCategory::Entertainment,
        AppCategory::Utilities,
        AppCategory::Creativity,
        AppCategory::Learning,
        AppCategory::Other,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AppCategory::Social => "Social",
            AppCategory::Productivity => "Productivity",
            AppCategory::Entertainment => "Entertainment",
            AppCategory::Utilities => "Utilities",
            AppCategory::Creativity => "Creativity",
            AppCategory::Learning => "Learning",
            AppCategory::Other => "Other",
        }
    }

    /// Model output is free text, so anything unrecognised lands in [AppCategory::Other].
    pub fn parse_lenient(value: &str) -> AppCategory {
        value.parse().unwrap_or(AppCategory::Other)
    }
}

impl Display for AppCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AppCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        AppCategory::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow!("Unknown app category {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUsage {
    pub id: Arc<str>,
    pub name: Arc<str>,
    pub category: AppCategory,
    /// Minutes used today.
    #[serde(rename = "usage")]
    pub usage_minutes: u32,
}

impl AppUsage {
    pub fn new(id: &str, name: &str, category: AppCategory, usage_minutes: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            usage_minutes,
        }
    }
}

/// Per-day totals used for the weekly chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTotals {
    pub day: &'static str,
    pub total: u32,
    pub productivity: u32,
    pub social: u32,
    pub entertainment: u32,
}

pub fn sample_usage() -> Vec<AppUsage> {
    vec![
        AppUsage::new("1", "Instagram", AppCategory::Social, 95),
        AppUsage::new("2", "YouTube", AppCategory::Entertainment, 125),
        AppUsage::new("3", "VS Code", AppCategory::Productivity, 150),
        AppUsage::new("4", "TikTok", AppCategory::Social, 80),
        AppUsage::new("5", "Netflix", AppCategory::Entertainment, 60),
        AppUsage::new("6", "Slack", AppCategory::Productivity, 45),
        AppUsage::new("7", "Spotify", AppCategory::Entertainment, 70),
        AppUsage::new("8", "Duolingo", AppCategory::Learning, 35),
    ]
}

pub fn weekly_sample() -> [DailyTotals; 7] {
    const fn day(
        day: &'static str,
        total: u32,
        productivity: u32,
        social: u32,
        entertainment: u32,
    ) -> DailyTotals {
        DailyTotals {
            day,
            total,
            productivity,
            social,
            entertainment,
        }
    }
    [
        day("Mon", 320, 100, 150, 70),
        day("Tue", 410, 120, 180, 110),
        day("Wed", 350, 150, 120, 80),
        day("Thu", 480, 130, 220, 130),
        day("Fri", 510, 100, 250, 160),
        day("Sat", 550, 60, 280, 210),
        day("Sun", 450, 70, 230, 150),
    ]
}

/// Reads a JSON array of [AppUsage] records.
pub async fn load_usage(path: &Path) -> Result<Vec<AppUsage>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read usage file {path:?}"))?;
    let usage = serde_json::from_str::<Vec<AppUsage>>(&content)
        .with_context(|| format!("Usage file {path:?} is not a list of app usages"))?;
    debug!("Loaded {} usage records from {path:?}", usage.len());
    Ok(usage)
}

pub fn total_minutes(usage: &[AppUsage]) -> u32 {
    usage.iter().map(|v| v.usage_minutes).sum()
}

/// Sums minutes per category, keeping categories in the order they are first seen.
pub fn aggregate_by_category(usage: &[AppUsage]) -> Vec<(AppCategory, u32)> {
    let mut totals = Vec::<(AppCategory, u32)>::new();
    for app in usage {
        match totals.iter_mut().find(|(category, _)| *category == app.category) {
            Some((_, minutes)) => *minutes += app.usage_minutes,
            None => totals.push((app.category, app.usage_minutes)),
        }
    }
    totals
}

/// Usage sorted from most to least used.
pub fn sorted_by_usage(usage: &[AppUsage]) -> Vec<AppUsage> {
    let mut sorted = usage.to_vec();
    sorted.sort_by(|a, b| b.usage_minutes.cmp(&a.usage_minutes));
    sorted
}

/// One line summary passed to the language model.
pub fn usage_summary(usage: &[AppUsage]) -> String {
    usage
        .iter()
        .map(|app| format!("{} ({}): {} minutes", app.name, app.category, app.usage_minutes))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn find_by_id<'a>(usage: &'a [AppUsage], id: &str) -> Option<&'a AppUsage> {
    usage.iter().find(|v| &*v.id == id)
}

pub fn find_by_name<'a>(usage: &'a [AppUsage], name: &str) -> Option<&'a AppUsage> {
    usage.iter().find(|v| &*v.name == name)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn aggregates_in_first_seen_order() {
        let totals = aggregate_by_category(&sample_usage());
        assert_eq!(
            totals,
            vec![
                (AppCategory::Social, 175),
                (AppCategory::Entertainment, 255),
                (AppCategory::Productivity, 195),
                (AppCategory::Learning, 35),
            ]
        );
        assert_eq!(total_minutes(&sample_usage()), 660);
    }

    #[test]
    fn summary_format() {
        let usage = vec![
            AppUsage::new("1", "Instagram", AppCategory::Social, 95),
            AppUsage::new("3", "VS Code", AppCategory::Productivity, 150),
        ];
        assert_eq!(
            usage_summary(&usage),
            "Instagram (Social): 95 minutes, VS Code (Productivity): 150 minutes"
        );
        assert_eq!(usage_summary(&[]), "");
    }

    #[test]
    fn sorting_puts_heaviest_first() {
        let sorted = sorted_by_usage(&sample_usage());
        assert_eq!(&*sorted[0].name, "VS Code");
        assert_eq!(&*sorted[7].name, "Duolingo");
    }

    #[test]
    fn category_parsing() {
        assert_eq!("social".parse::<AppCategory>().unwrap(), AppCategory::Social);
        assert!("Gaming".parse::<AppCategory>().is_err());
        assert_eq!(AppCategory::parse_lenient("Gaming"), AppCategory::Other);
    }

    #[tokio::test]
    async fn loads_usage_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            r#"[{{"id":"a","name":"Figma","category":"Creativity","usage":42}}]"#
        )?;

        let usage = load_usage(file.path()).await?;
        assert_eq!(usage, vec![AppUsage::new("a", "Figma", AppCategory::Creativity, 42)]);
        Ok(())
    }

    #[tokio::test]
    async fn rejects_malformed_usage_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, "Instagram: 95 minutes")?;
        assert!(load_usage(file.path()).await.is_err());
        Ok(())
    }
}
