//! AI generated insights. Every operation degrades to a fixed fallback so callers never have to
//! deal with model failures.

pub mod gemini;
pub mod prompts;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::usage::{goals::SuggestedGoal, live::LiveUsageEvent, AppCategory, AppUsage};

/// A text generation backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generates a reply for `prompt`. With a schema the reply is expected to be JSON matching it.
    async fn generate(&self, prompt: &str, response_schema: Option<Value>) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageInsights {
    pub tips: Vec<String>,
    pub suggested_goal: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveAnalysis {
    pub analysis_summary: String,
    pub focus_score: f64,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitalPersona {
    pub name: String,
    pub description: String,
    pub advice: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub summary: String,
    pub trends: Vec<Trend>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    #[serde(deserialize_with = "lenient_category")]
    pub category: AppCategory,
    pub change_percentage: f64,
}

fn lenient_category<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AppCategory, D::Error> {
    let name = String::deserialize(deserializer)?;
    Ok(AppCategory::parse_lenient(&name))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRecommendation {
    pub app_name: String,
    pub category: String,
    pub description: String,
    pub reason: String,
}

/// Runs the dashboard's insight requests against a [LanguageModel].
pub struct InsightService<M> {
    model: M,
}

impl<M: LanguageModel> InsightService<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub async fn usage_insights(&self, usage: &[AppUsage]) -> UsageInsights {
        let result = self
            .structured(prompts::usage_insights(usage), prompts::usage_insights_schema())
            .await;
        or_fallback("usage_insights", result, || UsageInsights {
            tips: vec![
                "Could not fetch AI insights.".into(),
                "Mind your time on social media.".into(),
                "Set a timer before opening entertainment apps.".into(),
            ],
            suggested_goal: "Reduce top social media app usage by 15 minutes.".into(),
        })
    }

    pub async fn live_session_insights(&self, events: &[LiveUsageEvent]) -> LiveAnalysis {
        let result = self
            .structured(prompts::live_session(events), prompts::live_session_schema())
            .await;
        or_fallback("live_session_insights", result, || LiveAnalysis {
            analysis_summary: "Could not analyze your session.".into(),
            focus_score: 50.,
            suggestions: vec![
                "Set a clear goal before starting.".into(),
                "Minimize distractions.".into(),
            ],
        })
    }

    pub async fn digital_persona(&self, usage: &[AppUsage]) -> DigitalPersona {
        let result = self
            .structured(prompts::digital_persona(usage), prompts::digital_persona_schema())
            .await;
        or_fallback("digital_persona", result, || DigitalPersona {
            name: "Error".into(),
            description: "Could not determine your digital persona.".into(),
            advice: "Try to balance your screen time across different categories.".into(),
        })
    }

    pub async fn weekly_report(&self, usage: &[AppUsage]) -> WeeklyReport {
        let result = self
            .structured(prompts::weekly_report(usage), prompts::weekly_report_schema())
            .await;
        or_fallback("weekly_report", result, || WeeklyReport {
            summary: "Could not generate weekly report. Keep up the good work!".into(),
            trends: vec![],
        })
    }

    pub async fn app_recommendations(
        &self,
        category: &str,
        interest: &str,
    ) -> Vec<AppRecommendation> {
        let result = self
            .structured(
                prompts::app_recommendations(category, interest),
                prompts::app_recommendations_schema(),
            )
            .await;
        or_fallback("app_recommendations", result, Vec::new)
    }

    pub async fn detox_coach_message(&self, title: &str, day: u32) -> String {
        let result = self.text(prompts::detox_coach(title, day)).await;
        or_fallback("detox_coach_message", result, || {
            "You're doing great! Keep it up.".into()
        })
    }

    pub async fn suggest_goals(&self, usage: &[AppUsage]) -> Vec<SuggestedGoal> {
        let result = self
            .structured(prompts::suggested_goals(usage), prompts::suggested_goals_schema())
            .await;
        or_fallback("suggest_goals", result, Vec::new)
    }

    /// Markdown analysis of free form usage data.
    pub async fn analyze_imported(&self, data: &str) -> String {
        let result = self.text(prompts::imported_data(data)).await;
        or_fallback("analyze_imported", result, || {
            "Sorry, I couldn't analyze the data. Please check the format and try again. Ensure \
             your data includes app names and usage times."
                .into()
        })
    }

    async fn structured<T: DeserializeOwned>(&self, prompt: String, schema: Value) -> Result<T> {
        let reply = self.model.generate(&prompt, Some(schema)).await?;
        debug!("Model replied with {} bytes", reply.len());
        Ok(serde_json::from_str(reply.trim())?)
    }

    async fn text(&self, prompt: String) -> Result<String> {
        let reply = self.model.generate(&prompt, None).await?;
        Ok(reply.trim().to_owned())
    }
}

fn or_fallback<T>(operation: &str, result: Result<T>, fallback: impl FnOnce() -> T) -> T {
    result.unwrap_or_else(|e| {
        error!("Error in {operation}: {e:?}");
        fallback()
    })
}
