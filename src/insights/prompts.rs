//! Prompts and response schemas sent to the language model.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::usage::{live::LiveUsageEvent, usage_summary, AppUsage};

pub fn usage_insights(usage: &[AppUsage]) -> String {
    format!(
        "Analyze the following daily screen time usage data: {}. The user wants to improve their \
         digital wellbeing. Provide three actionable, personalized tips and suggest one specific, \
         realistic goal. Format the entire response as a single, valid JSON object.",
        usage_summary(usage)
    )
}

pub fn usage_insights_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "tips": { "type": "ARRAY", "items": { "type": "STRING" } },
            "suggestedGoal": { "type": "STRING" },
        },
        "required": ["tips", "suggestedGoal"],
    })
}

/// Only closed events are described. Durations are rounded to whole seconds.
pub fn live_session_log(events: &[LiveUsageEvent]) -> String {
    events
        .iter()
        .filter_map(|event| {
            let end: DateTime<Utc> = event.end?;
            let millis = (end - event.start).num_milliseconds();
            let seconds = (millis + 500).div_euclid(1000);
            Some(format!(
                "{} ({}) for {seconds}s",
                event.app.name, event.app.category
            ))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn live_session(events: &[LiveUsageEvent]) -> String {
    format!(
        "As a productivity coach, analyze this app usage log: {}. Analyze multitasking, identify \
         distractions (switching from Productivity to Social/Entertainment), summarize the user's \
         focus, and provide a Focus Score from 0 (very distracted) to 100 (fully focused). Offer \
         two specific suggestions to improve focus. Respond in valid JSON.",
        live_session_log(events)
    )
}

pub fn live_session_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "analysisSummary": { "type": "STRING" },
            "focusScore": { "type": "NUMBER" },
            "suggestions": { "type": "ARRAY", "items": { "type": "STRING" } },
        },
        "required": ["analysisSummary", "focusScore", "suggestions"],
    })
}

pub fn digital_persona(usage: &[AppUsage]) -> String {
    format!(
        "Based on this screen time data: {}, create a \"Digital Persona\" for the user. Give the \
         persona a creative name (e.g., 'The Focused Creator', 'The Night Owl Entertainer'), a \
         short description of their digital habits, and one key piece of advice tailored to that \
         persona. Respond in valid JSON.",
        usage_summary(usage)
    )
}

pub fn digital_persona_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING" },
            "description": { "type": "STRING" },
            "advice": { "type": "STRING" },
        },
        "required": ["name", "description", "advice"],
    })
}

pub fn weekly_report(usage: &[AppUsage]) -> String {
    format!(
        "Analyze this daily usage data which represents a week: {}. Write a brief, encouraging \
         summary of the user's weekly digital habits. Identify up to 2 key trends (e.g., increase \
         in Productivity, decrease in Social) and express them as percentage changes. Respond in \
         valid JSON.",
        usage_summary(usage)
    )
}

pub fn weekly_report_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "trends": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "category": { "type": "STRING" },
                        "changePercentage": { "type": "NUMBER" },
                    },
                    "required": ["category", "changePercentage"],
                },
            },
        },
        "required": ["summary", "trends"],
    })
}

pub fn app_recommendations(category: &str, interest: &str) -> String {
    format!(
        "The user wants to replace apps in the '{category}' category. They are interested in \
         '{interest}'. Suggest 3 alternative, productive apps. For each app, provide its name, a \
         suitable category, a brief description, and a reason why it fits the user's interest. \
         Respond in valid JSON as an array of objects."
    )
}

pub fn app_recommendations_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "appName": { "type": "STRING" },
                "category": { "type": "STRING" },
                "description": { "type": "STRING" },
                "reason": { "type": "STRING" },
            },
            "required": ["appName", "category", "description", "reason"],
        },
    })
}

pub fn detox_coach(title: &str, day: u32) -> String {
    format!(
        "I am on day {day} of a \"{title}\" digital detox challenge. Write a short, encouraging, \
         and motivational message for me."
    )
}

pub fn suggested_goals(usage: &[AppUsage]) -> String {
    format!(
        "Based on this usage data: {}, identify the top 2-3 apps where the user could \
         realistically reduce their screen time. For each, suggest a new daily time limit (in \
         minutes) and provide a brief reasoning. Respond in valid JSON as an array of objects.",
        usage_summary(usage)
    )
}

pub fn suggested_goals_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "appName": { "type": "STRING" },
                "suggestedLimit": { "type": "NUMBER" },
                "reasoning": { "type": "STRING" },
            },
            "required": ["appName", "suggestedLimit", "reasoning"],
        },
    })
}

pub fn imported_data(data: &str) -> String {
    format!(
        "You are a digital wellbeing expert. Analyze the following screen time data, which is \
         provided as unstructured text. Identify app names, usage durations, and categories. \
         Provide a comprehensive analysis covering: \n\
         1.  A summary of total screen time and key usage patterns.\n\
         2.  A breakdown by app category (Social, Productivity, Entertainment, etc.).\n\
         3.  Insights into potential overuse, distraction loops, or positive habits.\n\
         4.  Three actionable, personalized recommendations for improvement.\n\
         Structure your response in clear, easy-to-read markdown.\n\
         \n\
         Here is the user's data:\n\
         ---\n\
         {data}\n\
         ---\n"
    )
}
