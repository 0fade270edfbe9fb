use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::{
    insights::{LanguageModel, Trend},
    usage::AppCategory,
};

use super::{output::Grade, AppContext};

pub async fn print_tips<M: LanguageModel>(context: &AppContext<M>) {
    let palette = &context.palette;
    let insights = context.insights.usage_insights(&context.usage).await;

    println!("{}", palette.heading("Tips"));
    for (index, tip) in insights.tips.iter().enumerate() {
        println!("{}. {tip}", index + 1);
    }
    println!();
    println!("{}", palette.heading("Suggested goal"));
    println!("{}", insights.suggested_goal);
}

/// Persona and weekly report are requested together.
pub async fn print_report<M: LanguageModel>(context: &AppContext<M>) {
    let palette = &context.palette;
    let (persona, report) = tokio::join!(
        context.insights.digital_persona(&context.usage),
        context.insights.weekly_report(&context.usage),
    );

    println!("{}", palette.heading("Your digital persona"));
    println!("{}", palette.accent(&persona.name));
    println!("{}", persona.description);
    println!("{} {}", palette.muted("Advice:"), persona.advice);
    println!();
    println!("{}", palette.heading("Weekly report"));
    println!("{}", report.summary);
    for trend in &report.trends {
        let grade = if trend.change_percentage >= 0. {
            Grade::Good
        } else {
            Grade::Poor
        };
        println!("  {}", palette.graded(grade, &trend_line(trend)));
    }
}

fn trend_line(trend: &Trend) -> String {
    format!("{} {:+.1}%", trend.category, trend.change_percentage)
}

pub async fn print_discoveries<M: LanguageModel>(
    context: &AppContext<M>,
    category: AppCategory,
    interest: &str,
) {
    let palette = &context.palette;
    let apps = context
        .insights
        .app_recommendations(category.name(), interest)
        .await;

    if apps.is_empty() {
        println!("No recommendations right now. Try another interest.");
        return;
    }
    for app in apps {
        println!("{} {}", palette.accent(&app.app_name), palette.muted(&app.category));
        println!("  {}", app.description);
        println!("  {} {}", palette.muted("Why:"), app.reason);
    }
}

pub async fn process_import_command<M: LanguageModel>(
    file: Option<PathBuf>,
    context: &AppContext<M>,
) -> Result<()> {
    let data = match file {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {path:?}"))?,
        None => {
            let mut data = String::new();
            tokio::io::stdin().read_to_string(&mut data).await?;
            data
        }
    };

    if data.trim().is_empty() {
        info!("Nothing to import");
        println!("Nothing to analyze.");
        return Ok(());
    }

    let analysis = context.insights.analyze_imported(&data).await;
    println!("{analysis}");
    Ok(())
}
