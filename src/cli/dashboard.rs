use anyhow::Result;
use chrono::Utc;
use clap::ValueEnum;
use tracing::info;

use crate::{
    insights::LanguageModel,
    storage::preferences::PreferenceStore,
    usage::{
        aggregate_by_category, challenges::active_progress, goals::goal_progress, sorted_by_usage,
        total_minutes, weekly_sample, AppUsage,
    },
    utils::{percentage::ratio_percentage, time::format_minutes},
};

use super::{
    output::{progress_bar, Grade, Palette},
    AppContext,
};

const BAR_WIDTH: usize = 24;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ThemeAction {
    Toggle,
}

pub async fn print_dashboard<M: LanguageModel>(context: &AppContext<M>) -> Result<()> {
    let palette = &context.palette;
    let usage = &context.usage;
    let total = total_minutes(usage);

    println!("{}", palette.heading("Today"));
    println!("Total screen time\t{}", format_minutes(total));
    println!();
    for (category, minutes) in aggregate_by_category(usage) {
        println!(
            "{:<14}{}  {:>7}",
            category.name(),
            progress_bar(ratio_percentage(minutes, total), BAR_WIDTH),
            format_minutes(minutes)
        );
    }

    println!();
    println!("{}", palette.heading("This week"));
    let week = weekly_sample();
    let busiest = week.iter().map(|v| v.total).max().unwrap_or(0);
    for day in week {
        println!(
            "{}  {}  {:>7}  {}",
            day.day,
            progress_bar(ratio_percentage(day.total, busiest), BAR_WIDTH),
            format_minutes(day.total),
            palette.muted(&format!(
                "productivity {} social {} entertainment {}",
                format_minutes(day.productivity),
                format_minutes(day.social),
                format_minutes(day.entertainment)
            ))
        );
    }

    let goals = context.store.load_goals().await?;
    let progress = goal_progress(&goals, usage);
    let exceeded = progress.iter().filter(|v| v.is_exceeded()).count();
    let challenges = context.store.load_active_challenges().await?;
    let challenges = active_progress(&challenges, Utc::now());

    println!();
    println!("{}", palette.heading("Goals"));
    let summary = format!("{} active, {exceeded} exceeded", progress.len());
    let grade = if exceeded == 0 {
        Grade::Good
    } else {
        Grade::Poor
    };
    println!("{}", palette.graded(grade, &summary));
    println!("Active challenges\t{}", challenges.len());
    Ok(())
}

pub fn print_usage<M>(context: &AppContext<M>) {
    let total = total_minutes(&context.usage);
    println!("{}", context.palette.heading("App usage today"));
    for line in usage_lines(&context.usage, total, &context.palette) {
        println!("{line}");
    }
}

fn usage_lines(usage: &[AppUsage], total: u32, palette: &Palette) -> Vec<String> {
    sorted_by_usage(usage)
        .into_iter()
        .map(|app| {
            format!(
                "{:<16}{:<14}{:>7}\t{}",
                app.name,
                palette.muted(app.category.name()),
                format_minutes(app.usage_minutes),
                ratio_percentage(app.usage_minutes, total)
            )
        })
        .collect()
}

pub async fn process_theme_command<M>(
    action: Option<ThemeAction>,
    context: &mut AppContext<M>,
) -> Result<()> {
    if let Some(ThemeAction::Toggle) = action {
        context.theme = context.theme.toggle();
        context.store.save_theme(context.theme).await?;
        context.palette = Palette::new(context.theme);
        info!("Theme switched to {}", context.theme);
    }
    println!("Theme: {}", context.palette.accent(&context.theme.to_string()));
    Ok(())
}
