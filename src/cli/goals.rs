use anyhow::{bail, Result};
use chrono::{Duration, Utc};
use clap::Subcommand;

use crate::{
    insights::LanguageModel,
    storage::preferences::PreferenceStore,
    usage::goals::{add_suggested_goal, goal_progress, remove_goal, GoalProgress},
    utils::time::format_minutes,
};

use super::{
    output::{progress_bar, Grade, Palette},
    AppContext,
};

#[derive(Subcommand, Debug)]
pub enum GoalsCommand {
    #[command(about = "Show goals with today's progress")]
    List,
    #[command(about = "Ask for goal suggestions based on today's usage")]
    Suggest {
        #[arg(long, help = "Add every suggestion for an app that has no goal yet")]
        add: bool,
    },
    #[command(about = "Remove a goal")]
    Remove { id: String },
}

pub async fn process_goals_command<M: LanguageModel>(
    command: GoalsCommand,
    context: &AppContext<M>,
) -> Result<()> {
    match command {
        GoalsCommand::List => {
            let goals = context.store.load_goals().await?;
            let progress = goal_progress(&goals, &context.usage);
            if progress.is_empty() {
                println!("No goals yet. Try `goals suggest --add`.");
            }
            for goal in progress {
                println!("{}", goal_line(&goal, &context.palette));
            }
            Ok(())
        }
        GoalsCommand::Suggest { add } => suggest_goals(context, add).await,
        GoalsCommand::Remove { id } => {
            let mut goals = context.store.load_goals().await?;
            if !remove_goal(&mut goals, &id) {
                bail!("There is no goal {id}");
            }
            context.store.save_goals(&goals).await?;
            println!("Removed goal {id}");
            Ok(())
        }
    }
}

async fn suggest_goals<M: LanguageModel>(context: &AppContext<M>, add: bool) -> Result<()> {
    let palette = &context.palette;
    let suggestions = context.insights.suggest_goals(&context.usage).await;
    if suggestions.is_empty() {
        println!("No suggestions right now.");
        return Ok(());
    }

    for suggestion in &suggestions {
        println!(
            "{} {}",
            palette.accent(&suggestion.app_name),
            format_minutes(suggestion.suggested_limit)
        );
        println!("  {}", palette.muted(&suggestion.reasoning));
    }
    if !add {
        return Ok(());
    }

    let mut goals = context.store.load_goals().await?;
    let now = Utc::now();
    let mut added = 0;
    for (index, suggestion) in suggestions.iter().enumerate() {
        // Offset keeps ids unique within one batch.
        let at = now + Duration::milliseconds(index as i64);
        if add_suggested_goal(&mut goals, &context.usage, suggestion, at) {
            added += 1;
        }
    }
    if added > 0 {
        context.store.save_goals(&goals).await?;
    }
    println!("Added {added} goals");
    Ok(())
}

fn goal_line(goal: &GoalProgress, palette: &Palette) -> String {
    let grade = if goal.is_exceeded() {
        Grade::Poor
    } else {
        Grade::Good
    };
    let status = if goal.is_exceeded() {
        format!("over by {}", format_minutes(goal.exceeded_by()))
    } else {
        goal.percentage.to_string()
    };
    format!(
        "{:<6}{:<16}{} {} / {}  {}",
        goal.goal.id,
        goal.app.name,
        progress_bar(goal.percentage, 20),
        format_minutes(goal.app.usage_minutes),
        format_minutes(goal.goal.limit_minutes),
        palette.graded(grade, &status)
    )
}
