use anyhow::{bail, Result};
use chrono::Utc;
use clap::Subcommand;

use crate::{
    insights::LanguageModel,
    storage::preferences::PreferenceStore,
    usage::challenges::{
        active_progress, available_challenges, day_of_challenge, find_challenge, start_challenge,
        ChallengeProgress,
    },
};

use super::{
    output::{progress_bar, Palette},
    AppContext,
};

#[derive(Subcommand, Debug)]
pub enum ChallengesCommand {
    #[command(about = "Show active and available challenges")]
    List,
    #[command(about = "Start a challenge")]
    Start { id: String },
    #[command(about = "Get a motivational message for an active challenge")]
    Coach { id: String },
}

pub async fn process_challenges_command<M: LanguageModel>(
    command: ChallengesCommand,
    context: &AppContext<M>,
) -> Result<()> {
    let palette = &context.palette;
    match command {
        ChallengesCommand::List => {
            let active = context.store.load_active_challenges().await?;

            println!("{}", palette.heading("Active"));
            let progress = active_progress(&active, Utc::now());
            if progress.is_empty() {
                println!("{}", palette.muted("None"));
            }
            for challenge in &progress {
                println!("{}", progress_line(challenge, palette));
            }

            println!();
            println!("{}", palette.heading("Available"));
            for challenge in available_challenges(&active) {
                println!(
                    "{:<4}{} {}",
                    challenge.id,
                    palette.accent(challenge.title),
                    palette.muted(&format!("{} days", challenge.duration_days))
                );
                println!("    {}", challenge.description);
            }
            Ok(())
        }
        ChallengesCommand::Start { id } => {
            let Some(challenge) = find_challenge(&id) else {
                bail!("There is no challenge {id}");
            };
            let mut active = context.store.load_active_challenges().await?;
            if start_challenge(&mut active, &id, Utc::now()) {
                context.store.save_active_challenges(&active).await?;
                println!("Started {}. Good luck!", challenge.title);
            } else {
                println!("{} is already running", challenge.title);
            }
            Ok(())
        }
        ChallengesCommand::Coach { id } => {
            let active = context.store.load_active_challenges().await?;
            let (Some(challenge), Some(started)) = (
                find_challenge(&id),
                active.iter().find(|v| &*v.id == id.as_str()),
            ) else {
                bail!("Challenge {id} is not active");
            };
            let day = day_of_challenge(started.start_date, Utc::now());
            let message = context
                .insights
                .detox_coach_message(challenge.title, day)
                .await;
            println!("{}", palette.banner(&format!("Day {day}")));
            println!("{message}");
            Ok(())
        }
    }
}

fn progress_line(progress: &ChallengeProgress, palette: &Palette) -> String {
    format!(
        "{:<4}{:<26}{} day {} of {}  {}",
        progress.challenge.id,
        progress.challenge.title,
        progress_bar(progress.progress, 20),
        progress.day,
        progress.challenge.duration_days,
        palette.muted(&progress.progress.capped().to_string())
    )
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::Duration;
    use mockall::predicate::{always, eq};
    use tempfile::tempdir;

    use super::*;
    use crate::{
        insights::{InsightService, MockLanguageModel},
        storage::preferences::{JsonPreferenceStore, Theme},
        usage::{challenges::ActiveChallenge, sample_usage},
    };

    fn context(dir: &std::path::Path, model: MockLanguageModel) -> Result<AppContext<MockLanguageModel>> {
        Ok(AppContext::new(
            JsonPreferenceStore::new(dir.to_owned())?,
            sample_usage(),
            Theme::Dark,
            InsightService::new(model),
        ))
    }

    #[tokio::test]
    async fn start_persists_once() -> Result<()> {
        let dir = tempdir()?;
        let context = context(dir.path(), MockLanguageModel::new())?;

        process_challenges_command(ChallengesCommand::Start { id: "c3".into() }, &context).await?;
        process_challenges_command(ChallengesCommand::Start { id: "c3".into() }, &context).await?;
        assert!(
            process_challenges_command(ChallengesCommand::Start { id: "c7".into() }, &context)
                .await
                .is_err()
        );

        let active = context.store.load_active_challenges().await?;
        assert_eq!(active.len(), 1);
        assert_eq!(&*active[0].id, "c3");
        Ok(())
    }

    #[tokio::test]
    async fn coach_uses_current_day() -> Result<()> {
        let dir = tempdir()?;
        let mut model = MockLanguageModel::new();
        model
            .expect_generate()
            .withf(|prompt, _| prompt.starts_with("I am on day 3 of a \"Mindful Mornings\""))
            .times(1)
            .returning(|_, _| Ok("Keep going".into()));
        let context = context(dir.path(), model)?;
        context
            .store
            .save_active_challenges(&[ActiveChallenge {
                id: "c2".into(),
                start_date: Utc::now() - Duration::hours(50),
            }])
            .await?;

        process_challenges_command(ChallengesCommand::Coach { id: "c2".into() }, &context).await?;
        Ok(())
    }

    #[tokio::test]
    async fn coach_requires_active_challenge() -> Result<()> {
        let dir = tempdir()?;
        let mut model = MockLanguageModel::new();
        model.expect_generate().with(always(), eq(None)).never();
        let context = context(dir.path(), model)?;

        assert!(
            process_challenges_command(ChallengesCommand::Coach { id: "c1".into() }, &context)
                .await
                .is_err()
        );
        Ok(())
    }
}
