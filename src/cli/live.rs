use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    insights::{LanguageModel, LiveAnalysis},
    usage::live::{LiveCollector, LiveSession, LiveSnapshot},
    utils::{
        clock::{DefaultClock, TICK},
        time::format_elapsed,
    },
};

use super::{
    output::{redraw_line, Grade, Palette},
    shutdown::detect_shutdown,
    AppContext,
};

#[derive(Debug, clap::Args)]
pub struct LiveCommand {
    #[arg(long, help = "Stop after this many seconds. Runs until Ctrl-C otherwise")]
    seconds: Option<u64>,
    #[arg(long, help = "Seed for the simulated app switches")]
    seed: Option<u64>,
}

pub async fn process_live_command<M: LanguageModel>(
    command: LiveCommand,
    context: &AppContext<M>,
) -> Result<()> {
    let palette = context.palette;
    let rng = match command.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let session = LiveSession::new(context.usage.clone(), rng)?;

    let stop = CancellationToken::new();
    let shutdown = tokio::spawn(detect_shutdown(stop.clone()));
    let timer = command.seconds.map(|seconds| {
        let stop = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            stop.cancel();
        })
    });

    println!("{}", palette.heading("Live session"));
    println!("{}", palette.muted("Press Ctrl-C to stop and analyze"));
    let (collector, updates) = LiveCollector::new(session, Box::new(DefaultClock), stop, TICK);
    let (session, _) = tokio::join!(collector.run(), render_snapshots(updates, palette));
    shutdown.abort();
    if let Some(timer) = timer {
        timer.abort();
    }
    let mut session = session?;

    println!();
    println!("{}", palette.heading("Session log"));
    let now = Utc::now();
    for event in session.log() {
        println!(
            "{}  {:<12}{}",
            event.start.format("%H:%M:%S"),
            event.app.name,
            palette.muted(&format!("{}s", event.duration(now).num_seconds()))
        );
    }
    for (category, seconds) in session.category_totals(now) {
        println!("{:<14}{seconds}s", category.name());
    }

    println!();
    println!("{}", palette.muted("Analyzing..."));
    let analysis = context.insights.live_session_insights(session.log()).await;
    session.finish_analysis();
    print_analysis(&analysis, &palette);
    Ok(())
}

async fn render_snapshots(mut updates: watch::Receiver<LiveSnapshot>, palette: Palette) {
    while updates.changed().await.is_ok() {
        let line = snapshot_line(&updates.borrow_and_update());
        if let Err(e) = redraw_line(&mut std::io::stdout(), &palette.accent(&line)) {
            debug!("Failed to draw the live snapshot {e:?}");
        }
    }
}

fn snapshot_line(snapshot: &LiveSnapshot) -> String {
    let current = snapshot
        .current_app
        .as_ref()
        .map(|v| format!("{} ({})", v.name, v.category))
        .unwrap_or_else(|| "-".into());
    format!(
        "{}  {current}  {} switches",
        format_elapsed(snapshot.elapsed),
        snapshot.events.saturating_sub(1)
    )
}

fn print_analysis(analysis: &LiveAnalysis, palette: &Palette) {
    let grade = Grade::from_focus_score(analysis.focus_score);
    println!(
        "Focus score {}",
        palette.graded(grade, &format!("{:.0}", analysis.focus_score))
    );
    println!("{}", analysis.analysis_summary);
    for suggestion in &analysis.suggestions {
        println!("  - {suggestion}");
    }
}
