use std::io::{IsTerminal, Write};

use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::CommandFactory;
use tracing::{debug, info};

use crate::{
    focus::{
        config::{FocusDuration, SessionConfig, SessionConfigurator, SessionType},
        environment::{Environment, Permission},
        phase::{SessionPhase, TimerState, POMODORO_BREAK_MINUTES, POMODORO_FOCUS_MINUTES},
        session::{FocusSession, SessionHandle, SessionOutcome},
    },
    insights::LanguageModel,
    usage::{find_by_id, AppUsage},
    utils::{
        clock::{DefaultClock, TICK},
        time::format_countdown,
    },
};

use super::{
    output::{redraw_line, Palette},
    shutdown::detect_shutdown,
    AppContext, Args,
};

#[derive(Debug, clap::Args)]
pub struct FocusCommand {
    #[arg(long, help = "Alternate 25 minute focus blocks with 5 minute breaks until ended")]
    pomodoro: bool,
    #[arg(
        short,
        long,
        default_value_t = FocusDuration::default(),
        help = "Length of a single session in minutes: 15, 25, 45 or 60"
    )]
    duration: FocusDuration,
    #[arg(long = "allow", value_name = "APP_ID", help = "App allowed during the session. Repeat for more")]
    allowed: Vec<String>,
    #[arg(long, help = "Allow every app", conflicts_with = "allowed")]
    all_apps: bool,
    #[arg(long, help = "Don't switch the terminal into distraction-free mode")]
    no_block: bool,
}

impl FocusCommand {
    fn configure(&self, usage: &[AppUsage]) -> Result<SessionConfig> {
        let mut configurator = SessionConfigurator::new();
        configurator
            .set_session_type(if self.pomodoro {
                SessionType::Pomodoro
            } else {
                SessionType::Single
            })
            .set_duration(self.duration)
            .set_block_notifications(!self.no_block);

        if self.all_apps {
            configurator.toggle_select_all(usage.iter().map(|v| v.id.clone()));
        }
        for id in &self.allowed {
            if find_by_id(usage, id).is_none() {
                return Err(Args::command()
                    .error(
                        clap::error::ErrorKind::ValueValidation,
                        format!("There is no app with id {id}"),
                    )
                    .into());
            }
            configurator.allow_app(id.as_str());
        }
        Ok(configurator.freeze())
    }
}

pub async fn process_focus_command<M: LanguageModel>(
    command: FocusCommand,
    context: &AppContext<M>,
) -> Result<()> {
    let palette = context.palette;
    let config = command.configure(&context.usage)?;
    print_configuration(&config, &context.usage, &palette);

    let (session, handle) = FocusSession::new(
        Box::new(TerminalEnvironment::new(palette)),
        Box::new(DefaultClock),
        TICK,
    );
    let shutdown = tokio::spawn(detect_shutdown(handle.end_token()));

    let (outcome, _) = tokio::join!(
        session.run(config.clone()),
        render_countdown(handle.clone(), config.session_type, palette)
    );
    shutdown.abort();

    println!();
    match outcome? {
        SessionOutcome::Completed => {
            println!("{}", palette.heading("Session complete. Nice work!"));
        }
        SessionOutcome::EndedEarly { at } => {
            info!("Session ended early at {at:?}");
            println!("{}", ended_early_message(&at, config.session_type));
        }
    }
    Ok(())
}

fn print_configuration(config: &SessionConfig, usage: &[AppUsage], palette: &Palette) {
    println!("{}", palette.heading("Focus session"));
    println!("Type\t\t{}", config.session_type);
    let length = match config.session_type {
        SessionType::Single => format!("{} minutes", config.single_duration),
        SessionType::Pomodoro => format!(
            "{POMODORO_FOCUS_MINUTES} minute focus, {POMODORO_BREAK_MINUTES} minute break"
        ),
    };
    println!("Length\t\t{length}");
    println!("Allowed apps\t{}", describe_allowed(config, usage));
    println!(
        "Distraction-free\t{}",
        if config.block_notifications { "on" } else { "off" }
    );
    println!("{}", palette.muted("Press Ctrl-C to end the session"));
}

fn describe_allowed(config: &SessionConfig, usage: &[AppUsage]) -> String {
    if !config.is_restricted() {
        return "no restriction".into();
    }
    if usage.iter().all(|v| config.allowed_app_ids.contains(&v.id)) {
        return "all apps".into();
    }
    usage
        .iter()
        .filter(|v| config.allowed_app_ids.contains(&v.id))
        .map(|v| &*v.name)
        .collect::<Vec<_>>()
        .join(", ")
}

async fn render_countdown(mut handle: SessionHandle, session_type: SessionType, palette: Palette) {
    while let Ok(state) = handle.changed().await {
        if state.is_idle() {
            continue;
        }
        let line = palette.heading(&countdown_line(&state, session_type));
        if let Err(e) = redraw_line(&mut std::io::stdout(), &line) {
            debug!("Failed to draw the countdown {e:?}");
        }
    }
}

fn countdown_line(state: &TimerState, session_type: SessionType) -> String {
    let line = format!("{}  {}", state.phase, format_countdown(state.seconds_remaining));
    match session_type {
        SessionType::Pomodoro => format!("{line}  cycle {}", state.cycle_count),
        SessionType::Single => line,
    }
}

fn ended_early_message(at: &TimerState, session_type: SessionType) -> String {
    if at.is_idle() {
        return "Session ended before it started".into();
    }
    let left = format!(
        "Session ended with {} left in {}",
        format_countdown(at.seconds_remaining),
        at.phase
    );
    match (session_type, at.phase) {
        (SessionType::Pomodoro, SessionPhase::Focus | SessionPhase::Break) => {
            format!("{left} after {} cycles", at.cycle_count)
        }
        _ => left,
    }
}

/// Terminal host: the alternate screen stands in for full screen and notices are printed as
/// banners with a bell.
pub struct TerminalEnvironment {
    palette: Palette,
}

impl TerminalEnvironment {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }
}

#[async_trait]
impl Environment for TerminalEnvironment {
    async fn request_distraction_free_mode(&self) -> Result<()> {
        let mut stdout = std::io::stdout();
        if !stdout.is_terminal() {
            bail!("stdout is not a terminal");
        }
        write!(stdout, "\x1b[?1049h\x1b[H")?;
        stdout.flush()?;
        Ok(())
    }

    async fn release_distraction_free_mode(&self) -> Result<()> {
        let mut stdout = std::io::stdout();
        write!(stdout, "\x1b[?1049l")?;
        stdout.flush()?;
        Ok(())
    }

    fn notification_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn request_notification_permission(&self) -> Result<Permission> {
        Ok(Permission::Granted)
    }

    fn notify(&self, title: &str, body: &str) -> Result<()> {
        let mut stdout = std::io::stdout();
        writeln!(stdout, "\r\x1b[2K{} {body}\x07", self.palette.banner(title))?;
        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::usage::sample_usage;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        command: FocusCommand,
    }

    fn parse(args: &[&str]) -> Result<FocusCommand, clap::Error> {
        Wrapper::try_parse_from(std::iter::once("focus").chain(args.iter().copied()))
            .map(|v| v.command)
    }

    #[test]
    fn defaults_match_configurator() -> Result<()> {
        let config = parse(&[])?.configure(&sample_usage())?;
        assert_eq!(config, SessionConfigurator::new().freeze());
        Ok(())
    }

    #[test]
    fn durations_outside_the_set_are_rejected() {
        assert!(parse(&["--duration", "45"]).is_ok());
        assert!(parse(&["--duration", "30"]).is_err());
    }

    #[test]
    fn allowed_apps_are_validated() -> Result<()> {
        let usage = sample_usage();
        let config = parse(&["--allow", "3", "--allow", "6", "--no-block"])?.configure(&usage)?;
        assert!(!config.block_notifications);
        assert_eq!(describe_allowed(&config, &usage), "VS Code, Slack");

        assert!(parse(&["--allow", "99"])?.configure(&usage).is_err());

        let config = parse(&["--allow", "3", "--allow", "3"])?.configure(&usage)?;
        assert_eq!(describe_allowed(&config, &usage), "VS Code");

        let config = parse(&["--all-apps", "--pomodoro"])?.configure(&usage)?;
        assert_eq!(config.session_type, SessionType::Pomodoro);
        assert_eq!(describe_allowed(&config, &usage), "all apps");
        Ok(())
    }

    #[test]
    fn countdown_lines() {
        let state = TimerState {
            phase: SessionPhase::Break,
            seconds_remaining: 299,
            cycle_count: 2,
        };
        assert_eq!(
            countdown_line(&state, SessionType::Pomodoro),
            "Break Time  04:59  cycle 2"
        );
        let state = TimerState {
            phase: SessionPhase::Focus,
            seconds_remaining: 2700,
            cycle_count: 0,
        };
        assert_eq!(countdown_line(&state, SessionType::Single), "Focus Time  45:00");
        assert_eq!(
            ended_early_message(&state, SessionType::Single),
            "Session ended with 45:00 left in Focus Time"
        );
        assert_eq!(
            ended_early_message(&TimerState::default(), SessionType::Pomodoro),
            "Session ended before it started"
        );
    }
}
