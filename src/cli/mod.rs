pub mod challenges;
pub mod dashboard;
pub mod focus;
pub mod goals;
pub mod insights;
pub mod live;
pub mod output;
pub mod shutdown;

use std::path::{Path, PathBuf};

use anyhow::Result;
use challenges::{process_challenges_command, ChallengesCommand};
use clap::{Parser, Subcommand};
use dashboard::{print_dashboard, print_usage, process_theme_command, ThemeAction};
use focus::{process_focus_command, FocusCommand};
use goals::{process_goals_command, GoalsCommand};
use insights::{print_discoveries, print_report, print_tips, process_import_command};
use live::{process_live_command, LiveCommand};
use output::Palette;
use tracing::{debug, level_filters::LevelFilter};

use crate::{
    insights::{
        gemini::{GeminiClient, DEFAULT_ENDPOINT, DEFAULT_MODEL},
        InsightService, LanguageModel,
    },
    storage::preferences::{JsonPreferenceStore, PreferenceStore, Theme},
    usage::{load_usage, sample_usage, AppCategory, AppUsage},
    utils::{dir::application_dir, logging::enable_logging},
};

#[derive(Parser, Debug)]
#[command(name = "Prodoma", version, long_about = None)]
#[command(about = "Digital wellbeing dashboard with focus sessions and AI insights", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "JSON file with today's app usage. The bundled sample data is used otherwise"
    )]
    usage: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "API_KEY",
        hide_env_values = true,
        help = "Gemini API key. GEMINI_API_KEY is also accepted"
    )]
    api_key: Option<String>,
    #[arg(long, global = true, default_value = DEFAULT_MODEL, help = "Gemini model used for insights")]
    model: String,
    #[arg(long, global = true, env = "PRODOMA_GEMINI_ENDPOINT", default_value = DEFAULT_ENDPOINT, hide = true)]
    endpoint: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Overview of today's screen time, the week and your goals")]
    Dashboard,
    #[command(about = "Per app usage for today")]
    Usage,
    #[command(about = "Manage daily usage limits")]
    Goals {
        #[command(subcommand)]
        command: GoalsCommand,
    },
    #[command(about = "Digital detox challenges")]
    Challenges {
        #[command(subcommand)]
        command: ChallengesCommand,
    },
    #[command(about = "Run a focus session. Ctrl-C ends it early")]
    Focus {
        #[command(flatten)]
        command: FocusCommand,
    },
    #[command(about = "Simulate live app switching and get it analyzed")]
    Live {
        #[command(flatten)]
        command: LiveCommand,
    },
    #[command(about = "Digital persona and weekly report")]
    Report,
    #[command(about = "Personalized tips for today's usage")]
    Tips,
    #[command(about = "Find productive alternatives for a category of apps")]
    Discover {
        #[arg(long, help = "Category to replace, e.g. Social")]
        category: AppCategory,
        #[arg(long, help = "What you'd rather spend time on")]
        interest: String,
    },
    #[command(about = "Analyze usage data exported from elsewhere. Reads stdin without a file")]
    Import { file: Option<PathBuf> },
    #[command(about = "Show or toggle the colour theme")]
    Theme {
        #[arg(value_enum)]
        action: Option<ThemeAction>,
    },
}

/// Everything a command needs, loaded once at startup.
pub struct AppContext<M = GeminiClient> {
    pub store: JsonPreferenceStore,
    pub usage: Vec<AppUsage>,
    pub theme: Theme,
    pub palette: Palette,
    pub insights: InsightService<M>,
}

impl<M: LanguageModel> AppContext<M> {
    pub fn new(
        store: JsonPreferenceStore,
        usage: Vec<AppUsage>,
        theme: Theme,
        insights: InsightService<M>,
    ) -> Self {
        Self {
            store,
            usage,
            theme,
            palette: Palette::new(theme),
            insights,
        }
    }
}

impl AppContext<GeminiClient> {
    async fn load(args: &Args, dir: &Path) -> Result<Self> {
        let store = JsonPreferenceStore::new(dir.join("preferences"))?;
        let theme = store.load_theme().await?;

        let usage = match &args.usage {
            Some(path) => load_usage(path).await?,
            None => sample_usage(),
        };

        let api_key = args
            .api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok());
        let client = GeminiClient::new(api_key, args.model.clone(), args.endpoint.clone());

        Ok(Self::new(store, usage, theme, InsightService::new(client)))
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = application_dir(args.dir.clone())?;
    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(&dir.join("logs"), logging_level, args.log)?;
    debug!("Using application directory {dir:?}");

    let mut context = AppContext::load(&args, &dir).await?;

    match args.commands {
        Commands::Dashboard => print_dashboard(&context).await,
        Commands::Usage => {
            print_usage(&context);
            Ok(())
        }
        Commands::Goals { command } => process_goals_command(command, &context).await,
        Commands::Challenges { command } => process_challenges_command(command, &context).await,
        Commands::Focus { command } => process_focus_command(command, &context).await,
        Commands::Live { command } => process_live_command(command, &context).await,
        Commands::Report => {
            print_report(&context).await;
            Ok(())
        }
        Commands::Tips => {
            print_tips(&context).await;
            Ok(())
        }
        Commands::Discover { category, interest } => {
            print_discoveries(&context, category, &interest).await;
            Ok(())
        }
        Commands::Import { file } => process_import_command(file, &context).await,
        Commands::Theme { action } => process_theme_command(action, &mut context).await,
    }
}
