mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_browse, cmd_categories, cmd_history, cmd_pick, cmd_recipe_add, cmd_recipe_delete,
    cmd_recipe_edit, cmd_recipe_list, cmd_suggest, cmd_today, cmd_unpick,
};
use crate::config::Config;
use nextbite_core::models::{DEFAULT_MAX_SUGGESTIONS, DEFAULT_MIN_SUGGESTIONS, HistoryRange};
use nextbite_core::service::NextBiteService;

#[derive(Parser)]
#[command(
    name = "nextbite",
    version,
    about = "Pick today's meal from your own recipe list",
    long_about = "Keeps a list of recipes and a history of what you ate, and suggests \
                  what to cook next: things you have not had in a while, without \
                  repeating the same kind of dish back to back."
)]
struct Cli {
    /// Directory holding master_list.csv and history.csv
    #[arg(long, global = true, env = "NEXTBITE_DATA_DIR", value_name = "PATH")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Suggest recipes for today
    Suggest {
        /// Minimum number of suggestions
        #[arg(long, default_value_t = DEFAULT_MIN_SUGGESTIONS)]
        min: usize,
        /// Maximum number of suggestions
        #[arg(long, default_value_t = DEFAULT_MAX_SUGGESTIONS)]
        max: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show every recipe of one item type with when it was last eaten
    Browse {
        /// Item type (e.g. Breakfast, Curry)
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save the recipe you are cooking today
    Pick {
        /// Recipe name (case-insensitive)
        recipe: String,
        /// Replace a pick already saved for the day
        #[arg(long)]
        replace: bool,
        /// Date to save for (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show today's saved pick
    Today {
        /// Date to show (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove today's saved pick
    Unpick {
        /// Date to clear (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what was eaten, newest first
    History {
        /// all, current-week, previous-week, current-month, previous-month
        #[arg(short, long, default_value = "all")]
        range: HistoryRange,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the recipe list
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// List item types
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Add a recipe
    Add {
        /// Recipe name
        name: String,
        /// Item type (e.g. Breakfast, Curry)
        #[arg(short, long, default_value = "")]
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a recipe or change its item type
    Edit {
        /// Current recipe name
        recipe: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New item type
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe (history is kept)
    Delete {
        /// Recipe name
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(matches!(cli.command, Commands::Serve { .. }));

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// Log to stderr. `NEXTBITE_LOG` wins over `RUST_LOG`; the server defaults to
/// `info`, everything else to `warn`.
fn init_tracing(serving: bool) {
    let default = if serving { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env("NEXTBITE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.data_dir)?;
    let svc = NextBiteService::open(&config.data_dir)?;
    tracing::debug!(data_dir = %config.data_dir.display(), "opened data directory");

    match cli.command {
        Commands::Suggest { min, max, json } => cmd_suggest(&svc, min, max, json),
        Commands::Browse { category, json } => cmd_browse(&svc, &category, json),
        Commands::Pick {
            recipe,
            replace,
            date,
            json,
        } => cmd_pick(&svc, &recipe, date, replace, json),
        Commands::Today { date, json } => cmd_today(&svc, date, json),
        Commands::Unpick { date, json } => cmd_unpick(&svc, date, json),
        Commands::History { range, json } => cmd_history(&svc, range, json),
        Commands::Categories { json } => cmd_categories(&svc, json),
        Commands::Recipe { command } => match command {
            RecipeCommands::Add {
                name,
                category,
                json,
            } => cmd_recipe_add(&svc, &name, &category, json),
            RecipeCommands::Edit {
                recipe,
                name,
                category,
                json,
            } => cmd_recipe_edit(&svc, &recipe, name.as_deref(), category.as_deref(), json),
            RecipeCommands::Delete { recipe, json } => cmd_recipe_delete(&svc, &recipe, json),
            RecipeCommands::List { json } => cmd_recipe_list(&svc, json),
        },
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let api_key = if no_auth {
                None
            } else {
                let (key, _) = config.load_or_create_api_key()?;
                Some(key)
            };
            server::start_server(svc, port, &bind, api_key).await
        }
    }
}
