use clap::{Parser, Subcommand, ValueEnum};

mod app;
mod commands;

use app::App;

#[derive(Parser)]
#[command(
    name = "tasklane",
    about = "Tasklane task manager: tasks, Kanban board, analytics and voice navigation from the terminal",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session token
    Login {
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Create an account
    Signup {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Log out and clear the local session
    Logout,

    /// Show the logged-in profile
    Whoami,

    /// Update the profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        /// Image URL or data URL
        #[arg(long)]
        picture: Option<String>,
    },

    /// Request a password-reset OTP by email
    ForgotPassword { email: String },

    /// Finish a password reset with the emailed OTP
    ResetPassword {
        #[arg(long)]
        otp: Option<String>,
    },

    /// Change the password of the logged-in account
    ChangePassword,

    /// Task management
    Tasks {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Show the Kanban board, or move a card
    Kanban {
        #[command(subcommand)]
        action: Option<KanbanAction>,
    },

    /// Task statistics
    Analytics,

    /// Recent account activity
    Activity {
        /// Clear the activity log instead
        #[arg(long)]
        clear: bool,
    },

    /// AI summary of the task list
    Summary,

    /// Send a recorded clip to the voice assistant
    Bot {
        /// .wav file, or raw 16 kHz mono PCM (.pcm/.raw)
        file: String,
    },

    /// Ask the assistant in text
    Ask { text: Vec<String> },

    /// Show or change the theme
    Theme { mode: Option<ThemeArg> },

    /// Show or change the sidebar state
    Sidebar { state: Option<SidebarArg> },

    /// Voice navigation; reads one utterance per line from stdin
    Voice,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// List tasks
    List {
        /// Case-insensitive title search
        #[arg(short, long)]
        search: Option<String>,
        /// Exact due date, YYYY-MM-DD
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Add a task
    Add {
        title: String,
        #[arg(short, long, default_value = "Medium")]
        priority: String,
        /// Due date, YYYY-MM-DD
        #[arg(short, long)]
        date: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Show one task
    Show { id: String },
    /// Edit a task
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete a task
    Delete { id: String },
    /// Set a task's status (todo, inprogress, completed, blocked)
    Status { id: String, status: String },
    /// Tasks past their due date
    Overdue,
    /// Tasks due soon
    Upcoming,
    /// Download all tasks
    Export {
        format: ExportArg,
        /// Output file (default: tasks.<format>)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
enum KanbanAction {
    /// Move a card to another column
    Move {
        id: String,
        status: String,
        /// Position in the destination column
        #[arg(long, default_value_t = 0)]
        position: usize,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get a specific config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// Check the configuration for problems
    Validate,
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
    Toggle,
}

#[derive(Clone, Copy, ValueEnum)]
enum SidebarArg {
    Collapse,
    Expand,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportArg {
    Csv,
    Pdf,
}

/// Modules that flood debug output with connection-level detail.
const NOISY_MODULES: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls"];

fn init_logging(verbose: bool, level: Option<&str>, format: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let base = if verbose { "debug" } else { level.unwrap_or("info") };
        let mut directives = base.to_string();
        for module in NOISY_MODULES {
            directives.push_str(&format!(",{module}=warn"));
        }
        EnvFilter::new(directives)
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(tasklane_core::config::Config::default_path);
    let config = tasklane_core::config::Config::load(&config_path)?;

    init_logging(cli.verbose, config.log_level(), config.log_format());

    let app = App::new(config, config_path)?;
    if let Err(e) = commands::run(&app, cli.command).await {
        app.report(&e);
        std::process::exit(1);
    }
    Ok(())
}
