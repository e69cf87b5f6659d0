use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;
mod context;

use context::AppContext;

#[derive(Parser)]
#[command(name = "pixur")]
#[command(about = "Pixur CLI - browse, upload and moderate pictures on a pixur server", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server base URL, overriding config and PIXUR_URL
    #[arg(long, global = true)]
    url: Option<String>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a page of pictures (the newest page by default)
    List {
        /// Start at ID and list newer pictures
        #[arg(long, conflicts_with = "after")]
        before: Option<String>,
        /// Start at ID and list older pictures
        #[arg(long)]
        after: Option<String>,
    },
    /// Show a picture with its tags and comments
    Show { id: String },
    /// Print a picture's comment thread
    Comments { id: String },
    /// Upload a picture from a file, a URL, or both
    Upload {
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Vote on a picture
    Vote {
        id: String,
        /// up, down or neutral
        vote: String,
    },
    /// Mark a picture for deletion
    Delete {
        id: String,
        #[arg(long)]
        details: Option<String>,
        /// Delete for breaking the site rules
        #[arg(long)]
        rule_violation: bool,
    },
    /// Comment on a picture, or reply to a comment
    Comment {
        id: String,
        #[arg(long)]
        parent: Option<String>,
        text: String,
    },
    /// Log in (the secret may come from PIXUR_SECRET)
    Login { ident: String, secret: Option<String> },
    /// Create an account and log in
    Signup { ident: String, secret: String },
    /// Log out and forget the stored tokens
    Logout,
    /// Show who is logged in
    Whoami,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {}", err);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let app = AppContext::load(cli.config, cli.url)?;

    match cli.command {
        Commands::List { before, after } => commands::pics::list(&app, before, after).await?,
        Commands::Show { id } => commands::pics::show(&app, &id).await?,
        Commands::Comments { id } => commands::comments::thread(&app, &id).await?,
        Commands::Upload { file, url } => commands::pics::upload(&app, file, url).await?,
        Commands::Vote { id, vote } => commands::pics::vote(&app, &id, &vote).await?,
        Commands::Delete {
            id,
            details,
            rule_violation,
        } => commands::pics::delete(&app, &id, details, rule_violation).await?,
        Commands::Comment { id, parent, text } => {
            commands::comments::add(&app, &id, parent.as_deref(), &text).await?
        }
        Commands::Login { ident, secret } => commands::auth::login(&app, &ident, secret).await?,
        Commands::Signup { ident, secret } => commands::auth::signup(&app, &ident, &secret).await?,
        Commands::Logout => commands::auth::logout(&app).await?,
        Commands::Whoami => commands::auth::whoami(&app).await?,
    }

    Ok(())
}
