use crate::cli::commands_notes::{
    handle_download_missing, handle_fill_missing, handle_sync, handle_templates_backwards,
    handle_templates_check, SyncOptions,
};
use crate::cli::error::*;
use crate::cli::output::{format_config, format_registries};
use crate::config::AppConfig;
use crate::db::DbConnection;
use crate::dictionary::{create_dictionary, Dictionary};
use crate::http::parse_cookie;
use crate::repo::{DeckRepo, MediaDir};
use crate::workers::{check_for_update, check_login, LoginEvent, WorkerPools};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Parser)]
#[command(name = "dict2deck")]
#[command(about = "Sync vocabulary word books into a flashcard deck, with definitions and pronunciation audio")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show or change settings
    Config {
        #[command(subcommand)]
        subcommand: ConfigCommands,
    },
    /// List decks in the collection
    Decks,
    /// List dictionaries and query APIs with their indices
    Dicts,
    /// Check the session cookie of the selected dictionary and store it
    Login {
        /// Session cookie as JSON or "name=value; name2=value2"
        #[arg(long)]
        cookie: Option<String>,
    },
    /// List word-book groups of the selected dictionary
    Groups,
    /// Add new words from the dictionary (or word list files) to the deck
    Sync {
        /// Word-book group to sync (repeatable; defaults to the saved selection)
        #[arg(long = "group")]
        groups: Vec<String>,
        /// Import words from a tab separated file instead (repeatable)
        #[arg(long = "from-file")]
        from_file: Vec<PathBuf>,
        /// Only add these terms (repeatable)
        #[arg(long)]
        only: Vec<String>,
        /// Delete notes whose terms are no longer in the word book
        #[arg(long)]
        delete: bool,
        /// Auto-confirm prompts
        #[arg(short = 'y', long)]
        yes: bool,
        /// Show the differences without changing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Query notes again and fill their empty fields
    FillMissing {
        /// Auto-confirm prompts
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Download missing image and audio files of notes
    DownloadMissing {
        /// Auto-confirm prompts
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Check or change card templates
    Templates {
        #[command(subcommand)]
        subcommand: TemplateCommands,
    },
    /// Check for a newer release
    CheckUpdate,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print settings (secrets masked)
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set one setting by its key
    Set {
        /// Setting key, e.g. deck or aporaApiToken
        key: String,
        /// New value (JSON for non-string settings)
        value: String,
    },
    /// Print the settings file path
    Path,
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Compare fields, templates and CSS with the defaults
    Check {
        /// Restore the default templates and CSS
        #[arg(long)]
        reset: bool,
        /// Auto-confirm prompts
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Add or remove the backwards card template
    Backwards {
        #[command(subcommand)]
        subcommand: BackwardsCommands,
    },
}

#[derive(Subcommand)]
pub enum BackwardsCommands {
    /// Add the backwards template
    Add {
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Remove the backwards template
    Remove {
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Open collection, settings and media directory
pub(crate) struct App {
    pub conn: Connection,
    pub config: AppConfig,
    pub config_path: PathBuf,
    pub media: MediaDir,
}

impl App {
    pub(crate) fn open() -> Result<Self> {
        let (config, config_path) = load_config()?;
        let conn = DbConnection::connect().context("Failed to connect to database")?;
        let media = MediaDir::open(DbConnection::media_dir()?)?;
        Ok(Self {
            conn,
            config,
            config_path,
            media,
        })
    }
}

pub(crate) fn load_config() -> Result<(AppConfig, PathBuf)> {
    let path = DbConnection::config_path()?;
    let config = AppConfig::load(&path).context("Failed to load settings")?;
    Ok((config, path))
}

fn init_logging() {
    #[cfg(windows)]
    let _ = enable_ansi_support::enable_ansi_support();

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("dict2deck=info"))
        .format_timestamp(None)
        .try_init();
}

pub fn run() -> Result<()> {
    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            e.print()?;
            if e.use_stderr() {
                std::process::exit(1);
            }
            return Ok(());
        }
    };

    handle_command(cli)
}

fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Config { subcommand } => handle_config(subcommand),
        Commands::Decks => handle_decks(),
        Commands::Dicts => handle_dicts(),
        Commands::Login { cookie } => handle_login(cookie),
        Commands::Groups => handle_groups(),
        Commands::Sync {
            groups,
            from_file,
            only,
            delete,
            yes,
            dry_run,
        } => handle_sync(SyncOptions {
            groups,
            from_file,
            only,
            delete,
            yes,
            dry_run,
        }),
        Commands::FillMissing { yes } => handle_fill_missing(yes),
        Commands::DownloadMissing { yes } => handle_download_missing(yes),
        Commands::Templates { subcommand } => match subcommand {
            TemplateCommands::Check { reset, yes } => handle_templates_check(reset, yes),
            TemplateCommands::Backwards { subcommand } => match subcommand {
                BackwardsCommands::Add { yes } => handle_templates_backwards(true, yes),
                BackwardsCommands::Remove { yes } => handle_templates_backwards(false, yes),
            },
        },
        Commands::CheckUpdate => handle_check_update(),
    }
}

/// Ask a yes/no question on stderr; `yes` answers it without asking.
/// Anything but y/yes (including end of input) is a no.
pub(crate) fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    eprint!("{} [y/N]: ", prompt);
    std::io::Write::flush(&mut std::io::stderr())
        .map_err(|e| anyhow::anyhow!("Failed to flush stderr: {}", e))?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| anyhow::anyhow!("Failed to read input: {}", e))?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn handle_config(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show { json } => {
            let (config, _) = load_config()?;
            if json {
                println!("{}", config.masked().to_json()?);
            } else {
                print!("{}", format_config(&config));
            }
        }
        ConfigCommands::Set { key, value } => {
            let (mut config, path) = load_config()?;
            if let Err(e) = config.set_value(&key, &value) {
                user_error(&e.to_string());
            }
            if key == "selectedDict" {
                validate_dict_index(config.selected_dict).unwrap_or_else(|e| user_error(&e));
            }
            if key == "selectedApi" {
                validate_api_index(config.selected_api).unwrap_or_else(|e| user_error(&e));
            }
            config.save(&path).context("Failed to save settings")?;
            println!("Set {}.", key);
        }
        ConfigCommands::Path => {
            println!("{}", DbConnection::config_path()?.display());
        }
    }
    Ok(())
}

fn handle_decks() -> Result<()> {
    let conn = DbConnection::connect().context("Failed to connect to database")?;
    let names = DeckRepo::list_names(&conn)?;
    if names.is_empty() {
        println!("No decks.");
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

fn handle_dicts() -> Result<()> {
    let (config, _) = load_config()?;
    print!("{}", format_registries(&config));
    Ok(())
}

fn handle_login(cookie: Option<String>) -> Result<()> {
    let (mut config, path) = load_config()?;
    let index = validate_dict_index(config.selected_dict).unwrap_or_else(|e| user_error(&e));
    let dict = create_dictionary(index, config.language).context("Failed to create dictionary client")?;

    let raw = match cookie {
        Some(c) => c,
        None => config
            .credential_for(index)
            .map(|c| c.cookie.clone())
            .unwrap_or_default(),
    };
    if raw.trim().is_empty() {
        user_error(&format!(
            "Not logged in to {}. Sign in at {} and pass the session cookie with --cookie.",
            dict.name(),
            dict.login_url()
        ));
    }
    let cookie = parse_cookie(&raw).unwrap_or_else(|e| user_error(&format!("Invalid cookie: {}", e)));

    let pools = WorkerPools::new()?;
    let accepted = Mutex::new(None);
    let valid = check_login(&pools.work, dict.as_ref(), &cookie, |event| {
        if let LoginEvent::Success(json) = event {
            *accepted.lock().unwrap_or_else(|e| e.into_inner()) = Some(json);
        }
    });
    if !valid {
        user_error(&format!(
            "Login to {} failed. Sign in at {} and pass a fresh session cookie with --cookie.",
            dict.name(),
            dict.login_url()
        ));
    }

    if let Some(json) = accepted.into_inner().unwrap_or_else(|e| e.into_inner()) {
        config.set_cookie(index, dict.platform(), json);
        config.save(&path).context("Failed to save settings")?;
    }
    println!("Logged in to {}.", dict.name());
    Ok(())
}

/// The selected dictionary, logged in with the stored cookie
pub(crate) fn logged_in_dictionary(config: &AppConfig, pools: &WorkerPools) -> Result<Box<dyn Dictionary>> {
    let index = validate_dict_index(config.selected_dict).unwrap_or_else(|e| user_error(&e));
    let dict = create_dictionary(index, config.language).context("Failed to create dictionary client")?;

    let raw = config
        .credential_for(index)
        .map(|c| c.cookie.clone())
        .unwrap_or_default();
    if raw.trim().is_empty() {
        user_error(&format!(
            "Not logged in to {}. Run `dict2deck login --cookie <cookie>` first.",
            dict.name()
        ));
    }
    let cookie = parse_cookie(&raw).unwrap_or_else(|e| user_error(&format!("Stored cookie is invalid: {}", e)));

    if !check_login(&pools.work, dict.as_ref(), &cookie, |_| {}) {
        user_error(&format!(
            "Login to {} has expired. Sign in at {} and run `dict2deck login --cookie <cookie>`.",
            dict.name(),
            dict.login_url()
        ));
    }
    Ok(dict)
}

fn handle_groups() -> Result<()> {
    let (config, _) = load_config()?;
    let pools = WorkerPools::new()?;
    let dict = logged_in_dictionary(&config, &pools)?;

    let groups = dict
        .groups()
        .with_context(|| format!("Failed to fetch word-book groups from {}", dict.name()))?;
    if groups.is_empty() {
        println!("No groups.");
        return Ok(());
    }

    let selected = config.groups_for(config.selected_dict);
    for (name, id) in groups {
        let mark = if selected.contains(&name) { "*" } else { " " };
        println!("{} {} ({})", mark, name, id);
    }
    Ok(())
}

fn handle_check_update() -> Result<()> {
    let pools = WorkerPools::new()?;
    match check_for_update(&pools.update, env!("CARGO_PKG_VERSION"))? {
        Some(release) => {
            println!("New version available: {}", release.version);
            if !release.changelog.trim().is_empty() {
                println!();
                println!("{}", release.changelog.trim());
            }
            println!();
            println!("Download: {}", crate::workers::update::RELEASE_URL);
        }
        None => println!("dict2deck {} is up to date.", env!("CARGO_PKG_VERSION")),
    }
    Ok(())
}
