//! ghmulti command-line tool.
//!
//! Manages several GitHub identities: adding and editing accounts, choosing
//! the global default, linking repositories to an account, and running
//! push/pull/clone as the effective account.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ghmulti_core::config::Settings;

use commands::App;

/// Environment variable holding a log filter, e.g. `debug` or `ghmulti_core=trace`.
const LOG_ENV: &str = "GHMULTI_LOG";

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Manage multiple GitHub accounts for git.
#[derive(Parser, Debug)]
#[command(name = "ghmulti", version, about = "Manage multiple GitHub accounts for git")]
struct Cli {
    /// Path to the TOML settings file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (overrides GHMULTI_LOG and the settings file).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a new account.
    Add {
        /// Account name (prompted when omitted).
        name: Option<String>,

        /// GitHub username.
        #[arg(long)]
        username: Option<String>,

        /// GPG or SSH signing key id.
        #[arg(long)]
        gpg_key_id: Option<String>,

        /// Private key for `core.sshCommand`.
        #[arg(long)]
        ssh_key_path: Option<String>,

        /// Personal access token, stored in the OS keychain.
        #[arg(long, conflicts_with = "no_token")]
        token: Option<String>,

        /// Do not prompt for a token.
        #[arg(long)]
        no_token: bool,
    },

    /// List configured accounts.
    List {
        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Set the global default account and apply it to the global git config.
    Use {
        name: String,
    },

    /// Link the current repository to an account.
    Link {
        name: String,

        /// Add the `origin-<name>` remote without asking.
        #[arg(long, conflicts_with = "no_remote")]
        add_remote: bool,

        /// Never offer to add a remote.
        #[arg(long)]
        no_remote: bool,
    },

    /// Unlink the current repository.
    Unlink {
        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,

        /// Also unset local user.name/user.email/user.signingkey/core.sshCommand.
        #[arg(long)]
        reset_local_git: bool,
    },

    /// Show the effective account and git identity.
    Status {
        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,

        /// Skip the token check against the GitHub API.
        #[arg(long)]
        no_verify: bool,
    },

    /// Push as the effective account.
    Push {
        /// Branch to push.
        #[arg(long, default_value = "main")]
        branch: String,

        /// Stage everything and commit with this message first.
        #[arg(short, long)]
        message: Option<String>,

        /// Remote name (default: origin-<linked account> or origin).
        #[arg(long)]
        remote: Option<String>,
    },

    /// Pull as the effective account.
    Pull {
        /// Branch to pull.
        #[arg(long, default_value = "main")]
        branch: String,

        /// Remote name (default: origin-<linked account> or origin).
        #[arg(long)]
        remote: Option<String>,
    },

    /// Clone a repository, optionally as a given account, and link it.
    Clone {
        url: String,

        /// Account whose token is used for the clone.
        #[arg(long)]
        account: Option<String>,

        /// Link the clone (default: yes when --account is given, else ask).
        #[arg(long, conflicts_with = "no_link")]
        link: bool,

        /// Do not link the clone.
        #[arg(long)]
        no_link: bool,
    },

    /// Rename an account.
    Rename {
        old_name: String,
        new_name: String,
    },

    /// Remove an account and its token.
    Remove {
        name: String,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Update account details.
    Update {
        name: String,

        /// New GitHub username (the stored token moves with it).
        #[arg(long)]
        username: Option<String>,

        /// New signing key; an empty value clears it.
        #[arg(long)]
        gpg_key_id: Option<String>,

        /// New SSH key path; an empty value clears it.
        #[arg(long)]
        ssh_key_path: Option<String>,

        /// Store a new token.
        #[arg(long)]
        token: Option<String>,

        /// Delete the stored token.
        #[arg(long)]
        clear_token: bool,

        /// Make this the global default account.
        #[arg(long)]
        set_active: bool,
    },

    /// Run environment diagnostics.
    Doctor {
        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage per-account remotes (`origin-<account>`).
    Remote {
        #[command(subcommand)]
        action: RemoteAction,
    },

    /// Manage the settings file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum RemoteAction {
    /// Add `origin-<account>` pointing at a URL.
    Add {
        #[arg(long)]
        account: String,

        /// Remote URL (HTTPS or SSH).
        #[arg(long)]
        url: String,
    },
    /// Remove `origin-<account>`.
    Remove {
        #[arg(long)]
        account: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a commented settings template.
    Init {
        /// Output path (default: the standard settings location).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Print the effective settings.
    Show,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = Settings::load_and_resolve(cli.config.as_deref());
    init_logging(cli.log_level.as_deref(), settings.as_ref().ok());

    // Writing a template must work even when the current settings are broken.
    let result = if let Commands::Config {
        action: ConfigAction::Init { output, force },
    } = &cli.command
    {
        commands::settings::run_init(output.as_deref(), *force).map(|()| ExitCode::SUCCESS)
    } else {
        match settings {
            Ok(settings) => run(cli, settings).await,
            Err(e) => Err(anyhow::Error::new(e).context("failed to load settings")),
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// `--log-level` > `GHMULTI_LOG` > settings `log_level` > `warn`.
fn init_logging(flag: Option<&str>, settings: Option<&Settings>) {
    let directive = flag
        .map(str::to_string)
        .or_else(|| std::env::var(LOG_ENV).ok().filter(|v| !v.trim().is_empty()))
        .or_else(|| settings.map(|s| s.general.log_level.clone()))
        .unwrap_or_else(|| "warn".to_string());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, settings: Settings) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("failed to determine the current directory")?;
    let app = App::new(settings, cwd);

    let result = match cli.command {
        Commands::Add {
            name,
            username,
            gpg_key_id,
            ssh_key_path,
            token,
            no_token,
        } => commands::accounts::run_add(
            &app,
            commands::accounts::AddArgs {
                name,
                username,
                gpg_key_id,
                ssh_key_path,
                token,
                no_token,
            },
        ),
        Commands::List { json } => commands::accounts::run_list(&app, json),
        Commands::Use { name } => commands::accounts::run_use(&app, &name),
        Commands::Rename { old_name, new_name } => {
            commands::accounts::run_rename(&app, &old_name, &new_name)
        }
        Commands::Remove { name, yes } => commands::accounts::run_remove(&app, &name, yes),
        Commands::Update {
            name,
            username,
            gpg_key_id,
            ssh_key_path,
            token,
            clear_token,
            set_active,
        } => commands::accounts::run_update(
            &app,
            &name,
            ghmulti_core::accounts::UpdateRequest {
                username,
                signing_key: gpg_key_id,
                ssh_key_path,
                token,
                clear_token,
                set_active,
            },
        ),
        Commands::Link {
            name,
            add_remote,
            no_remote,
        } => {
            let mode = match (add_remote, no_remote) {
                (true, _) => commands::link::RemoteMode::Add,
                (_, true) => commands::link::RemoteMode::Skip,
                _ => commands::link::RemoteMode::Ask,
            };
            commands::link::run_link(&app, &name, mode)
        }
        Commands::Unlink {
            json,
            reset_local_git,
        } => commands::link::run_unlink(&app, json, reset_local_git),
        Commands::Status { json, no_verify } => {
            return commands::status::run_status(&app, json, !no_verify)
                .await
                .map(|()| ExitCode::SUCCESS)
        }
        Commands::Push {
            branch,
            message,
            remote,
        } => commands::remote::run_push(&app, branch, message, remote),
        Commands::Pull { branch, remote } => commands::remote::run_pull(&app, branch, remote),
        Commands::Clone {
            url,
            account,
            link,
            no_link,
        } => {
            let link = match (link, no_link) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            commands::remote::run_clone(&app, &url, account.as_deref(), link)
        }
        Commands::Remote { action } => match action {
            RemoteAction::Add { account, url } => {
                commands::remote::run_remote_add(&app, &account, &url)
            }
            RemoteAction::Remove { account } => commands::remote::run_remote_remove(&app, &account),
        },
        Commands::Doctor { json } => return commands::doctor::run_doctor(&app, json),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::settings::run_show(&app),
            ConfigAction::Init { output, force } => {
                commands::settings::run_init(output.as_deref(), force)
            }
        },
    };
    result.map(|()| ExitCode::SUCCESS)
}
