//! Argument parsing and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use cloudpull_app::{AppError, logging_config};
use cloudpull_config::{ConfigStore, default_path};
use cloudpull_telemetry::{GlobalContextGuard, init_logging};

use crate::client::{AppContext, CliError, CliResult};
use crate::commands::config::{handle_config_set, handle_config_show};
use crate::commands::ls::handle_ls;
use crate::commands::pull::handle_pull;
use crate::commands::remotes::{handle_remotes_create, handle_remotes_list};

/// Parses CLI arguments and executes the requested command. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    match run_with(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn run_with(cli: Cli) -> CliResult<()> {
    let path = match cli.config {
        Some(path) => path,
        None => default_path()
            .map_err(|err| CliError::failure(AppError::config("config.path", err)))?,
    };
    let store = ConfigStore::open(path)
        .await
        .map_err(|err| CliError::failure(AppError::config("config.open", err)))?;
    init_logging(&logging_config(&store.config().logging))
        .map_err(|err| CliError::failure(AppError::telemetry("telemetry.init", err)))?;
    let _context = GlobalContextGuard::new(command_label(&cli.command));

    let mut ctx = AppContext {
        store,
        output: cli.output,
    };
    dispatch(cli.command, &mut ctx).await
}

pub(crate) async fn dispatch(command: Command, ctx: &mut AppContext) -> CliResult<()> {
    match command {
        Command::Remotes(RemotesCommand::List) => handle_remotes_list(ctx).await,
        Command::Remotes(RemotesCommand::Create) => handle_remotes_create(ctx).await,
        Command::Ls(args) => handle_ls(ctx, &args).await,
        Command::Pull(args) => handle_pull(ctx, &args).await,
        Command::Config(ConfigCommand::Show) => handle_config_show(ctx),
        Command::Config(ConfigCommand::Set(args)) => handle_config_set(ctx, &args).await,
    }
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Remotes(RemotesCommand::List) => "remotes_list",
        Command::Remotes(RemotesCommand::Create) => "remotes_create",
        Command::Ls(_) => "ls",
        Command::Pull(_) => "pull",
        Command::Config(ConfigCommand::Show) => "config_show",
        Command::Config(ConfigCommand::Set(_)) => "config_set",
    }
}

#[derive(Parser)]
#[command(
    name = "cloudpull",
    about = "Download and sync shared cloud folders through rclone"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        help = "Configuration file (defaults to $CLOUDPULL_CONFIG or the XDG config dir)"
    )]
    pub(crate) config: Option<PathBuf>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Manage rclone remotes.
    #[command(subcommand)]
    Remotes(RemotesCommand),
    /// List a folder of the source.
    Ls(LsArgs),
    /// Download or sync the source into a local folder.
    Pull(PullArgs),
    /// Inspect or edit the configuration file.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
pub(crate) enum RemotesCommand {
    /// List Google Drive remotes known to rclone.
    List,
    /// Authorize a new remote in the browser.
    Create,
}

#[derive(Subcommand)]
pub(crate) enum ConfigCommand {
    /// Print the effective configuration.
    Show,
    /// Set one `section.field` value.
    Set(ConfigSetArgs),
}

#[derive(Args)]
pub(crate) struct ConfigSetArgs {
    pub(crate) key: String,
    pub(crate) value: String,
}

#[derive(Args, Default)]
pub(crate) struct LsArgs {
    #[arg(long, default_value = "")]
    pub(crate) path: String,
    #[arg(long)]
    pub(crate) source: Option<String>,
    #[arg(long)]
    pub(crate) remote: Option<String>,
}

#[derive(Args, Default)]
pub(crate) struct PullArgs {
    #[arg(long)]
    pub(crate) destination: Option<String>,
    #[arg(long)]
    pub(crate) source: Option<String>,
    #[arg(long)]
    pub(crate) remote: Option<String>,
    #[arg(long, help = "Do not keep replaced or deleted files in a backup folder")]
    pub(crate) no_backup: bool,
    #[arg(long)]
    pub(crate) no_subfolder: bool,
    #[arg(long, help = "Copy new and changed files without deleting anything")]
    pub(crate) copy: bool,
    #[arg(long)]
    pub(crate) delete_excluded: bool,
    #[arg(long)]
    pub(crate) track_renames: bool,
    #[arg(long, help = "Bandwidth cap such as 10M or 512K")]
    pub(crate) bwlimit: Option<String>,
    #[arg(long, value_delimiter = ',', help = "Top-level entries to transfer")]
    pub(crate) select: Vec<String>,
    #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
    pub(crate) yes: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}
