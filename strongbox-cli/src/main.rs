use std::io::{self, BufWriter};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use strongbox_core::ConfirmationGate;
use strongbox_store::{BackupEngine, EngineConfigBuilder};

mod commands;
mod confirm;

use commands::{CliError, CliResult};
use confirm::{Terminal, confirm};

#[derive(Parser, Debug)]
#[command(name = "strongbox", version)]
#[command(about = "Strongbox - encrypted SQLite backup and restore")]
struct Cli {
    /// SQLite database file (overrides STRONGBOX_DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Directory for locally stored backups (overrides STRONGBOX_BACKUP_DIR)
    #[arg(long, global = true)]
    backup_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an encrypted backup of every table
    Backup {
        /// Also write the artifact to this path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List backups in the backup directory
    List,
    /// Show what a restore would change, without changing anything
    Preview {
        /// Backup artifact
        file: PathBuf,
    },
    /// Restore from a backup after answering a confirmation question
    Restore {
        /// Backup artifact
        file: PathBuf,
        /// Comma-separated tables to restore; all tables when omitted
        #[arg(long)]
        tables: Option<String>,
    },
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    // stdout carries command output; logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .json()
        .try_init();
}

fn open_engine(cli: &Cli) -> CliResult<BackupEngine> {
    let mut builder = EngineConfigBuilder::from_env()?;
    if let Some(path) = &cli.database {
        builder = builder.database_path(path.clone());
    }
    if let Some(dir) = &cli.backup_dir {
        builder = builder.backup_dir(dir.clone());
    }
    let config = builder.build()?;
    Ok(BackupEngine::open(&config)?)
}

fn run(cli: Cli) -> CliResult<()> {
    let engine = open_engine(&cli)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Commands::Backup { out: out_path } => {
            commands::backup(&engine, out_path.as_deref(), &mut out)?;
        }
        Commands::List => commands::list(&engine, &mut out)?,
        Commands::Preview { file } => {
            let artifact = commands::read_artifact(&file)?;
            commands::preview(&engine, &artifact, &mut out)?;
        }
        Commands::Restore { file, tables } => {
            let artifact = commands::read_artifact(&file)?;
            let selection = tables.as_deref().map(commands::parse_tables);

            // Decodes and validates before anyone is asked to confirm
            let preview = engine.preview(&artifact)?;
            if let Some(selection) = &selection {
                preview.validate_selection(selection)?;
            }

            let mut terminal = Terminal::new(io::stdin().lock(), io::stderr());
            terminal
                .notice(&format!(
                    "About to replace {} table(s) from a backup taken at {}.",
                    selection.as_ref().map_or(preview.tables.len(), |s| s.len()),
                    preview.exported_at
                ))
                .map_err(|source| CliError::Io {
                    context: "writing prompt".to_string(),
                    source,
                })?;

            let mut gate = ConfirmationGate::new();
            let permit = confirm(&mut gate, &mut terminal)?;
            commands::restore(&engine, &artifact, selection.as_ref(), permit, &mut out)?;
        }
    }

    Ok(())
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
