//! banana - Banana 应用脚手架
//!
//! ```text
//! banana new <app_name> [--template bare|basic|advanced]
//! ```

use banana_core::{ApplicationError, Environment, LogLevel, LoggingConfig};
use clap::{Parser, Subcommand};
use scaffold::{ScaffoldError, Scaffolder};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use template::{Template, TemplateSources};
use thiserror::Error;

mod scaffold;
mod template;

/// banana - Banana application scaffolding
#[derive(Parser, Debug)]
#[command(name = "banana")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new app in the current directory
    New {
        /// App name, also used as the directory name
        app_name: Option<String>,

        /// Project template; prompts when omitted
        #[arg(short, long, value_enum)]
        template: Option<Template>,
    },

    #[command(external_subcommand)]
    External(Vec<String>),
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error(transparent)]
    Scaffold(#[from] ScaffoldError),

    #[error(transparent)]
    Config(#[from] ApplicationError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = cli.log_level.parse().unwrap_or(LogLevel::Warn);
    if let Err(err) = LoggingConfig::new()
        .level(level)
        .show_target(false)
        .show_timestamp(false)
        .init()
    {
        eprintln!("{}", err);
    }

    let root = PathBuf::from(".");
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    match execute(cli.command, &root, &mut input, &mut output) {
        Ok(message) => {
            println!("{}", message);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::debug!(error = ?err, "Command failed");
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

/// 执行子命令，返回成功时输出的提示
fn execute<R: BufRead, W: Write>(
    command: Commands,
    root: &Path,
    input: &mut R,
    output: &mut W,
) -> Result<String, CliError> {
    match command {
        Commands::New { app_name, template } => {
            let name = scaffold::validate_name(app_name.as_deref().unwrap_or_default())?;

            if root.join(name).exists() {
                return Err(ScaffoldError::AlreadyExists(name.to_string()).into());
            }

            let template = match template {
                Some(template) => template,
                None => template::prompt_template(input, output)?,
            };

            let environment = Environment::load(&[], "BANANA_")?;
            let sources = TemplateSources::from_environment(&environment);
            Scaffolder::new(root, sources).create_app(name, template)?;

            Ok(format!("App \"{}\" created successfully!", name))
        }
        Commands::External(args) => {
            let command = args.into_iter().next().unwrap_or_default();
            Err(CliError::UnknownCommand(command))
        }
    }
}
