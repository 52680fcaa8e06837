use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use cmsgen_core::config::{self, CONFIG_FILE_NAME, CmsgenConfig};
use cmsgen_core::{SpecDocument, complete, convert};
use cmsgen_pipeline::{BatchDriver, CommandTool, GenerationSettings, Orchestrator, TextObserver};

#[derive(Parser)]
#[command(
    name = "cmsgen",
    about = "Migrate legacy API specs and generate per-module client SDKs",
    version
)]
struct Cli {
    /// Config file (defaults to ./cmsgen.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Only run these modules (repeatable)
    #[arg(long = "only", value_name = "MODULE")]
    only: Vec<String>,

    /// Stop every module after conversion; no external generators are run
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Complete a single legacy spec
    Complete {
        /// Raw legacy spec (YAML or JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Module name used for synthesized metadata
        #[arg(short, long)]
        module: String,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a single completed legacy spec to the new dialect
    Convert {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a default cmsgen.yaml
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        None => cmd_run(cli.config, &cli.only, cli.dry_run),
        Some(Commands::Complete {
            input,
            module,
            output,
        }) => cmd_complete(&input, &module, output.as_deref()),
        Some(Commands::Convert { input, output }) => cmd_convert(&input, output.as_deref()),
        Some(Commands::Init { force }) => cmd_init(force),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

/// Load the config file, falling back to defaults when it does not exist.
fn load_config(path: Option<PathBuf>) -> Result<CmsgenConfig> {
    let explicit = path.is_some();
    let path = path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    match config::load_config(&path)? {
        Some(cfg) => Ok(cfg),
        None if explicit => anyhow::bail!("config file {} does not exist", path.display()),
        None => {
            log::debug!("no {CONFIG_FILE_NAME} found, using defaults");
            Ok(CmsgenConfig::default())
        }
    }
}

fn cmd_run(config_path: Option<PathBuf>, only: &[String], dry_run: bool) -> Result<ExitCode> {
    let mut cfg = load_config(config_path)?;
    cfg.validate()?;
    cfg.select(only)?;

    let client = CommandTool::client_generator(&cfg.client_generator);
    let models = CommandTool::model_generator(&cfg.model_generator);
    let orchestrator = Orchestrator::new(&client, &models, GenerationSettings::from_config(&cfg));
    let driver = BatchDriver::new(&cfg, orchestrator).dry_run(dry_run);

    let mut observer = TextObserver::stdout();
    let report = driver.run(&mut observer);
    println!();
    print!("{}", report.summary());

    Ok(ExitCode::from(report.exit_code()))
}

fn cmd_complete(input: &Path, module: &str, output: Option<&Path>) -> Result<ExitCode> {
    let doc = SpecDocument::from_path(input)?;
    let completed = complete(&doc, module)
        .with_context(|| format!("failed to complete {}", input.display()))?;
    emit(&completed, output)?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_convert(input: &Path, output: Option<&Path>) -> Result<ExitCode> {
    let doc = SpecDocument::from_path(input)?;
    let conversion =
        convert(&doc).with_context(|| format!("failed to convert {}", input.display()))?;
    for warning in &conversion.warnings {
        eprintln!("warning: {warning}");
    }
    emit(&conversion.document, output)?;
    Ok(ExitCode::SUCCESS)
}

fn emit(doc: &SpecDocument, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            doc.write_to(path)?;
            eprintln!("  wrote {}", path.display());
        }
        None => print!("{}", doc.to_yaml_string()?),
    }
    Ok(())
}

fn cmd_init(force: bool) -> Result<ExitCode> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, config::default_config_content())
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    eprintln!("Created {}", config_path.display());
    Ok(ExitCode::SUCCESS)
}
