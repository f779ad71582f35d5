//! Convert command implementation

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use tokio_util::sync::CancellationToken;

use crate::cli::error::CliError;
use crate::cli::output::{format_block_details, format_preview, format_summary};
use crate::config::AppConfig;
use crate::convert::DdlConverter;
use crate::input::DdlSource;
use crate::llm::{LlmProvider, build_client};

/// Provider selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    Gemini,
    Ollama,
}

/// Arguments for the `convert` command
#[derive(Debug, Clone, Default, Args)]
pub struct ConvertArgs {
    /// Oracle DDL file (.sql or .txt), or '-' to read pasted text from stdin
    #[arg(value_name = "INPUT", conflicts_with = "text")]
    pub input: Option<String>,

    /// Oracle DDL given directly on the command line
    #[arg(long)]
    pub text: Option<String>,

    /// TOML configuration file
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Model provider
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Model identifier
    #[arg(long)]
    pub model: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Per-block timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Number of blocks converted at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Convert identical blocks only once
    #[arg(long)]
    pub dedupe: bool,

    /// Extra attempts for transient model failures
    #[arg(long)]
    pub retries: Option<usize>,

    /// Output file
    #[arg(long, short = 'o', conflicts_with_all = ["output_dir", "stdout"])]
    pub output: Option<PathBuf>,

    /// Directory for the derived output file name
    #[arg(long, conflicts_with = "stdout")]
    pub output_dir: Option<PathBuf>,

    /// Write converted DDL to stdout
    #[arg(long)]
    pub stdout: bool,

    /// Show blocks and prompts without calling the model
    #[arg(long)]
    pub dry_run: bool,

    /// Log prompts, raw responses and per-block details
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

/// Load input content from a file, stdin or `--text`
fn load_input(args: &ConvertArgs) -> Result<DdlSource, CliError> {
    match (&args.input, &args.text) {
        (Some(_), Some(_)) => Err(CliError::InvalidArgument(
            "use either INPUT or --text, not both".to_string(),
        )),
        (None, Some(text)) => Ok(DdlSource::pasted(text.as_str())),
        (Some(input), None) if input == "-" => Ok(DdlSource::from_reader(std::io::stdin().lock())?),
        (Some(input), None) => Ok(DdlSource::from_path(input)?),
        (None, None) => Err(CliError::InvalidArgument(
            "no input given; pass a DDL file, '-' for stdin, or --text".to_string(),
        )),
    }
}

/// Merge the config file, environment and command-line flags
pub fn resolve_config(
    args: &ConvertArgs,
    env: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig, CliError> {
    let mut config = match &args.config_file {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    let switch_to = match args.provider {
        Some(ProviderArg::Ollama) if config.llm.provider.name() != "ollama" => {
            Some(LlmProvider::ollama())
        }
        Some(ProviderArg::Gemini) if config.llm.provider.name() != "gemini" => {
            Some(LlmProvider::gemini())
        }
        _ => None,
    };
    if let Some(provider) = switch_to {
        config.llm = config.llm.with_provider(provider);
    }

    config = config.with_env_from(env);

    if let Some(model) = &args.model {
        config.llm = config.llm.with_model(model.as_str());
    }
    if let Some(temperature) = args.temperature {
        config.llm.temperature = temperature;
    }
    if let Some(seconds) = args.timeout {
        config.llm = config.llm.with_timeout(seconds);
        config.converter = config.converter.with_block_timeout(Some(seconds));
    }
    if let Some(n) = args.concurrency {
        config.converter = config.converter.with_max_concurrency(n);
    }
    if args.dedupe {
        config.converter = config.converter.with_dedupe(true);
    }
    if let Some(n) = args.retries {
        let delay = config.converter.retry_delay_ms;
        config.converter = config.converter.with_retries(n, delay);
    }
    if args.verbose {
        config.converter = config.converter.with_verbose(true);
    }

    config.validate()?;
    Ok(config)
}

/// Where the converted DDL goes; `None` means stdout
fn output_path(args: &ConvertArgs, source: &DdlSource) -> Option<PathBuf> {
    if args.stdout {
        return None;
    }
    if let Some(path) = &args.output {
        return Some(path.clone());
    }
    let dir = args.output_dir.as_deref().unwrap_or(Path::new("."));
    Some(dir.join(source.output_file_name()))
}

/// Handle the convert command
pub async fn handle_convert(args: &ConvertArgs, cancel: CancellationToken) -> Result<(), CliError> {
    let source = load_input(args)?;
    let text = source.text();

    if args.dry_run {
        let preview = DdlConverter::preview(&text);
        if preview.is_empty() {
            return Err(crate::convert::ConvertError::EmptyInput.into());
        }
        println!("{}", format_preview(&preview, args.verbose));
        return Ok(());
    }

    let config = resolve_config(args, |key| std::env::var(key).ok())?;
    let client = build_client(&config.llm)?;
    let converter = DdlConverter::new(client, config.converter)?;

    eprintln!(
        "Converting with {} ({})...",
        config.llm.model,
        config.llm.provider.name()
    );

    let report = converter.convert_with_cancel(&text, &cancel).await?;

    eprint!("{}", format_summary(&report));
    if args.verbose {
        eprint!("{}", format_block_details(&report));
    }

    match output_path(args, &source) {
        None => println!("{}", report.output),
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| CliError::FileWriteError(path.clone(), e.to_string()))?;
            }
            let mut contents = report.output.clone();
            contents.push('\n');
            std::fs::write(&path, contents)
                .map_err(|e| CliError::FileWriteError(path.clone(), e.to_string()))?;
            eprintln!("Wrote {}", path.display());
        }
    }

    Ok(())
}
