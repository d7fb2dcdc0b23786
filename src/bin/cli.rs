use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Arg, ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hubaudit::config::{Config, LoggingConfig, CONFIG_FILE};
use hubaudit::error::{AuditError, Result};
use hubaudit::output::{self, OutputFormat};
use hubaudit::provider::aws::{AwsProvider, ClientConfig};
use hubaudit::rules::{ControlRegistry, Severity};
use hubaudit::server::{self, AppState};

#[derive(Parser)]
#[command(
    name = "hubaudit",
    about = "Audit an AWS account against AWS Security Hub controls",
    version,
    author,
    subcommand_required = true,
    arg_required_else_help = true
)]
struct Cli {
    /// AWS region to audit
    #[arg(long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    /// Named AWS profile
    #[arg(long, global = true, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// Config file path
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    // Control subcommands are added at runtime by `command_line`.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all available controls
    ListControls {
        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,

        /// Only list controls at or above this severity
        #[arg(long)]
        min_severity: Option<String>,
    },

    /// Run every control and print a summary
    All {
        /// Output format (console, json)
        #[arg(long, short = 'f', default_value = "console")]
        format: String,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Serve the controls over HTTP
    Serve {
        /// Address to bind, overriding `server.bind`
        #[arg(long)]
        bind: Option<String>,
    },

    /// Generate a starter .hubaudit.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// The derived CLI plus one subcommand per registered control.
fn command_line(registry: &ControlRegistry) -> clap::Command {
    let mut command = Cli::command();
    for meta in registry.list() {
        command = command.subcommand(
            clap::Command::new(meta.command)
                .about(format!("[{}] {}", meta.id, meta.title))
                .visible_alias(meta.alias())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .default_value("console")
                        .help("Output format (console, json)"),
                ),
        );
    }
    command
}

fn main() {
    let registry = ControlRegistry::default();
    let matches = command_line(&registry).get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    match run(cli, &matches) {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn run(cli: Cli, matches: &ArgMatches) -> Result<i32> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let load = || -> Result<(Config, ControlRegistry)> {
        let config =
            Config::load(&config_path)?.with_overrides(cli.region.clone(), cli.profile.clone());
        init_tracing(&config.logging)?;
        let registry = ControlRegistry::new(&config.controls);
        Ok((config, registry))
    };

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(force),
        Some(Commands::ListControls {
            format,
            min_severity,
        }) => {
            let (_, registry) = load()?;
            cmd_list_controls(&registry, &format, min_severity)
        }
        Some(Commands::All { format, output }) => {
            let (config, registry) = load()?;
            block_on(cmd_all(&config, &registry, &format, output))
        }
        Some(Commands::Serve { bind }) => {
            let (config, registry) = load()?;
            block_on(cmd_serve(config, registry, bind))
        }
        None => {
            let (name, sub) = matches
                .subcommand()
                .ok_or_else(|| AuditError::UnknownControl(String::new()))?;
            let format = sub
                .get_one::<String>("format")
                .cloned()
                .unwrap_or_else(|| "console".into());
            let (config, registry) = load()?;
            block_on(cmd_control(&config, &registry, name, &format))
        }
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .map_err(|e| AuditError::Config(format!("invalid log filter: {}", e)))?;
    let subscriber = tracing_subscriber::registry().with(filter);

    let result = if logging.json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        subscriber
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|e| AuditError::Config(format!("failed to init tracing: {}", e)))
}

/// Controls make sequential calls, so one thread is enough.
fn block_on<F: std::future::Future<Output = Result<i32>>>(fut: F) -> Result<i32> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(fut)
}

fn parse_format(format_str: &str) -> OutputFormat {
    OutputFormat::from_str_lenient(format_str).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", format_str);
        OutputFormat::Console
    })
}

async fn connect(config: &Config) -> Result<AwsProvider> {
    AwsProvider::connect(&ClientConfig::from(&config.aws)).await
}

async fn cmd_control(
    config: &Config,
    registry: &ControlRegistry,
    name: &str,
    format_str: &str,
) -> Result<i32> {
    let control = registry
        .find(name)
        .ok_or_else(|| AuditError::UnknownControl(name.to_string()))?;
    let provider = connect(config).await?;

    let report = hubaudit::run_control(control, &provider, &config.catalog).await;
    print!(
        "{}",
        output::render_report(&report, parse_format(format_str))?
    );

    // FAIL and NA are results, not errors.
    Ok(0)
}

async fn cmd_all(
    config: &Config,
    registry: &ControlRegistry,
    format_str: &str,
    output_path: Option<PathBuf>,
) -> Result<i32> {
    let provider = connect(config).await?;
    let run = hubaudit::run_all(registry, &provider, &config.catalog).await;
    let rendered = output::render_run(&run, parse_format(format_str))?;

    match output_path {
        Some(out) => std::fs::write(&out, &rendered)?,
        None => print!("{}", rendered),
    }

    Ok(0)
}

async fn cmd_serve(config: Config, registry: ControlRegistry, bind: Option<String>) -> Result<i32> {
    let provider = connect(&config).await?;
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let state = AppState {
        provider: Arc::new(provider),
        registry: Arc::new(registry),
        catalog: config.catalog.clone(),
    };

    server::serve(state, &bind).await?;
    Ok(0)
}

fn cmd_list_controls(
    registry: &ControlRegistry,
    format_str: &str,
    min_severity: Option<String>,
) -> Result<i32> {
    let threshold = min_severity.and_then(|s| {
        let sev = Severity::from_str_lenient(&s);
        if sev.is_none() {
            eprintln!("Warning: unknown severity '{}', listing all controls", s);
        }
        sev
    });

    let controls: Vec<_> = registry
        .list()
        .into_iter()
        .filter(|meta| threshold.map_or(true, |t| meta.severity >= t))
        .collect();

    print!(
        "{}",
        output::render_controls(&controls, parse_format(format_str))?
    );
    Ok(0)
}

fn cmd_init(force: bool) -> Result<i32> {
    let path = PathBuf::from(CONFIG_FILE);

    if path.exists() && !force {
        eprintln!("{} already exists. Use --force to overwrite.", CONFIG_FILE);
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created {}", CONFIG_FILE);

    Ok(0)
}
