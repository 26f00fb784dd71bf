use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use keenq::analysis::{CachedDatasetRequest, RefreshRate, SavedQueryRequest, Timeframe};
use keenq::config::Config;
use keenq::keen::analyses::{list_datasets, list_saved_queries};
use keenq::keen::client::{format_keen_error, KeenClient};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Manage Keen saved queries and cached datasets
#[derive(Parser, Debug)]
#[command(name = "keenq", version, about, long_about = None)]
struct Args {
    /// Keen project to use
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Saved queries
    #[command(subcommand)]
    Saved(SavedCommand),
    /// Cached datasets
    #[command(subcommand)]
    Datasets(DatasetCommand),
    /// Local configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum SavedCommand {
    /// List all saved queries
    List,
    /// Show a saved query definition
    Get { name: String },
    /// Run a saved query and print its result
    Result { name: String },
    /// Create or replace a saved query
    Put(SavedPutArgs),
    /// Delete a saved query
    Delete { name: String },
}

#[derive(ClapArgs, Debug)]
struct SavedPutArgs {
    name: String,
    /// Query definition as JSON, e.g. '{"analysis_type":"count",...}'
    #[arg(long)]
    query: String,
    #[arg(long)]
    display_name: Option<String>,
    /// Hours between cache refreshes (0 disables caching)
    #[arg(long, default_value_t = 0)]
    refresh_hours: u32,
}

#[derive(Subcommand, Debug)]
enum DatasetCommand {
    /// List cached datasets
    List {
        #[arg(long)]
        limit: Option<u32>,
        /// Continue listing after this dataset name
        #[arg(long)]
        after: Option<String>,
    },
    /// Show a dataset definition
    Get { name: String },
    /// Read dataset results for one index value
    Results {
        name: String,
        /// Index value: a plain string or a JSON object of index properties
        #[arg(long)]
        index_by: String,
        /// Relative timeframe (this_7_days) or JSON {"start":..,"end":..}
        #[arg(long)]
        timeframe: String,
    },
    /// Define a new dataset
    Create(DatasetCreateArgs),
    /// Delete a dataset
    Delete { name: String },
}

#[derive(ClapArgs, Debug)]
struct DatasetCreateArgs {
    name: String,
    #[arg(long)]
    display_name: String,
    /// Query definition as JSON; must include an interval
    #[arg(long)]
    query: String,
    /// Property to index by (repeatable)
    #[arg(long = "index-by", required = true)]
    index_by: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Show the effective configuration (keys redacted)
    Show,
    /// Store the default project id
    SetProject { project_id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing_level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("keenq started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("keenq").join("keenq.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".keenq").join("keenq.log");
    }
    PathBuf::from("keenq.log")
}

fn parse_json(arg: &str, what: &str) -> Result<Value> {
    serde_json::from_str(arg).with_context(|| format!("{} is not valid JSON", what))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn client(args: &Args, config: &Config) -> Result<KeenClient> {
    let project = config.project(args.project.as_deref())?;
    KeenClient::with_base_url(project, config.effective_api_url())
}

async fn run_saved(command: &SavedCommand, client: &KeenClient) -> Result<()> {
    match command {
        SavedCommand::List => {
            for query in list_saved_queries(client).await? {
                println!(
                    "{}\t{}\t{}\trefresh={}s",
                    query.query_name, query.display_name, query.analysis_type, query.refresh_rate
                );
            }
        }
        SavedCommand::Get { name } => {
            print_json(&client.execute(&SavedQueryRequest::definition(name)?).await?)?;
        }
        SavedCommand::Result { name } => {
            let result = client.query_result(&SavedQueryRequest::result(name)?).await?;
            print_json(&result.to_json())?;
        }
        SavedCommand::Put(put) => {
            let request = SavedQueryRequest::put(
                &put.name,
                put.display_name.as_deref(),
                parse_json(&put.query, "--query")?,
                RefreshRate::from_hours(put.refresh_hours)?,
            )?;
            print_json(&client.execute(&request).await?)?;
        }
        SavedCommand::Delete { name } => {
            client.execute(&SavedQueryRequest::delete(name)?).await?;
            println!("Deleted saved query {}", name);
        }
    }
    Ok(())
}

async fn run_datasets(command: &DatasetCommand, client: &KeenClient) -> Result<()> {
    match command {
        DatasetCommand::List { limit, after } => {
            let page = list_datasets(client, *limit, after.as_deref()).await?;
            for dataset in &page.datasets {
                println!(
                    "{}\t{}\t[{}]\t{}",
                    dataset.dataset_name,
                    dataset.display_name,
                    dataset.index_by.join(", "),
                    dataset.status
                );
            }
            if let Some(next) = page.next_after_name {
                println!("More datasets available: --after {}", next);
            }
        }
        DatasetCommand::Get { name } => {
            print_json(&client.execute(&CachedDatasetRequest::definition(name)?).await?)?;
        }
        DatasetCommand::Results {
            name,
            index_by,
            timeframe,
        } => {
            let index_by = if index_by.trim_start().starts_with('{') {
                parse_json(index_by, "--index-by")?
            } else {
                Value::String(index_by.clone())
            };
            let request =
                CachedDatasetRequest::results(name, index_by, Timeframe::parse(timeframe)?)?;
            let result = client.query_result(&request).await?;
            print_json(&result.to_json())?;
        }
        DatasetCommand::Create(create) => {
            let request = CachedDatasetRequest::create(
                &create.name,
                &create.display_name,
                parse_json(&create.query, "--query")?,
                create.index_by.clone(),
            )?;
            print_json(&client.execute(&request).await?)?;
        }
        DatasetCommand::Delete { name } => {
            client.execute(&CachedDatasetRequest::delete(name)?).await?;
            println!("Deleted dataset {}", name);
        }
    }
    Ok(())
}

fn run_config(command: &ConfigCommand, config: &mut Config) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let redact = |key: &Option<String>| key.as_ref().map(|_| "<set>").unwrap_or("-");
            println!("project_id: {}", config.project_id.as_deref().unwrap_or("-"));
            println!("read_key:   {}", redact(&config.read_key));
            println!("master_key: {}", redact(&config.master_key));
            println!("api_url:    {}", config.effective_api_url());
            if let Some(path) = Config::config_path() {
                println!("file:       {}", path.display());
            }
        }
        ConfigCommand::SetProject { project_id } => {
            config.set_project(project_id)?;
            println!("Default project set to {}", project_id);
        }
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    match &args.command {
        Command::Config(command) => {
            // Only the file contents are persisted, never environment overrides
            let mut config = Config::load();
            if matches!(command, ConfigCommand::Show) {
                config = config.with_env();
            }
            run_config(command, &mut config)
        }
        Command::Saved(command) => {
            let client = client(&args, &Config::load().with_env())?;
            run_saved(command, &client).await
        }
        Command::Datasets(command) => {
            let client = client(&args, &Config::load().with_env())?;
            run_datasets(command, &client).await
        }
    }
}

fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<keenq::Error>() {
        Some(e) => e.to_string(),
        None => format_keen_error(err),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("Command failed: {:?}", err);
            eprintln!("Error: {}", describe_error(&err));
            ExitCode::FAILURE
        }
    }
}
