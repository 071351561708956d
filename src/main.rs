use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use daktela_v6::config::Config;
use daktela_v6::format::{normalize_phone_number, DEFAULT_INTL_LENGTH, DEFAULT_INTL_PREFIX};
use daktela_v6::{ApiResponse, Client, Request, SortDirection};
use serde_json::Value;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Command line client for the Daktela V6 REST API
#[derive(Parser, Debug)]
#[command(name = "daktela", version, about, long_about = None)]
struct Args {
    /// Instance URL (e.g. my.daktela.com)
    #[arg(short, long, global = true)]
    instance: Option<String>,

    /// Access token of the connecting user
    #[arg(short, long, global = true)]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<f64>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,

    /// Store instance, token, timeout and --insecure in the config file
    #[arg(long, global = true)]
    save: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a single entity
    Get { model: String, id: String },
    /// Read one page of a collection
    List {
        model: String,
        #[command(flatten)]
        query: QueryArgs,
        /// Number of records to skip
        #[arg(long, default_value_t = 0)]
        skip: u32,
    },
    /// Read every page of a collection
    All {
        model: String,
        #[command(flatten)]
        query: QueryArgs,
        /// Stop quietly at the first failing page instead of returning its error
        #[arg(long)]
        skip_error_pages: bool,
    },
    /// Read a relation of one entity
    Relation {
        model: String,
        id: String,
        relation: String,
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Create an entity from a JSON object of attributes
    Create { model: String, attributes: String },
    /// Update an entity from a JSON object of attributes
    Update {
        model: String,
        id: String,
        attributes: String,
    },
    /// Delete an entity
    Delete { model: String, id: String },
    /// Normalize a phone number
    Phone {
        number: String,
        /// Use `+` instead of `00`
        #[arg(long)]
        plus: bool,
        #[arg(long, default_value = DEFAULT_INTL_PREFIX)]
        prefix: String,
        #[arg(long, default_value_t = DEFAULT_INTL_LENGTH)]
        length: usize,
    },
}

#[derive(ClapArgs, Debug)]
struct QueryArgs {
    /// Page size
    #[arg(long, default_value_t = daktela_v6::request::DEFAULT_TAKE)]
    take: u32,

    /// Filter clause as FIELD:OPERATOR:VALUE (repeatable)
    #[arg(long = "filter")]
    filters: Vec<String>,

    /// Raw filter JSON, e.g. '{"logic":"or","filters":[["stage","eq","OPEN"]]}'
    #[arg(long)]
    filter_json: Option<String>,

    /// Sort as FIELD:asc|desc (repeatable)
    #[arg(long = "sort")]
    sorts: Vec<String>,
}

impl QueryArgs {
    fn apply(&self, mut request: Request) -> Result<Request> {
        request = request.take(self.take);
        for filter in &self.filters {
            let mut parts = filter.splitn(3, ':');
            let (Some(field), Some(operator), Some(value)) = (parts.next(), parts.next(), parts.next())
            else {
                bail!("Filter must be FIELD:OPERATOR:VALUE, got {}", filter);
            };
            request = request.filter(field, operator, value);
        }
        if let Some(raw) = &self.filter_json {
            let raw: Value = serde_json::from_str(raw).context("Invalid --filter-json")?;
            request = request.merge_filter(&raw)?;
        }
        for sort in &self.sorts {
            let (field, dir) = sort.split_once(':').unwrap_or((sort.as_str(), "asc"));
            request = request.sort(field, dir.parse::<SortDirection>()?);
        }
        Ok(request)
    }
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
            eprintln!("Failed to open log file {:?}: {}", log_path, e);
            return None;
        },
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing_level.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("daktela started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("daktela").join("daktela.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".daktela").join("daktela.log");
    }
    PathBuf::from("daktela.log")
}

fn parse_attributes(raw: &str) -> Result<serde_json::Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).context("Attributes must be valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("Attributes must be a JSON object, got {}", other),
    }
}

fn build_request(command: &Command) -> Result<Request> {
    let request = match command {
        Command::Get { model, id } => Request::read_single(model, id),
        Command::List { model, query, skip } => {
            query.apply(Request::read_multiple(model))?.skip(*skip)
        },
        Command::All {
            model,
            query,
            skip_error_pages,
        } => query
            .apply(Request::read_all(model))?
            .skip_error_pages(*skip_error_pages),
        Command::Relation {
            model,
            id,
            relation,
            query,
        } => query.apply(Request::read_relation(model, id, relation))?,
        Command::Create { model, attributes } => {
            Request::create(model).attributes(parse_attributes(attributes)?)
        },
        Command::Update {
            model,
            id,
            attributes,
        } => Request::update(model)
            .object_id(id)
            .attributes(parse_attributes(attributes)?),
        Command::Delete { model, id } => Request::delete(model).object_id(id),
        Command::Phone { .. } => bail!("phone does not issue a request"),
    };
    Ok(request)
}

fn print_response(response: &ApiResponse) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Command::Phone {
        number,
        plus,
        prefix,
        length,
    } = &args.command
    {
        println!("{}", normalize_phone_number(number, *plus, prefix, *length));
        return Ok(());
    }

    let mut config = Config::load();
    let instance = config
        .effective_instance(args.instance.as_deref())
        .context("No instance configured. Use --instance or save one with --save")?;
    let token = config
        .effective_access_token(args.token.as_deref())
        .context("No access token configured. Use --token or save one with --save")?;

    if args.save {
        config.remember(&instance, &token, args.timeout, args.insecure);
        config.save()?;
    }

    tracing::info!("Using instance: {}", instance);

    let client = Client::connect_with_config(
        &instance,
        &token,
        &config.client_config(args.timeout, args.insecure),
    )?;
    let mut request = build_request(&args.command)?;
    let response = client.execute(&mut request);
    print_response(&response)?;

    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
