/// Version injected at compile time via XDMCTL_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("XDMCTL_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use xdm_registry::api::Api;
use xdm_registry::config::{Credentials, Settings};
use xdm_registry::registry::{
    install_global_table, AnyResource, Collection, Container, GlobalTable, PropertyFilter,
    ResourceKind, TypedResource,
};

/// Command line client for the XDM schema registry
#[derive(Parser, Debug)]
#[command(name = "xdmctl", version = VERSION, about, long_about = None)]
struct Args {
    /// Sandbox to target (overrides settings and XDM_SANDBOX)
    #[arg(short, long)]
    sandbox: Option<String>,

    /// Developer-console credential file (overrides settings and XDM_CREDENTIALS)
    #[arg(short, long)]
    credentials: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one resource and print its document
    Get {
        /// `$id` or `meta:altId`
        id: String,
        /// Fetch the fully resolved document
        #[arg(long)]
        full: bool,
    },
    /// List resources
    List {
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,
        #[arg(long, value_enum)]
        container: Option<ContainerArg>,
        #[arg(long)]
        full: bool,
        /// Server-side property filter, `key=value` (repeatable)
        #[arg(short, long, value_parser = parse_filter)]
        filter: Vec<PropertyFilter>,
    },
    /// Find the single resource with a given title
    Find {
        title: String,
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,
        #[arg(long, value_enum)]
        container: Option<ContainerArg>,
    },
    /// Change the title of a resource
    Rename { id: String, title: String },
    /// Delete a tenant resource
    Delete { id: String },
    /// Write a fresh global-resource snapshot to a file
    Globals { out: PathBuf },
    /// Save the default sandbox in the settings file
    UseSandbox { name: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Schema,
    Class,
    FieldGroup,
    DataType,
    Behavior,
}

impl From<KindArg> for ResourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Schema => ResourceKind::Schema,
            KindArg::Class => ResourceKind::Class,
            KindArg::FieldGroup => ResourceKind::FieldGroup,
            KindArg::DataType => ResourceKind::DataType,
            KindArg::Behavior => ResourceKind::Behavior,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ContainerArg {
    Global,
    Tenant,
}

impl From<ContainerArg> for Container {
    fn from(container: ContainerArg) -> Self {
        match container {
            ContainerArg::Global => Container::Global,
            ContainerArg::Tenant => Container::Tenant,
        }
    }
}

fn parse_filter(raw: &str) -> std::result::Result<PropertyFilter, String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok(PropertyFilter::new(key, value)),
        _ => Err(format!("expected key=value, got \"{}\"", raw)),
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

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("xdmctl started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("xdmctl").join("xdmctl.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".xdmctl").join("xdmctl.log");
    }
    PathBuf::from("xdmctl.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    if let Command::UseSandbox { name } = &args.command {
        let path = Settings::settings_path().context("No config directory available")?;
        Settings::save_sandbox(&path, name)?;
        println!("Default sandbox is now {}", name);
        return Ok(());
    }

    let mut settings = Settings::load();
    if let Some(sandbox) = &args.sandbox {
        settings.sandbox = sandbox.clone();
    }
    if let Some(path) = &args.credentials {
        settings.credentials_file = Some(path.clone());
    }

    if let Some(path) = &settings.globals_file {
        let table = GlobalTable::from_path(path)?;
        install_global_table(table)?;
    }

    let Some(credentials_file) = &settings.credentials_file else {
        bail!("No credentials configured. Set XDM_CREDENTIALS or use --credentials");
    };
    let credentials = Credentials::load(credentials_file)?;

    tracing::info!("Using sandbox: {}", settings.sandbox);
    let api = Api::from_settings(&settings, &credentials)?;

    run(&api, args.command).await
}

async fn run(api: &Api, command: Command) -> Result<()> {
    match command {
        Command::Get { id, full } => {
            let mut resource = api.reference(&id)?;
            resource.fetch(full).await?;
            println!("{}", serde_json::to_string_pretty(&resource.body())?);
        }
        Command::List {
            kind,
            container,
            full,
            filter,
        } => {
            let collection = scoped_registry(api, kind, container)?;
            for resource in collection.find_all(full, &filter).await? {
                println!("{}\t{}", resource.short_id(), resource);
            }
        }
        Command::Find {
            title,
            kind,
            container,
        } => {
            let collection = scoped_registry(api, kind, container)?;
            let filters = [PropertyFilter::new("title", &title)];
            let resource = collection.find(false, &filters).await?;
            println!("{}\t{}", resource.short_id(), resource);
        }
        Command::Rename { id, title } => {
            let mut resource = api.reference(&id)?;
            resource.set_title(&title).await?;
            println!("{}", resource);
        }
        Command::Delete { id } => {
            let resource = api.reference(&id)?;
            let label = resource.to_string();
            resource.into_resource().delete().await?;
            println!("Deleted {}", label);
        }
        Command::Globals { out } => {
            let table = api.snapshot_globals().await?;
            std::fs::write(&out, table.to_json()?)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Wrote {} global resources to {}", table.len(), out.display());
        }
        Command::UseSandbox { .. } => bail!("use-sandbox runs without a registry connection"),
    }
    Ok(())
}

fn scoped_registry(
    api: &Api,
    kind: Option<KindArg>,
    container: Option<ContainerArg>,
) -> Result<Collection<AnyResource>> {
    let container = container.map(Container::from);
    Ok(match kind {
        Some(kind) => Collection::with_kinds(
            api.client().clone(),
            container,
            &[ResourceKind::from(kind)],
        )?,
        None => Collection::new(api.client().clone(), container),
    })
}
