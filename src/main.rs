use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use veoscan::config::{DEFAULT_ENV_FILE, DEFAULT_PREVIEW_LIMIT, DEFAULT_PUBLISHER, DEFAULT_REGION};
use veoscan::generate::DEFAULT_VIDEO_MODEL;
use veoscan::{GcpClient, GenerateOptions, ServiceAccountKey, Settings};

/// Find video-generation models in the Vertex AI Model Garden
#[derive(Parser, Debug)]
#[command(name = "veoscan", version = veoscan::VERSION, about, long_about = None)]
struct Args {
    /// Defaults to `scan`
    #[command(subcommand)]
    command: Option<Command>,

    /// Env file holding GOOGLE_SERVICE_ACCOUNT_JSON and GOOGLE_CLOUD_PROJECT_ID
    #[arg(long, global = true, default_value = DEFAULT_ENV_FILE)]
    env_file: PathBuf,

    /// Vertex AI region
    #[arg(long, global = true, default_value = DEFAULT_REGION)]
    region: String,

    /// Publisher whose models are listed
    #[arg(long, global = true, default_value = DEFAULT_PUBLISHER)]
    publisher: String,

    /// API root to use instead of https://{region}-aiplatform.googleapis.com
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Models requested per page
    #[arg(long, global = true)]
    page_size: Option<u32>,

    /// Log level for debugging
    #[arg(long, global = true, value_enum, default_value = "off")]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the publisher catalog and print video-generation models
    Scan,
    /// Ask a Veo model for a video
    Generate {
        /// What the video should show
        prompt: String,

        /// Reference image file (repeatable)
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,

        /// Model to call
        #[arg(long, default_value = DEFAULT_VIDEO_MODEL)]
        model: String,
    },
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

impl From<&Args> for Settings {
    fn from(args: &Args) -> Self {
        Self {
            env_file: args.env_file.clone(),
            region: args.region.clone(),
            publisher: args.publisher.clone(),
            endpoint: args.endpoint.clone(),
            page_size: args.page_size,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
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
            eprintln!("Could not open log file {}: {}", log_path.display(), e);
            return None;
        }
    };

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

    tracing::info!("veoscan {} started with log level: {:?}", veoscan::VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("veoscan").join("veoscan.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".veoscan").join("veoscan.log");
    }
    PathBuf::from("veoscan.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let settings = Settings::from(&args);
    let mut stdout = std::io::stdout().lock();

    let connect =
        |key: &ServiceAccountKey, project: &str| GcpClient::from_settings(key, project, &settings);

    match args.command {
        None | Some(Command::Scan) => veoscan::run(&settings, connect, &mut stdout).await?,
        Some(Command::Generate {
            prompt,
            images,
            model,
        }) => {
            let options = GenerateOptions {
                prompt,
                images,
                model,
            };
            veoscan::run_generate(&settings, &options, connect, &mut stdout).await?
        }
    }

    stdout.flush()?;
    Ok(())
}
