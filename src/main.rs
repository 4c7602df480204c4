use clap::Parser;
use pocket::core::config::{self, CliOverrides};
use pocket::tui;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;

#[derive(Parser)]
#[command(name = "pocket", about = "Terminal client for a streaming text-generation server")]
struct Args {
    /// Base URL of the inference server
    #[arg(long)]
    api_base: Option<String>,

    /// Maximum tokens per reply (the server caps this at 200)
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Sampling temperature (the server clamps this to 0.0-1.0)
    #[arg(long)]
    temperature: Option<f64>,

    /// Resume an existing session instead of starting a new one
    #[arg(long)]
    session: Option<String>,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        CliOverrides {
            api_base: args.api_base,
            max_tokens: args.max_tokens,
            temperature: args.temperature,
            session: args.session,
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let (file_config, config_error) = config::load_config_or_default();

    // Log to a file so output never lands on the terminal UI
    let (log_path, log_level) = config::log_settings(&file_config);
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let level = log_level.parse().unwrap_or(LevelFilter::Info);
    if let Ok(log_file) = File::create(&log_path) {
        let _ = WriteLogger::init(level, log_config, log_file);
    }
    if let Some(e) = config_error {
        log::warn!("Ignoring config file ({}), using defaults", e);
    }

    let resolved = config::resolve(&file_config, &args.into());

    log::info!(
        "Pocket starting up: api_base={}, max_tokens={}, temperature={}",
        resolved.api_base,
        resolved.params.max_tokens,
        resolved.params.temperature
    );

    tui::run(resolved)
}
