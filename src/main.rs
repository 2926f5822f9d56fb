use clap::{Parser, Subcommand, ValueEnum};
use photo_editor::imaging::FsStore;
use photo_editor::naming::OsTokenSource;
use photo_editor::pipeline::Pipeline;
use photo_editor::process::{ProcessResponse, process_body};
use photo_editor::request::Request;
use photo_editor::{config, output};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "photo-editor")]
#[command(about = "Apply crop, resize and convert actions to stored images")]
#[command(long_about = "\
Apply crop, resize and convert actions to stored images

A request names a source image and up to five actions, applied in order:

  {
    \"image_name\": \"cat.jpg\",
    \"actions\": [
      {\"action\": \"crop\",    \"params\": {\"x\": 10, \"y\": 10, \"width\": 400, \"height\": 300}},
      {\"action\": \"resize\",  \"params\": {\"width\": 200}},
      {\"action\": \"convert\", \"params\": {\"format\": \"webp\"}}
    ]
  }

Resize takes width and/or height (one alone keeps the aspect ratio), or a
scale factor. Convert targets jpeg, png, webp, tiff or avif.

The result is saved under a random name and its reference is printed.
Set RUST_LOG (e.g. RUST_LOG=photo_editor=debug) for per-step logs on stderr.

Run 'photo-editor gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (stock defaults when absent)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a request and save the result
    Process {
        /// Request JSON file, or `-` for stdin
        #[arg(long)]
        request: PathBuf,
        /// Correlation id attached to every log line
        #[arg(long)]
        request_id: Option<String>,
        /// How to report the outcome
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Validate a request and its actions without touching any image
    Check {
        /// Request JSON file, or `-` for stdin
        #[arg(long)]
        request: PathBuf,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Process {
            request,
            request_id,
            format,
        } => {
            let config = config::load_config(&cli.config)?;
            let body = read_request(&request)?;
            let store = FsStore::new(
                config.storage.images_dir.clone(),
                config.storage.output_dir.clone(),
                config.storage.public_base_url.clone(),
                config.output.quality,
            );

            let span = tracing::info_span!(
                "request",
                request_id = request_id.as_deref().unwrap_or("-")
            );
            let result = span.in_scope(|| process_body(&store, &OsTokenSource, &config, &body));

            match format {
                Format::Json => {
                    let response = ProcessResponse::from_result(&result);
                    println!("{}", serde_json::to_string_pretty(&response)?);
                }
                Format::Text => match &result {
                    Ok(report) => output::print_process_report(report),
                    Err(e) => output::print_process_error(e),
                },
            }
            result?;
        }
        Command::Check { request } => {
            let config = config::load_config(&cli.config)?;
            let body = read_request(&request)?;
            let request = Request::parse(&body, &config.request_limits())?;
            let plan = Pipeline::new(config.transform_settings()).plan(request.actions())?;
            output::print_plan(request.image_name(), &plan);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default: warnings only).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read a request body from a file, or stdin when the path is `-`.
fn read_request(path: &Path) -> std::io::Result<String> {
    if path == Path::new("-") {
        let mut body = String::new();
        std::io::stdin().read_to_string(&mut body)?;
        Ok(body)
    } else {
        std::fs::read_to_string(path)
    }
}
