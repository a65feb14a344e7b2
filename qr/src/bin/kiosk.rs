//! Check-in kiosk CLI

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use qr::client::HttpSubmitter;
use qr::scanner::{CheckInConfirmation, ManualEntryError, ScanOutcome, Scanner};
use qr::sources::{DirectoryFrameSource, StdinClipboard};
use qr::{CodePattern, encode};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "kiosk", about = "Dojo attendance check-in kiosk", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scan frames from a directory until a check-in succeeds or Ctrl-C
    Scan(ScanArgs),
    /// Submit a typed code or check-in link
    Enter(EnterArgs),
    /// Read a code or link from standard input and submit it
    Paste(ApiArgs),
    /// Write a code as a QR image (PNG or SVG, by extension)
    Render(RenderArgs),
}

#[derive(Debug, Args)]
struct ApiArgs {
    /// Base URL of the API, including the `/api` prefix
    #[arg(long, env = "KIOSK_API_URL", default_value = "http://127.0.0.1:3000/api")]
    api_url: String,

    /// Bearer token of the student checking in
    #[arg(long, env = "KIOSK_TOKEN", hide_env_values = true)]
    token: String,
}

#[derive(Debug, Args)]
struct ScanArgs {
    #[command(flatten)]
    api: ApiArgs,

    /// Directory the capture daemon drops frames into
    #[arg(long)]
    frames: PathBuf,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 250)]
    interval_ms: u64,
}

#[derive(Debug, Args)]
struct EnterArgs {
    #[command(flatten)]
    api: ApiArgs,

    /// Code or link, e.g. HAMARR-AB12CD
    code: String,
}

#[derive(Debug, Args)]
struct RenderArgs {
    /// Code to encode
    code: String,

    /// Output file (.png or .svg)
    #[arg(long)]
    out: PathBuf,

    /// Pixels per module
    #[arg(long, default_value_t = 8)]
    module_px: u32,
}

#[tokio::main]
async fn main() {
    let _env = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kiosk=info,qr=info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Scan(args) => scan(args).await,
        Commands::Enter(args) => enter(args).await,
        Commands::Paste(args) => paste(args).await,
        Commands::Render(args) => render(args),
    };

    if let Err(message) = result {
        eprintln!("{message}");
        process::exit(1);
    }
}

fn pattern() -> Result<CodePattern, String> {
    CodePattern::from_config().map_err(|e| format!("invalid code configuration: {e}"))
}

fn print_confirmation(confirmation: &CheckInConfirmation) {
    println!("{}", confirmation.message);
    if let Some(a) = &confirmation.attendance {
        println!("{} ({}) at {}, {} {}", a.class_name, a.discipline, a.location, a.class_date, a.class_time);
    }
}

async fn scan(args: ScanArgs) -> Result<(), String> {
    let submitter = HttpSubmitter::new(&args.api.api_url, args.api.token);
    let frames = DirectoryFrameSource::new(args.frames);
    let mut scanner = Scanner::new(frames, submitter, pattern()?)
        .with_interval(Duration::from_millis(args.interval_ms));

    let stop = CancellationToken::new();
    let on_ctrl_c = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let mut states = scanner.subscribe();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            tracing::debug!(?state, "Scanner state");
        }
    });

    match scanner.run(stop).await {
        Ok(ScanOutcome::CheckedIn(confirmation)) => {
            print_confirmation(&confirmation);
            Ok(())
        }
        Ok(ScanOutcome::Stopped { last_rejection }) => match last_rejection {
            Some(rejection) => Err(rejection.message),
            None => Ok(()),
        },
        Err(e) => Err(e.to_string()),
    }
}

async fn enter(args: EnterArgs) -> Result<(), String> {
    let submitter = HttpSubmitter::new(&args.api.api_url, args.api.token);
    let scanner = Scanner::new(DirectoryFrameSource::new("."), submitter, pattern()?);
    report(scanner.submit_manual(&args.code).await)
}

async fn paste(args: ApiArgs) -> Result<(), String> {
    let submitter = HttpSubmitter::new(&args.api_url, args.token);
    let scanner = Scanner::new(DirectoryFrameSource::new("."), submitter, pattern()?);
    report(scanner.paste_from(&mut StdinClipboard).await)
}

fn report(result: Result<CheckInConfirmation, ManualEntryError>) -> Result<(), String> {
    match result {
        Ok(confirmation) => {
            print_confirmation(&confirmation);
            Ok(())
        }
        Err(e) => Err(e.to_string()),
    }
}

fn render(args: RenderArgs) -> Result<(), String> {
    let matrix = encode(&args.code).map_err(|e| e.to_string())?;
    let is_svg = args
        .out
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

    let bytes = if is_svg {
        matrix.to_svg(args.module_px).into_bytes()
    } else {
        matrix.to_png(args.module_px).map_err(|e| e.to_string())?
    };
    std::fs::write(&args.out, bytes).map_err(|e| format!("{}: {e}", args.out.display()))?;
    println!("Wrote {}", args.out.display());
    Ok(())
}
