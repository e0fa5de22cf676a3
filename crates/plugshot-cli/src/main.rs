use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use plugshot_host::{ScreenshotHost, ScreenshotOptions};
use tracing_subscriber::EnvFilter;

/// Exit code for capture failures, as opposed to usage errors (1).
const EXIT_CAPTURE_FAILED: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "plugshot",
    version,
    about = "Captures a VST3 plugin editor into a PNG without showing a window"
)]
struct Cli {
    /// Path to the .vst3 bundle (or flat module file).
    plugin: PathBuf,
    /// Where to write the PNG.
    output: PathBuf,
    /// Initial window width for the fixed-size hosting path.
    #[arg(long, default_value_t = 1024)]
    width: u32,
    /// Initial window height for the fixed-size hosting path.
    #[arg(long, default_value_t = 768)]
    height: u32,
    /// Exact class name to host instead of the first effect class.
    #[arg(long)]
    class_name: Option<String>,
    /// How long to pump the editor before capturing, in milliseconds.
    #[arg(long, default_value_t = 500)]
    warmup_ms: u64,
}

fn main() -> ExitCode {
    install_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version requests come through here too; only real
            // usage mistakes are failures.
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
            let _ = err.print();
            return code;
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_CAPTURE_FAILED)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let opts = ScreenshotOptions {
        width: cli.width,
        height: cli.height,
        class_name: cli.class_name,
        warmup: Duration::from_millis(cli.warmup_ms),
    };
    let mut host = ScreenshotHost::new();
    host.capture_plugin(&cli.plugin, &cli.output, &opts)
        .with_context(|| format!("could not capture {}", cli.plugin.display()))?;
    Ok(())
}

fn install_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
