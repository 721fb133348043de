use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use metadater_core::source::parse_source_list;
use metadater_core::{CancellationToken, ProcessControl, DEFAULT_FILENAME_PATTERN};

#[derive(Parser)]
#[command(
    name = "metadater",
    version,
    about = "Restore capture dates and GPS positions of photos from EXIF, JSON sidecars and file names"
)]
struct Cli {
    /// Directory holding the media files
    input: PathBuf,

    /// Directory the processed copies are written to
    output: PathBuf,

    /// Comma-separated metadata sources, highest priority first (exif, json, filename)
    #[arg(short, long, default_value = "exif,json,filename")]
    sources: String,

    /// strptime-style file name templates for the filename source, e.g. IMG_%Y%m%d_%H%M%S
    #[arg(short = 'n', long, value_delimiter = ',', default_value = DEFAULT_FILENAME_PATTERN)]
    name_format: Vec<String>,

    /// Walk subdirectories and mirror them in the output
    #[arg(short, long)]
    recursive: bool,

    /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let t_total = std::time::Instant::now();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling after the current file...");
        handler_token.cancel();
    })?;

    let mut options = metadater_core::ProcessOptions::new(cli.input, cli.output);
    options.sources = parse_source_list(&cli.sources)?;
    options.filename_patterns = cli.name_format;
    options.recursive = cli.recursive;

    let pb = ProgressBar::new(0);
    pb.set_style(ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} {msg}")?);

    let control = ProcessControl::new().with_cancel_token(token);
    let cb_pb = pb.clone();
    let result = metadater_core::process_with_control(&options, &control, &move |stage, current, total, message| {
        match stage {
            "scan" => {
                cb_pb.set_length(total);
                cb_pb.set_message(message.to_string());
            }
            _ => {
                cb_pb.println(message);
                cb_pb.set_position(current + 1);
            }
        }
    });
    pb.finish_and_clear();
    let result = result?;

    eprintln!(
        "Done! {} files, {} updated, {} unchanged, {} failed ({:.2}s)",
        result.total_files,
        result.files_written,
        result.files_unchanged,
        result.files_failed,
        t_total.elapsed().as_secs_f64()
    );

    Ok(())
}
