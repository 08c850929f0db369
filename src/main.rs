//! imgturn CLI - flip an image vertically on the GPU.
//!
//! Usage: `imgturn [input]`. The result is always written to
//! `./output_img.png`.

use anyhow::Context;
use imgturn::prelude::*;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or(imgturn::NAME);

    let input = match args.get(1).map(String::as_str) {
        Some("-h") | Some("--help") => {
            print_usage(program);
            return;
        }
        Some("-V") | Some("--version") => {
            println!("{} {}", imgturn::NAME, imgturn::VERSION);
            return;
        }
        Some(path) => path.to_string(),
        None => imgturn::core::DEFAULT_INPUT.to_string(),
    };

    if args.len() > 2 {
        log::warn!("ignoring {} extra argument(s)", args.len() - 2);
    }

    if let Err(e) = run(&input) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(input: &str) -> anyhow::Result<()> {
    let options = PipelineOptions::new().with_input(input).with_progress(|update| {
        if let ProgressUpdate::Failed { stage, kind, .. } = update {
            log::debug!("{} stage failed with {}", stage, kind);
        }
    });

    let report = TransformPipeline::run(&options, &FileCodec::new())
        .map_err(|e| {
            let stage = e.stage();
            anyhow::Error::new(e).context(format!("failed during {} stage", stage))
        })
        .with_context(|| format!("could not flip {}", input))?;

    println!(
        "Wrote {} ({}x{}) in {:.2} ms",
        options.output_path.display(),
        report.width,
        report.height,
        report.total_ms
    );
    Ok(())
}

fn print_usage(program: &str) {
    println!("Usage: {} [input]", program);
    println!();
    println!("Flips <input> vertically on the GPU and writes {}.", imgturn::core::DEFAULT_OUTPUT);
    println!();
    println!("Arguments:");
    println!("  input          Image to flip (default: {})", imgturn::core::DEFAULT_INPUT);
    println!();
    println!("Options:");
    println!("  -h, --help     Show this help message");
    println!("  -V, --version  Show version");
    println!();
    println!("Set RUST_LOG=debug for per-stage timings.");
}
