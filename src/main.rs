use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use shrinkray::{
    calculate_aspect_ratio, format_file_size, BatchCoordinator, CancelToken, Cli, Commands,
    Loader, MetadataProcessor, RunArgs,
};
use std::path::Path;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    match cli.command {
        Commands::Run(args) => run_batch(args),
        Commands::Info { input } => print_info(&input),
    }
}

fn run_batch(args: RunArgs) -> anyhow::Result<()> {
    let config = args.to_config().context("Invalid configuration")?;
    let coordinator = BatchCoordinator::new(config)?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let token = CancelToken::new();
    let report = coordinator.run(&args.inputs, &token, |snapshot| {
        if pb.length() != Some(snapshot.total as u64) {
            pb.set_length(snapshot.total as u64);
        }
        pb.set_position(snapshot.processed as u64);
        pb.set_message(snapshot.current_file.clone());
    })?;
    pb.finish_and_clear();

    println!(
        "Processed {} of {} images in {:.1}s ({:.1}% size reduction)",
        report.succeeded,
        report.total,
        report.duration.as_secs_f64(),
        report.savings_percent()
    );
    println!(
        "Bytes: {} -> {}",
        format_file_size(report.bytes_before),
        format_file_size(report.bytes_after)
    );

    if report.cancelled {
        println!("Batch cancelled, {} items never started", report.skipped);
    }

    if !report.warnings.is_empty() {
        println!("\nSkipped during enumeration ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  {}: {}", warning.path.display(), warning.message);
        }
    }

    if !report.failures.is_empty() {
        println!("\nFailed ({}):", report.failures.len());
        for failure in &report.failures {
            println!(
                "  {} ({}): {}",
                failure.path.display(),
                failure.kind,
                failure.message
            );
        }
    }

    Ok(())
}

fn print_info(input: &Path) -> anyhow::Result<()> {
    if !input.exists() {
        anyhow::bail!("File does not exist: {}", input.display());
    }

    let metadata = std::fs::metadata(input)?;
    let loader = Loader::new();
    let (width, height, format) = loader.probe(input)?;
    let aspect_ratio = calculate_aspect_ratio(width, height);

    let metadata_processor = MetadataProcessor::new();
    let exif = metadata_processor.read_metadata(input).unwrap_or(None);

    println!("=== Image Information ===");
    println!("File: {}", input.display());
    println!("Size: {}", format_file_size(metadata.len()));
    println!("Dimensions: {} x {} pixels", width, height);
    println!("Aspect Ratio: {:.2}:1", aspect_ratio);
    println!("Format: {}", format);
    println!("Has EXIF metadata: {}", exif.is_some());

    if let Some(exif) = exif {
        println!("\n=== EXIF Metadata ===");
        for field in exif.fields() {
            println!(
                "{}: {}",
                field.tag,
                field.display_value().with_unit(&exif)
            );
        }
    }

    Ok(())
}
