use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;

use fifa_insights::cli_args::{parse_arg, string_arg};
use fifa_insights::config::{AppConfig, init_logging, load_dotenv};
use fifa_insights::dataset::load_dataset;
use fifa_insights::image_fetch::{HttpImageSource, fetch_all};

fn main() -> Result<()> {
    load_dotenv();
    init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cfg = AppConfig::from_env();
    let dataset_path = string_arg(&args, "--dataset")
        .map(PathBuf::from)
        .unwrap_or(cfg.dataset_path);
    let out_dir = string_arg(&args, "--out-dir")
        .map(PathBuf::from)
        .unwrap_or(cfg.image_dir);
    let season = parse_arg::<i32>(&args, "--year").unwrap_or(cfg.image_season);
    let workers = parse_arg::<usize>(&args, "--workers")
        .unwrap_or(cfg.fetch_parallelism)
        .clamp(1, 128);

    println!("Loading FIFA {season} data...");
    let dataset = load_dataset(&dataset_path)?;
    let urls: Vec<String> = dataset
        .season(season)
        .into_iter()
        .filter_map(|r| r.face_url.clone())
        .collect();
    println!("Found {} player image urls for {season}", urls.len());

    let source = HttpImageSource::new()?;
    let summary = fetch_all(&urls, &out_dir, workers, &source, |progress| {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", progress.render());
        let _ = stderr.flush();
    })?;

    println!("\n\nDownload complete!");
    println!("✓ Successful: {}", summary.succeeded);
    println!("✗ Failed: {}", summary.failed);
    println!("⊘ Skipped (already exists): {}", summary.skipped);
    if summary.invalid > 0 {
        println!("  Invalid urls: {}", summary.invalid);
    }
    println!("Total images: {}", summary.available());
    println!(
        "Time taken: {:.1} seconds ({:.1} img/s)",
        summary.elapsed.as_secs_f64(),
        summary.throughput()
    );
    Ok(())
}
