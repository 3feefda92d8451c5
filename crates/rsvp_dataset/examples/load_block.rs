//! Load one block of the THU RSVP dataset and print a summary.
//!
//! Usage: `cargo run --example load_block -- [config.json] [subject] [group] [block]`
//!
//! Without a config file the dataset is expected under `./datasets/thu`,
//! unpacked from the published archives.

use anyhow::Context;
use rsvp_dataset::rsvp_types::{BlockId, RECOMMENDED_EXCLUDED_CHANNELS};
use rsvp_dataset::{Dataset, DatasetConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rsvp_dataset=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match args.first() {
        Some(path) => DatasetConfig::from_json_file(path)?,
        None => DatasetConfig::default(),
    };
    let subject: i64 = args.get(1).map_or(Ok(1), |s| s.parse()).context("subject")?;
    let group: char = args.get(2).map_or(Ok('A'), |s| s.parse()).context("group")?;
    let block: i64 = args.get(3).map_or(Ok(1), |s| s.parse()).context("block")?;

    let dataset = Dataset::open(config)?;

    let report = dataset.verify()?;
    if !report.is_ok() {
        println!(
            "Dataset files incomplete: {} missing, {} mismatched",
            report.missing().count(),
            report.mismatched().count()
        );
    }

    let id = BlockId::parse(subject, group, block)?;
    let recording = dataset.load(id)?;
    println!("{}", id);
    println!("  signal:   {:?} at {} Hz", recording.data().dim(), recording.sample_rate_hz());
    println!("  duration: {:.1} s", recording.duration_secs());
    println!("  events:   {}", recording.events().len());
    println!("  targets:  {:.2}%", recording.target_fraction() * 100.0);

    let kept = recording.channels_excluding(&RECOMMENDED_EXCLUDED_CHANNELS)?;
    println!("  without channels {:?}: {:?}", RECOMMENDED_EXCLUDED_CHANNELS, kept.dim());
    Ok(())
}
