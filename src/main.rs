use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::time::Duration;

use mscprobe::devices::{locate_msc_device, platform_enumerator};
use mscprobe::sector::probe_cluster_heap;
use mscprobe::stress::{
    self, DeviceSectorSource, StressConfig, StressOutcome, ThreadSleeper,
};

#[derive(Parser)]
#[command(name = "mscprobe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "USB mass-storage diagnostic: locate, raw-read, and stress an MSC device")]
struct Cli {
    /// Device node to use instead of auto-discovery
    #[arg(short, long, global = true)]
    device: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the first external/USB block device found
    Locate,

    /// List all candidate devices in discovery order
    List,

    /// Read the boot sector, decode the ClusterHeapOffset, and read the
    /// sector it points at
    Probe,

    /// Hammer LBA 0 with repeated reads to provoke the endpoint
    /// double-arming bug; device disconnection counts as a trigger
    Stress {
        #[arg(short, long, default_value_t = 100)]
        iterations: u32,

        /// Pause between reads, in milliseconds
        #[arg(long, default_value_t = 10)]
        delay_ms: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Locate => {
            let device = match cli.device {
                Some(path) => path,
                None => locate_msc_device().context("No suitable device found")?,
            };
            println!("{device}");
        }
        Commands::List => run_list()?,
        Commands::Probe => run_probe(resolve_device(cli.device)?)?,
        Commands::Stress {
            iterations,
            delay_ms,
        } => run_stress(resolve_device(cli.device)?, iterations, delay_ms),
    }

    Ok(())
}

fn resolve_device(override_path: Option<String>) -> Result<String> {
    if let Some(path) = override_path {
        return Ok(path);
    }

    let device = locate_msc_device().context("No suitable device found")?;
    println!("{} {}", style("Found device:").green().bold(), device);
    Ok(device)
}

fn run_list() -> Result<()> {
    let enumerator = platform_enumerator()?;

    println!(
        "{} {}",
        style("Discovering:").cyan(),
        enumerator.description()
    );

    let candidates = enumerator.enumerate()?;

    if candidates.is_empty() {
        println!("{}", style("No candidate devices found.").yellow());
        return Ok(());
    }

    for path in &candidates {
        println!("{path}");
    }

    Ok(())
}

fn run_probe(device: String) -> Result<()> {
    let probe = probe_cluster_heap(&device)
        .with_context(|| format!("Probe of {device} failed"))?;

    println!("Read LBA 0: {} bytes", probe.boot_bytes);
    println!("ClusterHeapOffset LBA: {}", probe.heap_lba);
    println!(
        "Read {} bytes from LBA {}",
        probe.heap_bytes, probe.heap_lba
    );

    Ok(())
}

fn run_stress(device: String, iterations: u32, delay_ms: u64) {
    println!(
        "Reading from {} to trigger the bug ({} iterations, {} ms apart)...",
        device, iterations, delay_ms
    );
    println!("The device should panic and drop off the bus after a few reads.");
    println!();

    let config = StressConfig {
        iterations,
        delay: Duration::from_millis(delay_ms),
        ..StressConfig::default()
    };

    let mut source = DeviceSectorSource::new(&device);
    let mut sleeper = ThreadSleeper;

    let report = stress::run(&mut source, &mut sleeper, &config, |iteration, bytes| {
        println!("Read {bytes} bytes (iteration {iteration}/{iterations})");
    });

    println!();

    match report.outcome {
        StressOutcome::Triggered => {
            if let Some(err) = &report.failure {
                println!("Device access failed: {err}");
            }
            println!(
                "{}",
                style("Device disconnected - the bug was likely triggered.")
                    .green()
                    .bold()
            );
            println!(
                "({} clean reads before the failure)",
                report.completed
            );
        }
        StressOutcome::CompletedClean => {
            println!(
                "{}",
                style(format!(
                    "All {} reads completed - bug not triggered.",
                    report.completed
                ))
                .yellow()
            );
        }
        StressOutcome::UnexpectedFailure => {
            if let Some(err) = &report.failure {
                println!("Unexpected error: {err}");
            }
            println!(
                "{}",
                style("Stopped on a non-I/O failure - not counted as a trigger.").yellow()
            );
        }
    }
}
