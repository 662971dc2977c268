use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tenki::{AppError, Config, DayEntry, ForecastSnapshot, Refresher};
use tenki_store::{parse_fetched_at, FETCHED_AT_FORMAT};

#[derive(Debug, Parser)]
#[command(name = "tenki", version, about = "JMA forecasts with a local snapshot history")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "TENKI_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download the area catalog and list centers with their offices
    Areas,
    /// Download an area's forecast and store it as a new snapshot
    Fetch { area_code: String },
    /// Show the latest snapshot of an area, or the one fetched at `--at`
    Show {
        area_code: String,
        /// Fetch time, e.g. "2025-12-18 17:05:12"
        #[arg(long)]
        at: Option<String>,
    },
    /// List the fetch times stored for an area, newest first
    History { area_code: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tenki_core::init()?;

    let (config, _) = Config::load_validated(cli.config.as_deref()).map_err(report)?;
    let refresher = Refresher::from_config(&config).map_err(report)?;

    match cli.command {
        Command::Areas => {
            let index = refresher.refresh_catalog().await.map_err(report)?;
            for center in &index.centers {
                println!("{} {} ({} areas)", center.code, center.name, center.offices.len());
                for office in &center.offices {
                    println!("    {} {}", office.area_code, office.area_name);
                }
            }
        }
        Command::Fetch { area_code } => {
            let snapshot = refresher.refresh_area(&area_code).await.map_err(report)?;
            print_snapshot(&snapshot);
        }
        Command::Show { area_code, at } => match at {
            Some(at) => {
                let fetched_at = parse_fetched_at(&at)
                    .with_context(|| format!("Expected a time like 2025-12-18 17:05:12, got {:?}", at))?;
                match refresher.snapshot_at(&area_code, fetched_at).await.map_err(report)? {
                    Some(snapshot) => print_snapshot(&snapshot),
                    None => println!("No snapshot for {} at {}", area_code, at),
                }
            }
            None => {
                let days = refresher.latest(&area_code).await.map_err(report)?;
                if days.is_empty() {
                    println!("No forecasts stored for {}", area_code);
                }
                print_days(&days);
            }
        },
        Command::History { area_code } => {
            for fetched_at in refresher.history(&area_code).await.map_err(report)? {
                println!("{}", fetched_at.format(FETCHED_AT_FORMAT));
            }
        }
    }

    Ok(())
}

/// Log the full error and surface the user-facing message.
fn report(err: AppError) -> anyhow::Error {
    tracing::error!("{}", err);
    let hint = if err.is_retryable() { " (try again)" } else { "" };
    anyhow::anyhow!("{}{}", err.user_message(), hint)
}

fn print_snapshot(snapshot: &ForecastSnapshot) {
    println!(
        "{} {} fetched {}",
        snapshot.area_code,
        snapshot.area_name,
        snapshot.fetched_at.format(FETCHED_AT_FORMAT)
    );
    print_days(&snapshot.days);
}

fn print_days(days: &[DayEntry]) {
    for day in days {
        let r = &day.record;
        let category = r.category().map(|c| c.description()).unwrap_or("-");
        println!(
            "{}  {:<4} {:<8} {}  pop {}%  {} / {}  reliability {}",
            day.date,
            r.weather_code.as_deref().unwrap_or("-"),
            category,
            r.weather.as_deref().unwrap_or("-"),
            r.pop.as_deref().unwrap_or("-"),
            r.temp_min.as_deref().unwrap_or("-"),
            r.temp_max.as_deref().unwrap_or("-"),
            r.reliability.map(|g| g.as_str()).unwrap_or("-"),
        );
        if let Some(wind) = &r.wind {
            println!("            wind {}", wind);
        }
        if let Some(wave) = &r.wave {
            println!("            wave {}", wave);
        }
    }
}
