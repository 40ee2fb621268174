//! CLI entry point over `taxi_core`.
//!
//! # Responsibility
//! - Provide a small executable to inspect a taxi database.
//! - Keep output deterministic: one car per line, sorted by id.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use taxi_core::{
    default_log_level, init_logging, Car, CarService, SqliteCarRepository, StorageConfig,
};

#[derive(Parser, Debug)]
#[command(name = "taxi", version, about = "Inspect cars, manufacturers and drivers")]
struct Cli {
    /// SQLite database file. An empty in-memory store is used when omitted.
    #[arg(long, env = "TAXI_DB_PATH", global = true)]
    db: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error.
    #[arg(long, env = "TAXI_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files. Logging is off when omitted.
    #[arg(long, env = "TAXI_LOG_DIR", global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print core health and version.
    Ping,
    /// List all active cars.
    Cars,
    /// Show one active car.
    Car { id: i64 },
    /// List active cars linked to a driver.
    CarsByDriver { driver_id: i64 },
    /// Soft-delete a car.
    DeleteCar { id: i64 },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).context("failed to initialize logging")?;
    }

    if let Command::Ping = cli.command {
        println!("taxi_core ping={}", taxi_core::ping());
        println!("taxi_core version={}", taxi_core::core_version());
        return Ok(());
    }

    let config = match cli.db {
        Some(path) => StorageConfig::file(path),
        None => StorageConfig::default(),
    };
    let provider = config.into_provider().context("failed to open database")?;
    let service = CarService::new(SqliteCarRepository::new(provider));
    info!("event=cli_command module=cli status=start command={:?}", cli.command);

    match cli.command {
        Command::Ping => {}
        Command::Cars => print_cars(&service.list_cars()?),
        Command::Car { id } => match service.get_car(id)? {
            Some(car) => println!("{}", render_car(&car)),
            None => println!("car {id} not found"),
        },
        Command::CarsByDriver { driver_id } => {
            print_cars(&service.get_all_by_driver(driver_id)?)
        }
        Command::DeleteCar { id } => {
            let deleted = service.delete_car(id)?;
            println!("car {id} deleted={deleted}");
        }
    }

    Ok(())
}

fn print_cars(cars: &[Car]) {
    for car in cars {
        println!("{}", render_car(car));
    }
}

fn render_car(car: &Car) -> String {
    let mut drivers: Vec<String> = car
        .drivers
        .iter()
        .map(|driver| format!("{} ({})", driver.name, driver.license_number))
        .collect();
    drivers.sort();

    format!(
        "{}\t{}\t{} [{}]\tdrivers: {}",
        car.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
        car.model,
        car.manufacturer.name,
        car.manufacturer.country,
        if drivers.is_empty() {
            "none".to_string()
        } else {
            drivers.join(", ")
        }
    )
}
