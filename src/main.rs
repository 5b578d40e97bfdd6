use std::sync::Arc;

use anyhow::{Context, Result};
use skycast_core::{AppError, Config};
use skycast_weather::{
    cardinal_direction, Notification, SearchCoordinator, SqliteStore, WeatherOrchestrator,
    WeatherSnapshot,
};

#[tokio::main]
async fn main() -> Result<()> {
    skycast_core::init()?;

    if let Err(e) = run().await {
        tracing::error!("SkyCast failed: {:#}", e);
        let err = AppError::from_anyhow(e);
        eprintln!("{}", err.user_message());
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let (config, _validation) = Config::load_validated()?;
    let store = SqliteStore::open(config.database_path())?;

    let (tx, rx) = std::sync::mpsc::channel();
    let orchestrator = WeatherOrchestrator::from_config(&config, Arc::new(store))
        .context("Failed to create weather service")?
        .with_notifier(tx);

    orchestrator.initialize().await;
    tracing::info!("SkyCast started");

    if let Some(query) = std::env::args().nth(1) {
        let search = SearchCoordinator::from_config(&config.search)
            .context("Failed to create location search")?;
        match search.submit(&query).await.unwrap_or_default().first() {
            Some(location) => {
                orchestrator.fetch_weather(location).await;
            }
            None => println!("No locations found for '{}'", query),
        }
    }

    while let Ok(notification) = rx.try_recv() {
        match notification {
            Notification::FetchFailed { title, description } => {
                eprintln!("{}: {}", title, description)
            }
            Notification::Refreshed { location_name } => {
                println!("Weather data updated for {}", location_name)
            }
        }
    }

    let state = orchestrator.state().snapshot();
    match state.current_weather {
        Some(snapshot) => print_summary(&snapshot),
        None if state.saved_locations.is_empty() => {
            println!("No saved locations. Run `skycast <place or postal code>` to add one.")
        }
        None => println!("No weather data available."),
    }

    Ok(())
}

fn print_summary(snapshot: &WeatherSnapshot) {
    let current = &snapshot.current;
    let info = current.code_info();

    println!("{}", snapshot.location.name);
    println!(
        "  {:.1}° {} ({})",
        current.temperature,
        info.label,
        snapshot.current_icon().name()
    );
    println!(
        "  Wind {:.0} km/h {}",
        current.wind_speed,
        cardinal_direction(current.wind_direction)
    );
    if let Some(humidity) = current.humidity {
        println!("  Humidity {:.0}%", humidity);
    }

    if !snapshot.hourly.is_empty() {
        println!("\nNext hours:");
        for hour in snapshot.next_hours(6) {
            println!(
                "  {}  {:>5.1}°  {}",
                hour.time.format("%H:%M"),
                hour.temperature,
                skycast_weather::WeatherCodeInfo::lookup(hour.weather_code).label
            );
        }
    }

    println!("\nDaily:");
    for day in &snapshot.daily {
        println!(
            "  {}  {:>5.1}° / {:>5.1}°  {}",
            day.date.format("%a %d %b"),
            day.temperature_max,
            day.temperature_min,
            skycast_weather::WeatherCodeInfo::lookup(day.weather_code).label
        );
    }

    println!(
        "\nUpdated {}",
        snapshot.last_updated.format("%Y-%m-%d %H:%M UTC")
    );
}
