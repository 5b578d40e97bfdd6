//! Conversion of raw Open-Meteo payloads into the internal model.
//!
//! The forecast endpoint answers in columnar form (`daily.time[i]`,
//! `daily.temperature_2m_max[i]`, ...). Columns are zipped by index into
//! row records; every column must match the length of its section's `time`.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::Deserialize;

use crate::types::{
    CurrentConditions, DailyForecastEntry, HourlyForecastEntry, Location, WeatherError,
    WeatherResult, WeatherSnapshot,
};

/// Raw forecast response
#[derive(Debug, Deserialize)]
pub struct RawForecast {
    #[serde(default)]
    pub utc_offset_seconds: i32,
    pub current: RawCurrent,
    pub hourly: RawHourly,
    pub daily: RawDaily,
}

#[derive(Debug, Deserialize)]
pub struct RawCurrent {
    pub time: String,
    pub temperature_2m: f64,
    pub weather_code: i32,
    pub wind_speed_10m: f64,
    pub wind_direction_10m: f64,
    pub relative_humidity_2m: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub precipitation: Option<f64>,
    pub surface_pressure: Option<f64>,
    pub uv_index: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RawHourly {
    pub time: Vec<String>,
    pub temperature_2m: Vec<f64>,
    pub weather_code: Vec<i32>,
    pub precipitation: Option<Vec<Option<f64>>>,
    pub precipitation_probability: Option<Vec<Option<f64>>>,
    pub wind_speed_10m: Option<Vec<Option<f64>>>,
    pub relative_humidity_2m: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
pub struct RawDaily {
    pub time: Vec<String>,
    pub temperature_2m_max: Vec<f64>,
    pub temperature_2m_min: Vec<f64>,
    pub weather_code: Vec<i32>,
    pub sunrise: Vec<String>,
    pub sunset: Vec<String>,
    pub precipitation_probability_max: Option<Vec<Option<f64>>>,
    pub precipitation_sum: Option<Vec<Option<f64>>>,
    pub uv_index_max: Option<Vec<Option<f64>>>,
}

/// Raw geocoding response; `results` is omitted entirely when nothing matches
#[derive(Debug, Default, Deserialize)]
pub struct RawGeocodeResponse {
    #[serde(default)]
    pub results: Option<Vec<RawGeocodeResult>>,
}

#[derive(Debug, Deserialize)]
pub struct RawGeocodeResult {
    pub id: Option<i64>,
    pub name: String,
    pub admin1: Option<String>,
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// How a free-text query is sent to the geocoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    PostalCode(String),
    PlaceName(String),
}

impl SearchQuery {
    /// Provider query parameter and value
    pub fn param(&self) -> (&'static str, &str) {
        match self {
            SearchQuery::PostalCode(code) => ("postal_code", code),
            SearchQuery::PlaceName(name) => ("name", name),
        }
    }
}

/// Trimmed input of exactly 4-6 ASCII digits is a postal code; anything else is a place name.
pub fn classify_query(input: &str) -> SearchQuery {
    let trimmed = input.trim();
    let is_postal = (4..=6).contains(&trimmed.len()) && trimmed.bytes().all(|b| b.is_ascii_digit());
    if is_postal {
        SearchQuery::PostalCode(trimmed.to_string())
    } else {
        SearchQuery::PlaceName(trimmed.to_string())
    }
}

/// `name[, admin1][, country]`, skipping empty segments
pub fn display_name(name: &str, admin1: Option<&str>, country: Option<&str>) -> String {
    [Some(name), admin1, country]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Stable identifier: provider id (or name) plus coordinates rounded to 4 decimals
pub fn location_id(provider_id: Option<i64>, name: &str, latitude: f64, longitude: f64) -> String {
    let prefix = provider_id.map_or_else(|| name.trim().to_string(), |id| id.to_string());
    format!("{}-{:.4}-{:.4}", prefix, latitude, longitude)
}

pub fn normalize_geocode_results(raw: RawGeocodeResponse) -> Vec<Location> {
    raw.results
        .unwrap_or_default()
        .into_iter()
        .map(|r| Location {
            id: location_id(r.id, &r.name, r.latitude, r.longitude),
            name: display_name(&r.name, r.admin1.as_deref(), r.country.as_deref()),
            latitude: r.latitude,
            longitude: r.longitude,
            favorite: false,
        })
        .collect()
}

/// Build a snapshot from a forecast response. `last_updated` is stamped now.
pub fn normalize_weather(raw: RawForecast, location: &Location) -> WeatherResult<WeatherSnapshot> {
    let offset = FixedOffset::east_opt(raw.utc_offset_seconds).ok_or_else(|| {
        WeatherError::malformed(format!("utc_offset_seconds out of range: {}", raw.utc_offset_seconds))
    })?;

    let current = normalize_current(raw.current, offset)?;
    let daily = normalize_daily(raw.daily, offset)?;
    let hourly = normalize_hourly(raw.hourly, offset)?;

    // Drop hours that are already over so index 0 is the current hour
    let hour_start = current
        .time
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(current.time);
    let hourly = hourly
        .into_iter()
        .skip_while(|h| h.time < hour_start)
        .collect();

    Ok(WeatherSnapshot {
        location: location.clone(),
        current,
        daily,
        hourly,
        alerts: Vec::new(),
        last_updated: Utc::now(),
    })
}

fn normalize_current(raw: RawCurrent, offset: FixedOffset) -> WeatherResult<CurrentConditions> {
    Ok(CurrentConditions {
        time: parse_local_time("current.time", &raw.time, offset)?,
        temperature: raw.temperature_2m,
        weather_code: raw.weather_code,
        wind_speed: raw.wind_speed_10m,
        wind_direction: raw.wind_direction_10m,
        humidity: raw.relative_humidity_2m,
        apparent_temperature: raw.apparent_temperature,
        precipitation: raw.precipitation,
        pressure: raw.surface_pressure,
        uv_index: raw.uv_index,
    })
}

fn normalize_daily(raw: RawDaily, offset: FixedOffset) -> WeatherResult<Vec<DailyForecastEntry>> {
    let len = raw.time.len();
    expect_len("daily.temperature_2m_max", raw.temperature_2m_max.len(), len)?;
    expect_len("daily.temperature_2m_min", raw.temperature_2m_min.len(), len)?;
    expect_len("daily.weather_code", raw.weather_code.len(), len)?;
    expect_len("daily.sunrise", raw.sunrise.len(), len)?;
    expect_len("daily.sunset", raw.sunset.len(), len)?;
    let precipitation_probability =
        optional_column("daily.precipitation_probability_max", raw.precipitation_probability_max, len)?;
    let precipitation_sum = optional_column("daily.precipitation_sum", raw.precipitation_sum, len)?;
    let uv_index_max = optional_column("daily.uv_index_max", raw.uv_index_max, len)?;

    (0..len)
        .map(|i| -> WeatherResult<DailyForecastEntry> {
            let date = NaiveDate::parse_from_str(&raw.time[i], "%Y-%m-%d").map_err(|e| {
                WeatherError::malformed(format!("daily.time[{}] '{}': {}", i, raw.time[i], e))
            })?;
            Ok(DailyForecastEntry {
                date,
                temperature_max: raw.temperature_2m_max[i],
                temperature_min: raw.temperature_2m_min[i],
                weather_code: raw.weather_code[i],
                sunrise: parse_local_time("daily.sunrise", &raw.sunrise[i], offset)?,
                sunset: parse_local_time("daily.sunset", &raw.sunset[i], offset)?,
                precipitation_probability: precipitation_probability[i],
                precipitation_sum: precipitation_sum[i],
                uv_index_max: uv_index_max[i],
            })
        })
        .collect()
}

fn normalize_hourly(raw: RawHourly, offset: FixedOffset) -> WeatherResult<Vec<HourlyForecastEntry>> {
    let len = raw.time.len();
    expect_len("hourly.temperature_2m", raw.temperature_2m.len(), len)?;
    expect_len("hourly.weather_code", raw.weather_code.len(), len)?;
    let precipitation = optional_column("hourly.precipitation", raw.precipitation, len)?;
    let precipitation_probability =
        optional_column("hourly.precipitation_probability", raw.precipitation_probability, len)?;
    let wind_speed = optional_column("hourly.wind_speed_10m", raw.wind_speed_10m, len)?;
    let humidity = optional_column("hourly.relative_humidity_2m", raw.relative_humidity_2m, len)?;

    (0..len)
        .map(|i| -> WeatherResult<HourlyForecastEntry> {
            Ok(HourlyForecastEntry {
                time: parse_local_time("hourly.time", &raw.time[i], offset)?,
                temperature: raw.temperature_2m[i],
                weather_code: raw.weather_code[i],
                precipitation: precipitation[i],
                precipitation_probability: precipitation_probability[i],
                wind_speed: wind_speed[i],
                humidity: humidity[i],
            })
        })
        .collect()
}

fn expect_len(field: &str, actual: usize, expected: usize) -> WeatherResult<()> {
    if actual != expected {
        return Err(WeatherError::malformed(format!(
            "{} has {} entries, expected {}",
            field, actual, expected
        )));
    }
    Ok(())
}

fn optional_column(
    field: &str,
    column: Option<Vec<Option<f64>>>,
    len: usize,
) -> WeatherResult<Vec<Option<f64>>> {
    match column {
        Some(values) => {
            expect_len(field, values.len(), len)?;
            Ok(values)
        }
        None => Ok(vec![None; len]),
    }
}

/// Provider times are local wall-clock ("2024-06-01T14:15") in the location's offset
fn parse_local_time(field: &str, value: &str, offset: FixedOffset) -> WeatherResult<DateTime<FixedOffset>> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| WeatherError::malformed(format!("{} '{}': {}", field, value, e)))?;
    naive
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| WeatherError::malformed(format!("{} '{}': ambiguous local time", field, value)))
}
