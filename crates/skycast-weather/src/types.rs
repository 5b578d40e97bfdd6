use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use skycast_core::{StorageError, WeatherError};

/// Result type for provider and normalization operations
pub type WeatherResult<T> = Result<T, WeatherError>;

/// Result type for key-value store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Icon categories for WMO weather codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconCategory {
    Sun,
    Moon,
    CloudSun,
    Cloud,
    CloudFog,
    CloudDrizzle,
    CloudRain,
    CloudSnow,
    CloudLightning,
    CloudLightningRain,
}

impl IconCategory {
    /// Icon identifier used by the presentation layer
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sun => "sun",
            Self::Moon => "moon",
            Self::CloudSun => "cloud-sun",
            Self::Cloud => "cloud",
            Self::CloudFog => "cloud-fog",
            Self::CloudDrizzle => "cloud-drizzle",
            Self::CloudRain => "cloud-rain",
            Self::CloudSnow => "cloud-snow",
            Self::CloudLightning => "cloud-lightning",
            Self::CloudLightningRain => "cloud-lightning-rain",
        }
    }

    /// Clear skies show a moon at night; everything else is unchanged.
    pub fn for_daylight(self, is_day: bool) -> Self {
        match self {
            Self::Sun if !is_day => Self::Moon,
            other => other,
        }
    }
}

/// Label and icon for a WMO weather code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeatherCodeInfo {
    pub code: i32,
    pub label: &'static str,
    pub icon: IconCategory,
}

/// See: https://open-meteo.com/en/docs#weathervariables
const WEATHER_CODES: &[(i32, &str, IconCategory)] = &[
    (0, "Clear sky", IconCategory::Sun),
    (1, "Mainly clear", IconCategory::Sun),
    (2, "Partly cloudy", IconCategory::CloudSun),
    (3, "Overcast", IconCategory::Cloud),
    (45, "Fog", IconCategory::CloudFog),
    (48, "Depositing rime fog", IconCategory::CloudFog),
    (51, "Light drizzle", IconCategory::CloudDrizzle),
    (53, "Moderate drizzle", IconCategory::CloudDrizzle),
    (55, "Dense drizzle", IconCategory::CloudDrizzle),
    (56, "Light freezing drizzle", IconCategory::CloudDrizzle),
    (57, "Dense freezing drizzle", IconCategory::CloudDrizzle),
    (61, "Slight rain", IconCategory::CloudRain),
    (63, "Moderate rain", IconCategory::CloudRain),
    (65, "Heavy rain", IconCategory::CloudRain),
    (66, "Light freezing rain", IconCategory::CloudSnow),
    (67, "Heavy freezing rain", IconCategory::CloudSnow),
    (71, "Slight snow fall", IconCategory::CloudSnow),
    (73, "Moderate snow fall", IconCategory::CloudSnow),
    (75, "Heavy snow fall", IconCategory::CloudSnow),
    (77, "Snow grains", IconCategory::CloudSnow),
    (80, "Slight rain showers", IconCategory::CloudRain),
    (81, "Moderate rain showers", IconCategory::CloudRain),
    (82, "Violent rain showers", IconCategory::CloudLightningRain),
    (85, "Slight snow showers", IconCategory::CloudSnow),
    (86, "Heavy snow showers", IconCategory::CloudSnow),
    (95, "Thunderstorm", IconCategory::CloudLightning),
    (96, "Thunderstorm with slight hail", IconCategory::CloudLightning),
    (99, "Thunderstorm with heavy hail", IconCategory::CloudLightning),
];

impl WeatherCodeInfo {
    /// Look up a WMO code; unknown codes map to a generic cloud.
    pub fn lookup(code: i32) -> Self {
        WEATHER_CODES
            .iter()
            .find(|(c, _, _)| *c == code)
            .map(|&(code, label, icon)| Self { code, label, icon })
            .unwrap_or(Self {
                code,
                label: "Unknown",
                icon: IconCategory::Cloud,
            })
    }
}

/// 8-point compass label for a wind direction in degrees
pub fn cardinal_direction(degrees: f64) -> &'static str {
    let d = degrees.rem_euclid(360.0);
    if !(22.5..337.5).contains(&d) {
        "N"
    } else if d < 67.5 {
        "NE"
    } else if d < 112.5 {
        "E"
    } else if d < 157.5 {
        "SE"
    } else if d < 202.5 {
        "S"
    } else if d < 247.5 {
        "SW"
    } else if d < 292.5 {
        "W"
    } else {
        "NW"
    }
}

/// A saved or selectable place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Stable identifier; two locations with the same id are the same entity
    pub id: String,
    /// Display name, e.g. "Berlin, Land Berlin, Germany"
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub favorite: bool,
}

impl Location {
    /// Create a location with an identifier derived from name and coordinates
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        let name = name.into();
        Self {
            id: crate::normalize::location_id(None, &name, latitude, longitude),
            name,
            latitude,
            longitude,
            favorite: false,
        }
    }

    /// Location for a device-position result
    pub fn current_position(latitude: f64, longitude: f64) -> Self {
        Self::new("Current Location", latitude, longitude)
    }
}

/// Current weather conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub time: DateTime<FixedOffset>,
    pub temperature: f64,
    pub weather_code: i32,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub humidity: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub precipitation: Option<f64>,
    pub pressure: Option<f64>,
    pub uv_index: Option<f64>,
}

impl CurrentConditions {
    pub fn code_info(&self) -> WeatherCodeInfo {
        WeatherCodeInfo::lookup(self.weather_code)
    }
}

/// Daily forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecastEntry {
    pub date: NaiveDate,
    pub temperature_max: f64,
    pub temperature_min: f64,
    pub weather_code: i32,
    pub sunrise: DateTime<FixedOffset>,
    pub sunset: DateTime<FixedOffset>,
    pub precipitation_probability: Option<f64>,
    pub precipitation_sum: Option<f64>,
    pub uv_index_max: Option<f64>,
}

/// Hourly forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecastEntry {
    pub time: DateTime<FixedOffset>,
    pub temperature: f64,
    pub weather_code: i32,
    pub precipitation: Option<f64>,
    pub precipitation_probability: Option<f64>,
    pub wind_speed: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Minor,
    Moderate,
    Severe,
    Extreme,
}

/// Provider alert; Open-Meteo does not supply any, so lists stay empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: AlertSeverity,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// One immutable fetched-and-normalized weather result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: Location,
    pub current: CurrentConditions,
    pub daily: Vec<DailyForecastEntry>,
    pub hourly: Vec<HourlyForecastEntry>,
    #[serde(default)]
    pub alerts: Vec<WeatherAlert>,
    pub last_updated: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// The first `n` hourly entries, starting at the current hour
    pub fn next_hours(&self, n: usize) -> &[HourlyForecastEntry] {
        &self.hourly[..n.min(self.hourly.len())]
    }

    pub fn today(&self) -> Option<&DailyForecastEntry> {
        self.daily.first()
    }

    /// Whether the current observation falls between today's sunrise and sunset.
    /// Defaults to true when there is no daily data.
    pub fn is_daytime(&self) -> bool {
        match self.today() {
            Some(today) => self.current.time >= today.sunrise && self.current.time <= today.sunset,
            None => true,
        }
    }

    /// Icon for the current conditions, with night substitution
    pub fn current_icon(&self) -> IconCategory {
        self.current.code_info().icon.for_daylight(self.is_daytime())
    }
}
