use std::env;

use async_trait::async_trait;
use serde::Deserialize;

use crate::weather::{ForecastProvider, WeatherError, codes};

const API_KEY_ENV: &str = "MET_OFFICE_API_KEY";
const DEFAULT_BASE_URL: &str = "http://datapoint.metoffice.gov.uk/public/data";

const NEED_LOCATION: &str = "Wut? I need a location name.";

fn unknown_location(location_name: &str) -> String {
    format!("Wut iz {location_name}? I dunno where that is. Try again with a real place name.")
}

/// Credentials and endpoint for the weather data provider.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub api_key: String,
    pub base_url: String,
}

impl WeatherConfig {
    /// Reads the key from `MET_OFFICE_API_KEY`, using the public endpoint.
    pub fn from_env() -> Result<Self, WeatherError> {
        let api_key = env::var(API_KEY_ENV).map_err(|_| WeatherError::MissingEnv {
            key_env: API_KEY_ENV,
        })?;
        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }
}

/// One directory entry: a place name and its opaque identifier.
#[derive(Debug, Clone, Deserialize)]
pub struct Site {
    pub id: String,
    pub name: String,
}

/// Coded detail record for one forecast time period.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastDetail {
    #[serde(rename = "W")]
    pub weather_code: String,
    #[serde(rename = "PPd")]
    pub rain_chance_pct: String,
    #[serde(rename = "Dm")]
    pub mean_temp_c: String,
    #[serde(rename = "FDm")]
    pub feels_like_c: String,
    #[serde(rename = "Hn")]
    pub humidity_pct: String,
    #[serde(rename = "S")]
    pub wind_speed_kn: String,
    #[serde(rename = "Gn")]
    pub gust_speed_kn: String,
}

/// Site directory and daily forecast client.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Self {
        Self {
            api_key: config.api_key,
            base_url: config.base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Looks the place up in the site directory and formats its daily
    /// forecast as one sentence.
    ///
    /// Missing or unknown place names come back as user-facing messages,
    /// not errors; transport and payload-shape problems propagate. The
    /// directory is fetched fresh on every call.
    pub async fn get_forecast(&self, location_name: &str) -> Result<String, WeatherError> {
        if location_name.trim().is_empty() {
            return Ok(NEED_LOCATION.to_string());
        }

        let sites = self.fetch_sites().await?;
        let Some(site) = find_site(&sites, location_name) else {
            return Ok(unknown_location(location_name));
        };

        let detail = self.fetch_daily(&site.id).await?;
        Ok(format_forecast(location_name, &detail))
    }

    async fn fetch_sites(&self) -> Result<Vec<Site>, WeatherError> {
        let url = format!(
            "{}/val/wxfcs/all/json/sitelist",
            self.base_url.trim_end_matches('/'),
        );
        let response = self
            .http
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| WeatherError::Request { source })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::Api { status, body });
        }

        let parsed: SiteListResponse = response
            .json()
            .await
            .map_err(|source| WeatherError::Request { source })?;
        Ok(parsed.locations.location)
    }

    async fn fetch_daily(&self, site_id: &str) -> Result<ForecastDetail, WeatherError> {
        let url = format!(
            "{}/val/wxfcs/all/json/{}",
            self.base_url.trim_end_matches('/'),
            site_id,
        );
        let response = self
            .http
            .get(url)
            .query(&[("res", "daily"), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| WeatherError::Request { source })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::Api { status, body });
        }

        let parsed: ForecastResponse = response
            .json()
            .await
            .map_err(|source| WeatherError::Request { source })?;

        let period = parsed
            .site_rep
            .dv
            .location
            .period
            .into_iter()
            .next()
            .ok_or(WeatherError::MalformedResponse {
                detail: "forecast contained no time periods",
            })?;
        period
            .rep
            .into_iter()
            .next()
            .ok_or(WeatherError::MalformedResponse {
                detail: "time period contained no detail records",
            })
    }
}

#[async_trait]
impl ForecastProvider for WeatherClient {
    async fn forecast(&self, location_name: &str) -> Result<String, WeatherError> {
        self.get_forecast(location_name).await
    }
}

#[derive(Debug, Deserialize)]
struct SiteListResponse {
    #[serde(rename = "Locations")]
    locations: SiteList,
}

#[derive(Debug, Deserialize)]
struct SiteList {
    #[serde(rename = "Location")]
    location: Vec<Site>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(rename = "SiteRep")]
    site_rep: SiteRep,
}

#[derive(Debug, Deserialize)]
struct SiteRep {
    #[serde(rename = "DV")]
    dv: DataValues,
}

#[derive(Debug, Deserialize)]
struct DataValues {
    #[serde(rename = "Location")]
    location: ForecastLocation,
}

#[derive(Debug, Deserialize)]
struct ForecastLocation {
    #[serde(rename = "Period")]
    period: Vec<Period>,
}

#[derive(Debug, Deserialize)]
struct Period {
    #[serde(rename = "Rep")]
    rep: Vec<ForecastDetail>,
}

/// First directory entry whose name matches case-insensitively wins;
/// duplicate names are not disambiguated.
fn find_site<'a>(sites: &'a [Site], location_name: &str) -> Option<&'a Site> {
    let wanted = location_name.to_lowercase();
    sites.iter().find(|site| site.name.to_lowercase() == wanted)
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

fn format_forecast(location_name: &str, detail: &ForecastDetail) -> String {
    format!(
        "Forecast for {}: {}, chance of rain {}%, temperature {}C (feels like {}C). Humidity {}%, wind {} knots - gusting upto {}.\n",
        capitalize(location_name),
        codes::description(&detail.weather_code),
        detail.rain_chance_pct,
        detail.mean_temp_c,
        detail.feels_like_c,
        detail.humidity_pct,
        detail.wind_speed_kn,
        detail.gust_speed_kn,
    )
}
