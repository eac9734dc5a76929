use reqwest::{
    blocking::Client,
    header::{HeaderMap, HeaderValue, USER_AGENT},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::Cache;
use crate::coordinate::Coordinates;
use crate::error::GeocodeError;
use crate::photo_metadata::RawGps;

pub const GOOGLE_GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AddressComponent {
    pub long_name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// One candidate of a reverse geocode lookup.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub formatted_address: String,
    pub address_components: Vec<AddressComponent>,
}

/// Reverse geocoding backend. Candidates come back best first.
///
/// Arguments are longitude first; backends reorder them for their own API.
pub trait GeocodeService {
    fn reverse_geocode(
        &self,
        longitude: f64,
        latitude: f64,
    ) -> Result<Vec<GeocodeResult>, GeocodeError>;
}

/// Google Maps Geocoding API over blocking HTTP.
pub struct GoogleGeocoder {
    client: Client,
    endpoint: String,
    api_key: String,
    cache: Option<Cache>,
}

impl GoogleGeocoder {
    pub fn new(api_key: &str, endpoint: &str, cache: Option<Cache>) -> GoogleGeocoder {
        GoogleGeocoder {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            cache,
        }
    }

    fn request_api(&self, longitude: f64, latitude: f64) -> Result<Value, GeocodeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("imsort/", env!("CARGO_PKG_VERSION"))),
        );
        let latlng = format!("{},{}", latitude, longitude);
        let params = [("latlng", latlng.as_str()), ("key", self.api_key.as_str())];

        let res_json = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .headers(headers)
            .send()?
            .error_for_status()?
            .json::<Value>()?;
        Ok(res_json)
    }

    fn cached(&self, key: &str) -> Option<Value> {
        let cache = self.cache.as_ref()?;
        match cache.read(key) {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!("Ignoring unreadable geocode cache entry {}: {}", key, e);
                None
            }
        }
    }
}

impl GeocodeService for GoogleGeocoder {
    fn reverse_geocode(
        &self,
        longitude: f64,
        latitude: f64,
    ) -> Result<Vec<GeocodeResult>, GeocodeError> {
        let key = format!("{:.6}_{:.6}", latitude, longitude);
        let res_json = match self.cached(&key) {
            Some(res_json) => res_json,
            None => {
                tracing::debug!("Geocode cache miss for {}", key);
                let res_json = self.request_api(longitude, latitude)?;
                if let Some(cache) = &self.cache {
                    if res_json["status"] == "OK" {
                        if let Err(e) = cache.write(&key, &res_json) {
                            tracing::warn!("Unable to cache geocode response {}: {}", key, e);
                        }
                    }
                }
                res_json
            }
        };
        json_to_results(res_json)
    }
}

fn json_to_results(json_response: Value) -> Result<Vec<GeocodeResult>, GeocodeError> {
    let status = json_response["status"]
        .as_str()
        .ok_or_else(|| GeocodeError::Malformed("missing status".to_string()))?;
    match status {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(Vec::new()),
        other => {
            return Err(GeocodeError::Status {
                status: other.to_string(),
                message: json_response["error_message"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
            })
        }
    }
    serde_json::from_value(json_response["results"].clone())
        .map_err(|e| GeocodeError::Malformed(e.to_string()))
}

/// Folder label for a place: the formatted address without its leading
/// address component (e.g. the street number).
pub fn place_label(result: &GeocodeResult) -> Result<String, GeocodeError> {
    let first = result
        .address_components
        .first()
        .ok_or_else(|| GeocodeError::Malformed("result has no address components".to_string()))?;
    let prefix = format!("{} ", first.long_name);
    let address = result
        .formatted_address
        .strip_prefix(&prefix)
        .unwrap_or(&result.formatted_address);

    let label = folder_safe(address);
    if label.is_empty() || label == "." || label == ".." {
        return Err(GeocodeError::Malformed(format!(
            "no usable folder name in {:?}",
            result.formatted_address
        )));
    }
    Ok(label)
}

fn folder_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Turns a photo's GPS fields into a folder label via a [`GeocodeService`].
pub struct PlaceNameResolver<G> {
    service: G,
}

impl<G: GeocodeService> PlaceNameResolver<G> {
    pub fn new(service: G) -> PlaceNameResolver<G> {
        PlaceNameResolver { service }
    }

    pub fn service(&self) -> &G {
        &self.service
    }

    pub fn resolve(&self, gps: &RawGps) -> Result<String, GeocodeError> {
        let Coordinates {
            latitude,
            longitude,
        } = gps.coordinates();
        let results = self.service.reverse_geocode(longitude, latitude)?;
        let first = results.first().ok_or(GeocodeError::NoResults)?;
        let label = place_label(first)?;
        tracing::debug!("({}, {}) resolved to {:?}", latitude, longitude, label);
        Ok(label)
    }
}
