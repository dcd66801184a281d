use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::area_profile::{CityTier, Coordinates};
use crate::domain::place::Place;
use crate::store::Cache;

use super::tables::ProfilerTables;

#[derive(Debug, Clone, Default)]
pub struct CallMeta {
    pub cached: bool,
    pub network_calls: u32,
}

#[derive(Debug, Clone)]
pub struct GeoContextResult {
    pub city: String,
    pub state: String,
    pub country: String,
    pub city_tier: CityTier,
    pub formatted_address: String,
}

#[derive(Debug, Clone, Default)]
pub struct MovementContextResult {
    pub road_type: String,
    pub near_junction: bool,
    pub pedestrian_friendly: bool,
}

/// Newtype over the inter-page pagination delay so tests can collapse it to zero
/// (spec.md §4.1: "mandatory delay between pages equal to the provider's next-page
/// activation latency (≈2s)").
#[derive(Debug, Clone, Copy)]
pub struct PageDelay(pub Duration);

impl Default for PageDelay {
    fn default() -> Self {
        PageDelay(Duration::from_secs(2))
    }
}

/// Reverse-geocode + places-nearby + place-details + movement-context (C1, spec.md
/// §4.1), grounded on the teacher's `Gateway` trait shape (`async_trait`, one method
/// per capability, a concrete network implementation plus a null/offline fallback).
#[async_trait]
pub trait MapsProvider: Send + Sync {
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> (GeoContextResult, CallMeta);

    async fn places_nearby(&self, lat: f64, lng: f64, radius_m: u32, max_results: u32) -> (Vec<Place>, CallMeta);

    async fn enrich_places(&self, places: &[Place], max_enrichments: usize, ring1_count: usize) -> (Vec<Place>, CallMeta);

    async fn movement_context(&self, lat: f64, lng: f64, geo_full: Option<&str>) -> (MovementContextResult, CallMeta);
}

/// Live implementation over the Google Maps Places/Geocoding HTTP APIs, grounded on
/// `original_source/backend/console/screen_profiler/google_maps_utils.py` for cache
/// keys, TTLs, and pagination shape.
pub struct GoogleMapsClient {
    http: reqwest::Client,
    api_key: Secret<String>,
    base_url: String,
    cache: Arc<dyn Cache>,
    tables: Arc<ProfilerTables>,
    page_delay: PageDelay,
}

impl GoogleMapsClient {
    pub fn new(api_key: Secret<String>, base_url: String, cache: Arc<dyn Cache>, tables: Arc<ProfilerTables>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds"),
            api_key,
            base_url,
            cache,
            tables,
            page_delay: PageDelay::default(),
        }
    }

    pub fn with_page_delay(mut self, delay: PageDelay) -> Self {
        self.page_delay = delay;
        self
    }

    fn cache_key_geocode(lat: f64, lng: f64) -> String {
        format!("geocode_full_{:.5}_{:.5}", lat, lng)
    }

    fn cache_key_places(lat: f64, lng: f64, radius_m: u32, max_results: u32) -> String {
        format!("places_{:.5}_{:.5}_{radius_m}_{max_results}", lat, lng)
    }

    fn city_tier(&self, city: &str) -> CityTier {
        match self.tables.city_tiers.get(city).map(String::as_str) {
            Some("TIER_1") => CityTier::Tier1,
            Some("TIER_2") => CityTier::Tier2,
            _ => CityTier::Tier3,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PlacesNearbyResponse {
    results: Vec<PlaceResult>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    place_id: String,
    name: String,
    #[serde(default)]
    types: Vec<String>,
    geometry: Geometry,
    #[serde(default)]
    user_ratings_total: u32,
    rating: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[async_trait]
impl MapsProvider for GoogleMapsClient {
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> (GeoContextResult, CallMeta) {
        let key = Self::cache_key_geocode(lat, lng);
        if let Some(cached) = self.cache.get(&key).await {
            if let Ok(result) = serde_json::from_str::<CachedGeo>(&cached) {
                return (
                    GeoContextResult {
                        city: result.city,
                        state: result.state,
                        country: result.country,
                        city_tier: self.city_tier(&result.city_for_tier),
                        formatted_address: result.formatted_address,
                    },
                    CallMeta { cached: true, network_calls: 0 },
                );
            }
        }

        let url = format!("{}/geocode/json", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("latlng", format!("{lat},{lng}")), ("key", self.api_key.expose_secret().clone())])
            .send()
            .await
            .ok()
            .and_then(|r| r.error_for_status().ok());

        let Some(response) = response else {
            return (neutral_geo_context(), CallMeta { cached: false, network_calls: 1 });
        };

        let Ok(parsed) = response.json::<GeocodeResponse>().await else {
            return (neutral_geo_context(), CallMeta { cached: false, network_calls: 1 });
        };

        let Some(first) = parsed.results.into_iter().next() else {
            return (neutral_geo_context(), CallMeta { cached: false, network_calls: 1 });
        };

        let mut city = String::new();
        let mut state = String::new();
        let mut country = String::new();
        for component in &first.address_components {
            if component.types.iter().any(|t| t == "locality") {
                city = component.long_name.clone();
            }
            if component.types.iter().any(|t| t == "administrative_area_level_1") {
                state = component.long_name.clone();
            }
            if component.types.iter().any(|t| t == "country") {
                country = component.long_name.clone();
            }
        }

        let geo = GeoContextResult {
            city: city.clone(),
            state,
            country,
            city_tier: self.city_tier(&city),
            formatted_address: first.formatted_address,
        };

        let cacheable = CachedGeo {
            city: geo.city.clone(),
            state: geo.state.clone(),
            country: geo.country.clone(),
            city_for_tier: geo.city.clone(),
            formatted_address: geo.formatted_address.clone(),
        };
        if let Ok(json) = serde_json::to_string(&cacheable) {
            self.cache.put(&key, json, Duration::from_secs(30 * 24 * 3600)).await;
        }

        (geo, CallMeta { cached: false, network_calls: 1 })
    }

    async fn places_nearby(&self, lat: f64, lng: f64, radius_m: u32, max_results: u32) -> (Vec<Place>, CallMeta) {
        let key = Self::cache_key_places(lat, lng, radius_m, max_results);
        if let Some(cached) = self.cache.get(&key).await {
            if let Ok(places) = serde_json::from_str::<Vec<Place>>(&cached) {
                return (places, CallMeta { cached: true, network_calls: 0 });
            }
        }

        let mut places = Vec::new();
        let mut network_calls = 0u32;
        let mut page_token: Option<String> = None;

        for page in 0..3 {
            if places.len() as u32 >= max_results {
                break;
            }
            if page > 0 {
                tokio::time::sleep(self.page_delay.0).await;
            }

            let url = format!("{}/place/nearbysearch/json", self.base_url);
            let mut req = self.http.get(&url).query(&[
                ("location", format!("{lat},{lng}")),
                ("radius", radius_m.to_string()),
                ("key", self.api_key.expose_secret().clone()),
            ]);
            if let Some(token) = &page_token {
                req = req.query(&[("pagetoken", token.clone())]);
            }

            let Some(response) = req.send().await.ok().and_then(|r| r.error_for_status().ok()) else {
                break;
            };
            network_calls += 1;

            let Ok(parsed) = response.json::<PlacesNearbyResponse>().await else {
                break;
            };

            for p in parsed.results {
                places.push(Place {
                    place_id: p.place_id,
                    name: p.name,
                    types: p.types,
                    latitude: p.geometry.location.lat,
                    longitude: p.geometry.location.lng,
                    user_ratings_total: p.user_ratings_total,
                    editorial_summary: None,
                    rating: p.rating,
                });
            }

            match parsed.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        places.truncate(max_results as usize);

        if let Ok(json) = serde_json::to_string(&places) {
            self.cache.put(&key, json, Duration::from_secs(7 * 24 * 3600)).await;
        }

        (places, CallMeta { cached: false, network_calls })
    }

    async fn enrich_places(&self, places: &[Place], max_enrichments: usize, ring1_count: usize) -> (Vec<Place>, CallMeta) {
        let mut scored: Vec<(f64, Place)> = places
            .iter()
            .map(|p| (enrichment_priority(p, &self.tables, ring1_count), p.clone()))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut network_calls = 0u32;
        let mut enriched = Vec::with_capacity(places.len());
        for (i, (_, mut place)) in scored.into_iter().enumerate() {
            if i < max_enrichments {
                let url = format!("{}/place/details/json", self.base_url);
                if let Ok(response) = self
                    .http
                    .get(&url)
                    .query(&[("place_id", place.place_id.clone()), ("key", self.api_key.expose_secret().clone())])
                    .send()
                    .await
                {
                    network_calls += 1;
                    if let Ok(details) = response.json::<serde_json::Value>().await {
                        if let Some(summary) = details
                            .pointer("/result/editorial_summary/overview")
                            .and_then(|v| v.as_str())
                        {
                            place.editorial_summary = Some(summary.to_string());
                        }
                    }
                }
            }
            enriched.push(place);
        }

        (enriched, CallMeta { cached: false, network_calls })
    }

    async fn movement_context(&self, lat: f64, lng: f64, geo_full: Option<&str>) -> (MovementContextResult, CallMeta) {
        let address_lower = geo_full.unwrap_or_default().to_lowercase();
        let road_type = if address_lower.contains("highway") || address_lower.contains("expressway") {
            "highway"
        } else if address_lower.contains("main road") || address_lower.contains("nh ") || address_lower.contains("arterial") {
            "arterial"
        } else {
            "local"
        };

        let (nearby, meta) = self.places_nearby(lat, lng, 200, 20).await;
        let near_junction = nearby.iter().any(|p| p.types_lower().iter().any(|t| t == "traffic_signal"));
        let pedestrian_friendly = nearby
            .iter()
            .any(|p| p.types_lower().iter().any(|t| t == "park" || t == "tourist_attraction" || t == "shopping_mall"));

        (
            MovementContextResult {
                road_type: road_type.to_string(),
                near_junction,
                pedestrian_friendly,
            },
            meta,
        )
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct CachedGeo {
    city: String,
    state: String,
    country: String,
    city_for_tier: String,
    formatted_address: String,
}

fn neutral_geo_context() -> GeoContextResult {
    GeoContextResult {
        city: String::new(),
        state: String::new(),
        country: String::new(),
        city_tier: CityTier::Tier3,
        formatted_address: String::new(),
    }
}

/// Combines authority-type bonus, name-keyword bonus, capped rating-count, density
/// bonus, and false-positive penalty, as named in spec.md §4.1.
fn enrichment_priority(place: &Place, tables: &ProfilerTables, ring1_count: usize) -> f64 {
    let mut score = 0.0;
    let types = place.types_lower();
    let name = place.name_lower();

    if types.iter().any(|t| tables.authority_anchors.iter().any(|a| &a.place_type == t)) {
        score += 50.0;
    }
    for anchor in &tables.authority_anchors {
        if anchor.name_patterns.iter().any(|p| name.contains(p.as_str())) {
            score += 20.0;
            break;
        }
    }
    score += (place.user_ratings_total as f64).min(500.0) / 10.0;
    if ring1_count > 10 {
        score += 5.0;
    }
    if types.iter().any(|t| tables.generic_types.contains(t)) {
        score -= 15.0;
    }
    score
}

/// Returned when no Maps API key is configured (spec.md §4.1: "returns neutral
/// defaults with network_calls=0; never throws to the caller").
pub struct NullMapsProvider;

#[async_trait]
impl MapsProvider for NullMapsProvider {
    async fn reverse_geocode(&self, _lat: f64, _lng: f64) -> (GeoContextResult, CallMeta) {
        (neutral_geo_context(), CallMeta::default())
    }

    async fn places_nearby(&self, _lat: f64, _lng: f64, _radius_m: u32, _max_results: u32) -> (Vec<Place>, CallMeta) {
        (Vec::new(), CallMeta::default())
    }

    async fn enrich_places(&self, places: &[Place], _max_enrichments: usize, _ring1_count: usize) -> (Vec<Place>, CallMeta) {
        (places.to_vec(), CallMeta::default())
    }

    async fn movement_context(&self, _lat: f64, _lng: f64, _geo_full: Option<&str>) -> (MovementContextResult, CallMeta) {
        (MovementContextResult::default(), CallMeta::default())
    }
}

pub fn coordinates(lat: f64, lng: f64) -> Coordinates {
    Coordinates { latitude: lat, longitude: lng }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_provider_never_makes_network_calls() {
        let provider = NullMapsProvider;
        let (_, meta) = provider.reverse_geocode(13.08, 80.27).await;
        assert_eq!(meta.network_calls, 0);
        let (places, meta) = provider.places_nearby(13.08, 80.27, 75, 20).await;
        assert!(places.is_empty());
        assert_eq!(meta.network_calls, 0);
    }
}
