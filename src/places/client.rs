//! HTTP client for the places lookup service.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::response::{ApiErrorResponse, LegacyResponse, NearbyResponse};
use crate::error::{GridScoutError, Result};
use crate::models::{Coordinate, PlaceRecord};

const NEARBY_ENDPOINT: &str = "https://places.googleapis.com/v1/places:searchNearby";
const LEGACY_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/place/nearbysearch/json";

/// Fields requested from the Places (New) API
const FIELD_MASK: &[&str] = &[
    "places.id",
    "places.displayName.text",
    "places.rating",
    "places.userRatingCount",
    "places.shortFormattedAddress",
    "places.priceLevel",
    "places.location",
    "places.primaryType",
    "places.types",
];

/// Primary types requested from the Places (New) API
pub const RESTAURANT_TYPES: &[&str] = &[
    "american_restaurant",
    "bakery",
    "barbecue_restaurant",
    "brazilian_restaurant",
    "breakfast_restaurant",
    "brunch_restaurant",
    "cafe",
    "chinese_restaurant",
    "coffee_shop",
    "fast_food_restaurant",
    "french_restaurant",
    "greek_restaurant",
    "hamburger_restaurant",
    "ice_cream_shop",
    "indian_restaurant",
    "indonesian_restaurant",
    "italian_restaurant",
    "japanese_restaurant",
    "korean_restaurant",
    "lebanese_restaurant",
    "meal_delivery",
    "meal_takeaway",
    "mediterranean_restaurant",
    "mexican_restaurant",
    "middle_eastern_restaurant",
    "pizza_restaurant",
    "ramen_restaurant",
    "restaurant",
    "sandwich_shop",
    "seafood_restaurant",
    "spanish_restaurant",
    "steak_house",
    "sushi_restaurant",
    "thai_restaurant",
    "turkish_restaurant",
    "vegan_restaurant",
    "vegetarian_restaurant",
    "vietnamese_restaurant",
];

/// Continuation tokens are issued before they become valid; a request made
/// too early answers INVALID_REQUEST and is retried this many times.
const MAX_TOKEN_RETRIES: u32 = 2;

/// Which places API to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacesApi {
    /// Places (New) searchNearby: up to 20 results, no pagination
    Nearby,
    /// Nearby Search (legacy): up to 60 results over three pages
    Legacy,
}

/// A service that lists the places around a search center.
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    async fn search(&self, center: Coordinate) -> Result<Vec<PlaceRecord>>;
}

/// Settings for [`PlacesClient`]
#[derive(Debug, Clone)]
pub struct PlacesClientOptions {
    pub api: PlacesApi,
    pub radius_m: f64,
    /// Wait before requesting each continuation page
    pub page_delay: Duration,
    pub included_types: Vec<String>,
}

impl Default for PlacesClientOptions {
    fn default() -> Self {
        Self {
            api: PlacesApi::Legacy,
            radius_m: 500.0,
            page_delay: Duration::from_secs(3),
            included_types: RESTAURANT_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Places API client
pub struct PlacesClient {
    client: Client,
    api_key: String,
    options: PlacesClientOptions,
    nearby_url: Url,
    legacy_url: Url,
}

impl PlacesClient {
    pub fn new(api_key: impl Into<String>, options: PlacesClientOptions) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GridScoutError::invalid("places API key is empty"));
        }
        if !options.radius_m.is_finite() || options.radius_m <= 0.0 {
            return Err(GridScoutError::invalid(format!(
                "search radius must be positive, got {} m",
                options.radius_m
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("gridscout/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key,
            options,
            nearby_url: Url::parse(NEARBY_ENDPOINT).map_err(url_error)?,
            legacy_url: Url::parse(LEGACY_ENDPOINT).map_err(url_error)?,
        })
    }

    /// Point both endpoints at another host (a local stub, a proxy).
    pub fn with_base_url(mut self, base: &str) -> Result<Self> {
        let base = Url::parse(base).map_err(url_error)?;
        self.nearby_url = base.join("v1/places:searchNearby").map_err(url_error)?;
        self.legacy_url = base
            .join("maps/api/place/nearbysearch/json")
            .map_err(url_error)?;
        Ok(self)
    }

    async fn search_nearby(&self, center: Coordinate) -> Result<Vec<PlaceRecord>> {
        let body = json!({
            "includedPrimaryTypes": self.options.included_types,
            "rankPreference": "DISTANCE",
            "locationRestriction": {
                "circle": {
                    "center": {"latitude": center.lat, "longitude": center.lon},
                    "radius": self.options.radius_m,
                }
            }
        });

        let response = self
            .client
            .post(self.nearby_url.clone())
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK.join(","))
            .json(&body)
            .send()
            .await
            .map_err(|e| GridScoutError::recoverable(format!("searchNearby request: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GridScoutError::recoverable(format!("searchNearby body: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&text)
                .map(|e| format!("{} {}: {}", status, e.error.status, e.error.message))
                .unwrap_or_else(|_| format!("{}: {}", status, text));
            return Err(if is_auth_failure(status) {
                GridScoutError::fatal(message)
            } else {
                GridScoutError::recoverable(message)
            });
        }

        let parsed: NearbyResponse = serde_json::from_str(&text).map_err(|e| {
            GridScoutError::recoverable(format!("unexpected searchNearby response: {}", e))
        })?;

        debug!("searchNearby at ({}): {} places", center, parsed.places.len());
        Ok(parsed.places.into_iter().map(PlaceRecord::from).collect())
    }

    async fn search_legacy(&self, center: Coordinate) -> Result<Vec<PlaceRecord>> {
        let mut first = self.legacy_url.clone();
        first
            .query_pairs_mut()
            .append_pair("location", &format!("{},{}", center.lat, center.lon))
            .append_pair("radius", &self.options.radius_m.to_string())
            .append_pair("keyword", "restaurant")
            .append_pair("key", &self.api_key);

        let mut page = self.fetch_legacy_page(first).await?;
        let mut records: Vec<PlaceRecord> = Vec::new();
        let mut pages = 1;

        loop {
            records.extend(page.results.into_iter().map(PlaceRecord::from));

            let Some(token) = page.next_page_token else {
                break;
            };

            let mut next = self.legacy_url.clone();
            next.query_pairs_mut()
                .append_pair("pagetoken", &token)
                .append_pair("key", &self.api_key);

            page = self.fetch_continuation(next).await?;
            pages += 1;
        }

        debug!(
            "nearbysearch at ({}): {} places over {} pages",
            center,
            records.len(),
            pages
        );
        Ok(records)
    }

    /// Fetch a continuation page, waiting for the token to become usable.
    async fn fetch_continuation(&self, url: Url) -> Result<LegacyResponse> {
        let mut attempts = 0;

        loop {
            tokio::time::sleep(self.options.page_delay).await;
            attempts += 1;

            match self.fetch_legacy_page(url.clone()).await {
                Err(GridScoutError::ExternalService { message, fatal: false })
                    if message.starts_with("INVALID_REQUEST") && attempts <= MAX_TOKEN_RETRIES =>
                {
                    warn!(
                        "Page token not ready (attempt {}/{}), waiting",
                        attempts,
                        MAX_TOKEN_RETRIES + 1
                    );
                }
                other => return other,
            }
        }
    }

    async fn fetch_legacy_page(&self, url: Url) -> Result<LegacyResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GridScoutError::recoverable(format!("nearbysearch request: {}", e)))?;

        let status = response.status();
        if is_auth_failure(status) {
            return Err(GridScoutError::fatal(format!("nearbysearch: {}", status)));
        }
        if !status.is_success() {
            return Err(GridScoutError::recoverable(format!(
                "nearbysearch: {}",
                status
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| GridScoutError::recoverable(format!("nearbysearch body: {}", e)))?;
        let page: LegacyResponse = serde_json::from_str(&text).map_err(|e| {
            GridScoutError::recoverable(format!("unexpected nearbysearch response: {}", e))
        })?;

        check_legacy_status(page)
    }
}

#[async_trait]
impl PlaceSearch for PlacesClient {
    async fn search(&self, center: Coordinate) -> Result<Vec<PlaceRecord>> {
        match self.options.api {
            PlacesApi::Nearby => self.search_nearby(center).await,
            PlacesApi::Legacy => self.search_legacy(center).await,
        }
    }
}

fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Classify the `status` field of a legacy response page.
fn check_legacy_status(page: LegacyResponse) -> Result<LegacyResponse> {
    if matches!(page.status.as_str(), "OK" | "ZERO_RESULTS") {
        return Ok(page);
    }

    let detail = match &page.error_message {
        Some(m) => format!("{}: {}", page.status, m),
        None => page.status.clone(),
    };

    if page.status == "REQUEST_DENIED" {
        Err(GridScoutError::fatal(detail))
    } else {
        Err(GridScoutError::recoverable(detail))
    }
}

fn url_error(e: url::ParseError) -> GridScoutError {
    GridScoutError::invalid(format!("bad places endpoint: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn page(status: &str, error_message: Option<&str>) -> LegacyResponse {
        LegacyResponse {
            status: status.to_string(),
            results: Vec::new(),
            next_page_token: None,
            error_message: error_message.map(String::from),
        }
    }

    #[test]
    fn test_legacy_status_classification() {
        assert!(check_legacy_status(page("OK", None)).is_ok());
        assert!(check_legacy_status(page("ZERO_RESULTS", None)).is_ok());

        let denied = check_legacy_status(page("REQUEST_DENIED", Some("bad key"))).unwrap_err();
        assert!(denied.is_fatal());
        assert!(denied.to_string().contains("bad key"));

        let limited = check_legacy_status(page("OVER_QUERY_LIMIT", None)).unwrap_err();
        assert!(!limited.is_fatal());

        let early = check_legacy_status(page("INVALID_REQUEST", None)).unwrap_err();
        assert!(matches!(
            early,
            GridScoutError::ExternalService { ref message, fatal: false } if message.starts_with("INVALID_REQUEST")
        ));
    }

    #[test]
    fn test_auth_failures() {
        assert!(is_auth_failure(StatusCode::FORBIDDEN));
        assert!(is_auth_failure(StatusCode::UNAUTHORIZED));
        assert!(!is_auth_failure(StatusCode::TOO_MANY_REQUESTS));
    }

    #[test]
    fn test_client_validates_options() {
        assert!(PlacesClient::new("", PlacesClientOptions::default()).is_err());
        let options = PlacesClientOptions {
            radius_m: 0.0,
            ..Default::default()
        };
        assert!(PlacesClient::new("key", options).is_err());
    }

    /// Local HTTP stub answering one scripted JSON body per request, in
    /// order, and recording each request target.
    struct StubServer {
        base: String,
        targets: Arc<Mutex<Vec<String>>>,
    }

    impl StubServer {
        async fn start(bodies: Vec<String>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = format!("http://{}/", listener.local_addr().unwrap());
            let targets = Arc::new(Mutex::new(Vec::new()));
            let recorded = Arc::clone(&targets);

            tokio::spawn(async move {
                for body in bodies {
                    let (mut socket, _) = listener.accept().await.unwrap();
                    let target = read_request(&mut socket).await;
                    recorded.lock().unwrap().push(target);
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    socket.write_all(response.as_bytes()).await.unwrap();
                    socket.shutdown().await.ok();
                }
            });

            Self { base, targets }
        }

        fn targets(&self) -> Vec<String> {
            self.targets.lock().unwrap().clone()
        }
    }

    /// Read one request (headers and any body), returning its target.
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-request");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .map(|(_, v)| v.trim().parse::<usize>().unwrap())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-body");
            buf.extend_from_slice(&chunk[..n]);
        }

        head.split_whitespace().nth(1).unwrap().to_string()
    }

    fn legacy_page(status: &str, names: &[&str], token: Option<&str>) -> String {
        let results: Vec<serde_json::Value> = names
            .iter()
            .map(|name| {
                json!({
                    "place_id": name.to_lowercase(),
                    "name": name,
                    "rating": 4.1,
                    "user_ratings_total": 30,
                    "vicinity": "Main St",
                    "geometry": {"location": {"lat": 40.76, "lng": -111.89}},
                    "types": ["restaurant", "food"]
                })
            })
            .collect();
        let mut page = json!({"status": status, "results": results});
        if let Some(token) = token {
            page["next_page_token"] = json!(token);
        }
        page.to_string()
    }

    fn stub_client(server: &StubServer, api: PlacesApi) -> PlacesClient {
        let options = PlacesClientOptions {
            api,
            page_delay: Duration::from_millis(20),
            ..Default::default()
        };
        PlacesClient::new("test-key", options)
            .unwrap()
            .with_base_url(&server.base)
            .unwrap()
    }

    fn center() -> Coordinate {
        Coordinate::new(40.76, -111.89).unwrap()
    }

    fn names(records: &[PlaceRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_legacy_follows_page_tokens() {
        let server = StubServer::start(vec![
            legacy_page("OK", &["A1", "A2"], Some("tok-1")),
            legacy_page("OK", &["B1"], Some("tok-2")),
            legacy_page("OK", &["C1"], None),
        ])
        .await;
        let client = stub_client(&server, PlacesApi::Legacy);

        let started = Instant::now();
        let records = client.search(center()).await.unwrap();
        assert_eq!(names(&records), vec!["A1", "A2", "B1", "C1"]);
        // one delay before each of the two continuation pages
        assert!(started.elapsed() >= Duration::from_millis(40));

        let targets = server.targets();
        assert_eq!(targets.len(), 3);
        assert!(targets[0].contains("location=40.76%2C-111.89"));
        assert!(targets[0].contains("keyword=restaurant"));
        assert!(targets[1].contains("pagetoken=tok-1"));
        assert!(targets[2].contains("pagetoken=tok-2"));
        assert!(targets.iter().all(|t| t.contains("key=test-key")));
    }

    #[tokio::test]
    async fn test_legacy_retries_unready_token() {
        let server = StubServer::start(vec![
            legacy_page("OK", &["A1"], Some("tok-1")),
            legacy_page("INVALID_REQUEST", &[], None),
            legacy_page("OK", &["B1"], None),
        ])
        .await;
        let client = stub_client(&server, PlacesApi::Legacy);

        let records = client.search(center()).await.unwrap();
        assert_eq!(names(&records), vec!["A1", "B1"]);
        let targets = server.targets();
        assert_eq!(targets.len(), 3);
        assert!(targets[1..].iter().all(|t| t.contains("pagetoken=tok-1")));
    }

    #[tokio::test]
    async fn test_legacy_token_retries_are_bounded() {
        let mut bodies = vec![legacy_page("OK", &["A1"], Some("tok-1"))];
        bodies.extend((0..4).map(|_| legacy_page("INVALID_REQUEST", &[], None)));
        let server = StubServer::start(bodies).await;
        let client = stub_client(&server, PlacesApi::Legacy);

        let err = client.search(center()).await.unwrap_err();
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("INVALID_REQUEST"));
        // first page plus one try and MAX_TOKEN_RETRIES retries
        assert_eq!(server.targets().len(), 1 + 1 + MAX_TOKEN_RETRIES as usize);
    }

    #[tokio::test]
    async fn test_legacy_denied_on_later_page_is_fatal() {
        let server = StubServer::start(vec![
            legacy_page("OK", &["A1"], Some("tok-1")),
            legacy_page("REQUEST_DENIED", &[], None),
        ])
        .await;
        let client = stub_client(&server, PlacesApi::Legacy);

        let err = client.search(center()).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(server.targets().len(), 2);
    }

    #[tokio::test]
    async fn test_nearby_single_request() {
        let body = json!({
            "places": [{
                "id": "p1",
                "displayName": {"text": "Red Iguana"},
                "rating": 4.6,
                "userRatingCount": 9000,
                "location": {"latitude": 40.77, "longitude": -111.91},
                "primaryType": "mexican_restaurant",
                "types": ["restaurant", "food"]
            }]
        });
        let server = StubServer::start(vec![body.to_string()]).await;
        let client = stub_client(&server, PlacesApi::Nearby);

        let records = client.search(center()).await.unwrap();
        assert_eq!(names(&records), vec!["Red Iguana"]);
        assert_eq!(records[0].categories[0], "mexican_restaurant");
        assert_eq!(server.targets(), vec!["/v1/places:searchNearby"]);
    }

    #[test]
    fn test_base_url_override() {
        let client = PlacesClient::new("key", PlacesClientOptions::default())
            .unwrap()
            .with_base_url("http://localhost:8080/")
            .unwrap();
        assert_eq!(
            client.legacy_url.as_str(),
            "http://localhost:8080/maps/api/place/nearbysearch/json"
        );
        assert_eq!(
            client.nearby_url.as_str(),
            "http://localhost:8080/v1/places:searchNearby"
        );
    }
}
