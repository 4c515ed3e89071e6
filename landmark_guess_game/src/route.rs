use std::time::Duration;

use futures::FutureExt;
use geo_types::LineString;
use landmark_guess_lib::{coordinate::Coordinate, distance::distance_km};
use serde::Deserialize;
use tokio::task::JoinHandle;

pub const DEFAULT_ROUTE_BASE_URL: &str = "https://router.project-osrm.org/route/v1/driving";
pub const DEFAULT_ROUTE_TIMEOUT: Duration = Duration::from_millis(4000);

/// A travel route between guess and truth. Presentation only; scores never depend on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub points: LineString<f64>,
    pub distance_meters: f64,
}

impl Route {
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.points.points().map(Coordinate::from).collect()
    }
}

#[derive(Deserialize)]
struct OsrmResponse {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    distance: f64,
    geometry: Option<OsrmGeometry>,
}

#[derive(Deserialize)]
struct OsrmGeometry {
    #[serde(default)]
    coordinates: Vec<[f64; 2]>,
}

/// Parses an OSRM `geometries=geojson` response. Anything unexpected is `None`.
pub fn parse_route(body: &str) -> Option<Route> {
    let response: OsrmResponse = serde_json::from_str(body).ok()?;
    let route = response.routes.into_iter().next()?;
    let coordinates = route.geometry?.coordinates;

    if coordinates.len() < 2 || !route.distance.is_finite() {
        return None;
    }

    Some(Route {
        // GeoJSON pairs are [lng, lat], which is already x, y
        points: coordinates.into_iter().collect(),
        distance_meters: route.distance,
    })
}

#[derive(Debug, Clone)]
pub struct RouteClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RouteClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, timeout)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn url_for(&self, from: Coordinate, to: Coordinate) -> String {
        format!(
            "{}/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url.trim_end_matches('/'),
            from.lng,
            from.lat,
            to.lng,
            to.lat
        )
    }

    /// Never errors: failures, timeouts and malformed responses are all `None`.
    pub async fn fetch_route(&self, from: Coordinate, to: Coordinate, timeout: Duration) -> Option<Route> {
        let url = self.url_for(from, to);

        match tokio::time::timeout(timeout, self.request(&url)).await {
            Ok(Ok(route)) => route,
            Ok(Err(err)) => {
                tracing::debug!("Route lookup failed: {err}");
                None
            }
            Err(_) => {
                tracing::debug!("Route lookup timed out after {:?}", timeout);
                None
            }
        }
    }

    async fn request(&self, url: &str) -> Result<Option<Route>, reqwest::Error> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            tracing::debug!("Route service answered {}", response.status());
            return Ok(None);
        }

        let body = response.text().await?;
        Ok(parse_route(&body))
    }

    /// Route if it arrives within the client timeout, otherwise the straight line.
    pub async fn reveal(&self, from: Coordinate, to: Coordinate) -> RevealPath {
        match self.fetch_route(from, to, self.timeout).await {
            Some(route) => RevealPath::Route(route),
            None => RevealPath::direct(from, to),
        }
    }

    /// Starts the lookup in the background. Requires a tokio runtime.
    pub fn spawn(&self, from: Coordinate, to: Coordinate) -> PendingRoute {
        let client = self.clone();
        let handle = tokio::spawn(async move { client.fetch_route(from, to, client.timeout).await });

        PendingRoute {
            from,
            to,
            handle,
            resolved: None,
        }
    }
}

impl Default for RouteClient {
    fn default() -> Self {
        Self::new(DEFAULT_ROUTE_BASE_URL, DEFAULT_ROUTE_TIMEOUT)
    }
}

/// What the reveal draws between guess and truth.
#[derive(Debug, Clone, PartialEq)]
pub enum RevealPath {
    Route(Route),
    Direct {
        from: Coordinate,
        to: Coordinate,
        distance_km: f64,
    },
}

impl RevealPath {
    pub fn direct(from: Coordinate, to: Coordinate) -> Self {
        RevealPath::Direct {
            from,
            to,
            distance_km: distance_km(from, to),
        }
    }

    pub fn is_route(&self) -> bool {
        matches!(self, RevealPath::Route(_))
    }

    pub fn points(&self) -> Vec<Coordinate> {
        match self {
            RevealPath::Route(route) => route.coordinates(),
            RevealPath::Direct { from, to, .. } => vec![*from, *to],
        }
    }

    pub fn distance_km(&self) -> f64 {
        match self {
            RevealPath::Route(route) => route.distance_meters / 1000.,
            RevealPath::Direct { distance_km, .. } => *distance_km,
        }
    }
}

/// A background route lookup. Dropping it aborts the lookup.
#[derive(Debug)]
pub struct PendingRoute {
    from: Coordinate,
    to: Coordinate,
    handle: JoinHandle<Option<Route>>,
    resolved: Option<Option<Route>>,
}

impl PendingRoute {
    /// Non-blocking check for a finished lookup.
    pub fn poll(&mut self) -> Option<&Route> {
        if self.resolved.is_none() {
            // A JoinHandle must not be polled again once it has completed
            match (&mut self.handle).now_or_never() {
                Some(Ok(route)) => self.resolved = Some(route),
                Some(Err(err)) => {
                    tracing::debug!("Route lookup task ended: {err}");
                    self.resolved = Some(None);
                }
                None => {}
            }
        }

        self.resolved.as_ref().and_then(|route| route.as_ref())
    }

    pub fn is_settled(&self) -> bool {
        self.resolved.is_some()
    }

    pub fn cancel(&mut self) {
        self.handle.abort();
    }

    /// The route when it is already here, the straight line otherwise.
    pub fn reveal(&mut self) -> RevealPath {
        let (from, to) = (self.from, self.to);
        match self.poll() {
            Some(route) => RevealPath::Route(route.clone()),
            None => RevealPath::direct(from, to),
        }
    }
}

impl Drop for PendingRoute {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

#[cfg(test)]
const SAMPLE_RESPONSE: &str = r#"{"code":"Ok","routes":[{"distance":1234.5,"duration":300,"geometry":{"type":"LineString","coordinates":[[21.0122,52.2497],[21.013,52.249],[21.015,52.247]]}}]}"#;

#[cfg(test)]
async fn serve_once(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0; 4096];
        let _ = stream.read(&mut buf).await;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
    });

    format!("http://{addr}/route/v1/driving")
}

// Local test services must not be routed through an environment proxy
#[cfg(test)]
fn local_client(base_url: impl Into<String>, timeout: Duration) -> RouteClient {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    RouteClient::with_client(http, base_url, timeout)
}

#[test]
fn parses_osrm_geojson() {
    let route = parse_route(SAMPLE_RESPONSE).unwrap();
    assert_eq!(route.distance_meters, 1234.5);
    assert_eq!(route.points.0.len(), 3);

    let coordinates = route.coordinates();
    assert_eq!(coordinates[0], Coordinate::new(52.2497, 21.0122));
    assert_eq!(coordinates[2], Coordinate::new(52.247, 21.015));
}

#[test]
fn rejects_unusable_responses() {
    assert_eq!(parse_route("not json"), None);
    assert_eq!(parse_route(r#"{"code":"NoRoute","routes":[]}"#), None);
    assert_eq!(parse_route(r#"{"code":"Ok"}"#), None);
    assert_eq!(parse_route(r#"{"routes":[{"distance":10.0}]}"#), None);
    assert_eq!(
        parse_route(r#"{"routes":[{"distance":10.0,"geometry":{"coordinates":[[21.0,52.0]]}}]}"#),
        None
    );
}

#[test]
fn url_uses_lng_lat_order() {
    let client = RouteClient::new("http://router.local/route/v1/driving/", DEFAULT_ROUTE_TIMEOUT);
    let url = client.url_for(Coordinate::new(52.1, 21.2), Coordinate::new(52.3, 21.4));
    assert_eq!(url, "http://router.local/route/v1/driving/21.2,52.1;21.4,52.3?overview=full&geometries=geojson");
}

#[test]
fn direct_path_is_straight_line() {
    let from = Coordinate::new(52.2497, 21.0122);
    let to = Coordinate::new(52.247, 21.015);
    let path = RevealPath::direct(from, to);

    assert!(!path.is_route());
    assert_eq!(path.points(), vec![from, to]);
    assert_eq!(path.distance_km(), distance_km(from, to));
}

#[tokio::test]
async fn fetches_route_from_local_service() {
    let base_url = serve_once(SAMPLE_RESPONSE).await;
    let client = local_client(base_url, Duration::from_secs(5));

    let path = client.reveal(Coordinate::new(52.2497, 21.0122), Coordinate::new(52.247, 21.015)).await;
    assert!(path.is_route());
    assert!((path.distance_km() - 1.2345).abs() < 1e-9);
}

#[tokio::test]
async fn refused_connection_falls_back() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = local_client(format!("http://{addr}"), Duration::from_secs(2));
    let from = Coordinate::new(52.2497, 21.0122);
    let to = Coordinate::new(52.247, 21.015);

    assert_eq!(client.fetch_route(from, to, Duration::from_secs(2)).await, None);
    assert_eq!(client.reveal(from, to).await, RevealPath::direct(from, to));
}

#[tokio::test]
async fn silent_service_times_out() {
    // Accepts connections through the backlog but never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let client = local_client(format!("http://{addr}"), Duration::from_millis(100));
    let started = std::time::Instant::now();
    let route = client
        .fetch_route(Coordinate::new(52.2, 21.0), Coordinate::new(52.3, 21.1), Duration::from_millis(100))
        .await;

    assert_eq!(route, None);
    assert!(started.elapsed() < Duration::from_secs(2));
    drop(listener);
}

#[tokio::test]
async fn pending_route_reveals_direct_until_ready() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let client = local_client(format!("http://{addr}"), Duration::from_secs(30));
    let from = Coordinate::new(52.2497, 21.0122);
    let to = Coordinate::new(52.247, 21.015);

    let mut pending = client.spawn(from, to);
    assert_eq!(pending.reveal(), RevealPath::direct(from, to));
    assert!(!pending.is_settled());

    pending.cancel();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(pending.reveal(), RevealPath::direct(from, to));
    assert!(pending.is_settled());
    drop(listener);
}

#[tokio::test]
async fn pending_route_resolves() {
    let base_url = serve_once(SAMPLE_RESPONSE).await;
    let client = local_client(base_url, Duration::from_secs(5));

    let mut pending = client.spawn(Coordinate::new(52.2497, 21.0122), Coordinate::new(52.247, 21.015));
    for _ in 0..100 {
        if pending.poll().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(pending.reveal().is_route());
}
