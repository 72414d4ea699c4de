//! Scene polling against the backend

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bevy::prelude::*;
use stepview_core::poll::DEFAULT_POLL_INTERVAL;
use stepview_core::{PollSchedule, SceneSnapshot, ViewerError};

use crate::scene::ViewerScene;
use crate::surface::BevySurface;

pub struct NetworkPlugin;

/// Resource storing the backend connection configuration
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    /// HTTP(S) base URL of the scene server (empty means same origin)
    pub server_url: String,
    /// Delay between the end of one poll and the start of the next
    pub interval: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ViewerConfig {
    /// Create config from URL query parameters or same-origin fallback
    #[cfg(target_arch = "wasm32")]
    pub fn from_browser() -> Self {
        let mut config = Self::default();
        let Some(window) = web_sys::window() else {
            return config;
        };
        let location = window.location();

        if let Ok(search) = location.search() {
            if let Some(server) = Self::parse_query_param(&search, "server") {
                tracing::info!("Using server from URL parameter: {}", server);
                config.server_url = Self::server_url_from_address(&server);
            }
            if let Some(ms) = Self::parse_query_param(&search, "interval_ms") {
                match ms.parse::<u64>() {
                    Ok(ms) if ms > 0 => config.interval = Duration::from_millis(ms),
                    _ => tracing::warn!("Ignoring invalid interval_ms: {}", ms),
                }
            }
        }

        // Fall back to same-origin
        if config.server_url.is_empty() {
            if let Ok(origin) = location.origin() {
                config.server_url = origin;
            }
        }
        config
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_browser() -> Self {
        Self::default()
    }

    /// Base URL from a server address (host:port or full URL)
    pub fn server_url_from_address(addr: &str) -> String {
        let addr = addr.trim().trim_end_matches('/');
        if addr.starts_with("https://") || addr.starts_with("http://") {
            addr.to_string()
        } else {
            format!("http://{}", addr)
        }
    }

    /// Parse a query parameter from a search string
    pub fn parse_query_param(search: &str, param: &str) -> Option<String> {
        let search = search.trim_start_matches('?');
        for pair in search.split('&') {
            let mut parts = pair.splitn(2, '=');
            if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
                if key == param {
                    // URL decode the value
                    return Some(value.replace("%3A", ":").replace("%2F", "/"));
                }
            }
        }
        None
    }
}

/// The scene poll schedule
#[derive(Resource, Debug)]
pub struct ScenePoll(pub PollSchedule);

/// Fetch result handed from the async task to the main schedule
#[derive(Resource, Default, Clone)]
pub struct PendingSnapshot(pub Arc<Mutex<Option<stepview_core::Result<SceneSnapshot>>>>);

impl PendingSnapshot {
    /// Hand over a finished fetch. A poisoned slot is recovered so the poll
    /// loop never stalls with a request in flight.
    pub fn store(&self, result: stepview_core::Result<SceneSnapshot>) {
        let mut data = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *data = Some(result);
    }

    pub fn take(&self) -> Option<stepview_core::Result<SceneSnapshot>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Last poll outcome, for the connection indicator
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub connected: Option<bool>,
    pub polls: u64,
}

/// Async runtime and HTTP client for the desktop build
#[cfg(not(target_arch = "wasm32"))]
#[derive(Resource)]
pub struct NativeFetcher {
    runtime: tokio::runtime::Runtime,
    client: reqwest::Client,
}

#[cfg(not(target_arch = "wasm32"))]
impl NativeFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;
        let client = reqwest::Client::builder().build()?;
        Ok(Self { runtime, client })
    }
}

impl Plugin for NetworkPlugin {
    fn build(&self, app: &mut App) {
        let interval = app
            .world()
            .get_resource::<ViewerConfig>()
            .map(|c| c.interval)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        app.insert_resource(ScenePoll(PollSchedule::new(interval)))
            .init_resource::<PendingSnapshot>()
            .init_resource::<ConnectionStatus>()
            .add_systems(Update, (poll_scene, process_snapshot).chain())
            .add_systems(Last, cancel_on_exit);
    }
}

/// Issue a scene request when the schedule says one is due
fn poll_scene(
    time: Res<Time>,
    mut poll: ResMut<ScenePoll>,
    scene: Res<ViewerScene>,
    config: Res<ViewerConfig>,
    pending: Res<PendingSnapshot>,
    #[cfg(not(target_arch = "wasm32"))] fetcher: Res<NativeFetcher>,
) {
    let Some(request) = poll.0.tick(time.delta(), scene.state.steps.selected()) else {
        return;
    };
    let url = request.url(&config.server_url);
    tracing::debug!(url = %url, sequence = request.sequence, "Polling scene");
    let slot = pending.clone();

    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        spawn_local(async move {
            slot.store(fetch_snapshot(&url).await);
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let client = fetcher.client.clone();
        fetcher.runtime.spawn(async move {
            slot.store(fetch_snapshot(&client, &url).await);
        });
    }
}

/// Reconcile a finished fetch into the scene
fn process_snapshot(
    pending: Res<PendingSnapshot>,
    mut poll: ResMut<ScenePoll>,
    mut scene: ResMut<ViewerScene>,
    mut status: ResMut<ConnectionStatus>,
    mut surface: BevySurface,
) {
    let Some(result) = pending.take() else {
        return;
    };

    if let Some(report) = poll.0.finish(&mut scene.state, &mut surface, result) {
        if report.built() > 0 {
            tracing::info!("Scene updated: {}", report);
        }
    }
    status.connected = poll.0.last_ok();
    status.polls += 1;
}

fn cancel_on_exit(mut exits: MessageReader<AppExit>, poll: Res<ScenePoll>) {
    if exits.read().next().is_some() {
        poll.0.handle().cancel();
    }
}

#[cfg(target_arch = "wasm32")]
async fn fetch_snapshot(url: &str) -> stepview_core::Result<SceneSnapshot> {
    let response = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| ViewerError::Http(e.to_string()))?;
    if !response.ok() {
        return Err(ViewerError::Status {
            status: response.status(),
            url: url.to_string(),
        });
    }
    let body = response
        .text()
        .await
        .map_err(|e| ViewerError::Http(e.to_string()))?;
    SceneSnapshot::from_json(&body)
}

#[cfg(not(target_arch = "wasm32"))]
async fn fetch_snapshot(client: &reqwest::Client, url: &str) -> stepview_core::Result<SceneSnapshot> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ViewerError::Http(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ViewerError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let body = response
        .text()
        .await
        .map_err(|e| ViewerError::Http(e.to_string()))?;
    SceneSnapshot::from_json(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_param() {
        let search = "?server=192.168.1.10%3A5006&interval_ms=250";
        assert_eq!(
            ViewerConfig::parse_query_param(search, "server").as_deref(),
            Some("192.168.1.10:5006")
        );
        assert_eq!(
            ViewerConfig::parse_query_param(search, "interval_ms").as_deref(),
            Some("250")
        );
        assert_eq!(ViewerConfig::parse_query_param(search, "step"), None);
        assert_eq!(ViewerConfig::parse_query_param("", "server"), None);
    }

    #[test]
    fn test_server_url_from_address() {
        assert_eq!(
            ViewerConfig::server_url_from_address("localhost:5006"),
            "http://localhost:5006"
        );
        assert_eq!(
            ViewerConfig::server_url_from_address("https://viewer.example.org/"),
            "https://viewer.example.org"
        );
    }

    #[test]
    fn test_default_config() {
        let config = ViewerConfig::default();
        assert!(config.server_url.is_empty());
        assert_eq!(config.interval, Duration::from_millis(1000));
    }

    #[test]
    fn test_pending_slot_survives_poisoning() {
        let pending = PendingSnapshot::default();
        let holder = pending.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.0.lock().unwrap();
            panic!("fetch task panicked while holding the slot");
        })
        .join();
        assert!(pending.0.is_poisoned());

        pending.store(Ok(SceneSnapshot::default()));
        assert!(matches!(pending.take(), Some(Ok(_))));
        assert!(pending.take().is_none());
    }
}
