//! Web server setup and routing

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::api;
use crate::config::TlsConfig;
use crate::state::AppState;

/// Build the scene API router with the viewer as static fallback
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/scene", get(api::get_scene))
        .route("/steps", get(api::list_steps))
        .route("/load_scene", post(api::load_scene))
        .route("/update_mesh", post(api::update_mesh))
        .route("/update_point_cloud", post(api::update_point_cloud))
        .route("/add_mesh", post(api::add_mesh))
        .route("/add_point_cloud", post(api::add_point_cloud))
        .route("/add_frustum", post(api::add_frustum))
        .route("/add_object_axis", post(api::add_object_axis))
        .route("/add_global_axes", post(api::add_global_axes))
        .route("/clear_scene", post(api::clear_scene))
        .route("/health", get(api::health))
        // Static files (WASM viewer) - must be fallback for root
        .fallback_service(ServeDir::new(&state.config.server.web_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve the router on the configured address, over TLS when configured
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let bind = state.config.server.bind.clone();
    let tls = state.config.server.tls.clone();
    let app = router(state);

    let Some(tls) = tls else {
        let listener = tokio::net::TcpListener::bind(&bind).await?;
        info!(address = %bind, protocol = "HTTP", "Scene server listening");
        axum::serve(listener, app).await?;
        return Ok(());
    };

    let (cert, key) = tls_files(&tls)?;
    let addr: SocketAddr = bind.parse()?;
    let rustls = RustlsConfig::from_pem_file(cert, key).await?;
    info!(address = %bind, protocol = "HTTPS", cert = %tls.cert, "Scene server listening");
    axum_server::bind_rustls(addr, rustls)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

/// Certificate and key paths, checked to exist before rustls reads them
fn tls_files(tls: &TlsConfig) -> Result<(PathBuf, PathBuf)> {
    let cert = PathBuf::from(&tls.cert);
    let key = PathBuf::from(&tls.key);
    for (kind, path) in [("certificate", &cert), ("key", &key)] {
        if !path.is_file() {
            anyhow::bail!("TLS {} file not found: {}", kind, path.display());
        }
    }
    Ok((cert, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use stepview_core::SceneSnapshot;
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::new(Config::default()))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
        send(app, Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(app, request).await
    }

    fn triangle() -> Value {
        json!({"vertices": [[0, 0, 0], [1, 0, 0], [0, 1, 0]], "faces": [[0, 1, 2]]})
    }

    #[test]
    fn test_tls_files_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        std::fs::write(&cert, "cert").unwrap();
        let mut tls = TlsConfig {
            cert: cert.display().to_string(),
            key: dir.path().join("key.pem").display().to_string(),
        };

        let err = tls_files(&tls).unwrap_err();
        assert!(err.to_string().contains("TLS key file not found"));

        std::fs::write(dir.path().join("key.pem"), "key").unwrap();
        tls.key = dir.path().join("key.pem").display().to_string();
        assert_eq!(tls_files(&tls).unwrap().0, cert);
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get(&app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy"}));
    }

    #[tokio::test]
    async fn test_empty_scene() {
        let (status, body) = get(&app(), "/scene").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"add_global_axes": false, "total_steps": 0}));
    }

    #[tokio::test]
    async fn test_updates_grow_history() {
        let app = app();
        for i in 1..=3 {
            let (status, ack) = post(
                &app,
                "/update_mesh",
                json!({"mesh": triangle(), "label": format!("update_{}", i)}),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(ack, json!({"step": i - 1, "total_steps": i}));
        }

        let (_, body) = get(&app, "/scene?step=1").await;
        let snapshot: SceneSnapshot = serde_json::from_value(body).unwrap();
        assert_eq!(snapshot.total_steps, Some(3));
        assert_eq!(
            snapshot.updated_mesh.unwrap().label.as_deref(),
            Some("update_2")
        );

        let (status, body) = get(&app, "/scene?step=3").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (_, steps) = get(&app, "/steps").await;
        assert_eq!(steps.as_array().unwrap().len(), 3);

        // A step that existed before a clear is gone afterwards
        post(&app, "/clear_scene", json!({})).await;
        let (status, _) = get(&app, "/scene?step=2").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, body) = get(&app, "/scene").await;
        assert_eq!(body["total_steps"], 0);
    }

    #[tokio::test]
    async fn test_load_scene_and_clear() {
        let app = app();
        post(
            &app,
            "/load_scene",
            json!({"points": [[0, 0, 0], [1, 1, 1]], "mesh": triangle()}),
        )
        .await;
        post(
            &app,
            "/add_frustum",
            json!({"pose": [[1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 1, 0], [0, 0, 0, 1]]}),
        )
        .await;
        post(
            &app,
            "/add_object_axis",
            json!({"pose": [[1, 0, 0, 0.5], [0, 1, 0, 0], [0, 0, 1, 0], [0, 0, 0, 1]]}),
        )
        .await;

        let (_, body) = get(&app, "/scene").await;
        let snapshot: SceneSnapshot = serde_json::from_value(body).unwrap();
        assert!(snapshot.add_global_axes);
        assert_eq!(snapshot.frustums.unwrap().len(), 1);
        assert_eq!(snapshot.axes.unwrap()[0].label, "Object");
        assert_eq!(snapshot.initial_point_cloud.unwrap().points.len(), 2);

        let (status, _) = post(&app, "/clear_scene", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = get(&app, "/scene").await;
        assert_eq!(body, json!({"add_global_axes": false, "total_steps": 0}));
    }

    #[tokio::test]
    async fn test_add_point_cloud_creates_first_step() {
        let app = app();
        let (_, ack) = post(
            &app,
            "/add_point_cloud",
            json!({"points": [[0, 0, 0]], "color": "#00ff00", "label": "seed"}),
        )
        .await;
        assert_eq!(ack, json!({"step": 0, "total_steps": 1}));

        let (_, body) = get(&app, "/scene").await;
        assert_eq!(body["point_clouds"][0]["label"], "seed");
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let (status, _) = post(&app(), "/update_mesh", json!({"label": "x"})).await;
        assert!(status.is_client_error());
    }
}
