//! HTTP endpoints for uploading alerts and pulling stored documents.

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::{Kind, Store, FEED_FILE};

/// Media type served for stored alert documents.
const CAP_MEDIA_TYPE: &str = "application/cap+xml";
/// Media type served for feed documents.
const ATOM_MEDIA_TYPE: &str = "application/atom+xml";

/// Multipart framing allowance on top of the configured upload cap; the cap
/// itself is enforced against the decoded field bytes.
const UPLOAD_OVERHEAD: usize = 64 * 1024;

/// Shared per-request state: the store plus the read-only configuration.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Config,
}

/// Response body for the `/healthz` endpoint.
#[derive(Serialize, Deserialize)]
struct Health {
    /// Always "ok" when the server is running.
    status: String,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_size as usize + UPLOAD_OVERHEAD;
    Router::new()
        .route("/healthz", get(healthz))
        .route("/cap/", get(pull_feed))
        .route("/cap/{reference}", get(pull_alert))
        .route("/alerts/{file}", get(download_alert))
        .route("/feeds/{file}", get(download_feed))
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

/// Serve the HTTP interface on `addr` until `shutdown` completes, then
/// drain in-flight requests.
pub async fn serve(
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = router(state);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Health check endpoint.
async fn healthz() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

/// The canonical feed when no reference is given.
async fn pull_feed(State(state): State<Arc<AppState>>) -> Response {
    match state.store.retrieve(Kind::Feeds, FEED_FILE) {
        Ok(data) => xml_response(ATOM_MEDIA_TYPE, data),
        Err(err) => error_response(err, "pull feed"),
    }
}

/// A specific stored alert document by filename.
async fn pull_alert(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> Response {
    match state.store.retrieve(Kind::Alerts, &reference) {
        Ok(data) => xml_response(CAP_MEDIA_TYPE, data),
        Err(err) => error_response(err, "pull alert"),
    }
}

/// Static passthrough download of a stored alert file.
async fn download_alert(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> Response {
    match state.store.retrieve(Kind::Alerts, &file) {
        Ok(data) => xml_response(CAP_MEDIA_TYPE, data),
        Err(err) => error_response(err, "download alert"),
    }
}

/// Static passthrough download of a stored feed file.
async fn download_feed(State(state): State<Arc<AppState>>, Path(file): Path<String>) -> Response {
    match state.store.retrieve(Kind::Feeds, &file) {
        Ok(data) => xml_response(ATOM_MEDIA_TYPE, data),
        Err(err) => error_response(err, "download feed"),
    }
}

/// Accept a multipart upload and store it in the alert directory.
///
/// ```text
/// curl -F 'uploadFile=@KAR0-0306112239-SW.xml' http://localhost:8080/upload
/// ```
async fn upload(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    match save_upload(&state, multipart).await {
        Ok((name, written)) => {
            info!(file = %name, bytes = written, "alert uploaded");
            (StatusCode::OK, format!("uploaded {name}: {written} bytes")).into_response()
        }
        Err(err) => error_response(err, "upload"),
    }
}

/// Read the `uploadFile` field, enforce the size cap, and persist. Nothing
/// touches disk until the whole payload has passed the cap.
async fn save_upload(state: &AppState, mut multipart: Multipart) -> Result<(String, usize)> {
    let limit = state.config.max_upload_size;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some("uploadFile") {
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| Error::invalid_argument("upload is missing a file name"))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, limit))?;
        if data.len() as u64 > limit {
            return Err(Error::PayloadTooLarge { limit });
        }
        let written = state.store.store(Kind::Alerts, &name, &data)?;
        return Ok((name, written));
    }
    Err(Error::invalid_argument(
        "multipart field uploadFile is required",
    ))
}

fn multipart_error(err: MultipartError, limit: u64) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { limit }
    } else {
        Error::validation(err.to_string())
    }
}

fn xml_response(content_type: &'static str, data: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, content_type)], data).into_response()
}

/// Map a handler error onto an HTTP response. Errors are reported to the
/// caller with the underlying message and logged; they never take the
/// serving process down.
fn error_response(err: Error, context: &'static str) -> Response {
    let status = match &err {
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        Error::Decode(_)
        | Error::Validation(_)
        | Error::InvalidArgument(_)
        | Error::MalformedTimestamp { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::NOT_FOUND {
        info!(%err, context, "request failed");
    } else {
        error!(%err, context, "request failed");
    }
    (status, err.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate;
    use crate::types::TimeStr;
    use tempfile::TempDir;
    use tokio::task;

    const AMBER_ALERT: &str = include_str!("../tests/data/cap_amber_alert.xml");

    fn app_state(dir: &TempDir, max_upload_size: u64) -> Arc<AppState> {
        let store = Store::new(dir.path().to_path_buf()).unwrap();
        store.init().unwrap();
        let config = Config {
            root: dir.path().to_path_buf(),
            max_upload_size,
            host_name: "http://alerts.example.com/".into(),
            ..Default::default()
        };
        Arc::new(AppState { store, config })
    }

    async fn spawn_server(state: Arc<AppState>) -> (String, task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state);
        let handle = task::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });
        (format!("http://{addr}"), handle)
    }

    fn upload_form(name: &str, data: &[u8]) -> reqwest::multipart::Form {
        let part = reqwest::multipart::Part::bytes(data.to_vec()).file_name(name.to_string());
        reqwest::multipart::Form::new().part("uploadFile", part)
    }

    #[tokio::test]
    async fn health_endpoint() {
        let dir = TempDir::new().unwrap();
        let (base, handle) = spawn_server(app_state(&dir, 1024)).await;
        let body: Health = reqwest::get(format!("{base}/healthz"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body.status, "ok");
        handle.abort();
    }

    #[tokio::test]
    async fn upload_then_pull_alert() {
        let dir = TempDir::new().unwrap();
        let state = app_state(&dir, 1_048_576);
        let (base, handle) = spawn_server(state.clone()).await;

        let client = reqwest::Client::new();
        let resp = client
            .post(format!("{base}/upload"))
            .multipart(upload_form("KAR0-0306112239-SW.xml", AMBER_ALERT.as_bytes()))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        assert!(state
            .store
            .retrieve(Kind::Alerts, "KAR0-0306112239-SW.xml")
            .is_ok());

        let resp = reqwest::get(format!("{base}/cap/KAR0-0306112239-SW.xml"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            CAP_MEDIA_TYPE
        );
        let body = resp.text().await.unwrap();
        assert!(body.contains("KAR0-0306112239-SW"));

        // the static passthrough serves the same bytes
        let body2 = reqwest::get(format!("{base}/alerts/KAR0-0306112239-SW.xml"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, body2);
        handle.abort();
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_before_persisting() {
        let dir = TempDir::new().unwrap();
        let state = app_state(&dir, 16);
        let (base, handle) = spawn_server(state.clone()).await;

        let client = reqwest::Client::new();
        let resp = client
            .post(format!("{base}/upload"))
            .multipart(upload_form("big.xml", &[b'x'; 1024]))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(state.store.retrieve(Kind::Alerts, "big.xml").is_err());
        let leftover = std::fs::read_dir(state.store.dir(Kind::Alerts))
            .unwrap()
            .count();
        assert_eq!(leftover, 0);
        handle.abort();
    }

    #[tokio::test]
    async fn upload_without_the_expected_field_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (base, handle) = spawn_server(app_state(&dir, 1024)).await;
        let client = reqwest::Client::new();
        let form = reqwest::multipart::Form::new().text("somethingElse", "value");
        let resp = client
            .post(format!("{base}/upload"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        handle.abort();
    }

    #[tokio::test]
    async fn pull_feed_before_any_publish_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (base, handle) = spawn_server(app_state(&dir, 1024)).await;
        let resp = reqwest::get(format!("{base}/cap/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        handle.abort();
    }

    #[tokio::test]
    async fn pull_feed_serves_the_published_document() {
        let dir = TempDir::new().unwrap();
        let state = app_state(&dir, 1_048_576);
        state
            .store
            .store(Kind::Alerts, "KAR0-0306112239-SW.xml", AMBER_ALERT.as_bytes())
            .unwrap();
        let feed = aggregate::build_feed(&state.store, &state.config, TimeStr::now()).unwrap();
        state.store.publish_feed(&feed).unwrap();

        let (base, handle) = spawn_server(state).await;
        let resp = reqwest::get(format!("{base}/cap/")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            ATOM_MEDIA_TYPE
        );
        let body = resp.text().await.unwrap();
        assert!(body.contains("<entry>"));
        assert!(body.contains("KAR0-0306112239-SW"));

        let body2 = reqwest::get(format!("{base}/feeds/{FEED_FILE}"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, body2);
        handle.abort();
    }

    #[tokio::test]
    async fn unknown_reference_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (base, handle) = spawn_server(app_state(&dir, 1024)).await;
        let resp = reqwest::get(format!("{base}/cap/no-such-alert.xml"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = reqwest::get(format!("{base}/feeds/no-such-feed.xml"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        handle.abort();
    }
}
