//! HTTP front end: multipart uploads in, JSON out.

use anyhow::{Context, Result};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pdf_seal_core::MAX_DOCUMENT_SIZE;
use pdf_seal_dsa::{EngineError, SignatureEngine};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cli::KeyArgs;
use crate::json::{FailureResponse, HealthResponse, RejectionResponse, SignResponse, VerifyResponse};
use crate::util::format_bytes;

/// Multipart field carrying the PDF bytes.
pub const PDF_FIELD: &str = "pdf";
/// Multipart field carrying the base64 signature (verify only).
pub const SIGNATURE_FIELD: &str = "signature";

/// Headroom over the document limit for multipart boundaries and the
/// signature field.
const MULTIPART_ALLOWANCE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub cors_origin: String,
    pub max_document_size: usize,
}

#[derive(Clone)]
struct AppState {
    engine: SignatureEngine,
    max_document_size: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No PDF uploaded.")]
    NoDocument,

    #[error("File too large. Maximum size is {}.", format_limit(.0))]
    TooLarge(usize),

    #[error("Malformed upload: {0}")]
    BadUpload(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Signing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Whole mebibytes render as `5MB`, the form clients already match on.
fn format_limit(limit: &usize) -> String {
    const MIB: usize = 1024 * 1024;
    if *limit > 0 && *limit % MIB == 0 {
        format!("{}MB", limit / MIB)
    } else {
        format_bytes(*limit)
    }
}

impl ApiError {
    fn from_multipart(err: MultipartError, limit: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::TooLarge(limit)
        } else {
            ApiError::BadUpload(err.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NoDocument | ApiError::BadUpload(_) => StatusCode::BAD_REQUEST,
            ApiError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Engine(e) if e.is_precondition() => StatusCode::BAD_REQUEST,
            ApiError::Engine(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
            let body = FailureResponse {
                success: false,
                message: self.to_string(),
            };
            return (status, Json(body)).into_response();
        }

        tracing::debug!(error = %self, %status, "Request rejected");
        let body = RejectionResponse {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Default)]
struct Upload {
    pdf: Option<Vec<u8>>,
    signature: Option<String>,
}

/// Drain the multipart body, streaming the PDF field so oversized uploads are
/// cut off at the limit instead of buffered.
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
    limit: usize,
) -> Result<Upload, ApiError> {
    let Ok(mut multipart) = multipart else {
        return Err(ApiError::NoDocument);
    };

    let mut upload = Upload::default();
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::from_multipart(e, limit))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(PDF_FIELD) => {
                let mut data = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| ApiError::from_multipart(e, limit))?
                {
                    if data.len() + chunk.len() > limit {
                        return Err(ApiError::TooLarge(limit));
                    }
                    data.extend_from_slice(&chunk);
                }
                upload.pdf = Some(data).filter(|d| !d.is_empty());
            }
            Some(SIGNATURE_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::from_multipart(e, limit))?;
                upload.signature = Some(text);
            }
            _ => {}
        }
    }

    tracing::debug!(
        pdf_len = upload.pdf.as_ref().map(Vec::len),
        has_signature = upload.signature.is_some(),
        "Upload received"
    );
    Ok(upload)
}

async fn sign(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SignResponse>, ApiError> {
    let upload = read_upload(multipart, state.max_document_size).await?;
    let pdf = upload.pdf.ok_or(ApiError::NoDocument)?;
    let data_len = pdf.len();

    let engine = state.engine.clone();
    let signature = tokio::task::spawn_blocking(move || engine.sign(&pdf)).await??;
    tracing::info!(data_len, "Signed document");
    Ok(Json(SignResponse {
        success: true,
        signature,
    }))
}

async fn verify(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let upload = read_upload(multipart, state.max_document_size).await?;
    let pdf = upload.pdf.ok_or(ApiError::NoDocument)?;
    let signature = upload.signature.unwrap_or_default();
    let data_len = pdf.len();

    let engine = state.engine.clone();
    let result = tokio::task::spawn_blocking(move || engine.verify(&pdf, &signature)).await??;
    tracing::info!(data_len, valid = result.valid, "Verified document");
    Ok(Json(VerifyResponse {
        success: true,
        valid: result.valid,
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse<'static>> {
    let key_pair = state.engine.key_pair();
    let parameters = key_pair.parameters();
    Json(HealthResponse {
        status: "ok",
        key_fingerprint: key_pair.fingerprint().to_string(),
        modulus_length: parameters.modulus_length,
        divisor_length: parameters.divisor_length,
    })
}

fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    if origin == "*" {
        return Ok(layer.allow_origin(Any));
    }
    let origin = HeaderValue::from_str(origin)
        .with_context(|| format!("Invalid CORS origin: {origin}"))?;
    Ok(layer.allow_origin(origin))
}

pub fn router(engine: SignatureEngine, config: &ServerConfig) -> Result<Router> {
    let state = AppState {
        engine,
        max_document_size: config.max_document_size,
    };

    Ok(Router::new()
        .route("/sign", post(sign))
        .route("/verify", post(verify))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(
            config.max_document_size + MULTIPART_ALLOWANCE,
        ))
        .layer(cors_layer(&config.cors_origin)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

/// Resolve the key pair, then bind and serve until Ctrl-C.
///
/// Key resolution finishes before the listener exists, so no request can
/// observe a missing key.
pub fn serve(keys: &KeyArgs, config: ServerConfig) -> Result<()> {
    let key_pair = keys
        .key_store()
        .initialize()
        .context("Failed to initialize the service key pair")?;
    let engine = SignatureEngine::new(key_pair);
    let app = router(engine, &config)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let listener = tokio::net::TcpListener::bind(config.addr)
            .await
            .with_context(|| format!("Failed to bind {}", config.addr))?;
        tracing::info!(
            addr = %config.addr,
            cors_origin = %config.cors_origin,
            max_document_size = config.max_document_size,
            "Server running on http://{}",
            config.addr
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server failed")
    })
}

impl ServerConfig {
    pub fn new(addr: SocketAddr, cors_origin: String) -> Self {
        Self {
            addr,
            cors_origin,
            max_document_size: MAX_DOCUMENT_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use pdf_seal_dsa::{DsaParameters, KeyPair};
    use std::sync::LazyLock;
    use tower::ServiceExt;

    const BOUNDARY: &str = "pdfsealtestboundary";
    const DOC: &[u8] = b"%PDF-1.4...test...";

    static ENGINE: LazyLock<SignatureEngine> = LazyLock::new(|| {
        SignatureEngine::new(KeyPair::generate(DsaParameters::Dsa2048_224).unwrap())
    });

    enum Part<'a> {
        File(&'a str, &'a [u8]),
        Text(&'a str, &'a str),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::File(name, data) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"doc.pdf\"\r\n\
                             Content-Type: application/pdf\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn app_with_limit(limit: usize) -> Router {
        let config = ServerConfig {
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cors_origin: "*".to_string(),
            max_document_size: limit,
        };
        router(ENGINE.clone(), &config).unwrap()
    }

    fn app() -> Router {
        app_with_limit(MAX_DOCUMENT_SIZE)
    }

    async fn post_form(app: Router, uri: &str, parts: &[Part<'_>]) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn sign_doc(doc: &[u8]) -> String {
        let (status, body) = post_form(app(), "/sign", &[Part::File(PDF_FIELD, doc)]).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["success"], true);
        body["signature"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn sign_then_verify_round_trip() {
        let signature = sign_doc(DOC).await;
        let (status, body) = post_form(
            app(),
            "/verify",
            &[Part::File(PDF_FIELD, DOC), Part::Text(SIGNATURE_FIELD, &signature)],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["valid"], true);
    }

    #[tokio::test]
    async fn tampered_document_is_invalid_not_an_error() {
        let signature = sign_doc(DOC).await;
        let mut tampered = DOC.to_vec();
        tampered.push(0);
        let (status, body) = post_form(
            app(),
            "/verify",
            &[
                Part::Text(SIGNATURE_FIELD, &signature),
                Part::File(PDF_FIELD, &tampered),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["valid"], false);
    }

    #[tokio::test]
    async fn garbage_signature_is_invalid() {
        let (status, body) = post_form(
            app(),
            "/verify",
            &[
                Part::File(PDF_FIELD, DOC),
                Part::Text(SIGNATURE_FIELD, "%%% not base64 %%%"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], false);
    }

    #[tokio::test]
    async fn sign_without_pdf_is_rejected() {
        let (status, body) = post_form(app(), "/sign", &[Part::Text("other", "x")]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No PDF uploaded.");
    }

    #[tokio::test]
    async fn empty_pdf_field_is_rejected() {
        let (status, body) = post_form(app(), "/sign", &[Part::File(PDF_FIELD, b"")]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No PDF uploaded.");
    }

    #[tokio::test]
    async fn verify_without_signature_is_rejected() {
        let (status, body) = post_form(app(), "/verify", &[Part::File(PDF_FIELD, DOC)]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No signature provided.");

        let (status, _) = post_form(
            app(),
            "/verify",
            &[Part::File(PDF_FIELD, DOC), Part::Text(SIGNATURE_FIELD, "")],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn verify_without_pdf_is_rejected_first() {
        let (status, body) = post_form(app(), "/verify", &[Part::Text(SIGNATURE_FIELD, "")]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No PDF uploaded.");
    }

    #[tokio::test]
    async fn oversized_pdf_gets_413() {
        let big = vec![b'x'; 2048];
        let (status, body) = post_form(app_with_limit(1024), "/sign", &[Part::File(PDF_FIELD, &big)]).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["success"], false);
        assert!(
            body["error"].as_str().unwrap().starts_with("File too large."),
            "{body}"
        );
    }

    #[tokio::test]
    async fn pdf_at_limit_is_accepted() {
        let doc = vec![b'x'; 1024];
        let (status, _) = post_form(app_with_limit(1024), "/sign", &[Part::File(PDF_FIELD, &doc)]).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn non_multipart_request_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/sign")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_reports_key_fingerprint() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["key_fingerprint"], ENGINE.key_pair().fingerprint());
        assert_eq!(body["modulus_length"], 2048);
        assert_eq!(body["divisor_length"], 224);
    }

    #[tokio::test]
    async fn cors_allows_any_origin_by_default() {
        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[test]
    fn cors_rejects_unencodable_origin() {
        assert!(cors_layer("http://bad\norigin").is_err());
        assert!(cors_layer("http://localhost:3000").is_ok());
    }

    async fn response_json(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn precondition_errors_use_the_error_key() {
        let (status, body) =
            response_json(ApiError::from(EngineError::MissingSignature).into_response()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "No signature provided.");
        assert!(body.get("message").is_none(), "{body}");
    }

    #[tokio::test]
    async fn internal_failures_use_the_message_key() {
        let error = ApiError::from(EngineError::Signing(signature::Error::new()));
        let expected = error.to_string();
        let (status, body) = response_json(error.into_response()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], expected);
        assert!(body.get("error").is_none(), "{body}");
    }

    #[tokio::test]
    async fn panicked_signing_task_is_an_internal_failure() {
        let join_error = tokio::task::spawn_blocking::<_, ()>(|| panic!("boom"))
            .await
            .unwrap_err();
        let (status, body) = response_json(ApiError::from(join_error).into_response()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["message"].is_string(), "{body}");
    }

    #[tokio::test]
    async fn oversized_default_upload_reports_the_limit_in_megabytes() {
        let big = vec![b'x'; MAX_DOCUMENT_SIZE + 1];
        let (status, body) = post_form(app(), "/sign", &[Part::File(PDF_FIELD, &big)]).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "File too large. Maximum size is 5MB.");
    }

    #[test]
    fn too_large_message_names_the_limit() {
        assert_eq!(
            ApiError::TooLarge(MAX_DOCUMENT_SIZE).to_string(),
            "File too large. Maximum size is 5MB."
        );
        assert_eq!(
            ApiError::TooLarge(1024).to_string(),
            "File too large. Maximum size is 1.0 KB."
        );
    }
}
