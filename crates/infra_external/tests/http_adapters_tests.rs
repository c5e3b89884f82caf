//! HTTP adapter tests against throwaway local servers

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Form, Multipart, Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

use core_kernel::PortError;
use domain_claims::{
    ConsistencyCheckPort, DamageDetectorPort, ImageRef, ImageUpload, ObjectStorePort, Payout,
    PolicyTier, SummaryGeneratorPort,
};
use infra_external::{
    DetectorConfig, GeminiConfig, GeminiSummaryGenerator, HttpDamageDetector, RestObjectStore,
    ServiceAccountTokenSource, StaticToken, StorageConfig, TokenSource, VertexConfig,
    VertexConsistencyChecker,
};

const TEST_PRIVATE_KEY: &str = include_str!("fixtures/test_service_account_key.pem");
const TEST_PUBLIC_KEY: &str = include_str!("fixtures/test_service_account_key.pub.pem");

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn png() -> ImageUpload {
    ImageUpload::new(vec![0x89, b'P', b'N', b'G', 1, 2, 3], "image/png")
}

// ============================================================================
// Object store
// ============================================================================

mod object_store_tests {
    use super::*;

    #[tokio::test]
    async fn test_put_uploads_bytes_under_generated_key() {
        let received: Arc<Mutex<Vec<(String, String, usize)>>> = Arc::default();
        let seen = received.clone();
        let router = Router::new().route(
            "/storage/v1/object/:bucket/:key",
            post(move |Path((bucket, key)): Path<(String, String)>, headers: HeaderMap, body: Bytes| {
                let seen = seen.clone();
                async move {
                    if bearer(&headers).as_deref() != Some("service-key") {
                        return StatusCode::UNAUTHORIZED.into_response();
                    }
                    seen.lock().unwrap().push((bucket, key.clone(), body.len()));
                    Json(json!({"Key": format!("crash-images/{}", key)})).into_response()
                }
            }),
        );
        let base = serve(router).await;
        let store = RestObjectStore::new(StorageConfig::new(&base, "service-key")).unwrap();

        let image_ref = store.put(&png()).await.unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, "crash-images");
        assert_eq!(received[0].1, image_ref.as_str());
        assert_eq!(received[0].2, 7);
        assert!(image_ref.as_str().ends_with(".png"));
    }

    #[tokio::test]
    async fn test_put_server_error_is_unavailable() {
        let router = Router::new().route(
            "/storage/v1/object/:bucket/:key",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "storage down") }),
        );
        let base = serve(router).await;
        let store = RestObjectStore::new(StorageConfig::new(&base, "k")).unwrap();

        let error = store.put(&png()).await.unwrap_err();
        assert!(matches!(error, PortError::ServiceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_put_rejected_quota() {
        let router = Router::new().route(
            "/storage/v1/object/:bucket/:key",
            post(|| async { (StatusCode::PAYLOAD_TOO_LARGE, "quota exceeded") }),
        );
        let base = serve(router).await;
        let store = RestObjectStore::new(StorageConfig::new(&base, "k")).unwrap();

        let error = store.put(&png()).await.unwrap_err();
        assert!(error.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_sign_read_builds_absolute_url() {
        let router = Router::new().route(
            "/storage/v1/object/sign/:bucket/:key",
            post(|Path((bucket, key)): Path<(String, String)>, Json(body): Json<Value>| async move {
                assert_eq!(body["expiresIn"], 3600);
                Json(json!({"signedURL": format!("/object/sign/{}/{}?token=t0k", bucket, key)}))
            }),
        );
        let base = serve(router).await;
        let store = RestObjectStore::new(StorageConfig::new(&base, "k")).unwrap();

        let url = store
            .sign_read(&ImageRef::new("abc.png"), Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(url, format!("{}/storage/v1/object/sign/crash-images/abc.png?token=t0k", base));
    }

    #[tokio::test]
    async fn test_sign_missing_object_is_not_found() {
        let router = Router::new().route(
            "/storage/v1/object/sign/:bucket/:key",
            post(|| async { (StatusCode::BAD_REQUEST, Json(json!({"error": "Object not found"}))) }),
        );
        let base = serve(router).await;
        let store = RestObjectStore::new(StorageConfig::new(&base, "k")).unwrap();

        let error = store
            .sign_read(&ImageRef::new("gone.png"), Duration::from_secs(3600))
            .await
            .unwrap_err();
        assert!(error.is_not_found());
    }
}

// ============================================================================
// Damage detector
// ============================================================================

mod detector_tests {
    use super::*;

    async fn echo_detector(mut multipart: Multipart) -> impl IntoResponse {
        while let Some(field) = multipart.next_field().await.unwrap() {
            if field.name() == Some("file") {
                let bytes = field.bytes().await.unwrap();
                return Json(json!({
                    "damage_type": ["dent", "light broken"],
                    "image": STANDARD.encode(&bytes),
                }))
                .into_response();
            }
        }
        StatusCode::BAD_REQUEST.into_response()
    }

    #[tokio::test]
    async fn test_detect_sends_file_field() {
        let base = serve(Router::new().route("/predict", post(echo_detector))).await;
        let detector = HttpDamageDetector::new(DetectorConfig::new(format!("{}/predict", base))).unwrap();

        let detection = detector.detect(&png()).await.unwrap();
        assert_eq!(detection.labels, vec!["dent", "light broken"]);
        assert_eq!(detection.annotated_image, png().bytes);
    }

    #[tokio::test]
    async fn test_detect_malformed_payload() {
        let router = Router::new().route(
            "/predict",
            post(|| async { Json(json!({"damage_type": ["dent"], "image": 42})) }),
        );
        let base = serve(router).await;
        let detector = HttpDamageDetector::new(DetectorConfig::new(format!("{}/predict", base))).unwrap();

        let error = detector.detect(&png()).await.unwrap_err();
        assert!(matches!(error, PortError::Transformation { .. }));
    }

    #[tokio::test]
    async fn test_detect_server_error() {
        let router = Router::new().route(
            "/predict",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base = serve(router).await;
        let detector = HttpDamageDetector::new(DetectorConfig::new(format!("{}/predict", base))).unwrap();

        assert!(detector.detect(&png()).await.unwrap_err().is_transient());
    }

    #[tokio::test]
    async fn test_detect_times_out() {
        let router = Router::new().route(
            "/predict",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
        );
        let base = serve(router).await;
        let config = DetectorConfig::new(format!("{}/predict", base)).with_timeout(Duration::from_millis(200));
        let detector = HttpDamageDetector::new(config).unwrap();

        assert!(detector.detect(&png()).await.unwrap_err().is_timeout());
    }
}

// ============================================================================
// Consistency checker
// ============================================================================

mod consistency_tests {
    use super::*;

    const STREAM_CHUNKS: [&str; 4] = [
        "[{\"candidates\": [{\"content\": {\"role\": \"model\", \"parts\": [{\"te",
        "xt\": \"The damage is consist\"}]}}]}\n,\n{\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"ent with a rear",
        " collision \\u2014 no exaggeration.\\n\"}]}, \"finishReason\": \"STOP\"}]}",
        "\n]",
    ];

    fn vertex_router(expected_token: &'static str) -> Router {
        Router::new().route(
            "/v1/projects/:project/locations/:location/publishers/google/models/:model_action",
            post(move |headers: HeaderMap, Json(body): Json<Value>| async move {
                if bearer(&headers).as_deref() != Some(expected_token) {
                    return (StatusCode::UNAUTHORIZED, "bad token").into_response();
                }
                let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
                assert!(prompt.contains("[dent, scratch]"));
                let chunks = STREAM_CHUNKS
                    .iter()
                    .map(|c| Ok::<_, Infallible>(Bytes::from_static(c.as_bytes())));
                Body::from_stream(futures::stream::iter(chunks)).into_response()
            }),
        )
    }

    fn labels() -> Vec<String> {
        vec!["dent".to_string(), "scratch".to_string()]
    }

    #[tokio::test]
    async fn test_streamed_verdict_is_accumulated() {
        let base = serve(vertex_router("test-token")).await;
        let checker = VertexConsistencyChecker::new(
            VertexConfig::new("claims-test").with_base_url(&base),
            Arc::new(StaticToken("test-token".to_string())),
        )
        .unwrap();

        let verdict = checker.check("Rear-ended at a light", &labels()).await.unwrap();
        assert_eq!(verdict, "The damage is consistent with a rear collision \u{2014} no exaggeration.");
    }

    #[tokio::test]
    async fn test_rejected_token_is_unauthorized() {
        let base = serve(vertex_router("test-token")).await;
        let checker = VertexConsistencyChecker::new(
            VertexConfig::new("claims-test").with_base_url(&base),
            Arc::new(StaticToken("expired".to_string())),
        )
        .unwrap();

        let error = checker.check("Rear-ended", &labels()).await.unwrap_err();
        assert!(matches!(error, PortError::Unauthorized { .. }));
    }
}

// ============================================================================
// Service-account tokens
// ============================================================================

mod token_tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    #[derive(Debug, serde::Deserialize)]
    struct Assertion {
        iss: String,
        scope: String,
    }

    async fn token_server(expires_in: i64) -> (String, Arc<AtomicUsize>) {
        let exchanges = Arc::new(AtomicUsize::new(0));
        let counter = exchanges.clone();
        let router = Router::new().route(
            "/token",
            post(move |Form(form): Form<HashMap<String, String>>| {
                let counter = counter.clone();
                async move {
                    assert_eq!(form["grant_type"], "urn:ietf:params:oauth:grant-type:jwt-bearer");
                    let key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap();
                    let mut validation = Validation::new(Algorithm::RS256);
                    validation.validate_aud = false;
                    let claims = decode::<Assertion>(&form["assertion"], &key, &validation)
                        .unwrap()
                        .claims;
                    assert_eq!(claims.iss, "claims@test-project.iam.gserviceaccount.com");
                    assert_eq!(claims.scope, "https://www.googleapis.com/auth/cloud-platform");

                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({
                        "access_token": format!("ya29.token-{}", n),
                        "expires_in": expires_in,
                        "token_type": "Bearer",
                    }))
                }
            }),
        );
        let base = serve(router).await;
        (format!("{}/token", base), exchanges)
    }

    fn credentials(token_uri: &str) -> String {
        json!({
            "type": "service_account",
            "project_id": "test-project",
            "client_email": "claims@test-project.iam.gserviceaccount.com",
            "private_key": TEST_PRIVATE_KEY,
            "token_uri": token_uri,
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_token_is_cached() {
        let (token_uri, exchanges) = token_server(3600).await;
        let source =
            ServiceAccountTokenSource::from_json(&credentials(&token_uri), Duration::from_secs(5)).unwrap();

        let first = source.access_token().await.unwrap();
        let second = source.access_token().await.unwrap();

        assert_eq!(first, "ya29.token-0");
        assert_eq!(first, second);
        assert_eq!(exchanges.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_nearly_expired_token_is_refreshed() {
        let (token_uri, exchanges) = token_server(30).await;
        let source =
            ServiceAccountTokenSource::from_json(&credentials(&token_uri), Duration::from_secs(5)).unwrap();

        source.access_token().await.unwrap();
        let second = source.access_token().await.unwrap();

        assert_eq!(second, "ya29.token-1");
        assert_eq!(exchanges.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_exchange_is_unauthorized() {
        let router = Router::new().route(
            "/token",
            post(|| async { (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"}))) }),
        );
        let base = serve(router).await;
        let source = ServiceAccountTokenSource::from_json(
            &credentials(&format!("{}/token", base)),
            Duration::from_secs(5),
        )
        .unwrap();

        let error = source.access_token().await.unwrap_err();
        assert!(matches!(error, PortError::Unauthorized { .. }));
        assert!(error.to_string().contains("invalid_grant"));
    }
}

// ============================================================================
// Summary generator
// ============================================================================

mod summary_tests {
    use super::*;

    fn gemini_router(response: Value) -> Router {
        Router::new().route(
            "/v1beta/models/:model_action",
            post(
                move |Path(model_action): Path<String>,
                      Query(query): Query<HashMap<String, String>>,
                      Json(body): Json<Value>| {
                    let response = response.clone();
                    async move {
                        assert_eq!(model_action, "gemini-1.5-pro:generateContent");
                        if query.get("key").map(String::as_str) != Some("api-key") {
                            return StatusCode::FORBIDDEN.into_response();
                        }
                        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
                        assert!(prompt.starts_with("Summarize this car insurance claim:"));
                        assert!(prompt.ends_with("Estimated payout: $1150"));
                        Json(response).into_response()
                    }
                },
            ),
        )
    }

    async fn summarize(base: &str, key: &str) -> Result<String, PortError> {
        let generator = GeminiSummaryGenerator::new(GeminiConfig::new(key).with_base_url(base)).unwrap();
        generator
            .summarize(
                "Kerb strike",
                &["scratch".to_string(), "crack".to_string(), "tire flat".to_string()],
                PolicyTier::Standard,
                Payout::new(1150),
            )
            .await
    }

    #[tokio::test]
    async fn test_summary_first_text_part() {
        let base = serve(gemini_router(json!({
            "candidates": [{"content": {"parts": [{"text": "Kerb strike with tyre damage."}]}}]
        })))
        .await;

        assert_eq!(summarize(&base, "api-key").await.unwrap(), "Kerb strike with tyre damage.");
    }

    #[tokio::test]
    async fn test_summary_absent_path_is_empty() {
        let base = serve(gemini_router(json!({"promptFeedback": {"blockReason": "OTHER"}}))).await;
        assert_eq!(summarize(&base, "api-key").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_summary_rejected_key() {
        let base = serve(gemini_router(json!({}))).await;
        let error = summarize(&base, "wrong").await.unwrap_err();
        assert!(matches!(error, PortError::Unauthorized { .. }));
    }
}
