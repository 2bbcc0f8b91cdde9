//! API Server Module
//!
//! This module implements a JSON-RPC server over the dispatch batch. It
//! provides a single HTTP endpoint through which the depot opens and closes
//! the day's batch, adds consignments and inspects the transport log.

use crate::{
    batch::BatchAccumulator,
    config::ApiConfig,
    error::DispatchError,
    transport::InMemoryTransportLog,
    Consignment,
};
use axum::{Router, routing::post, Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn, error};

/// Error code for domain errors raised by the batch
const DOMAIN_ERROR: i32 = -32000;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

/// Shared application state that is accessible across all request handlers
///
/// - `batch`: The dispatch batch the API drives
/// - `log`: The transport log the batch's dispatcher writes to
#[derive(Clone)]
pub struct AppState {
    pub batch: Arc<BatchAccumulator>,
    pub log: Arc<InMemoryTransportLog>,
}

/// The main API server struct
///
/// Encapsulates the listening address and application state.
pub struct Server {
    config: ApiConfig,
    state: AppState,
}

impl Server {
    /// Creates a new API server instance
    ///
    /// # Arguments
    /// * `config` - Host and port to listen on
    /// * `state` - The batch and transport log to serve
    pub fn new(config: ApiConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Starts the API server and begins listening for incoming requests
    ///
    /// # Returns
    /// `Ok(())` when the server shuts down, or an error if binding fails
    pub async fn start(self) -> anyhow::Result<()> {
        let app = router(self.state);

        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Build the router with a single POST endpoint at "/"
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_rpc))
        .with_state(state)
}

/// JSON-RPC 2.0 request structure
///
/// `params` may be omitted for methods that take none.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    id: Value,
}

/// JSON-RPC 2.0 response structure
///
/// Either `result` or `error` will be populated, but not both.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Value,
}

/// JSON-RPC error object
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    fn success<T: Serialize>(id: Value, result: &T) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self {
                jsonrpc: "2.0".to_string(),
                result: Some(value),
                error: None,
                id,
            },
            Err(e) => {
                error!("Failed to serialize result: {}", e);
                Self::failure(id, INTERNAL_ERROR, format!("Internal error: {}", e))
            }
        }
    }

    fn failure(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError { code, message }),
            id,
        }
    }
}

/// Parameters naming a single courier
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourierParams {
    courier_ref: String,
}

/// Deserialize request parameters, mapping failures to an invalid params response
fn parse_params<T: for<'de> Deserialize<'de>>(request: &JsonRpcRequest) -> Result<T, JsonRpcResponse> {
    serde_json::from_value(request.params.clone()).map_err(|e| {
        warn!("Invalid params for {}: {}", request.method, e);
        JsonRpcResponse::failure(request.id.clone(), INVALID_PARAMS, format!("Invalid params: {}", e))
    })
}

/// Main RPC request handler
///
/// Routes the request to the appropriate batch operation based on the
/// method name.
///
/// # Arguments
/// * `state` - Shared application state (injected by Axum)
/// * `request` - The JSON-RPC request
///
/// # Returns
/// A JSON-RPC response (either success or error)
async fn handle_rpc(
    State(state): State<AppState>,
    Json(request): Json<JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    info!("Received RPC request: {}", request.method);

    let response = match request.method.as_str() {
        "startBatch" => {
            let batch_date = state.batch.open().await;
            JsonRpcResponse::success(request.id, &json!({ "batchDate": batch_date }))
        }
        "endBatch" => {
            let report = state.batch.close().await;
            JsonRpcResponse::success(request.id, &report)
        }
        "addConsignment" => handle_add_consignment(&state, request).await,
        "recordConsignment" => match parse_params::<Consignment>(&request) {
            Ok(consignment) => {
                state.batch.add_consignment(consignment).await;
                JsonRpcResponse::success(request.id, &Value::Null)
            }
            Err(response) => response,
        },
        "getConsignmentsSoFar" => match parse_params::<CourierParams>(&request) {
            Ok(params) => {
                let consignments = state.batch.consignments_so_far(&params.courier_ref).await;
                JsonRpcResponse::success(request.id, &consignments)
            }
            Err(response) => response,
        },
        "cancelTransport" => match parse_params::<CourierParams>(&request) {
            Ok(params) => {
                let cancelled = state.batch.cancel_transport(&params.courier_ref).await;
                JsonRpcResponse::success(request.id, &json!({ "cancelled": cancelled }))
            }
            Err(response) => response,
        },
        "batchStatus" => {
            let status = state.batch.status().await;
            JsonRpcResponse::success(request.id, &status)
        }
        "getTransportLog" => JsonRpcResponse::success(request.id, &state.log.entries()),
        _ => JsonRpcResponse::failure(request.id, METHOD_NOT_FOUND, "Method not found".to_string()),
    };

    Json(response)
}

/// Handles the "addConsignment" RPC method
///
/// Allocates a new consignment number for the named courier. Batch usage
/// errors are returned as domain errors rather than dropped.
async fn handle_add_consignment(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    let params: CourierParams = match parse_params(&request) {
        Ok(params) => params,
        Err(response) => return response,
    };

    match state.batch.allocate_consignment(&params.courier_ref).await {
        Ok(consignment) => {
            info!(
                courier = %params.courier_ref,
                number = consignment.consignment_number(),
                "Consignment added"
            );
            JsonRpcResponse::success(request.id, &consignment)
        }
        Err(e) => {
            if let DispatchError::GenerationExhausted { .. } = e {
                error!(courier = %params.courier_ref, "{}", e);
            } else {
                warn!(courier = %params.courier_ref, "Consignment rejected: {}", e);
            }
            JsonRpcResponse::failure(request.id, DOMAIN_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::FixedClock,
        config::{BatchConfig, TransportConfig},
        courier::{Courier, fixed_sequence},
        registry::CourierRegistry,
        transport::{TransportDispatcher, testing::{RecordingFileTransfer, RecordingMailer}},
        TransportCredentials, TransportMethod,
    };
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::NaiveDate;
    use tower::ServiceExt;

    fn app(scratch: &tempfile::TempDir) -> Router {
        let credentials: TransportCredentials = [("to", "a@b.com"), ("from", "c@d.com")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut registry = CourierRegistry::new();
        registry.register(
            "RM",
            Courier::new(
                "Royal Mail",
                TransportMethod::Email,
                credentials,
                fixed_sequence(["1111111111-GB", "2222222222-GB"]),
            ),
        );

        let log = Arc::new(InMemoryTransportLog::new());
        let dispatcher = TransportDispatcher::new(
            Arc::new(RecordingMailer::new()),
            Arc::new(RecordingFileTransfer::new()),
            log.clone(),
            scratch.path(),
            &TransportConfig { timeout_ms: 1_000, max_retries: 0, retry_backoff_ms: 1 },
        );
        let batch = BatchAccumulator::new(
            Arc::new(registry),
            Arc::new(dispatcher),
            Arc::new(FixedClock(NaiveDate::from_ymd_opt(2020, 10, 21).unwrap())),
            BatchConfig { scratch_dir: scratch.path().to_path_buf(), max_number_attempts: 5 },
        );

        router(AppState { batch: Arc::new(batch), log })
    }

    async fn call(app: &Router, method: &str, params: Value) -> Value {
        let body = json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": 1 });
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_add_before_start_is_domain_error() {
        let scratch = tempfile::tempdir().unwrap();
        let app = app(&scratch);

        let response = call(&app, "addConsignment", json!({ "courierRef": "RM" })).await;

        assert_eq!(response["error"]["code"], DOMAIN_ERROR);
        assert!(response["error"]["message"].as_str().unwrap().contains("batch has not started"));
        assert!(response.get("result").is_none());
    }

    #[tokio::test]
    async fn test_unknown_courier_is_domain_error() {
        let scratch = tempfile::tempdir().unwrap();
        let app = app(&scratch);
        call(&app, "startBatch", Value::Null).await;

        let response = call(&app, "addConsignment", json!({ "courierRef": "DHL" })).await;

        assert_eq!(response["error"]["code"], DOMAIN_ERROR);
        assert!(response["error"]["message"].as_str().unwrap().contains("courier does not exist"));
    }

    #[tokio::test]
    async fn test_batch_round_trip() {
        let scratch = tempfile::tempdir().unwrap();
        let app = app(&scratch);

        let started = call(&app, "startBatch", Value::Null).await;
        assert_eq!(started["result"]["batchDate"], "2020-10-21");

        let added = call(&app, "addConsignment", json!({ "courierRef": "RM" })).await;
        assert_eq!(added["result"]["consignmentNumber"], "1111111111-GB");

        call(
            &app,
            "recordConsignment",
            json!({ "courierRef": "RM", "consignmentNumber": "9999999999-GB" }),
        )
        .await;

        let so_far = call(&app, "getConsignmentsSoFar", json!({ "courierRef": "RM" })).await;
        assert_eq!(so_far["result"].as_array().unwrap().len(), 2);

        let status = call(&app, "batchStatus", Value::Null).await;
        assert_eq!(status["result"]["state"], "open");

        let report = call(&app, "endBatch", Value::Null).await;
        assert_eq!(report["result"]["receipts"][0]["courierRef"], "RM");
        assert_eq!(report["result"]["receipts"][0]["outcome"]["status"], "delivered");

        let log = call(&app, "getTransportLog", Value::Null).await;
        let entries = log["result"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["kind"], "success");
    }

    #[tokio::test]
    async fn test_end_without_open_batch_returns_null() {
        let scratch = tempfile::tempdir().unwrap();
        let app = app(&scratch);

        let response = call(&app, "endBatch", Value::Null).await;

        assert_eq!(response["result"], Value::Null);
        assert!(response.get("error").is_none());
    }

    #[tokio::test]
    async fn test_cancel_without_transport_in_flight() {
        let scratch = tempfile::tempdir().unwrap();
        let app = app(&scratch);

        let response = call(&app, "cancelTransport", json!({ "courierRef": "RM" })).await;

        assert_eq!(response["result"]["cancelled"], false);
    }

    #[tokio::test]
    async fn test_missing_params_are_rejected() {
        let scratch = tempfile::tempdir().unwrap();
        let app = app(&scratch);

        let response = call(&app, "getConsignmentsSoFar", json!({})).await;

        assert_eq!(response["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let scratch = tempfile::tempdir().unwrap();
        let app = app(&scratch);

        let response = call(&app, "sendTransaction", Value::Null).await;

        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(response["id"], 1);
    }
}
