//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Response},
    Json,
};
use http::{header, HeaderMap, StatusCode};
use tracing::{debug, error};

use crate::authn::caller::{UserToken, AUTH_HEADER};
use crate::errors::ProvisionerError;
use crate::server::state::ServerState;
use crate::tasks::{Operation, TaskHandle};
use crate::utils::{generate_uuid, version_info};
use openapi_server::models::{
    CreateIcapRequest, DeleteIcapRequest, ErrorResponse, HealthResponse, TaskAcceptedResponse,
    TaskRef, TaskState, TaskStatusResponse, VersionResponse,
};

/// Mount point of the ICAP API
pub const API_PREFIX: &str = "/api/2/inf/icap";

/// Header carrying the caller's correlation token
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Who is calling, and under which correlation token
#[derive(Debug, Clone)]
pub struct Caller {
    pub username: String,
    pub txn_id: String,
}

impl Caller {
    fn from_headers(headers: &HeaderMap, state: &ServerState) -> Result<Self, Response> {
        let raw = headers
            .get(AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Missing X-Auth token"))?;

        let token = UserToken::verify(raw, &state.token).map_err(|e| {
            debug!("Rejected caller token: {}", e);
            error_response(StatusCode::UNAUTHORIZED, &e.to_string())
        })?;

        let txn_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(generate_uuid);

        Ok(Self {
            username: token.claims.username,
            txn_id,
        })
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// URL at which the outcome of `handle` can be retrieved
pub fn status_link(vlab_url: &str, handle: &TaskHandle) -> String {
    format!("<{}{}/task/{}>; rel=status", vlab_url, API_PREFIX, handle)
}

/// Submit `operation` and answer with its task handle
async fn submit(
    state: &ServerState,
    caller: Caller,
    operation: Operation,
    status: StatusCode,
) -> Response {
    match state
        .dispatcher
        .submit(&caller.username, &caller.txn_id, operation)
        .await
    {
        Ok(handle) => {
            let link = status_link(&state.vlab_url, &handle);
            let body = TaskAcceptedResponse {
                user: caller.username,
                content: TaskRef {
                    task_id: handle.to_string(),
                },
            };
            (status, [(header::LINK, link)], Json(body)).into_response()
        }
        Err(e) => {
            error!("Failed to submit task: {}", e);
            let status = match e {
                ProvisionerError::DispatchError(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error_response(status, &e.to_string())
        }
    }
}

/// `GET /api/2/inf/icap`
pub async fn show_handler(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let caller = match Caller::from_headers(&headers, &state) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let operation = Operation::Show {
        username: caller.username.clone(),
    };
    submit(&state, caller, operation, StatusCode::OK).await
}

/// `POST /api/2/inf/icap`
///
/// The caller is authenticated before the body is validated.
pub async fn create_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Result<Json<CreateIcapRequest>, JsonRejection>,
) -> Response {
    let caller = match Caller::from_headers(&headers, &state) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection.into_response(),
    };
    let operation = Operation::Create {
        username: caller.username.clone(),
        name: body.name,
        version: body.image,
        network: body.network,
    };
    submit(&state, caller, operation, StatusCode::ACCEPTED).await
}

/// `DELETE /api/2/inf/icap`
pub async fn delete_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Result<Json<DeleteIcapRequest>, JsonRejection>,
) -> Response {
    let caller = match Caller::from_headers(&headers, &state) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection.into_response(),
    };
    let operation = Operation::Delete {
        username: caller.username.clone(),
        name: body.name,
    };
    submit(&state, caller, operation, StatusCode::OK).await
}

/// `GET /api/2/inf/icap/image`
pub async fn image_handler(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let caller = match Caller::from_headers(&headers, &state) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    submit(&state, caller, Operation::Image, StatusCode::OK).await
}

/// `GET /api/2/inf/icap/task/{id}`
///
/// Tasks belonging to another user look the same as unknown ones.
pub async fn task_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(task_id): Path<String>,
) -> Response {
    let caller = match Caller::from_headers(&headers, &state) {
        Ok(caller) => caller,
        Err(response) => return response,
    };

    let handle = TaskHandle::from(task_id);
    let record = match state.results.get(&handle) {
        Some(record) if record.user == caller.username => record,
        _ => return error_response(StatusCode::NOT_FOUND, "No such task"),
    };

    let status = match record.state {
        TaskState::Pending => StatusCode::ACCEPTED,
        TaskState::Success | TaskState::Failure => StatusCode::OK,
    };
    let body = TaskStatusResponse {
        user: record.user,
        task_id: handle.to_string(),
        state: record.state,
        result: record.result,
        failure: record.failure,
    };
    (status, Json(body)).into_response()
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "vlab-icap".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}
