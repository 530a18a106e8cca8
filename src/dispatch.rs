use axum::{
    Json,
    body::Bytes,
    extract::{Request, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use serde::Serialize;
use serde_json::{Value, json};
use std::{
    any::Any, collections::HashMap, future::Future, panic::AssertUnwindSafe, pin::Pin, sync::Arc,
};

use crate::{
    AppState,
    auth::RequestContext,
    contract::{ContractRegistry, RegistryError, RouteContract, RouteNotFound},
    identity::{self, Identity},
    models::MessageResponse,
    policy::{self, AccessDecision, DenyReason},
    repository::RepositoryError,
    storage::StorageError,
    validation::{self, ValidatedRequest, ValidationError},
};

// --- Handler Boundary ---

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Reply
///
/// What a business handler answers: a status and a JSON body. The dispatcher checks the
/// pair against the route contract before it reaches the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Result<Self, HandlerError> {
        Ok(Self {
            status,
            body: serde_json::to_value(body)?,
        })
    }

    pub fn ok<T: Serialize>(body: &T) -> Result<Self, HandlerError> {
        Self::json(StatusCode::OK, body)
    }

    pub fn created<T: Serialize>(body: &T) -> Result<Self, HandlerError> {
        Self::json(StatusCode::CREATED, body)
    }

    /// An application-level refusal with a [`MessageResponse`] body.
    pub fn message(status: StatusCode, message: &str) -> Result<Self, HandlerError> {
        Self::json(status, &MessageResponse::new(message))
    }
}

/// Failures inside business logic. All of them surface as `500 handler_failure`.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to encode or decode a body: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("validated request is missing '{0}'")]
    MissingInput(&'static str),
    #[error("handler panicked: {0}")]
    Panicked(String),
}

pub type HandlerResult = Result<Reply, HandlerError>;

/// Handler
///
/// Business logic bound to exactly one contract. Any async fn with the signature
/// `(AppState, ValidatedRequest, Identity) -> HandlerResult` is a handler.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, state: AppState, request: ValidatedRequest, identity: Identity)
    -> BoxFuture<HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(AppState, ValidatedRequest, Identity) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(
        &self,
        state: AppState,
        request: ValidatedRequest,
        identity: Identity,
    ) -> BoxFuture<HandlerResult> {
        Box::pin(self(state, request, identity))
    }
}

/// A contract declared together with the handler that implements it.
pub struct RouteBinding {
    pub contract: RouteContract,
    pub handler: Arc<dyn Handler>,
}

impl RouteBinding {
    pub fn new(contract: RouteContract, handler: impl Handler) -> Self {
        Self {
            contract,
            handler: Arc::new(handler),
        }
    }
}

// --- Requests and Responses ---

/// The transport could not hand over the body (too large or broken stream).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyRejected {
    pub limit: usize,
    pub reason: String,
}

/// RawRequest
///
/// An HTTP request as it arrives at the core, before any matching or validation.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub uri: Uri,
    pub body: Result<Bytes, BodyRejected>,
    pub context: RequestContext,
}

impl RawRequest {
    pub fn new(method: Method, uri: Uri, body: impl Into<Bytes>, context: RequestContext) -> Self {
        Self {
            method,
            uri,
            body: Ok(body.into()),
            context,
        }
    }
}

/// TypedResponse
///
/// The terminal result of every request: either a contract-conforming reply or a
/// rejection body.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl IntoResponse for TypedResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Rejection
///
/// Every way the pipeline can stop short of a contract-conforming reply.
#[derive(Debug)]
pub enum Rejection {
    RouteNotFound(RouteNotFound),
    Validation(ValidationError),
    Denied(DenyReason),
    ContractViolation {
        route: &'static str,
        status: StatusCode,
        detail: String,
    },
    HandlerFailure {
        route: &'static str,
        error: HandlerError,
    },
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::RouteNotFound(_) => StatusCode::NOT_FOUND,
            Rejection::Validation(_) => StatusCode::BAD_REQUEST,
            Rejection::Denied(DenyReason::Unauthenticated) => StatusCode::UNAUTHORIZED,
            Rejection::Denied(DenyReason::InsufficientRole | DenyReason::SystemOffline) => {
                StatusCode::FORBIDDEN
            }
            Rejection::ContractViolation { .. } | Rejection::HandlerFailure { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Rejection::RouteNotFound(_) => "route_not_found",
            Rejection::Validation(_) => "validation_error",
            Rejection::Denied(reason) => reason.code(),
            Rejection::ContractViolation { .. } => "contract_violation",
            Rejection::HandlerFailure { .. } => "handler_failure",
        }
    }

    /// Client-facing body. Internal detail of 500s stays in the logs.
    fn body(&self) -> Value {
        let code = self.code();
        match self {
            Rejection::RouteNotFound(e) => json!({ "error": code, "message": e.to_string() }),
            Rejection::Validation(e) => json!({
                "error": code,
                "message": "request does not match the route contract",
                "issues": e.issues,
            }),
            Rejection::Denied(DenyReason::Unauthenticated) => {
                json!({ "error": code, "message": "authentication required" })
            }
            Rejection::Denied(DenyReason::InsufficientRole) => {
                json!({ "error": code, "message": "your role may not access this route" })
            }
            Rejection::Denied(DenyReason::SystemOffline) => json!({
                "error": code,
                "message": "the system is offline; only public routes are available",
            }),
            Rejection::ContractViolation { .. } => json!({
                "error": code,
                "message": "the server produced a response outside its contract",
            }),
            Rejection::HandlerFailure { .. } => {
                json!({ "error": code, "message": "the request could not be completed" })
            }
        }
    }

    fn log(&self) {
        match self {
            Rejection::RouteNotFound(e) => tracing::debug!(error = %e, "rejected: no route"),
            Rejection::Validation(e) => tracing::debug!(error = %e, "rejected: invalid request"),
            Rejection::Denied(reason) => tracing::info!(reason = reason.code(), "rejected: access denied"),
            Rejection::ContractViolation {
                route,
                status,
                detail,
            } => tracing::error!(
                route,
                status = status.as_u16(),
                detail = %detail,
                "handler reply violates its contract"
            ),
            Rejection::HandlerFailure { route, error } => {
                tracing::error!(route, error = %error, "handler failed")
            }
        }
    }

    pub fn into_typed(self) -> TypedResponse {
        self.log();
        TypedResponse {
            status: self.status(),
            body: self.body(),
        }
    }
}

// --- Dispatcher ---

/// Dispatcher
///
/// Runs every request through the fixed pipeline
/// `Received → Matched → Validated → Identified → Authorized → Dispatched → Responded`,
/// leaving early with a [`Rejection`] after matching, validation, or authorization.
/// Holds no per-request state; one instance serves all requests concurrently.
pub struct Dispatcher {
    registry: ContractRegistry,
    handlers: HashMap<&'static str, Arc<dyn Handler>>,
    state: AppState,
}

impl Dispatcher {
    pub fn new(bindings: Vec<RouteBinding>, state: AppState) -> Result<Self, RegistryError> {
        let mut handlers = HashMap::with_capacity(bindings.len());
        let mut contracts = Vec::with_capacity(bindings.len());
        for binding in bindings {
            if handlers
                .insert(binding.contract.name, binding.handler)
                .is_some()
            {
                return Err(RegistryError::DuplicateName(binding.contract.name));
            }
            contracts.push(binding.contract);
        }

        let registry = ContractRegistry::new(contracts)?;
        tracing::info!(routes = registry.len(), "dispatcher ready");
        Ok(Self {
            registry,
            handlers,
            state,
        })
    }

    pub fn registry(&self) -> &ContractRegistry {
        &self.registry
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// dispatch
    ///
    /// Always terminates in a status and body; no failure escapes as a panic or error.
    pub async fn dispatch(&self, request: RawRequest) -> TypedResponse {
        match self.run(request).await {
            Ok(response) => {
                tracing::debug!(status = response.status.as_u16(), "responded");
                response
            }
            Err(rejection) => rejection.into_typed(),
        }
    }

    async fn run(&self, request: RawRequest) -> Result<TypedResponse, Rejection> {
        let matched = self
            .registry
            .lookup(&request.method, request.uri.path())
            .map_err(Rejection::RouteNotFound)?;
        let contract = matched.contract;
        tracing::debug!(route = contract.name, "matched");

        let body = request.body.map_err(|rejected| {
            Rejection::Validation(ValidationError::single(
                "body",
                format!("readable body of at most {} bytes", rejected.limit),
                Some(rejected.reason),
            ))
        })?;
        let validated = validation::validate(contract, &matched.params, &request.uri, &body)
            .map_err(Rejection::Validation)?;
        tracing::debug!(route = contract.name, "validated");

        let identity = identity::resolve(&request.context);
        tracing::debug!(route = contract.name, user_id = ?identity.id(), "identified");

        let mode = self.state.mode.current();
        if let AccessDecision::Deny(reason) = policy::evaluate(&contract.access, &identity, mode) {
            return Err(Rejection::Denied(reason));
        }
        tracing::debug!(route = contract.name, "authorized");

        let Some(handler) = self.handlers.get(contract.name) else {
            return Err(Rejection::ContractViolation {
                route: contract.name,
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: "no handler bound to contract".to_string(),
            });
        };

        // Panics inside a handler surface as handler_failure.
        let outcome = AssertUnwindSafe(async {
            handler.call(self.state.clone(), validated, identity).await
        })
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload.as_ref()))));

        let reply = outcome.map_err(|error| Rejection::HandlerFailure {
            route: contract.name,
            error,
        })?;
        tracing::debug!(route = contract.name, status = reply.status.as_u16(), "dispatched");

        check_reply(contract, reply)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// check_reply
///
/// The reply status must be declared by the contract and the body must match the schema
/// declared for that status.
pub fn check_reply(contract: &RouteContract, reply: Reply) -> Result<TypedResponse, Rejection> {
    let Some(schema) = contract.response_schema(reply.status) else {
        return Err(Rejection::ContractViolation {
            route: contract.name,
            status: reply.status,
            detail: format!("status {} is not declared", reply.status.as_u16()),
        });
    };

    validation::validate_value(schema, &reply.body, "response").map_err(|e| {
        Rejection::ContractViolation {
            route: contract.name,
            status: reply.status,
            detail: format!("{}: {:?}", e, e.issues),
        }
    })?;

    Ok(TypedResponse {
        status: reply.status,
        body: reply.body,
    })
}

/// serve_request
///
/// The axum fallback that adapts an HTTP request into a [`RawRequest`]. The request
/// context comes from the authentication middleware; without it the caller is anonymous.
pub async fn serve_request(
    State(dispatcher): State<Arc<Dispatcher>>,
    request: Request,
) -> TypedResponse {
    let (parts, body) = request.into_parts();
    let limit = dispatcher.state.config.max_body_bytes;

    let body = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| BodyRejected {
            limit,
            reason: e.to_string(),
        });

    let context = parts
        .extensions
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();

    dispatcher
        .dispatch(RawRequest {
            method: parts.method,
            uri: parts.uri,
            body,
            context,
        })
        .await
}
