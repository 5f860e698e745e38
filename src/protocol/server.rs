//! Site HTTP Server
//!
//! One engine behind an axum router. Other sites (or a client) POST XML
//! fragments to `/query`; the site admits them, evaluates whatever became
//! ready, and pushes partial results on to the sites they are addressed to.
//!
//! ## Endpoints
//!
//! - `POST /query`: XML relation tree, answered with [`QueryAccepted`]
//! - `GET /results`: final results collected so far, as [`WireTable`]s
//! - `GET /health`: liveness plus site name
//!
//! ## Design
//!
//! - Engine access is synchronous and short; the lock is never held across
//!   an await point
//! - Outgoing fragments go through the blocking [`Transport`] on
//!   `spawn_blocking`, so a slow peer never stalls the executor
//! - Results addressed to this site are fed straight back into the engine
//!   instead of looping through HTTP

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use super::wire::{HealthDto, QueryAccepted, WireTable};
use super::xml;
use crate::config::HttpConfig;
use crate::distributed::Transport;
use crate::engine::Engine;
use crate::execution::ExecutionError;
use crate::relation::Relation;
use crate::table::Table;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Handler error carrying its HTTP status.
#[derive(Debug)]
pub struct RestError {
    pub status: StatusCode,
    pub error: ApiError,
}

impl RestError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiError {
                code: "BAD_REQUEST".to_owned(),
                message: message.into(),
            },
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: ApiError {
                code: "INTERNAL_ERROR".to_owned(),
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.error
        }));
        (self.status, body).into_response()
    }
}

impl From<ExecutionError> for RestError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::Parse(_)
            | ExecutionError::Traversal(_)
            | ExecutionError::ArityMismatch { .. }
            | ExecutionError::UnknownAttribute(_)
            | ExecutionError::InvalidCondition(_) => RestError::bad_request(err.to_string()),
            _ => RestError::internal(err.to_string()),
        }
    }
}

/// Shared state of one site server.
pub struct SiteState<T> {
    engine: Mutex<Engine>,
    results: Mutex<Vec<Table>>,
    transport: Arc<T>,
}

impl<T: Transport> SiteState<T> {
    pub fn new(engine: Engine, transport: T) -> Self {
        SiteState {
            engine: Mutex::new(engine),
            results: Mutex::new(Vec::new()),
            transport: Arc::new(transport),
        }
    }

    pub fn site(&self) -> String {
        self.engine.lock().site().to_owned()
    }

    /// Final results collected so far.
    pub fn results(&self) -> Vec<Table> {
        self.results.lock().clone()
    }

    /// Admit `query` and run the engine until nothing addressed to this
    /// site is left.
    ///
    /// Only a rejected `query` is an error. Queries that fail to evaluate
    /// afterwards are dropped and counted.
    fn admit(&self, query: Relation) -> Result<Admitted, ExecutionError> {
        let mut engine = self.engine.lock();
        engine.add_query(query)?;

        let mut admitted = Admitted::default();
        loop {
            let processed = engine.process_pending_queries();
            admitted.failed += processed.failures.len();
            if processed.results.is_empty() {
                break;
            }
            for result in processed.results {
                match result {
                    Relation::Variable(vt) if vt.site() == engine.site() => {
                        if let Err(e) = engine.add_query(vt.into()) {
                            warn!(site = %engine.site(), error = %e, "result_undeliverable");
                            admitted.failed += 1;
                        }
                    }
                    Relation::Variable(vt) => admitted.outgoing.push((vt.site().to_owned(), vt.into())),
                    Relation::Table(table) => {
                        admitted.finals += 1;
                        self.results.lock().push(table);
                    }
                    other => warn!(site = %engine.site(), result = %other, "result_discarded"),
                }
            }
        }
        admitted.pending = engine.pending_queries().len();
        Ok(admitted)
    }
}

/// What one admission left behind.
#[derive(Default)]
struct Admitted {
    /// Fragments bound for other sites.
    outgoing: Vec<(String, Relation)>,
    finals: usize,
    failed: usize,
    pending: usize,
}

/// Builds the router for one site.
pub fn create_router<T: Transport + 'static>(state: Arc<SiteState<T>>) -> Router {
    Router::new()
        .route("/query", post(submit_query::<T>))
        .route("/results", get(results::<T>))
        .route("/health", get(health::<T>))
        .layer(Extension(state))
}

async fn submit_query<T: Transport + 'static>(
    Extension(state): Extension<Arc<SiteState<T>>>,
    body: String,
) -> Result<Json<QueryAccepted>, RestError> {
    let query = xml::parse(&body).map_err(|e| RestError::bad_request(e.to_string()))?;
    let admitted = state.admit(query)?;
    let outgoing = admitted.outgoing;

    let transport = Arc::clone(&state.transport);
    let forwarded = tokio::task::spawn_blocking(move || {
        outgoing
            .iter()
            .filter(|(site, fragment)| match transport.send(site, fragment) {
                Ok(()) => true,
                Err(e) => {
                    warn!(site = %site, error = %e, "fragment_undeliverable");
                    false
                }
            })
            .count()
    })
    .await
    .map_err(|e| RestError::internal(format!("forwarding task failed: {e}")))?;

    Ok(Json(QueryAccepted {
        site: state.site(),
        pending: admitted.pending,
        forwarded,
        results: admitted.finals,
        failed: admitted.failed,
    }))
}

async fn results<T: Transport + 'static>(Extension(state): Extension<Arc<SiteState<T>>>) -> Json<Vec<WireTable>> {
    Json(state.results().iter().map(WireTable::from).collect())
}

async fn health<T: Transport + 'static>(Extension(state): Extension<Arc<SiteState<T>>>) -> Json<HealthDto> {
    Json(HealthDto {
        status: "healthy".to_owned(),
        site: state.site(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
    })
}

/// Serve `state` until ctrl-c.
pub async fn serve<T: Transport + 'static>(state: Arc<SiteState<T>>, config: &HttpConfig) -> anyhow::Result<()> {
    let site = state.site();
    let app = create_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let socket = tokio::net::TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    let listener = socket.listen(1024)?;
    info!(site = %site, addr = %addr, "site_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!(site = %site, "site_stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "shutdown_signal_unavailable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionResult;
    use crate::condition::Condition;
    use crate::relation::VariableTable;
    use crate::value::{Attribute, Schema, Value};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<(String, Relation)>>,
    }

    impl Transport for Recording {
        fn send(&self, site: &str, relation: &Relation) -> ExecutionResult<()> {
            self.sent.lock().push((site.to_owned(), relation.clone()));
            Ok(())
        }
    }

    fn state() -> Arc<SiteState<Recording>> {
        let mut a = Table::new("A", Schema::parse("a,b"));
        a.put_values(["0", "1"]).unwrap();
        a.put_values(["2", "3"]).unwrap();
        let mut engine = Engine::new("Site 1");
        engine.put_relation("A", a);
        Arc::new(SiteState::new(engine, Recording::default()))
    }

    async fn post_xml(app: Router, xml: String) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/query")
            .body(Body::from(xml))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(state());
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let dto: HealthDto = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(dto.site, "Site 1");
    }

    #[tokio::test]
    async fn test_local_query_becomes_result() {
        let state = state();
        let query = Relation::projection(Schema::parse("A.a"), VariableTable::new("A"));
        let (status, body) = post_xml(create_router(Arc::clone(&state)), xml::to_xml_string(&query)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"], 1);
        assert_eq!(body["forwarded"], 0);
        assert_eq!(state.results()[0].len(), 2);
    }

    #[tokio::test]
    async fn test_fragment_forwarded_to_its_site() {
        let state = state();
        let fragment = VariableTable::wrapping("alpha", "Site 2", VariableTable::new("A"));
        let (status, body) = post_xml(create_router(Arc::clone(&state)), xml::to_xml_string(&fragment.into())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["forwarded"], 1);
        let sent = state.transport.sent.lock();
        assert_eq!(sent[0].0, "Site 2");
        assert_eq!(sent[0].1.cardinality().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_query_does_not_drop_forwarded_fragment() {
        let state = state();
        let fragment = VariableTable::wrapping("alpha", "Site 2", VariableTable::at("beta", "Site 1"));
        post_xml(create_router(Arc::clone(&state)), xml::to_xml_string(&fragment.into())).await;
        let broken = Relation::selection(
            Condition::equals(Attribute::parse("B.zz"), Value::from("1")),
            VariableTable::at("beta", "Site 1"),
        );
        let (_, body) = post_xml(create_router(Arc::clone(&state)), xml::to_xml_string(&broken)).await;
        assert_eq!(body["pending"], 2);

        let mut b = Table::new("B", Schema::parse("a,b"));
        b.put_values(["5", "6"]).unwrap();
        let data = VariableTable::wrapping("beta", "Site 1", b);
        let (status, body) = post_xml(create_router(Arc::clone(&state)), xml::to_xml_string(&data.into())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["forwarded"], 1);
        assert_eq!(body["failed"], 1);
        assert_eq!(body["pending"], 0);
        let sent = state.transport.sent.lock();
        assert_eq!(sent[0].0, "Site 2");
        assert_eq!(sent[0].1.cardinality().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bad_xml_is_400() {
        let (status, body) = post_xml(create_router(state()), "<operand><bogus/></operand>".to_owned()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}
