//! reqlog demo: a few JSON endpoints behind the trace middleware.
//!
//! Run with:
//!   cargo run --example basic
//!   REQLOG_JSON=1 REQLOG_VERBOSE=1 cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/healthz                 → INFO
//!   curl http://localhost:3000/users/42                → INFO
//!   curl http://localhost:3000/users/0                 → WARN (404)
//!   curl -X POST http://localhost:3000/users           → ERROR (400, with comment)
//!   curl -X POST http://localhost:3000/users -d '{}'   → INFO (201)

use std::sync::Arc;

use reqlog::{
    Logger, LoggerConfig, Request, Response, Router, Server, Severity, StatusCode, Trace, fields,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), reqlog::Error> {
    // Framework events (listening, shutdown) go through tracing; keep the
    // HTTP stack's own chatter down.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,h2=warn")),
        )
        .init();

    let logger = Arc::new(Logger::new(LoggerConfig::from_env()?)?);

    let users = Arc::clone(&logger);
    let app = Router::new()
        .get("/healthz", |_: Request| async { "ok" })
        .get("/users/{id}", move |req: Request| {
            let logger = Arc::clone(&users);
            async move { get_user(&logger, req) }
        })
        .post("/users", create_user);

    let served = Server::bind("0.0.0.0:3000")
        .trace(Trace::new(Arc::clone(&logger)))
        .serve(app)
        .await;

    logger.flush()?;
    served
}

// GET /users/{id}
fn get_user(logger: &Logger, req: Request) -> Response {
    let log = logger.scoped(req.context());
    let id = req.param("id").unwrap_or("0");
    log.log(Severity::Debug, "looking up user", fields!["id" => id]);

    if id == "0" {
        return Response::status(StatusCode::NOT_FOUND);
    }
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes())
}

// POST /users
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        req.annotate("empty request body");
        return Response::status(StatusCode::BAD_REQUEST);
    }

    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(br#"{"id":"99","name":"new_user"}"#.to_vec())
}
