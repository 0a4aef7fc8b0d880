//! OAuth2 callback server.
//!
//! `/` links to the Fitbit authorization page. Fitbit redirects back to
//! `/auth?code=...`; the code is exchanged for an access token, the user's
//! profile is returned, and a load runs in the background. The outcome of
//! each load is reported back to [`serve`], which stops on the first failed
//! load so that the process exits with an error.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use url::form_urlencoded;

use fitflux_pipeline::{PipelineError, RunReport};

use crate::app::App;

const TEXT: &str = "text/plain; charset=utf-8";
const HTML: &str = "text/html; charset=utf-8";
const JSON: &str = "application/json";

type LoadResult = Result<RunReport, PipelineError>;

struct ServerState {
    app: App,
    loading: AtomicBool,
    results: mpsc::Sender<LoadResult>,
}

/// Serve the callback endpoints until a load fails or the process is interrupted.
pub async fn serve(app: App) -> Result<()> {
    let addr: SocketAddr = app
        .settings()
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen address '{}'", app.settings().listen_addr))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Listening on {}", addr);
    info!("Visit: {}", app.fitbit().authorize_url());

    let (tx, mut rx) = mpsc::channel(1);
    let state = Arc::new(ServerState {
        app,
        loading: AtomicBool::new(false),
        results: tx,
    });

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let state = state.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let state = state.clone();
                        async move { handle_request(req, state).await }
                    });

                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        debug!("Connection error from {}: {}", peer, e);
                    }
                });
            }
            Some(result) = rx.recv() => {
                let report = result.context("load failed")?;
                info!(
                    "Loaded {} points in {} batches, waiting for the next authorization",
                    report.total_points(),
                    report.total_batches()
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        }
    }
}

async fn handle_request<B>(
    req: Request<B>,
    state: Arc<ServerState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let uri = req.uri().clone();

    let response = match uri.path() {
        "/" => index(state.app.fitbit().authorize_url()),
        "/auth" => {
            let query = uri.query();
            if let Some(reason) = query_param(query, "error") {
                warn!("Authorization denied: {}", reason);
                respond(
                    StatusCode::BAD_REQUEST,
                    TEXT,
                    format!("Authorization denied: {}", reason),
                )
            } else {
                match query_param(query, "code") {
                    Some(code) => authorize(&code, state).await,
                    None => respond(StatusCode::BAD_REQUEST, TEXT, "Missing code parameter"),
                }
            }
        }
        _ => respond(StatusCode::NOT_FOUND, TEXT, "Not Found"),
    };

    Ok(response)
}

async fn authorize(code: &str, state: Arc<ServerState>) -> Response<Full<Bytes>> {
    if state.loading.swap(true, Ordering::SeqCst) {
        return respond(StatusCode::CONFLICT, TEXT, "A load is already running");
    }

    let fitbit = state.app.fitbit();
    let profile = match fitbit.exchange_code(code).await {
        Ok(()) => fitbit.fetch_profile().await,
        Err(e) => Err(e),
    };
    let profile = match profile {
        Ok(profile) => profile,
        Err(e) => {
            state.loading.store(false, Ordering::SeqCst);
            warn!("Authorization failed: {}", e);
            return respond(StatusCode::BAD_GATEWAY, TEXT, format!("Authorization failed: {}", e));
        }
    };

    info!("Authorized, starting load");
    let task_state = state.clone();
    tokio::spawn(async move {
        let result = task_state.app.run().await;
        if let Err(e) = &result {
            error!("Load failed: {}", e);
        }
        task_state.loading.store(false, Ordering::SeqCst);
        let _ = task_state.results.send(result).await;
    });

    respond(StatusCode::OK, JSON, profile)
}

fn index(authorize_url: &str) -> Response<Full<Bytes>> {
    let url = escape_html(authorize_url);
    respond(
        StatusCode::OK,
        HTML,
        format!("Visit: <a href=\"{0}\">{0}</a>\n", url),
    )
}

fn respond(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Find a non-empty query parameter by name, percent-decoded.
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
