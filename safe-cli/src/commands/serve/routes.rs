//! HTTP routes
//!
//! `/safe/` and the paths below it take the form actions, either as a query
//! string or as a multipart POST. Everything else is a static file. Lock
//! exchanges block on the serial port, so they run on the blocking pool;
//! `open` streams its progress lines through a channel as they arrive.

use std::collections::HashMap;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::header::{CONNECTION, CONTENT_DISPOSITION, CONTENT_TYPE, LOCATION};
use axum::http::{HeaderValue, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Router, middleware};
use log::{debug, error};
use safe_link::{ByteStream, CancelToken};
use safe_server::{LockController, PASSWORD_IMAGE_CONTENT_TYPE, PasswordImage};
use tokio::sync::{mpsc, oneshot};

use super::action::{
    ActionReply, FILE_FIELD, FormInput, SafeAction, html_line, run_action, run_open,
};
use super::auth::{self, Credentials};
use super::static_files;

/// Form actions are served here and on every path below it
pub const FORM_PATH: &str = "/safe/";

/// Largest accepted form body, uploads included
pub const MAX_FORM_BYTES: usize = 1 << 20;

/// Padding sent ahead of the `open` stream so browsers start rendering
const OPEN_PREAMBLE_LEN: usize = 4096;

/// Progress lines buffered between the serial reader and the response body
const OPEN_CHANNEL_CAPACITY: usize = 16;

pub type SharedController = Arc<LockController<Box<dyn ByteStream>>>;

#[derive(Clone)]
pub struct AppState {
    pub controller: SharedController,
    /// Required credentials, if any
    pub auth: Option<Credentials>,
    pub html_dir: PathBuf,
    pub open_grace: Duration,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/safe", any(redirect_to_form))
        .route(FORM_PATH, get(safe_query).post(safe_multipart))
        .route("/safe/*rest", get(safe_query).post(safe_multipart))
        .fallback(static_files::serve)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ))
        .layer(DefaultBodyLimit::max(MAX_FORM_BYTES))
        .layer(middleware::map_response(close_connection))
        .with_state(state)
}

async fn close_connection(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(CONNECTION, HeaderValue::from_static("close"));
    response
}

/// `/safe` without the trailing slash moves to `/safe/`, keeping the query
async fn redirect_to_form(uri: Uri) -> Response {
    let target = match uri.query() {
        Some(query) => format!("{FORM_PATH}?{query}"),
        None => FORM_PATH.to_string(),
    };
    (StatusCode::MOVED_PERMANENTLY, [(LOCATION, target)]).into_response()
}

async fn safe_query(
    State(state): State<AppState>,
    Query(fields): Query<HashMap<String, String>>,
) -> Response {
    dispatch(state, SafeAction::from_form(FormInput::new(fields))).await
}

async fn safe_multipart(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut form = FormInput::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return e.into_response(),
        };
        let name = field.name().unwrap_or_default().to_string();
        if name == FILE_FIELD {
            match field.bytes().await {
                Ok(bytes) => form.file = Some(bytes.to_vec()),
                Err(e) => return e.into_response(),
            }
        } else {
            match field.text().await {
                Ok(text) => {
                    form.fields.insert(name, text);
                }
                Err(e) => return e.into_response(),
            }
        }
    }
    dispatch(state, SafeAction::from_form(form)).await
}

async fn dispatch(state: AppState, action: SafeAction) -> Response {
    let action = match action {
        SafeAction::Open { duration } => return stream_open(&state, duration),
        other => other,
    };

    let controller = Arc::clone(&state.controller);
    let grace = state.open_grace;
    match tokio::task::spawn_blocking(move || run_action(&*controller, action, grace)).await {
        Ok(ActionReply::Html(body)) => Html(body).into_response(),
        Ok(ActionReply::Download(image)) => download(image),
        Err(e) => {
            error!("Lock exchange failed to finish: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(html_line("ERROR Internal error")),
            )
                .into_response()
        }
    }
}

/// Password image as a file download
fn download(image: PasswordImage) -> Response {
    debug!("Sending {} ({} bytes)", image.filename, image.bytes.len());
    let disposition = format!("attachment; filename=\"{}\"", image.filename);
    (
        [
            (CONTENT_TYPE, PASSWORD_IMAGE_CONTENT_TYPE.to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        image.bytes,
    )
        .into_response()
}

pub fn open_preamble() -> String {
    format!("<!--{}-->\n", " ".repeat(OPEN_PREAMBLE_LEN))
}

/// Stream `open` progress to the client as the lock reports it
///
/// The exchange is cancelled once the client goes away; it also ends at the
/// request's deadline.
fn stream_open(state: &AppState, duration: String) -> Response {
    let (tx, rx) = mpsc::channel::<String>(OPEN_CHANNEL_CAPACITY);
    let (done_tx, done_rx) = oneshot::channel::<()>();
    let cancel = CancelToken::new();
    // Fresh channel, cannot be full
    let _ = tx.try_send(open_preamble());

    // Cancel when the response body is dropped, even while the lock is silent
    let watch_tx = tx.clone();
    let watch_cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = watch_tx.closed() => watch_cancel.cancel(),
            _ = done_rx => {}
        }
    });

    let controller = Arc::clone(&state.controller);
    let grace = state.open_grace;
    tokio::task::spawn_blocking(move || {
        let _done = done_tx;
        let emit_cancel = cancel.clone();
        run_open(&*controller, &duration, grace, &cancel, |chunk| {
            if tx.blocking_send(chunk).is_err() {
                emit_cancel.cancel();
            }
        });
    });

    let body = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|chunk| (Ok::<_, Infallible>(chunk), rx))
    });
    (
        [(CONTENT_TYPE, "text/html; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response()
}
