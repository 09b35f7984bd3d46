// Global error handling
// Every ApiError response passes through here and is finished according to
// where it happened (JSON API or HTML page) and the runtime environment

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::api::errors::{ApiError, ErrorReport, GENERIC_ERROR};
use crate::state::AppState;
use crate::views::{render, ErrorPage};

const ERROR_PAGE_TITLE: &str = "Something went wrong";
const TRY_AGAIN: &str = "Please try again later";

fn api_error_response(error: &ApiError, production: bool) -> Response {
    if production && !error.operational {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "error", "message": GENERIC_ERROR })),
        )
            .into_response();
    }

    let mut body = json!({
        "status": error.status_label(),
        "message": error.message,
    });
    if !production {
        body["error"] = json!(error.detail.as_deref().unwrap_or(&error.message));
    }
    (error.status, Json(body)).into_response()
}

fn page_error_response(error: &ApiError, production: bool) -> Response {
    let message = if production && !error.operational {
        TRY_AGAIN
    } else {
        error.message.as_str()
    };
    let page = ErrorPage {
        title: ERROR_PAGE_TITLE,
        user: None,
        message,
    };
    match render(&page) {
        Ok(html) => (error.status, html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render error page");
            (error.status, Html(message.to_string())).into_response()
        }
    }
}

pub async fn handle_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let is_api = request.uri().path().starts_with("/api");
    let response = next.run(request).await;

    let Some(ErrorReport(error)) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };

    if error.operational {
        tracing::debug!(status = error.status.as_u16(), message = %error.message, "Request failed");
    } else {
        tracing::error!(status = error.status.as_u16(), detail = ?error.detail, "Unexpected error");
    }

    let production = state.config.is_production();
    let mut finished = if is_api {
        api_error_response(&error, production)
    } else {
        page_error_response(&error, production)
    };

    // Keep headers such as Set-Cookie or rate limit hints set alongside the error
    for (name, value) in response.headers() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            finished.headers_mut().append(name.clone(), value.clone());
        }
    }
    finished
}
