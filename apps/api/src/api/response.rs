// JSend-style success envelopes

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::errors::ApiError;

/// `{status: "success", data: {data: value}}`
pub fn data(value: impl Serialize) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!({
        "status": "success",
        "data": { "data": serde_json::to_value(value)? }
    })))
}

/// `{status: "success", results, data: {data: [...]}}`
pub fn list(documents: Vec<Value>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "results": documents.len(),
        "data": { "data": documents }
    }))
}

pub fn created(value: impl Serialize) -> Result<(StatusCode, Json<Value>), ApiError> {
    Ok((StatusCode::CREATED, data(value)?))
}

pub fn success() -> Json<Value> {
    Json(json!({ "status": "success" }))
}
