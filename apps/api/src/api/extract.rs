// Request extractors that reject with ApiError instead of axum's plain-text rejections

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{header, request::Parts, HeaderMap},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_path_to_error::Segment;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::domain::errors::DomainError;

/// JSON request body. A field of the wrong type answers 400 `Invalid <field>: <value>`
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Value>::from_request(request, state)
            .await
            .map_err(|rejection| ApiError::new(rejection.status(), rejection.body_text()))?;
        decode_body(&body).map(JsonBody)
    }
}

/// Deserializes an already parsed body, naming the offending field on failure
pub fn decode_body<T: DeserializeOwned>(body: &Value) -> Result<T, ApiError> {
    serde_path_to_error::deserialize(body).map_err(|err| {
        let path = err.path();
        let offending = path.iter().try_fold(body, |value, segment| match segment {
            Segment::Map { key } => value.get(key),
            Segment::Seq { index } => value.get(*index),
            _ => None,
        });

        match offending {
            Some(value) if path.iter().next().is_some() => {
                let raw = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                DomainError::invalid_value(path.to_string(), raw).into()
            }
            _ => ApiError::bad_request(format!("Invalid input data. {}", err.inner())),
        }
    })
}

/// Raw query-string pairs in request order, repeated keys included
#[derive(Debug, Clone, Default)]
pub struct ListParams(pub Vec<(String, String)>);

#[async_trait]
impl<S> FromRequestParts<S> for ListParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(ListParams(pairs))
    }
}

/// Scheme and host the client used to reach us, for links in emails and redirects
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
}

impl RequestOrigin {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.split(',').next().unwrap_or(value).trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            scheme: header_str("x-forwarded-proto").unwrap_or_else(|| "http".to_string()),
            host: header_str("x-forwarded-host")
                .or_else(|| header_str(header::HOST.as_str()))
                .unwrap_or_else(|| "localhost".to_string()),
        }
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == "https"
    }

    /// Absolute URL for `path`, which must start with `/`
    pub fn url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.host, path)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let mut origin = RequestOrigin::from_headers(&parts.headers);
        if parts.uri.scheme_str() == Some("https") {
            origin.scheme = "https".to_string();
        }
        Ok(origin)
    }
}

/// Parses a path id, answering 400 `Invalid id: <raw>` for malformed ones
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| DomainError::invalid_value("id", raw).into())
}
