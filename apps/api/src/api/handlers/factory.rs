// Generic CRUD handlers shared by every resource
//
// A resource names its repository and may hook into population (embedding
// related documents in responses) and post-write side effects.

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::extract::{parse_id, JsonBody, ListParams};
use crate::api::response;
use crate::domain::entity::{Entity, FromDraft};
use crate::domain::query::ListQuery;
use crate::domain::repositories::CrudRepository;
use crate::state::AppState;

#[async_trait]
pub trait Resource: Entity {
    fn repository(state: &AppState) -> &dyn CrudRepository<Self>;

    /// Serializes list results, embedding related documents where needed
    async fn populate_many(_state: &AppState, items: Vec<Self>) -> Result<Vec<Value>, ApiError> {
        items
            .iter()
            .map(|item| serde_json::to_value(item).map_err(ApiError::from))
            .collect()
    }

    /// Serializes a single document for detail responses
    async fn populate(state: &AppState, item: Self) -> Result<Value, ApiError> {
        let mut documents = Self::populate_many(state, vec![item]).await?;
        Ok(documents.pop().unwrap_or(Value::Null))
    }

    /// Runs after a successful create, update or delete
    async fn after_write(_state: &AppState, _item: &Self) -> Result<(), ApiError> {
        Ok(())
    }
}

pub fn not_found<R: Entity>() -> ApiError {
    ApiError::not_found(format!("No {} found with that ID", R::NAME))
}

pub async fn find<R: Resource>(state: &AppState, id: Uuid) -> Result<R, ApiError> {
    R::repository(state)
        .find_by_id(id)
        .await?
        .ok_or_else(not_found::<R>)
}

/// Runs a parsed list query and wraps the projected documents
pub async fn list<R: Resource>(state: &AppState, query: &ListQuery) -> Result<Json<Value>, ApiError> {
    let items = R::repository(state).find_all(query).await?;
    let documents = R::populate_many(state, items)
        .await?
        .into_iter()
        .map(|document| query.projection.apply(document))
        .collect();
    Ok(response::list(documents))
}

/// Validates and stores a new document
pub async fn insert<R: Resource + FromDraft>(state: &AppState, draft: R::Draft) -> Result<R, ApiError> {
    let item = R::from_draft(draft)?;
    R::repository(state).insert(&item).await?;
    R::after_write(state, &item).await?;
    tracing::info!(resource = R::NAME, id = %item.id(), "Created");
    Ok(item)
}

pub async fn get_all<R: Resource>(
    State(state): State<AppState>,
    ListParams(params): ListParams,
) -> Result<Json<Value>, ApiError> {
    let query = ListQuery::parse(&params, R::FIELDS)?;
    list::<R>(&state, &query).await
}

pub async fn get_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let item = find::<R>(&state, parse_id(&id)?).await?;
    response::data(R::populate(&state, item).await?)
}

pub async fn create_one<R: Resource + FromDraft>(
    State(state): State<AppState>,
    JsonBody(draft): JsonBody<R::Draft>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let item = insert::<R>(&state, draft).await?;
    response::created(&item)
}

pub async fn update_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<R::Patch>,
) -> Result<Json<Value>, ApiError> {
    let mut item = find::<R>(&state, parse_id(&id)?).await?;
    item.apply(patch)?;

    if !R::repository(&state).update(&item).await? {
        return Err(not_found::<R>());
    }
    R::after_write(&state, &item).await?;
    tracing::info!(resource = R::NAME, id = %item.id(), "Updated");

    response::data(&item)
}

pub async fn delete_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let item = find::<R>(&state, parse_id(&id)?).await?;

    if !R::repository(&state).delete(item.id()).await? {
        return Err(not_found::<R>());
    }
    R::after_write(&state, &item).await?;
    tracing::info!(resource = R::NAME, id = %item.id(), "Deleted");

    Ok(StatusCode::NO_CONTENT)
}
