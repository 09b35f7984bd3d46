// Tour catalogue: CRUD through the factory plus aggregations and geo search

use std::collections::HashMap;

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::factory::{self, Resource};
use super::reviews;
use crate::api::errors::ApiError;
use crate::api::extract::{parse_id, JsonBody, ListParams};
use crate::api::middleware::auth::{restrict_to, CurrentUser, CUSTOMERS};
use crate::api::response;
use crate::domain::entity::Entity;
use crate::domain::errors::DomainError;
use crate::domain::geo::{DistanceUnit, LatLng};
use crate::domain::query::{FilterValue, ListQuery};
use crate::domain::repositories::CrudRepository;
use crate::domain::tour::stats::year_bounds;
use crate::domain::review::{Review, ReviewDraft};
use crate::domain::tour::Tour;
use crate::domain::user::UserSummary;
use crate::state::AppState;

/// Query parameters behind `/top/:top`
const TOP_TOURS_SORT: &str = "-ratingsAverage,price";
const TOP_TOURS_FIELDS: &str = "name,price,ratingsAverage,summary,difficulty";

/// Loads the guides of every tour in one lookup
pub async fn guide_summaries(state: &AppState, tours: &[Tour]) -> Result<HashMap<Uuid, UserSummary>, ApiError> {
    let mut ids: Vec<Uuid> = tours.iter().flat_map(|t| t.guides.iter().copied()).collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let guides = state.users.find_by_ids(&ids).await?;
    Ok(guides.iter().map(|g| (g.id, g.summary())).collect())
}

#[async_trait]
impl Resource for Tour {
    fn repository(state: &AppState) -> &dyn CrudRepository<Self> {
        state.tours.as_crud()
    }

    /// Replaces guide ids with guide summaries; unknown or inactive guides are dropped
    async fn populate_many(state: &AppState, items: Vec<Self>) -> Result<Vec<Value>, ApiError> {
        let guides = guide_summaries(state, &items).await?;

        items
            .iter()
            .map(|tour| -> Result<Value, ApiError> {
                let mut document = serde_json::to_value(tour)?;
                let embedded: Vec<&UserSummary> = tour.guides.iter().filter_map(|id| guides.get(id)).collect();
                document["guides"] = serde_json::to_value(embedded)?;
                Ok(document)
            })
            .collect()
    }

    /// Detail documents also carry the tour's reviews
    async fn populate(state: &AppState, item: Self) -> Result<Value, ApiError> {
        let tour_reviews = state.reviews.find_by_tour(item.id).await?;
        let reviews = reviews::with_authors(state, tour_reviews).await?;

        let mut documents = Self::populate_many(state, vec![item]).await?;
        let mut document = documents.pop().unwrap_or(Value::Null);
        document["reviews"] = Value::Array(reviews);
        Ok(document)
    }
}

/// GET /api/v1/tours/top/:top
///
/// Best rated tours, cheapest first among equals, trimmed to card fields.
pub async fn top_tours(
    State(state): State<AppState>,
    Path(top): Path<String>,
    ListParams(mut params): ListParams,
) -> Result<Json<Value>, ApiError> {
    params.retain(|(key, _)| !matches!(key.as_str(), "limit" | "sort" | "fields"));
    params.push(("limit".to_string(), top));
    params.push(("sort".to_string(), TOP_TOURS_SORT.to_string()));
    params.push(("fields".to_string(), TOP_TOURS_FIELDS.to_string()));

    let query = ListQuery::parse(&params, Tour::FIELDS)?;
    factory::list::<Tour>(&state, &query).await
}

/// GET /api/v1/tours/tour-stats
pub async fn tour_stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let stats = state.tours.stats().await?;
    Ok(Json(json!({
        "status": "success",
        "data": { "stats": stats }
    })))
}

/// GET /api/v1/tours/monthly-plan/:year
pub async fn monthly_plan(
    State(state): State<AppState>,
    Path(year): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let year = parse_year(&year)?;
    let plan = state.tours.monthly_plan(year).await?;
    Ok(Json(json!({
        "status": "success",
        "data": { "plan": plan }
    })))
}

/// Accepts years chrono can represent a whole calendar year for
fn parse_year(raw: &str) -> Result<i32, ApiError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|year| year_bounds(*year).is_some())
        .ok_or_else(|| DomainError::invalid_value("year", raw).into())
}

fn parse_distance(raw: &str) -> Result<f64, ApiError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| DomainError::invalid_value("distance", raw).into())
}

/// GET /api/v1/tours/tours-within/:distance/center/:latlng/unit/:unit
pub async fn tours_within(
    State(state): State<AppState>,
    Path((distance, latlng, unit)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
    let distance = parse_distance(&distance)?;
    let center: LatLng = latlng.parse()?;
    let radius = DistanceUnit::from_param(&unit).radius_radians(distance);

    let tours = state.tours.within(center, radius).await?;
    tracing::debug!(lat = center.lat, lng = center.lng, radius, found = tours.len(), "Tours within radius");

    Ok(Json(json!({
        "status": "success",
        "results": tours.len(),
        "data": tours
    })))
}

/// GET /api/v1/tours/distances/:latlng/unit/:unit
pub async fn distances(
    State(state): State<AppState>,
    Path((latlng, unit)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let from: LatLng = latlng.parse()?;
    let multiplier = DistanceUnit::from_param(&unit).meters_multiplier();

    let distances = state.tours.distances(from, multiplier).await?;
    Ok(Json(json!({
        "status": "success",
        "data": distances
    })))
}

/// GET /api/v1/tours/:id/reviews
pub async fn get_tour_reviews(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    ListParams(params): ListParams,
) -> Result<Json<Value>, ApiError> {
    let tour_id = parse_id(&id)?;
    let query = ListQuery::parse(&params, Review::FIELDS)?
        .scoped(reviews::TOUR_FIELD, FilterValue::Id(tour_id));
    factory::list::<Review>(&state, &query).await
}

/// POST /api/v1/tours/:id/reviews
///
/// The tour comes from the body when given, else from the path; the author is
/// always the signed-in user.
pub async fn create_tour_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    JsonBody(mut draft): JsonBody<ReviewDraft>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    restrict_to(&user, CUSTOMERS)?;

    let tour_id = parse_id(&id)?;
    draft.tour = draft.tour.or(Some(tour_id));
    draft.user = Some(user.id);

    let review = factory::insert::<Review>(&state, draft).await?;
    response::created(&review)
}
