// Reviews: CRUD through the factory, with tour ratings recomputed after writes

use std::collections::HashMap;

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;
use uuid::Uuid;

use super::factory::{self, Resource};
use crate::api::errors::ApiError;
use crate::api::extract::JsonBody;
use crate::api::middleware::auth::CurrentUser;
use crate::api::response;
use crate::domain::entity::{Field, FieldKind};
use crate::domain::repositories::CrudRepository;
use crate::domain::review::{Review, ReviewDraft};
use crate::domain::user::ReviewAuthor;
use crate::state::AppState;

/// Filter field used to scope review lists to one tour
pub const TOUR_FIELD: Field = Field::new("tour", FieldKind::Id);

/// Looks up the authors of `reviews`, keyed by user id
pub async fn authors(state: &AppState, reviews: &[Review]) -> Result<HashMap<Uuid, ReviewAuthor>, ApiError> {
    let mut ids: Vec<Uuid> = reviews.iter().map(|r| r.user).collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = state.users.find_by_ids(&ids).await?;
    Ok(users.iter().map(|user| (user.id, user.author())).collect())
}

/// Serializes reviews with `user` replaced by the author's name and photo
pub async fn with_authors(state: &AppState, reviews: Vec<Review>) -> Result<Vec<Value>, ApiError> {
    let authors = authors(state, &reviews).await?;

    reviews
        .iter()
        .map(|review| -> Result<Value, ApiError> {
            let mut document = serde_json::to_value(review)?;
            document["user"] = match authors.get(&review.user) {
                Some(author) => serde_json::to_value(author)?,
                None => Value::Null,
            };
            Ok(document)
        })
        .collect()
}

/// Recomputes the review count and average of one tour
pub async fn refresh_tour_ratings(state: &AppState, tour_id: Uuid) -> Result<(), ApiError> {
    let summary = state.reviews.rating_summary(tour_id).await?;
    state.tours.update_ratings(tour_id, summary).await?;
    tracing::debug!(%tour_id, quantity = summary.quantity, average = summary.average, "Refreshed tour ratings");
    Ok(())
}

#[async_trait]
impl Resource for Review {
    fn repository(state: &AppState) -> &dyn CrudRepository<Self> {
        state.reviews.as_crud()
    }

    async fn populate_many(state: &AppState, items: Vec<Self>) -> Result<Vec<Value>, ApiError> {
        with_authors(state, items).await
    }

    async fn after_write(state: &AppState, item: &Self) -> Result<(), ApiError> {
        refresh_tour_ratings(state, item.tour).await
    }
}

/// POST /api/v1/reviews
///
/// The body names the tour; the author is always the signed-in user.
pub async fn create_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(mut draft): JsonBody<ReviewDraft>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    draft.user = Some(user.id);

    let review = factory::insert::<Review>(&state, draft).await?;
    response::created(&review)
}
