// Bookings: admin CRUD plus the hosted checkout flow

use std::collections::HashMap;

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::factory::{self, Resource};
use crate::api::errors::ApiError;
use crate::api::extract::{parse_id, RequestOrigin};
use crate::api::middleware::auth::CurrentUser;
use crate::domain::booking::Booking;
use crate::domain::repositories::CrudRepository;
use crate::domain::tour::Tour;
use crate::domain::user::User;
use crate::infrastructure::payments::CheckoutRequest;
use crate::state::AppState;

const CHECKOUT_CURRENCY: &str = "usd";

fn unique(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.collect();
    ids.sort();
    ids.dedup();
    ids
}

#[async_trait]
impl Resource for Booking {
    fn repository(state: &AppState) -> &dyn CrudRepository<Self> {
        state.bookings.as_crud()
    }

    /// Embeds the booking's user summary and the tour's name
    async fn populate_many(state: &AppState, items: Vec<Self>) -> Result<Vec<Value>, ApiError> {
        let user_ids = unique(items.iter().map(|b| b.user));
        let tour_ids = unique(items.iter().map(|b| b.tour));

        let users: HashMap<Uuid, User> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            state
                .users
                .find_by_ids(&user_ids)
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect()
        };
        let tours: HashMap<Uuid, Tour> = if tour_ids.is_empty() {
            HashMap::new()
        } else {
            state
                .tours
                .find_by_ids(&tour_ids)
                .await?
                .into_iter()
                .map(|t| (t.id, t))
                .collect()
        };

        items
            .iter()
            .map(|booking| -> Result<Value, ApiError> {
                let mut document = serde_json::to_value(booking)?;
                document["user"] = match users.get(&booking.user) {
                    Some(user) => serde_json::to_value(user.summary())?,
                    None => Value::Null,
                };
                document["tour"] = match tours.get(&booking.tour) {
                    Some(tour) => json!({ "id": tour.id, "name": tour.name }),
                    None => Value::Null,
                };
                Ok(document)
            })
            .collect()
    }
}

/// Builds the checkout request for one seat on `tour`
///
/// Success lands on the overview with the booking details in the query string,
/// where the booking gets recorded; cancelling returns to the tour page.
pub fn checkout_request(origin: &RequestOrigin, user: &User, tour: &Tour) -> CheckoutRequest {
    let success_path = format!(
        "/?tour={}&user={}&price={}",
        tour.id,
        user.id,
        tour.price.normalize()
    );

    CheckoutRequest {
        success_url: origin.url(&success_path),
        cancel_url: origin.url(&format!("/tour/{}", tour.slug)),
        customer_email: user.email.to_string(),
        client_reference_id: tour.id.to_string(),
        name: format!("{} Tour", tour.name),
        description: tour.summary.clone(),
        image: origin.url(&format!("/img/tours/{}", tour.image_cover)),
        unit_amount: tour.price_cents(),
        currency: CHECKOUT_CURRENCY.to_string(),
        quantity: 1,
    }
}

/// GET /api/v1/bookings/checkout-session/:id
pub async fn get_checkout_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    origin: RequestOrigin,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let tour = factory::find::<Tour>(&state, parse_id(&id)?).await?;

    let request = checkout_request(&origin, &user, &tour);
    let session = state.payments.create_checkout_session(&request).await?;
    tracing::info!(user_id = %user.id, tour_id = %tour.id, session_id = %session.id, "Checkout session created");

    Ok(Json(json!({
        "status": "success",
        "session": session
    })))
}
