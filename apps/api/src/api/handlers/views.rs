// Server-rendered pages

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::reviews::authors;
use super::tours::guide_summaries;
use crate::api::errors::ApiError;
use crate::api::extract::parse_id;
use crate::api::middleware::auth::{CurrentUser, MaybeUser};
use crate::api::middleware::security::VIEW_CSP;
use crate::domain::booking::{Booking, BookingDraft};
use crate::domain::entity::{Entity, FromDraft};
use crate::domain::errors::DomainError;
use crate::domain::query::ListQuery;
use crate::domain::review::Review;
use crate::domain::tour::Tour;
use crate::state::AppState;
use crate::views::{
    render, AccountPage, ForgetPasswordPage, LoginPage, OverviewPage, ResetPasswordPage,
    ReviewCard, SignupPage, TourCard, TourDetail, TourPage, OVERVIEW_TITLE,
};

/// Attaches the page CSP that lets map, payment and CDN scripts load
fn with_view_csp(page: Html<String>) -> Response {
    let mut response = page.into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_SECURITY_POLICY, HeaderValue::from_static(VIEW_CSP));
    response
}

/// Query string Stripe appends when redirecting back after payment
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutReturn {
    pub tour: Option<String>,
    pub user: Option<String>,
    pub price: Option<String>,
}

impl CheckoutReturn {
    fn booking(&self) -> Result<Option<Booking>, ApiError> {
        let (Some(tour), Some(user), Some(price)) = (&self.tour, &self.user, &self.price) else {
            return Ok(None);
        };
        if tour.is_empty() || user.is_empty() || price.is_empty() {
            return Ok(None);
        }

        let price = Decimal::from_str(price.trim())
            .map_err(|_| ApiError::from(DomainError::invalid_value("price", price)))?;
        let booking = Booking::from_draft(BookingDraft {
            tour: Some(parse_id(tour)?),
            user: Some(parse_id(user)?),
            price: Some(price),
            paid: Some(true),
        })?;
        Ok(Some(booking))
    }
}

async fn all_tours(state: &AppState) -> Result<Vec<Tour>, ApiError> {
    let query = ListQuery::unpaged(Tour::FIELDS);
    Ok(state.tours.as_crud().find_all(&query).await?)
}

/// GET /
///
/// Returning from checkout records the booking first and redirects to a clean URL.
pub async fn overview(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(checkout): Query<CheckoutReturn>,
) -> Result<Response, ApiError> {
    if let Some(booking) = checkout.booking()? {
        state.bookings.as_crud().insert(&booking).await?;
        tracing::info!(booking_id = %booking.id, tour_id = %booking.tour, user_id = %booking.user, "Booking recorded from checkout");
        return Ok(Redirect::to("/").into_response());
    }

    let tours = all_tours(&state).await?;
    let page = OverviewPage {
        title: OVERVIEW_TITLE,
        user: user.as_ref(),
        tours: tours.iter().map(TourCard::from).collect(),
    };
    Ok(render(&page)?.into_response())
}

/// GET /tour/:slug
pub async fn tour(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let tour = state
        .tours
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("No tour found!!"))?;

    let guides = guide_summaries(&state, std::slice::from_ref(&tour)).await?;
    let guides: Vec<_> = tour.guides.iter().filter_map(|id| guides.get(id).cloned()).collect();

    let reviews: Vec<Review> = state.reviews.find_by_tour(tour.id).await?;
    let authors = authors(&state, &reviews).await?;
    let cards = reviews
        .iter()
        .map(|review| ReviewCard::new(review, authors.get(&review.user)))
        .collect();

    let page = TourPage {
        title: &tour.name,
        user: user.as_ref(),
        tour: TourDetail::new(&tour, &guides, cards),
        mapbox_token: &state.config.mapbox_token,
    };
    Ok(with_view_csp(render(&page)?))
}

/// GET /login
pub async fn login(MaybeUser(user): MaybeUser) -> Result<Response, ApiError> {
    let page = LoginPage {
        title: "Log in",
        user: user.as_ref(),
    };
    Ok(with_view_csp(render(&page)?))
}

/// GET /signup
pub async fn signup(MaybeUser(user): MaybeUser) -> Result<Response, ApiError> {
    let page = SignupPage {
        title: "Sign up",
        user: user.as_ref(),
    };
    Ok(with_view_csp(render(&page)?))
}

/// GET /forgetPassword
pub async fn forget_password() -> Result<Response, ApiError> {
    let page = ForgetPasswordPage {
        title: "Forget Password",
        user: None,
    };
    Ok(with_view_csp(render(&page)?))
}

/// GET /resetPassword/:token
pub async fn reset_password(Path(token): Path<String>) -> Result<Response, ApiError> {
    let page = ResetPasswordPage {
        title: "Reset Password",
        user: None,
        token: &token,
    };
    Ok(with_view_csp(render(&page)?))
}

/// GET /me
pub async fn account(CurrentUser(user): CurrentUser) -> Result<Response, ApiError> {
    let page = AccountPage {
        title: "Account",
        user: Some(&user),
        account: &user,
    };
    Ok(with_view_csp(render(&page)?))
}

/// GET /my-bookings
pub async fn my_bookings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, ApiError> {
    let bookings = state.bookings.find_by_user(user.id).await?;
    let mut tour_ids: Vec<_> = bookings.iter().map(|b| b.tour).collect();
    tour_ids.sort();
    tour_ids.dedup();

    let tours = if tour_ids.is_empty() {
        Vec::new()
    } else {
        state.tours.find_by_ids(&tour_ids).await?
    };

    let page = OverviewPage {
        title: "My Bookings",
        user: Some(&user),
        tours: tours.iter().map(TourCard::from).collect(),
    };
    Ok(with_view_csp(render(&page)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use uuid::Uuid;

    #[test]
    fn checkout_return_needs_all_params() {
        let partial = CheckoutReturn {
            tour: Some(Uuid::new_v4().to_string()),
            ..Default::default()
        };
        assert!(partial.booking().unwrap().is_none());
    }

    #[test]
    fn checkout_return_builds_paid_booking() {
        let (tour, user) = (Uuid::new_v4(), Uuid::new_v4());
        let params = CheckoutReturn {
            tour: Some(tour.to_string()),
            user: Some(user.to_string()),
            price: Some("497".to_string()),
        };
        let booking = params.booking().unwrap().unwrap();
        assert_eq!((booking.tour, booking.user), (tour, user));
        assert_eq!(booking.price, Decimal::from(497));
        assert!(booking.paid);
    }

    #[test]
    fn checkout_return_rejects_bad_price() {
        let params = CheckoutReturn {
            tour: Some(Uuid::new_v4().to_string()),
            user: Some(Uuid::new_v4().to_string()),
            price: Some("cheap".to_string()),
        };
        assert_eq!(params.booking().unwrap_err().message, "Invalid price: cheap");
    }

    #[test]
    fn checkout_return_rejects_negative_price() {
        let params = CheckoutReturn {
            tour: Some(Uuid::new_v4().to_string()),
            user: Some(Uuid::new_v4().to_string()),
            price: Some("-1".to_string()),
        };
        let err = params.booking().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Booking price must not be negative");
    }
}
