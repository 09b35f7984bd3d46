// Route table and the middleware stack around it

use axum::{
    extract::{DefaultBodyLimit, Request},
    handler::HandlerWithoutStateExt,
    middleware::{from_fn, from_fn_with_state, Next},
    routing::{delete, get, patch, post, MethodRouter},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::errors::ApiError;
use crate::api::handlers::{auth, bookings, factory, health, reviews, tours, users, views};
use crate::api::middleware::auth::{ADMIN, ALL_GUIDES, CUSTOMERS, REVIEWERS, STAFF};
use crate::api::middleware::{
    handle_errors, protect, rate_limit, request_id, require_roles, security_headers,
};
use crate::domain::booking::Booking;
use crate::domain::review::Review;
use crate::domain::tour::Tour;
use crate::domain::user::{Role, User};
use crate::state::AppState;

/// JSON and multipart bodies above this size are rejected
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Requires a logged-in user
fn protected(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(state.clone(), protect))
}

/// Requires a logged-in user holding one of `roles`
fn restricted(
    state: &AppState,
    roles: &'static [Role],
    route: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    let route = route.route_layer(from_fn(move |request: Request, next: Next| {
        require_roles(roles, request, next)
    }));
    protected(state, route)
}

fn tour_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(factory::get_all::<Tour>)
                .merge(restricted(state, STAFF, post(factory::create_one::<Tour>))),
        )
        .route("/top/:top", get(tours::top_tours))
        .route("/tour-stats", get(tours::tour_stats))
        .route(
            "/monthly-plan/:year",
            restricted(state, ALL_GUIDES, get(tours::monthly_plan)),
        )
        .route(
            "/tours-within/:distance/center/:latlng/unit/:unit",
            get(tours::tours_within),
        )
        .route("/distances/:latlng/unit/:unit", get(tours::distances))
        .route(
            "/:id",
            get(factory::get_one::<Tour>).merge(restricted(
                state,
                STAFF,
                patch(factory::update_one::<Tour>).delete(factory::delete_one::<Tour>),
            )),
        )
        .route(
            "/:id/reviews",
            protected(
                state,
                get(tours::get_tour_reviews).post(tours::create_tour_review),
            ),
        )
}

fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/forgetPassword", post(auth::forget_password))
        .route("/resetPassword/:token", patch(auth::reset_password))
        .route("/updatePassword", protected(state, patch(auth::update_password)))
        .route("/me", protected(state, get(users::get_me)))
        .route("/updateMe", protected(state, patch(users::update_me)))
        .route("/deleteMe", protected(state, delete(users::delete_me)))
        .route(
            "/",
            restricted(
                state,
                ADMIN,
                get(factory::get_all::<User>).post(users::create_user),
            ),
        )
        .route(
            "/:id",
            restricted(
                state,
                ADMIN,
                get(factory::get_one::<User>)
                    .patch(factory::update_one::<User>)
                    .delete(factory::delete_one::<User>),
            ),
        )
}

fn review_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            protected(state, get(factory::get_all::<Review>)).merge(restricted(
                state,
                CUSTOMERS,
                post(reviews::create_review),
            )),
        )
        .route(
            "/:id",
            protected(state, get(factory::get_one::<Review>)).merge(restricted(
                state,
                REVIEWERS,
                patch(factory::update_one::<Review>).delete(factory::delete_one::<Review>),
            )),
        )
}

fn booking_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/checkout-session/:id",
            protected(state, get(bookings::get_checkout_session)),
        )
        .route(
            "/",
            restricted(
                state,
                STAFF,
                get(factory::get_all::<Booking>).post(factory::create_one::<Booking>),
            ),
        )
        .route(
            "/:id",
            restricted(
                state,
                STAFF,
                get(factory::get_one::<Booking>)
                    .patch(factory::update_one::<Booking>)
                    .delete(factory::delete_one::<Booking>),
            ),
        )
}

fn view_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(views::overview))
        .route("/tour/:slug", get(views::tour))
        .route("/login", get(views::login))
        .route("/signup", get(views::signup))
        .route("/forgetPassword", get(views::forget_password))
        .route("/resetPassword/:token", get(views::reset_password))
        .route("/me", get(views::account))
        .route("/my-bookings", get(views::my_bookings))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Page not found")
}

/// Builds the complete application
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/tours", tour_routes(&state))
        .nest("/users", user_routes(&state))
        .nest("/reviews", review_routes(&state))
        .nest("/bookings", booking_routes(&state))
        .layer(from_fn_with_state(state.clone(), rate_limit));

    let public = ServeDir::new(&state.config.public_dir).not_found_service(not_found.into_service());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api)
        .merge(view_routes())
        .fallback_service(public)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(from_fn_with_state(state.clone(), handle_errors))
        .layer(from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(from_fn(request_id))
        .with_state(state)
}
