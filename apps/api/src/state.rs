// Shared application state handed to every handler

use std::sync::Arc;

use sqlx::PgPool;

use crate::api::middleware::rate_limit::{ip_rate_limiter, IpRateLimiter};
use crate::config::Config;
use crate::domain::repositories::{
    BookingRepository, ReviewRepository, TourRepository, UserRepository,
};
use crate::infrastructure::email::{mailer_from_config, Mailer};
use crate::infrastructure::payments::{PaymentGateway, StripeGateway};
use crate::infrastructure::repositories::{
    MemoryStore, PostgresBookingRepository, PostgresReviewRepository, PostgresTourRepository,
    PostgresUserRepository,
};

/// One repository per aggregate, backed by the same store
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub tours: Arc<dyn TourRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub bookings: Arc<dyn BookingRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            tours: store.clone(),
            reviews: store.clone(),
            bookings: store,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            tours: Arc::new(PostgresTourRepository::new(pool.clone())),
            reviews: Arc::new(PostgresReviewRepository::new(pool.clone())),
            bookings: Arc::new(PostgresBookingRepository::new(pool)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserRepository>,
    pub tours: Arc<dyn TourRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub payments: Arc<dyn PaymentGateway>,
    pub rate_limiter: Arc<IpRateLimiter>,
}

impl AppState {
    /// Wires the configured mail and payment providers around `repositories`
    pub fn new(config: Config, repositories: Repositories) -> Self {
        let mailer = mailer_from_config(&config);
        let payments = Arc::new(StripeGateway::new(config.stripe_secret_key.clone()));
        let rate_limiter = Arc::new(ip_rate_limiter(config.rate_limit_max));

        Self {
            config: Arc::new(config),
            users: repositories.users,
            tours: repositories.tours,
            reviews: repositories.reviews,
            bookings: repositories.bookings,
            mailer,
            payments,
            rate_limiter,
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_payments(mut self, payments: Arc<dyn PaymentGateway>) -> Self {
        self.payments = payments;
        self
    }
}
