// In-memory store implementing every repository port
// Used by the test suite and by `DATABASE_URL=memory://`

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::booking::Booking;
use crate::domain::geo::{angular_distance, LatLng};
use crate::domain::query::ListQuery;
use crate::domain::repositories::{
    BookingRepository, CrudRepository, RepositoryError, RepositoryResult, ReviewRepository,
    TourRepository, UserRepository,
};
use crate::domain::review::{RatingSummary, Review};
use crate::domain::tour::stats;
use crate::domain::tour::{MonthlyPlan, Tour, TourDistance, TourStats};
use crate::domain::user::{Email, User};

/// Thread-safe document store with the same constraints as the SQL schema:
/// unique emails, tour names and slugs, one review per (tour, user),
/// existing references and cascading deletes.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    tours: DashMap<Uuid, Tour>,
    reviews: DashMap<Uuid, Review>,
    bookings: DashMap<Uuid, Booking>,
    // Serializes check-then-write sequences
    writes: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn visible_tours(&self) -> Vec<Tour> {
        self.tours
            .iter()
            .filter(|entry| !entry.secret_tour)
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn active_users(&self) -> Vec<User> {
        self.users
            .iter()
            .filter(|entry| entry.active)
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn check_user_unique(&self, user: &User) -> RepositoryResult<()> {
        if self
            .users
            .iter()
            .any(|other| other.id != user.id && other.email == user.email)
        {
            return Err(RepositoryError::Duplicate("email".to_string()));
        }
        Ok(())
    }

    fn check_tour_unique(&self, tour: &Tour) -> RepositoryResult<()> {
        for other in self.tours.iter().filter(|other| other.id != tour.id) {
            if other.name == tour.name {
                return Err(RepositoryError::Duplicate("name".to_string()));
            }
            if other.slug == tour.slug {
                return Err(RepositoryError::Duplicate("slug".to_string()));
            }
        }
        Ok(())
    }

    fn check_references(&self, tour: Uuid, user: Uuid) -> RepositoryResult<()> {
        if !self.tours.contains_key(&tour) {
            return Err(RepositoryError::MissingReference("tour".to_string()));
        }
        if !self.users.contains_key(&user) {
            return Err(RepositoryError::MissingReference("user".to_string()));
        }
        Ok(())
    }

    fn remove_dependents(&self, matches: impl Fn(Uuid, Uuid) -> bool) {
        self.reviews.retain(|_, review| !matches(review.tour, review.user));
        self.bookings.retain(|_, booking| !matches(booking.tour, booking.user));
    }
}

#[async_trait]
impl CrudRepository<User> for MemoryStore {
    async fn find_all(&self, query: &ListQuery) -> RepositoryResult<Vec<User>> {
        Ok(query.apply(self.active_users()))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        Ok(self
            .users
            .get(&id)
            .filter(|user| user.active)
            .map(|user| user.value().clone()))
    }

    async fn insert(&self, user: &User) -> RepositoryResult<()> {
        let _guard = self.write_lock();
        self.check_user_unique(user)?;
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> RepositoryResult<bool> {
        let _guard = self.write_lock();
        if !self.users.contains_key(&user.id) {
            return Ok(false);
        }
        self.check_user_unique(user)?;
        self.users.insert(user.id, user.clone());
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
        let _guard = self.write_lock();
        let removed = self.users.remove(&id).is_some();
        if removed {
            self.remove_dependents(|_, user| user == id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    fn as_crud(&self) -> &dyn CrudRepository<User> {
        self
    }

    async fn find_by_email(&self, email: &Email) -> RepositoryResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|user| user.active && &user.email == email)
            .map(|user| user.value().clone()))
    }

    async fn find_by_reset_token(
        &self,
        token_digest: &str,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|user| user.active && user.reset_token_valid(token_digest, now))
            .map(|user| user.value().clone()))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<Vec<User>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).filter(|user| user.active).map(|user| user.value().clone()))
            .collect())
    }

    async fn delete_all(&self) -> RepositoryResult<u64> {
        let _guard = self.write_lock();
        let count = self.users.len() as u64;
        self.users.clear();
        self.reviews.clear();
        self.bookings.clear();
        Ok(count)
    }
}

#[async_trait]
impl CrudRepository<Tour> for MemoryStore {
    async fn find_all(&self, query: &ListQuery) -> RepositoryResult<Vec<Tour>> {
        Ok(query.apply(self.visible_tours()))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Tour>> {
        Ok(self
            .tours
            .get(&id)
            .filter(|tour| !tour.secret_tour)
            .map(|tour| tour.value().clone()))
    }

    async fn insert(&self, tour: &Tour) -> RepositoryResult<()> {
        let _guard = self.write_lock();
        self.check_tour_unique(tour)?;
        self.tours.insert(tour.id, tour.clone());
        Ok(())
    }

    async fn update(&self, tour: &Tour) -> RepositoryResult<bool> {
        let _guard = self.write_lock();
        if !self.tours.contains_key(&tour.id) {
            return Ok(false);
        }
        self.check_tour_unique(tour)?;
        self.tours.insert(tour.id, tour.clone());
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
        let _guard = self.write_lock();
        let removed = self.tours.remove(&id).is_some();
        if removed {
            self.remove_dependents(|tour, _| tour == id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl TourRepository for MemoryStore {
    fn as_crud(&self) -> &dyn CrudRepository<Tour> {
        self
    }

    async fn find_by_slug(&self, slug: &str) -> RepositoryResult<Option<Tour>> {
        Ok(self
            .tours
            .iter()
            .find(|tour| !tour.secret_tour && tour.slug == slug)
            .map(|tour| tour.value().clone()))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<Vec<Tour>> {
        let mut tours: Vec<Tour> = self
            .visible_tours()
            .into_iter()
            .filter(|tour| ids.contains(&tour.id))
            .collect();
        tours.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tours)
    }

    async fn stats(&self) -> RepositoryResult<Vec<TourStats>> {
        Ok(stats::tour_stats(&self.visible_tours()))
    }

    async fn monthly_plan(&self, year: i32) -> RepositoryResult<Vec<MonthlyPlan>> {
        Ok(stats::monthly_plan(&self.visible_tours(), year))
    }

    async fn within(&self, center: LatLng, radius: f64) -> RepositoryResult<Vec<Tour>> {
        let mut found: Vec<(f64, Tour)> = self
            .visible_tours()
            .into_iter()
            .filter_map(|tour| {
                let angle = angular_distance(center, tour.start_location.as_ref()?.lat_lng());
                (angle <= radius).then_some((angle, tour))
            })
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(found.into_iter().map(|(_, tour)| tour).collect())
    }

    async fn distances(&self, from: LatLng, multiplier: f64) -> RepositoryResult<Vec<TourDistance>> {
        Ok(stats::distances(&self.visible_tours(), from, multiplier))
    }

    async fn update_ratings(&self, id: Uuid, summary: RatingSummary) -> RepositoryResult<()> {
        if let Some(mut tour) = self.tours.get_mut(&id) {
            tour.set_ratings(summary);
        }
        Ok(())
    }

    async fn delete_all(&self) -> RepositoryResult<u64> {
        let _guard = self.write_lock();
        let count = self.tours.len() as u64;
        self.tours.clear();
        self.reviews.clear();
        self.bookings.clear();
        Ok(count)
    }
}

#[async_trait]
impl CrudRepository<Review> for MemoryStore {
    async fn find_all(&self, query: &ListQuery) -> RepositoryResult<Vec<Review>> {
        let reviews = self.reviews.iter().map(|r| r.value().clone()).collect();
        Ok(query.apply(reviews))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Review>> {
        Ok(self.reviews.get(&id).map(|review| review.value().clone()))
    }

    async fn insert(&self, review: &Review) -> RepositoryResult<()> {
        let _guard = self.write_lock();
        self.check_references(review.tour, review.user)?;
        if self
            .reviews
            .iter()
            .any(|other| other.tour == review.tour && other.user == review.user)
        {
            return Err(RepositoryError::Duplicate("tour, user".to_string()));
        }
        self.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn update(&self, review: &Review) -> RepositoryResult<bool> {
        let _guard = self.write_lock();
        match self.reviews.get_mut(&review.id) {
            Some(mut stored) => {
                stored.review = review.review.clone();
                stored.rating = review.rating;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
        let _guard = self.write_lock();
        Ok(self.reviews.remove(&id).is_some())
    }
}

#[async_trait]
impl ReviewRepository for MemoryStore {
    fn as_crud(&self) -> &dyn CrudRepository<Review> {
        self
    }

    async fn find_by_tour(&self, tour_id: Uuid) -> RepositoryResult<Vec<Review>> {
        let mut reviews: Vec<Review> = self
            .reviews
            .iter()
            .filter(|review| review.tour == tour_id)
            .map(|review| review.value().clone())
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(reviews)
    }

    async fn rating_summary(&self, tour_id: Uuid) -> RepositoryResult<RatingSummary> {
        let ratings: Vec<i32> = self
            .reviews
            .iter()
            .filter(|review| review.tour == tour_id)
            .map(|review| review.rating)
            .collect();
        Ok(RatingSummary::from_ratings(ratings))
    }

    async fn delete_all(&self) -> RepositoryResult<u64> {
        let _guard = self.write_lock();
        let count = self.reviews.len() as u64;
        self.reviews.clear();
        Ok(count)
    }
}

#[async_trait]
impl CrudRepository<Booking> for MemoryStore {
    async fn find_all(&self, query: &ListQuery) -> RepositoryResult<Vec<Booking>> {
        let bookings = self.bookings.iter().map(|b| b.value().clone()).collect();
        Ok(query.apply(bookings))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Booking>> {
        Ok(self.bookings.get(&id).map(|booking| booking.value().clone()))
    }

    async fn insert(&self, booking: &Booking) -> RepositoryResult<()> {
        let _guard = self.write_lock();
        self.check_references(booking.tour, booking.user)?;
        self.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn update(&self, booking: &Booking) -> RepositoryResult<bool> {
        let _guard = self.write_lock();
        match self.bookings.get_mut(&booking.id) {
            Some(mut stored) => {
                stored.price = booking.price;
                stored.paid = booking.paid;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
        let _guard = self.write_lock();
        Ok(self.bookings.remove(&id).is_some())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    fn as_crud(&self) -> &dyn CrudRepository<Booking> {
        self
    }

    async fn find_by_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|booking| booking.user == user_id)
            .map(|booking| booking.value().clone())
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }
}
