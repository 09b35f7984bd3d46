// Development data: loads tours, users and reviews from `dev-data/*.json`
// into any store, or clears them again

use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::domain::entity::FromDraft;
use crate::domain::errors::DomainError;
use crate::domain::repositories::RepositoryError;
use crate::domain::review::{Review, ReviewDraft};
use crate::domain::tour::{Tour, TourDraft};
use crate::domain::user::{Email, Registration, Role, User};
use crate::state::Repositories;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Invalid record {id}: {message}")]
    Invalid { id: Uuid, message: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedTour {
    pub id: Uuid,
    #[serde(flatten)]
    pub draft: TourDraft,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub photo: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedReview {
    pub id: Option<Uuid>,
    pub review: String,
    pub rating: i32,
    pub tour: Uuid,
    pub user: Uuid,
}

/// Contents of the three dev-data files
#[derive(Debug, Clone, Default)]
pub struct DevData {
    pub tours: Vec<SeedTour>,
    pub users: Vec<SeedUser>,
    pub reviews: Vec<SeedReview>,
}

/// Counts of imported documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub tours: usize,
    pub users: usize,
    pub reviews: usize,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SeedError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
        path: display,
        source,
    })
}

impl DevData {
    /// Reads `tours.json`, `users.json` and `reviews.json` from `dir`
    pub fn load(dir: &Path) -> Result<Self, SeedError> {
        Ok(Self {
            tours: read_json(&dir.join("tours.json"))?,
            users: read_json(&dir.join("users.json"))?,
            reviews: read_json(&dir.join("reviews.json"))?,
        })
    }
}

fn invalid(id: Uuid, error: impl ToString) -> SeedError {
    SeedError::Invalid {
        id,
        message: error.to_string(),
    }
}

fn build_user(seed: &SeedUser, bcrypt_cost: u32) -> Result<User, SeedError> {
    let registration = Registration {
        name: seed.name.clone(),
        email: Email::new(seed.email.as_str()).map_err(|e| invalid(seed.id, e))?,
        password: seed.password.clone(),
    };
    let password_hash = hash_password(&registration.password, bcrypt_cost)?;

    let mut user = User::register(&registration, password_hash, Utc::now());
    user.id = seed.id;
    user.role = seed.role;
    if let Some(photo) = &seed.photo {
        user.photo = photo.clone();
    }
    Ok(user)
}

fn build_tour(seed: &SeedTour) -> Result<Tour, SeedError> {
    let mut tour = Tour::from_draft(seed.draft.clone()).map_err(|e: DomainError| invalid(seed.id, e))?;
    tour.id = seed.id;
    Ok(tour)
}

fn build_review(seed: &SeedReview) -> Result<Review, SeedError> {
    let id = seed.id.unwrap_or_else(Uuid::new_v4);
    let mut review = Review::from_draft(ReviewDraft {
        review: Some(seed.review.clone()),
        rating: Some(seed.rating),
        tour: Some(seed.tour),
        user: Some(seed.user),
    })
    .map_err(|e| invalid(id, e))?;
    review.id = id;
    Ok(review)
}

/// Inserts every document, then recomputes the rating summary of each tour
///
/// Users go in before reviews so review authors resolve.
pub async fn import(repositories: &Repositories, data: &DevData, bcrypt_cost: u32) -> Result<ImportSummary, SeedError> {
    for seed in &data.tours {
        repositories.tours.as_crud().insert(&build_tour(seed)?).await?;
    }
    tracing::info!(count = data.tours.len(), "Imported tours");

    for seed in &data.users {
        repositories.users.as_crud().insert(&build_user(seed, bcrypt_cost)?).await?;
    }
    tracing::info!(count = data.users.len(), "Imported users");

    for seed in &data.reviews {
        repositories.reviews.as_crud().insert(&build_review(seed)?).await?;
    }
    for seed in &data.tours {
        let summary = repositories.reviews.rating_summary(seed.id).await?;
        repositories.tours.update_ratings(seed.id, summary).await?;
    }
    tracing::info!(count = data.reviews.len(), "Imported reviews");

    Ok(ImportSummary {
        tours: data.tours.len(),
        users: data.users.len(),
        reviews: data.reviews.len(),
    })
}

/// Removes all reviews, tours and users
pub async fn delete(repositories: &Repositories) -> Result<(), SeedError> {
    let reviews = repositories.reviews.delete_all().await?;
    let tours = repositories.tours.delete_all().await?;
    let users = repositories.users.delete_all().await?;
    tracing::info!(reviews, tours, users, "Cleared development data");
    Ok(())
}
