use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::{Entity, Field, FieldKind, FromDraft};
use crate::domain::errors::DomainError;
use crate::domain::tour::tour::DEFAULT_RATINGS_AVERAGE;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// A user's review of a tour; one per (tour, user)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub review: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub tour: Uuid,
    pub user: Uuid,
}

fn review_messages(review: &str, rating: i32) -> Vec<String> {
    let mut messages = Vec::new();
    if review.trim().is_empty() {
        messages.push("Review can not be empty".to_string());
    }
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        messages.push(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        ));
    }
    messages
}

const REVIEW_FIELDS: &[Field] = &[
    Field::new("review", FieldKind::Text),
    Field::new("rating", FieldKind::Number),
    Field::new("tour", FieldKind::Id),
    Field::new("user", FieldKind::Id),
    Field::new("createdAt", FieldKind::Timestamp),
];

impl Entity for Review {
    type Patch = ReviewPatch;

    const NAME: &'static str = "review";
    const FIELDS: &'static [Field] = REVIEW_FIELDS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, patch: ReviewPatch) -> Result<(), DomainError> {
        let review = patch.review.unwrap_or_else(|| self.review.clone());
        let rating = patch.rating.unwrap_or(self.rating);
        DomainError::check(review_messages(&review, rating))?;

        self.review = review.trim().to_string();
        self.rating = rating;
        Ok(())
    }
}

impl FromDraft for Review {
    type Draft = ReviewDraft;

    fn from_draft(draft: ReviewDraft) -> Result<Self, DomainError> {
        let mut messages = Vec::new();

        let review = draft.review.unwrap_or_default();
        match draft.rating {
            Some(rating) => messages.extend(review_messages(&review, rating)),
            None => {
                messages.extend(review_messages(&review, MIN_RATING));
                messages.push("A review must have a rating".to_string());
            }
        }
        if draft.tour.is_none() {
            messages.push("Review must belong to a tour".to_string());
        }
        if draft.user.is_none() {
            messages.push("Review must belong to a user".to_string());
        }

        match (draft.rating, draft.tour, draft.user) {
            (Some(rating), Some(tour), Some(user)) if messages.is_empty() => Ok(Review {
                id: Uuid::new_v4(),
                review: review.trim().to_string(),
                rating,
                created_at: Utc::now(),
                tour,
                user,
            }),
            _ => Err(DomainError::Validation(messages)),
        }
    }
}

/// Review body for `POST`; `tour` and `user` are usually filled from the route and session
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReviewDraft {
    pub review: Option<String>,
    pub rating: Option<i32>,
    pub tour: Option<Uuid>,
    pub user: Option<Uuid>,
}

/// Review edits; a review never moves to another tour or author
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReviewPatch {
    pub review: Option<String>,
    pub rating: Option<i32>,
}

/// Review count and mean rating of one tour
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct RatingSummary {
    pub quantity: i32,
    pub average: f64,
}

impl Default for RatingSummary {
    /// Summary of a tour nobody reviewed yet
    fn default() -> Self {
        Self {
            quantity: 0,
            average: DEFAULT_RATINGS_AVERAGE,
        }
    }
}

impl RatingSummary {
    pub fn from_ratings(ratings: impl IntoIterator<Item = i32>) -> Self {
        let (count, total) = ratings
            .into_iter()
            .fold((0i32, 0i64), |(count, total), rating| (count + 1, total + i64::from(rating)));
        if count == 0 {
            return Self::default();
        }
        Self {
            quantity: count,
            average: total as f64 / f64::from(count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ReviewDraft {
        ReviewDraft {
            review: Some("Amazing tour, would book again!".to_string()),
            rating: Some(5),
            tour: Some(Uuid::new_v4()),
            user: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn creates_review() {
        let review = Review::from_draft(draft()).unwrap();
        assert_eq!(review.rating, 5);
    }

    #[test]
    fn requires_text_tour_and_user() {
        let err = Review::from_draft(ReviewDraft {
            rating: Some(4),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Review can not be empty. Review must belong to a tour. Review must belong to a user"
        );
    }

    #[test]
    fn rating_is_bounded() {
        let mut input = draft();
        input.rating = Some(6);
        assert_eq!(
            Review::from_draft(input).unwrap_err().to_string(),
            "Rating must be between 1 and 5"
        );
    }

    #[test]
    fn patch_keeps_tour_and_author() {
        let mut review = Review::from_draft(draft()).unwrap();
        let (tour, user) = (review.tour, review.user);
        review
            .apply(ReviewPatch {
                rating: Some(3),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(review.rating, 3);
        assert_eq!((review.tour, review.user), (tour, user));
    }

    #[test]
    fn summary_of_ratings() {
        let summary = RatingSummary::from_ratings([5, 4, 4]);
        assert_eq!(summary.quantity, 3);
        assert!((summary.average - 4.333).abs() < 0.001);
    }

    #[test]
    fn summary_without_reviews_uses_defaults() {
        let summary = RatingSummary::from_ratings(Vec::new());
        assert_eq!(summary, RatingSummary { quantity: 0, average: 4.5 });
    }
}
