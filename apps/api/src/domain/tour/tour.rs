use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use super::value_objects::{slugify, Difficulty, Location};
use crate::domain::entity::{Entity, Field, FieldKind, FromDraft};
use crate::domain::errors::DomainError;
use crate::domain::review::RatingSummary;

pub const MIN_NAME_LENGTH: usize = 10;
pub const MAX_NAME_LENGTH: usize = 40;
pub const DEFAULT_RATINGS_AVERAGE: f64 = 4.5;

/// Tour aggregate
///
/// # Invariants
/// - `slug` is always derived from `name`
/// - `ratings_average` is kept rounded to one decimal
/// - `price_discount`, when present, is below `price`
#[derive(Debug, Clone, PartialEq)]
pub struct Tour {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub duration: i32,
    pub max_group_size: i32,
    pub difficulty: Difficulty,
    pub ratings_average: f64,
    pub ratings_quantity: i32,
    pub price: Decimal,
    pub price_discount: Option<Decimal>,
    pub summary: String,
    pub description: Option<String>,
    pub image_cover: String,
    pub images: Vec<String>,
    pub start_dates: Vec<DateTime<Utc>>,
    pub secret_tour: bool,
    pub start_location: Option<Location>,
    pub locations: Vec<Location>,
    pub guides: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Tour {
    fn blank(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            slug: String::new(),
            duration: 0,
            max_group_size: 0,
            difficulty: Difficulty::Easy,
            ratings_average: DEFAULT_RATINGS_AVERAGE,
            ratings_quantity: 0,
            price: Decimal::ZERO,
            price_discount: None,
            summary: String::new(),
            description: None,
            image_cover: String::new(),
            images: Vec::new(),
            start_dates: Vec::new(),
            secret_tour: false,
            start_location: None,
            locations: Vec::new(),
            guides: Vec::new(),
            created_at: now,
        }
    }

    /// Length of the tour in weeks
    pub fn duration_weeks(&self) -> f64 {
        f64::from(self.duration) / 7.0
    }

    /// Price in cents, as payment providers expect it
    pub fn price_cents(&self) -> i64 {
        (self.price * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .unwrap_or_default()
    }

    /// Stores a freshly aggregated review summary
    pub fn set_ratings(&mut self, summary: RatingSummary) {
        self.ratings_quantity = summary.quantity;
        self.ratings_average = round_rating(summary.average);
    }

    /// Copies every provided field, returning messages for unreadable values
    fn merge(&mut self, input: TourDraft) -> Vec<String> {
        let mut messages = Vec::new();

        if let Some(name) = input.name {
            self.name = name.trim().to_string();
            self.slug = slugify(&self.name);
        }
        if let Some(duration) = input.duration {
            self.duration = duration;
        }
        if let Some(size) = input.max_group_size {
            self.max_group_size = size;
        }
        if let Some(difficulty) = input.difficulty {
            match difficulty.parse() {
                Ok(difficulty) => self.difficulty = difficulty,
                Err(message) => messages.push(message),
            }
        }
        if let Some(average) = input.ratings_average {
            self.ratings_average = round_rating(average);
        }
        if let Some(quantity) = input.ratings_quantity {
            self.ratings_quantity = quantity;
        }
        if let Some(price) = input.price {
            self.price = price;
        }
        if input.price_discount.is_some() {
            self.price_discount = input.price_discount;
        }
        if let Some(summary) = input.summary {
            self.summary = summary.trim().to_string();
        }
        if let Some(description) = input.description {
            self.description = Some(description.trim().to_string());
        }
        if let Some(cover) = input.image_cover {
            self.image_cover = cover;
        }
        if let Some(images) = input.images {
            self.images = images;
        }
        if let Some(dates) = input.start_dates {
            self.start_dates = dates;
        }
        if let Some(secret) = input.secret_tour {
            self.secret_tour = secret;
        }
        if input.start_location.is_some() {
            self.start_location = input.start_location;
        }
        if let Some(locations) = input.locations {
            self.locations = locations;
        }
        if let Some(guides) = input.guides {
            self.guides = guides;
        }

        messages
    }

    fn validation_messages(&self) -> Vec<String> {
        let mut messages = Vec::new();

        let name_length = self.name.chars().count();
        if name_length == 0 {
            messages.push("A tour must have a name".to_string());
        } else if name_length < MIN_NAME_LENGTH {
            messages.push(format!(
                "A tour name must have more or equal then {} characters",
                MIN_NAME_LENGTH
            ));
        } else if name_length > MAX_NAME_LENGTH {
            messages.push(format!(
                "A tour name must have less or equal then {} characters",
                MAX_NAME_LENGTH
            ));
        }

        if self.duration < 1 {
            messages.push("A tour must have a duration".to_string());
        }
        if self.max_group_size < 1 {
            messages.push("A tour must have a group size".to_string());
        }

        if self.ratings_average < 1.0 {
            messages.push("Rating must be above 1.0".to_string());
        } else if self.ratings_average > 5.0 {
            messages.push("Rating must be below 5.0".to_string());
        }

        if let Some(discount) = self.price_discount {
            if discount >= self.price {
                messages.push(format!(
                    "Discount price ({}) should be below regular price",
                    discount
                ));
            }
        }

        if self.summary.is_empty() {
            messages.push("A tour must have a description".to_string());
        }
        if self.image_cover.trim().is_empty() {
            messages.push("A tour must have a cover image".to_string());
        }

        if let Some(start) = &self.start_location {
            messages.extend(start.messages());
        }
        for location in &self.locations {
            messages.extend(location.messages());
        }

        messages
    }
}

fn round_rating(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl Serialize for Tour {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut doc = serializer.serialize_struct("Tour", 21)?;
        doc.serialize_field("id", &self.id)?;
        doc.serialize_field("name", &self.name)?;
        doc.serialize_field("slug", &self.slug)?;
        doc.serialize_field("duration", &self.duration)?;
        doc.serialize_field("durationWeeks", &self.duration_weeks())?;
        doc.serialize_field("maxGroupSize", &self.max_group_size)?;
        doc.serialize_field("difficulty", &self.difficulty)?;
        doc.serialize_field("ratingsAverage", &self.ratings_average)?;
        doc.serialize_field("ratingsQuantity", &self.ratings_quantity)?;
        doc.serialize_field("price", &self.price)?;
        doc.serialize_field("priceDiscount", &self.price_discount)?;
        doc.serialize_field("summary", &self.summary)?;
        doc.serialize_field("description", &self.description)?;
        doc.serialize_field("imageCover", &self.image_cover)?;
        doc.serialize_field("images", &self.images)?;
        doc.serialize_field("startDates", &self.start_dates)?;
        doc.serialize_field("secretTour", &self.secret_tour)?;
        doc.serialize_field("startLocation", &self.start_location)?;
        doc.serialize_field("locations", &self.locations)?;
        doc.serialize_field("guides", &self.guides)?;
        doc.serialize_field("createdAt", &self.created_at)?;
        doc.end()
    }
}

const TOUR_FIELDS: &[Field] = &[
    Field::new("name", FieldKind::Text),
    Field::new("slug", FieldKind::Text),
    Field::new("duration", FieldKind::Number),
    Field::new("maxGroupSize", FieldKind::Number),
    Field::new("difficulty", FieldKind::Text),
    Field::new("ratingsAverage", FieldKind::Number),
    Field::new("ratingsQuantity", FieldKind::Number),
    Field::new("price", FieldKind::Number),
    Field::new("priceDiscount", FieldKind::Number),
    Field::new("summary", FieldKind::Text),
    Field::new("imageCover", FieldKind::Text),
    Field::new("createdAt", FieldKind::Timestamp),
];

impl Entity for Tour {
    type Patch = TourDraft;

    const NAME: &'static str = "tour";
    const FIELDS: &'static [Field] = TOUR_FIELDS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, patch: TourDraft) -> Result<(), DomainError> {
        let mut next = self.clone();
        let mut messages = next.merge(patch);
        messages.extend(next.validation_messages());
        DomainError::check(messages)?;
        *self = next;
        Ok(())
    }
}

impl FromDraft for Tour {
    type Draft = TourDraft;

    fn from_draft(draft: TourDraft) -> Result<Self, DomainError> {
        let missing_difficulty = draft.difficulty.is_none();
        let missing_price = draft.price.is_none();

        let mut tour = Tour::blank(Utc::now());
        let mut messages = tour.merge(draft);
        if missing_difficulty {
            messages.push("A tour must have a difficulty".to_string());
        }
        if missing_price {
            messages.push("A tour must have a price".to_string());
        }
        messages.extend(tour.validation_messages());

        DomainError::check(messages)?;
        Ok(tour)
    }
}

/// Tour body for `POST` (required fields enforced) and `PATCH` (any subset)
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourDraft {
    pub name: Option<String>,
    pub duration: Option<i32>,
    pub max_group_size: Option<i32>,
    pub difficulty: Option<String>,
    pub ratings_average: Option<f64>,
    pub ratings_quantity: Option<i32>,
    pub price: Option<Decimal>,
    pub price_discount: Option<Decimal>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub image_cover: Option<String>,
    pub images: Option<Vec<String>>,
    pub start_dates: Option<Vec<DateTime<Utc>>>,
    pub secret_tour: Option<bool>,
    pub start_location: Option<Location>,
    pub locations: Option<Vec<Location>>,
    pub guides: Option<Vec<Uuid>>,
}
