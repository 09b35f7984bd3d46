use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::{Entity, Field, FieldKind, FromDraft};
use crate::domain::errors::DomainError;

/// A paid (or pending) seat on a tour
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub tour: Uuid,
    pub user: Uuid,
    pub price: Decimal,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Booking recorded after a completed checkout
    pub fn paid(tour: Uuid, user: Uuid, price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            tour,
            user,
            price,
            paid: true,
            created_at: Utc::now(),
        }
    }
}

fn price_messages(price: Decimal) -> Vec<String> {
    if price.is_sign_negative() {
        vec!["Booking price must not be negative".to_string()]
    } else {
        Vec::new()
    }
}

const BOOKING_FIELDS: &[Field] = &[
    Field::new("tour", FieldKind::Id),
    Field::new("user", FieldKind::Id),
    Field::new("price", FieldKind::Number),
    Field::new("paid", FieldKind::Bool),
    Field::new("createdAt", FieldKind::Timestamp),
];

impl Entity for Booking {
    type Patch = BookingPatch;

    const NAME: &'static str = "booking";
    const FIELDS: &'static [Field] = BOOKING_FIELDS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, patch: BookingPatch) -> Result<(), DomainError> {
        if let Some(price) = patch.price {
            DomainError::check(price_messages(price))?;
            self.price = price;
        }
        if let Some(paid) = patch.paid {
            self.paid = paid;
        }
        Ok(())
    }
}

impl FromDraft for Booking {
    type Draft = BookingDraft;

    fn from_draft(draft: BookingDraft) -> Result<Self, DomainError> {
        let mut messages = Vec::new();
        if draft.tour.is_none() {
            messages.push("Booking must belong to a tour".to_string());
        }
        if draft.user.is_none() {
            messages.push("Booking must belong to a user".to_string());
        }
        match draft.price {
            Some(price) => messages.extend(price_messages(price)),
            None => messages.push("Booking must have a price".to_string()),
        }

        match (draft.tour, draft.user, draft.price) {
            (Some(tour), Some(user), Some(price)) if messages.is_empty() => Ok(Booking {
                paid: draft.paid.unwrap_or(true),
                ..Booking::paid(tour, user, price)
            }),
            _ => Err(DomainError::Validation(messages)),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct BookingDraft {
    pub tour: Option<Uuid>,
    pub user: Option<Uuid>,
    pub price: Option<Decimal>,
    pub paid: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct BookingPatch {
    pub price: Option<Decimal>,
    pub paid: Option<bool>,
}
