// Tour domain module
// Tour aggregate, its value objects and aggregations

#![allow(clippy::module_inception)]

pub mod stats;
pub mod tour;
pub mod value_objects;

pub use stats::{MonthlyPlan, TourDistance, TourStats};
pub use tour::{Tour, TourDraft};
pub use value_objects::{Difficulty, Location};
