// Review domain module

#![allow(clippy::module_inception)]

pub mod review;

pub use review::{RatingSummary, Review, ReviewDraft, ReviewPatch};
