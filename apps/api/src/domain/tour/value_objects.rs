use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::geo::LatLng;

pub const DIFFICULTY_MESSAGE: &str = "Difficulty is either: easy, medium, difficult";

/// Tour difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Difficult => "difficult",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "difficult" => Ok(Difficulty::Difficult),
            _ => Err(DIFFICULTY_MESSAGE.to_string()),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn point() -> String {
    "Point".to_string()
}

/// GeoJSON point with an optional itinerary day
///
/// `coordinates` are `[longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type", default = "point")]
    pub kind: String,
    pub coordinates: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

impl Location {
    pub fn new(lat_lng: LatLng) -> Self {
        Self {
            kind: point(),
            coordinates: [lat_lng.lng, lat_lng.lat],
            address: None,
            description: None,
            day: None,
        }
    }

    pub fn lat_lng(&self) -> LatLng {
        LatLng {
            lat: self.coordinates[1],
            lng: self.coordinates[0],
        }
    }

    /// Validator messages for a point
    pub fn messages(&self) -> Vec<String> {
        let mut messages = Vec::new();
        if self.kind != "Point" {
            messages.push("Location type must be Point".to_string());
        }
        let [lng, lat] = self.coordinates;
        if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
            messages.push("Location coordinates must be [longitude, latitude]".to_string());
        }
        messages
    }
}

/// URL slug: lowercase ASCII alphanumerics joined by single dashes
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
