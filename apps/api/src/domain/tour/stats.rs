// Tour aggregations: difficulty statistics, yearly start plan and distances

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::tour::Tour;
use crate::domain::geo::{distance_meters, LatLng};

/// Tours rated at least this well count towards difficulty statistics
pub const STATS_MIN_RATING: f64 = 4.5;

/// Statistics for one difficulty level
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TourStats {
    /// Upper-cased difficulty, e.g. `EASY`
    pub difficulty: String,
    pub num_tours: i64,
    pub num_ratings: i64,
    pub average_rating: f64,
    pub average_price: Decimal,
    pub minimum_price: Decimal,
    pub maximum_price: Decimal,
}

/// Tour starts within one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPlan {
    pub month: i32,
    pub num_tour_starts: i64,
    pub tours: Vec<String>,
}

/// Distance from a search point to a tour's start location
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TourDistance {
    pub id: Uuid,
    pub name: String,
    pub distance: f64,
}

/// Groups well-rated tours by difficulty, cheapest group first
pub fn tour_stats(tours: &[Tour]) -> Vec<TourStats> {
    let mut groups: BTreeMap<String, Vec<&Tour>> = BTreeMap::new();
    for tour in tours
        .iter()
        .filter(|t| !t.secret_tour && t.ratings_average >= STATS_MIN_RATING)
    {
        groups
            .entry(tour.difficulty.as_str().to_uppercase())
            .or_default()
            .push(tour);
    }

    let mut stats: Vec<TourStats> = groups
        .into_iter()
        .map(|(difficulty, group)| {
            let count = group.len();
            let prices = group.iter().map(|t| t.price);
            TourStats {
                difficulty,
                num_tours: count as i64,
                num_ratings: group.iter().map(|t| i64::from(t.ratings_quantity)).sum(),
                average_rating: group.iter().map(|t| t.ratings_average).sum::<f64>() / count as f64,
                average_price: prices.clone().sum::<Decimal>() / Decimal::from(count),
                minimum_price: prices.clone().min().unwrap_or_default(),
                maximum_price: prices.max().unwrap_or_default(),
            }
        })
        .collect();

    stats.sort_by(|a, b| a.average_price.cmp(&b.average_price));
    stats
}

/// Half-open UTC range covering `year`, or `None` when it is out of calendar range
pub fn year_bounds(year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single()?;
    let end = Utc.with_ymd_and_hms(year.checked_add(1)?, 1, 1, 0, 0, 0).single()?;
    Some((start, end))
}

/// Counts tour starts per month of `year`, busiest month first
pub fn monthly_plan(tours: &[Tour], year: i32) -> Vec<MonthlyPlan> {
    let Some((start, end)) = year_bounds(year) else {
        return Vec::new();
    };

    let mut months: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for tour in tours.iter().filter(|t| !t.secret_tour) {
        for date in tour.start_dates.iter().filter(|d| **d >= start && **d < end) {
            months.entry(date.month()).or_default().push(tour.name.clone());
        }
    }

    let mut plan: Vec<MonthlyPlan> = months
        .into_iter()
        .map(|(month, tours)| MonthlyPlan {
            month: month as i32,
            num_tour_starts: tours.len() as i64,
            tours,
        })
        .collect();

    plan.sort_by(|a, b| {
        b.num_tour_starts
            .cmp(&a.num_tour_starts)
            .then(a.month.cmp(&b.month))
    });
    plan
}

/// Distances to every tour with a start location, nearest first
pub fn distances(tours: &[Tour], from: LatLng, multiplier: f64) -> Vec<TourDistance> {
    let mut result: Vec<TourDistance> = tours
        .iter()
        .filter(|t| !t.secret_tour)
        .filter_map(|tour| {
            let start = tour.start_location.as_ref()?;
            Some(TourDistance {
                id: tour.id,
                name: tour.name.clone(),
                distance: distance_meters(from, start.lat_lng()) * multiplier,
            })
        })
        .collect();

    result.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::FromDraft;
    use crate::domain::tour::value_objects::Location;
    use crate::domain::tour::TourDraft;

    fn tour(name: &str, difficulty: &str, price: i64, rating: f64, dates: &[&str]) -> Tour {
        Tour::from_draft(TourDraft {
            name: Some(name.to_string()),
            duration: Some(5),
            max_group_size: Some(10),
            difficulty: Some(difficulty.to_string()),
            ratings_average: Some(rating),
            ratings_quantity: Some(10),
            price: Some(Decimal::from(price)),
            summary: Some("A tour".to_string()),
            image_cover: Some("cover.jpg".to_string()),
            start_dates: Some(
                dates
                    .iter()
                    .map(|d| d.parse().unwrap())
                    .collect(),
            ),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn stats_group_by_difficulty() {
        let tours = vec![
            tour("The Forest Hiker", "easy", 400, 4.7, &[]),
            tour("The City Wanderer", "easy", 1200, 4.6, &[]),
            tour("The Snow Adventurer", "difficult", 1000, 4.5, &[]),
            tour("The Poorly Rated One", "medium", 10, 3.9, &[]),
        ];

        let stats = tour_stats(&tours);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].difficulty, "EASY");
        assert_eq!(stats[0].num_tours, 2);
        assert_eq!(stats[0].num_ratings, 20);
        assert_eq!(stats[0].average_price, Decimal::from(800));
        assert_eq!(stats[0].minimum_price, Decimal::from(400));
        assert_eq!(stats[0].maximum_price, Decimal::from(1200));
        assert_eq!(stats[1].difficulty, "DIFFICULT");
    }

    #[test]
    fn secret_tours_are_not_counted() {
        let mut hidden = tour("The Secret Tour", "easy", 400, 4.9, &[]);
        hidden.secret_tour = true;
        assert!(tour_stats(&[hidden]).is_empty());
    }

    #[test]
    fn plan_counts_starts_in_year() {
        let tours = vec![
            tour("The Forest Hiker", "easy", 400, 4.7, &["2021-04-25T09:00:00Z", "2021-07-20T09:00:00Z", "2022-04-01T09:00:00Z"]),
            tour("The Sea Explorer", "medium", 500, 4.8, &["2021-07-19T09:00:00Z", "2021-12-31T23:00:00Z"]),
        ];

        let plan = monthly_plan(&tours, 2021);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].month, 7);
        assert_eq!(plan[0].num_tour_starts, 2);
        assert_eq!(plan[1].month, 4);
        assert_eq!(plan[2].month, 12);
        assert_eq!(plan[2].tours, vec!["The Sea Explorer".to_string()]);
    }

    #[test]
    fn out_of_range_years_have_no_plan() {
        let tours = vec![tour("The Forest Hiker", "easy", 397, 4.7, &["2021-04-25T09:00:00Z"])];
        assert!(year_bounds(i32::MAX).is_none());
        assert!(year_bounds(i32::MIN).is_none());
        assert!(monthly_plan(&tours, i32::MAX).is_empty());
        assert!(year_bounds(2021).is_some());
    }

    #[test]
    fn distances_are_sorted() {
        let mut near = tour("The Nearby Tour", "easy", 400, 4.7, &[]);
        near.start_location = Some(Location::new(LatLng { lat: 34.0, lng: -118.0 }));
        let mut far = tour("The Faraway Tour", "easy", 400, 4.7, &[]);
        far.start_location = Some(Location::new(LatLng { lat: 40.7, lng: -74.0 }));
        let nowhere = tour("The Homeless Tour", "easy", 400, 4.7, &[]);

        let result = distances(&[far, nowhere, near], LatLng { lat: 34.1, lng: -118.1 }, 0.001);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].name, "The Nearby Tour");
        assert!(result[0].distance < 20.0);
        assert!(result[1].distance > 3000.0);
    }
}
