// Server-rendered pages
// Templates live in `templates/` and autoescape HTML; the structs below hold
// display-ready values so templates stay free of logic

use askama::Template;
use axum::response::Html;

use crate::domain::review::Review;
use crate::domain::tour::Tour;
use crate::domain::user::{ReviewAuthor, User, UserSummary};

pub const OVERVIEW_TITLE: &str = "Exciting tours for adventurous people";

/// Summary card on the overview and bookings pages
#[derive(Debug, Clone)]
pub struct TourCard {
    pub slug: String,
    pub name: String,
    pub image_cover: String,
    pub headline: String,
    pub summary: String,
    pub start: String,
    pub next_date: String,
    pub stops: usize,
    pub group_size: i32,
    pub price: String,
    pub rating: String,
    pub ratings_quantity: i32,
}

fn next_date(tour: &Tour) -> String {
    tour.start_dates
        .first()
        .map(|date| date.format("%B %Y").to_string())
        .unwrap_or_else(|| "To be announced".to_string())
}

fn start_description(tour: &Tour) -> String {
    tour.start_location
        .as_ref()
        .and_then(|location| location.description.clone())
        .unwrap_or_default()
}

impl From<&Tour> for TourCard {
    fn from(tour: &Tour) -> Self {
        Self {
            slug: tour.slug.clone(),
            name: tour.name.clone(),
            image_cover: tour.image_cover.clone(),
            headline: format!("{} {}-day tour", tour.difficulty, tour.duration),
            summary: tour.summary.clone(),
            start: start_description(tour),
            next_date: next_date(tour),
            stops: tour.locations.len(),
            group_size: tour.max_group_size,
            price: tour.price.normalize().to_string(),
            rating: format!("{:.1}", tour.ratings_average),
            ratings_quantity: tour.ratings_quantity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GuideCard {
    pub name: String,
    pub photo: String,
    pub label: &'static str,
}

impl From<&UserSummary> for GuideCard {
    fn from(guide: &UserSummary) -> Self {
        let label = match guide.role.as_str() {
            "lead-guide" => "Lead guide",
            _ => "Tour guide",
        };
        Self {
            name: guide.name.clone(),
            photo: guide.photo.clone(),
            label,
        }
    }
}

/// A review as shown on a tour page
#[derive(Debug, Clone)]
pub struct ReviewCard {
    pub text: String,
    pub author_name: String,
    pub author_photo: String,
    /// `active`/`inactive` per star
    pub stars: Vec<&'static str>,
}

impl ReviewCard {
    pub fn new(review: &Review, author: Option<&ReviewAuthor>) -> Self {
        Self {
            text: review.review.clone(),
            author_name: author.map(|a| a.name.clone()).unwrap_or_default(),
            author_photo: author
                .map(|a| a.photo.clone())
                .unwrap_or_else(|| "default.jpg".to_string()),
            stars: (1..=5)
                .map(|n| if review.rating >= n { "active" } else { "inactive" })
                .collect(),
        }
    }
}

/// Everything the tour page shows
#[derive(Debug, Clone)]
pub struct TourDetail {
    pub id: String,
    pub name: String,
    pub image_cover: String,
    pub images: Vec<String>,
    pub duration: i32,
    pub start: String,
    pub next_date: String,
    pub difficulty: String,
    pub group_size: i32,
    pub rating: String,
    pub paragraphs: Vec<String>,
    pub guides: Vec<GuideCard>,
    pub reviews: Vec<ReviewCard>,
    /// Tour locations as JSON for the map script
    pub locations_json: String,
}

impl TourDetail {
    pub fn new(tour: &Tour, guides: &[UserSummary], reviews: Vec<ReviewCard>) -> Self {
        Self {
            id: tour.id.to_string(),
            name: tour.name.clone(),
            image_cover: tour.image_cover.clone(),
            images: tour.images.clone(),
            duration: tour.duration,
            start: start_description(tour),
            next_date: next_date(tour),
            difficulty: tour.difficulty.to_string(),
            group_size: tour.max_group_size,
            rating: format!("{:.1} / 5", tour.ratings_average),
            paragraphs: tour
                .description
                .as_deref()
                .unwrap_or_default()
                .split('\n')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect(),
            guides: guides.iter().map(GuideCard::from).collect(),
            reviews,
            locations_json: serde_json::to_string(&tour.locations).unwrap_or_else(|_| "[]".to_string()),
        }
    }
}

#[derive(Template)]
#[template(path = "overview.html")]
pub struct OverviewPage<'a> {
    pub title: &'a str,
    pub user: Option<&'a User>,
    pub tours: Vec<TourCard>,
}

#[derive(Template)]
#[template(path = "tour.html")]
pub struct TourPage<'a> {
    pub title: &'a str,
    pub user: Option<&'a User>,
    pub tour: TourDetail,
    pub mapbox_token: &'a str,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage<'a> {
    pub title: &'a str,
    pub user: Option<&'a User>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupPage<'a> {
    pub title: &'a str,
    pub user: Option<&'a User>,
}

#[derive(Template)]
#[template(path = "account.html")]
pub struct AccountPage<'a> {
    pub title: &'a str,
    pub user: Option<&'a User>,
    pub account: &'a User,
}

#[derive(Template)]
#[template(path = "forget_password.html")]
pub struct ForgetPasswordPage<'a> {
    pub title: &'a str,
    pub user: Option<&'a User>,
}

#[derive(Template)]
#[template(path = "reset_password.html")]
pub struct ResetPasswordPage<'a> {
    pub title: &'a str,
    pub user: Option<&'a User>,
    pub token: &'a str,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage<'a> {
    pub title: &'a str,
    pub user: Option<&'a User>,
    pub message: &'a str,
}

/// Renders a template into an HTML response body
pub fn render<T: Template>(page: &T) -> Result<Html<String>, askama::Error> {
    page.render().map(Html)
}
