use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{event_reviews::EventReviewEntity, users::UserSummaryEntity};

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewerDto {
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewDto {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: ReviewerDto,
}

impl ReviewDto {
    pub fn from_entities(review: EventReviewEntity, reviewer: UserSummaryEntity) -> Self {
        Self {
            id: review.id,
            event_id: review.event_id,
            user_id: review.user_id,
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at,
            updated_at: review.updated_at,
            user: ReviewerDto {
                full_name: reviewer.full_name,
                created_at: reviewer.created_at,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventReviewsDto {
    pub reviews: Vec<ReviewDto>,
    pub average_rating: f64,
    pub total_reviews: usize,
}

impl EventReviewsDto {
    pub fn new(reviews: Vec<ReviewDto>) -> Self {
        let ratings: Vec<i16> = reviews.iter().map(|review| review.rating).collect();
        Self {
            average_rating: average_rating(&ratings),
            total_reviews: reviews.len(),
            reviews,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertReviewModel {
    pub event_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
}

/// Mean rating rounded to one decimal place; zero when there are no reviews.
pub fn average_rating(ratings: &[i16]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }

    let sum: i64 = ratings.iter().map(|rating| i64::from(*rating)).sum();
    let mean = sum as f64 / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reviews_average_to_zero() {
        assert_eq!(average_rating(&[]), 0.0);
    }

    #[test]
    fn average_is_rounded_to_one_decimal() {
        assert_eq!(average_rating(&[5, 4, 4]), 4.3);
        assert_eq!(average_rating(&[5, 4]), 4.5);
        assert_eq!(average_rating(&[1, 2, 2]), 1.7);
    }
}
