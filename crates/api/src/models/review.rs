//! Review domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::{ProductId, ReviewId, Stars, UserId};

/// A product review with its author's name.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub author_name: String,
    pub comment: String,
    pub stars: Stars,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /resenas/{product_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub comment: String,
    pub stars: Stars,
}
