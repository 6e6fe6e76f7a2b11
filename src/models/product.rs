use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
    pub price: f64,
    pub original_price: Option<f64>,
    pub currency: String,
    pub image_url: Option<String>,
    pub vendor_id: Option<String>,
    pub vendor_name: Option<String>,
    pub category_id: Option<String>,
    pub rating: Option<f32>,
    pub review_count: u32,
    pub in_stock: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Discount relative to the original price, as a whole percentage.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u8> {
        let original = self.original_price?;
        if original <= 0.0 || self.price >= original {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = ((original - self.price) / original * 100.0).round() as u8;
        Some(pct)
    }
}
