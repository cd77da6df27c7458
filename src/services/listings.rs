use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::ListingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    #[default]
    Good,
    Fair,
}

/// A secondhand item for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Whole won.
    pub price: u64,
    pub category: String,
    pub condition: Condition,
    pub location: String,
    pub image_url: Option<String>,
    pub seller_id: String,
    pub seller_name: String,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

/// What a seller submits. The store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub price: u64,
    pub category: String,
    pub condition: Condition,
    pub location: String,
    pub image_url: Option<String>,
    pub seller_id: String,
    pub seller_name: String,
    pub tags: Vec<String>,
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn create(&self, listing: NewListing) -> Result<Listing, ListingError>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<Listing>, ListingError>;
    async fn get(&self, id: Uuid) -> Result<Option<Listing>, ListingError>;
    async fn by_category(&self, category: &str) -> Result<Vec<Listing>, ListingError>;
}

#[derive(Debug, Default)]
pub struct InMemoryListingStore {
    listings: RwLock<Vec<Listing>>,
}

impl InMemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ListingStore for InMemoryListingStore {
    async fn create(&self, listing: NewListing) -> Result<Listing, ListingError> {
        if listing.title.trim().is_empty() {
            return Err(ListingError::InvalidListing("제목을 입력해주세요.".into()));
        }
        let created = Listing {
            id: Uuid::new_v4(),
            title: listing.title.trim().to_string(),
            description: listing.description,
            price: listing.price,
            category: listing.category,
            condition: listing.condition,
            location: listing.location,
            image_url: listing.image_url,
            seller_id: listing.seller_id,
            seller_name: listing.seller_name,
            created_at: Utc::now(),
            tags: listing.tags,
        };
        self.listings.write().map_err(|_| ListingError::Poisoned)?.push(created.clone());
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<Listing>, ListingError> {
        let listings = self.listings.read().map_err(|_| ListingError::Poisoned)?;
        Ok(listings.iter().rev().cloned().collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Listing>, ListingError> {
        let listings = self.listings.read().map_err(|_| ListingError::Poisoned)?;
        Ok(listings.iter().find(|l| l.id == id).cloned())
    }

    async fn by_category(&self, category: &str) -> Result<Vec<Listing>, ListingError> {
        let listings = self.listings.read().map_err(|_| ListingError::Poisoned)?;
        Ok(listings
            .iter()
            .rev()
            .filter(|l| l.category.eq_ignore_ascii_case(category))
            .cloned()
            .collect())
    }
}
