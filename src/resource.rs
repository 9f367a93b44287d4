use serde::{Deserialize, Serialize};

use crate::coords::Coordinates;

/// Categories a donated resource can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceCategory {
    Clothing,
    Food,
    Tools,
    Toys,
    Furniture,
    Electronics,
    Books,
    Hygiene,
    SchoolSupplies,
    Others,
}

impl ResourceCategory {
    /// Wire spelling, as used in popups and REST payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clothing => "CLOTHING",
            Self::Food => "FOOD",
            Self::Tools => "TOOLS",
            Self::Toys => "TOYS",
            Self::Furniture => "FURNITURE",
            Self::Electronics => "ELECTRONICS",
            Self::Books => "BOOKS",
            Self::Hygiene => "HYGIENE",
            Self::SchoolSupplies => "SCHOOL_SUPPLIES",
            Self::Others => "OTHERS",
        }
    }
}

/// Lifecycle of a donation: available, claimed by a receiver, being
/// delivered, delivered, or cancelled by the donor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    Available,
    Claimed,
    InTransit,
    Delivered,
    Cancelled,
}

/// A donated resource as served by the backend. Coordinates are where the
/// donor published it; receiver fields appear once it is claimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub category: ResourceCategory,
    pub status: ResourceStatus,
    pub donor_id: u64,
    pub donor_name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Resource {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}
