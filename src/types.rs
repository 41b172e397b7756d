use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type UserId = u32;
pub type ItemId = u32;

/// Ratings supplied with a single request, keyed by item.
pub type InputRatings = HashMap<ItemId, f32>;

/// One row of the rating dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub user_id: UserId,
    #[serde(rename = "song_id")]
    pub item_id: ItemId,
    pub rating: f32,
    #[serde(rename = "song_name")]
    pub item_name: String,
    pub artist: String,
    pub genre: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub name: String,
    pub artist: String,
    pub genre: String,
}

/// Catalog entry as handed out for cold-start rating collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemSummary {
    pub id: ItemId,
    pub title: String,
    pub artist: String,
    pub genre: String,
}

impl ItemSummary {
    pub fn new(id: ItemId, info: &ItemInfo) -> Self {
        Self {
            id,
            title: info.name.clone(),
            artist: info.artist.clone(),
            genre: info.genre.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub id: ItemId,
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub score: f32,
}

/// A known user and how close they are to the query ratings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub user_id: UserId,
    pub score: f32,
}

/// An item with its accumulated score, before the catalog join.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub item_id: ItemId,
    pub score: f32,
}
