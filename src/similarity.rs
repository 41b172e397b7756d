//! Closeness between the query ratings and a known user's ratings.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RecError;
use crate::index::RatingIndex;
use crate::types::{InputRatings, ItemId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Distance over shared items. Lower is closer.
    #[default]
    Euclidean,
    /// Cosine over the full rating vectors. Higher is closer.
    Cosine,
}

/// Which way a metric's scores improve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

impl Metric {
    pub fn direction(self) -> Direction {
        match self {
            Metric::Euclidean => Direction::LowerIsBetter,
            Metric::Cosine => Direction::HigherIsBetter,
        }
    }

    /// Orders two scores so that the closer one comes first.
    pub fn compare(self, a: f32, b: f32) -> Ordering {
        match self.direction() {
            Direction::LowerIsBetter => a.total_cmp(&b),
            Direction::HigherIsBetter => b.total_cmp(&a),
        }
    }

    /// Turns a score into a non-negative neighbor weight, larger for closer
    /// users. Distances map to `1 / (1 + d)`, so users with nothing in common
    /// weigh 0. Negative cosine similarities weigh 0.
    pub fn weight(self, score: f32) -> f32 {
        match self {
            Metric::Euclidean => {
                if score.is_finite() {
                    1.0 / (1.0 + score)
                } else {
                    0.0
                }
            }
            Metric::Cosine => score.max(0.0),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Euclidean => f.write_str("euclidean"),
            Metric::Cosine => f.write_str("cosine"),
        }
    }
}

impl FromStr for Metric {
    type Err = RecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" => Ok(Metric::Euclidean),
            "cosine" => Ok(Metric::Cosine),
            other => Err(RecError::InvalidConfig(format!("unknown metric: {other}"))),
        }
    }
}

/// Euclidean distance over the items both sides rated.
///
/// With nothing in common there is no evidence of closeness, so the distance
/// is `f32::INFINITY` and the user sorts after every user that shares at
/// least one item.
pub fn euclidean_distance(input: &InputRatings, user: &HashMap<ItemId, f32>) -> f32 {
    let mut shared = 0usize;
    let mut sum_sq = 0.0f32;
    for (item_id, r_in) in input {
        if let Some(r_user) = user.get(item_id) {
            let d = r_in - r_user;
            sum_sq += d * d;
            shared += 1;
        }
    }
    if shared == 0 {
        f32::INFINITY
    } else {
        sum_sq.sqrt()
    }
}

/// Cosine similarity: the dot product runs over shared items, the norms over
/// each side's full vector. A zero norm on either side yields 0.
pub fn cosine_similarity(
    input: &InputRatings,
    input_norm: f32,
    user: &HashMap<ItemId, f32>,
    user_norm: f32,
) -> f32 {
    if input_norm == 0.0 || user_norm == 0.0 {
        return 0.0;
    }
    let prod: f32 = input
        .iter()
        .filter_map(|(item_id, r_in)| user.get(item_id).map(|r_user| r_in * r_user))
        .sum();
    (prod / (input_norm * user_norm)).clamp(-1.0, 1.0)
}

/// Norm of the query vector over catalog items. Ratings for items the catalog
/// does not know are outside the vector space and do not count.
pub fn input_norm(input: &InputRatings, index: &RatingIndex) -> f32 {
    input
        .iter()
        .filter(|(item_id, _)| index.catalog().contains(**item_id))
        .map(|(_, r)| r * r)
        .sum::<f32>()
        .sqrt()
}

/// Scores the query against every known user, in ascending user id order.
pub fn score_users(metric: Metric, input: &InputRatings, index: &RatingIndex) -> Vec<(UserId, f32)> {
    match metric {
        Metric::Euclidean => index
            .users()
            .map(|(user_id, ratings)| (user_id, euclidean_distance(input, ratings)))
            .collect(),
        Metric::Cosine => {
            let norm = input_norm(input, index);
            index
                .users()
                .map(|(user_id, ratings)| {
                    let sim = cosine_similarity(input, norm, ratings, index.user_norm(user_id));
                    (user_id, sim)
                })
                .collect()
        }
    }
}

/// Score of a single known user, `None` if the user does not exist.
pub fn similarity(
    metric: Metric,
    input: &InputRatings,
    index: &RatingIndex,
    user_id: UserId,
) -> Option<f32> {
    let ratings = index.user_ratings(user_id)?;
    Some(match metric {
        Metric::Euclidean => euclidean_distance(input, ratings),
        Metric::Cosine => cosine_similarity(
            input,
            input_norm(input, index),
            ratings,
            index.user_norm(user_id),
        ),
    })
}
