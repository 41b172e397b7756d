//! Turns a neighbor set into ranked song recommendations.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RecError, Result};
use crate::index::{ItemCatalog, RatingIndex};
use crate::similarity::Metric;
use crate::types::{Candidate, InputRatings, ItemId, Neighbor, Recommendation};

/// How neighbor ratings are folded into per-song scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationPolicy {
    /// Sum raw ratings above `min_rating`, restricted to the dominant genre.
    #[default]
    Threshold,
    /// Sum `weight(similarity) * rating` over every rating, no genre filter.
    /// See [`Metric::weight`]: distances become `1 / (1 + d)` and negative
    /// cosine similarities are clamped to 0, so dissimilar neighbors add
    /// nothing rather than subtracting.
    Weighted,
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationPolicy::Threshold => f.write_str("threshold"),
            AggregationPolicy::Weighted => f.write_str("weighted"),
        }
    }
}

impl FromStr for AggregationPolicy {
    type Err = RecError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "threshold" => Ok(AggregationPolicy::Threshold),
            "weighted" => Ok(AggregationPolicy::Weighted),
            other => Err(RecError::InvalidConfig(format!(
                "unknown aggregation policy: {other}"
            ))),
        }
    }
}

pub struct Ranker<'a> {
    pub index: &'a RatingIndex,
    pub metric: Metric,
    pub policy: AggregationPolicy,
    pub min_rating: f32,
}

impl Ranker<'_> {
    /// Accumulates a score for every song a neighbor rated and the query did
    /// not. `genre` only applies under the threshold policy.
    pub fn score_candidates(
        &self,
        neighbors: &[Neighbor],
        input: &InputRatings,
        genre: Option<&str>,
    ) -> Result<Vec<Candidate>> {
        let mut scores: HashMap<ItemId, f32> = HashMap::new();
        for neighbor in neighbors {
            let Some(ratings) = self.index.user_ratings(neighbor.user_id) else {
                continue;
            };
            let weight = self.metric.weight(neighbor.score);
            for (&item_id, &rating) in ratings {
                if input.contains_key(&item_id) {
                    continue;
                }
                match self.policy {
                    AggregationPolicy::Threshold => {
                        if rating <= self.min_rating {
                            continue;
                        }
                        if let Some(genre) = genre {
                            let info = self
                                .index
                                .catalog()
                                .get(item_id)
                                .ok_or(RecError::ItemMissing(item_id))?;
                            if info.genre != genre {
                                continue;
                            }
                        }
                        *scores.entry(item_id).or_insert(0.0) += rating;
                    }
                    AggregationPolicy::Weighted => {
                        *scores.entry(item_id).or_insert(0.0) += weight * rating;
                    }
                }
            }
        }
        Ok(scores
            .into_iter()
            .map(|(item_id, score)| Candidate { item_id, score })
            .collect())
    }

    /// Scores, orders and joins the top `max_results` songs with the catalog.
    pub fn rank(
        &self,
        neighbors: &[Neighbor],
        input: &InputRatings,
        genre: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<Recommendation>> {
        let candidates = self.score_candidates(neighbors, input, genre)?;
        let top = top_candidates(candidates, max_results);
        join_catalog(&top, self.index.catalog())
    }
}

/// Sorts by score descending, then item id ascending, and truncates.
pub fn top_candidates(mut candidates: Vec<Candidate>, max_results: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    candidates.truncate(max_results);
    candidates
}

pub fn join_catalog(candidates: &[Candidate], catalog: &ItemCatalog) -> Result<Vec<Recommendation>> {
    candidates
        .iter()
        .map(|c| {
            let info = catalog.get(c.item_id).ok_or_else(|| {
                tracing::error!("Song {} is rated but missing from the catalog", c.item_id);
                RecError::ItemMissing(c.item_id)
            })?;
            Ok(Recommendation {
                id: c.item_id,
                title: info.name.clone(),
                artist: info.artist.clone(),
                genre: info.genre.clone(),
                score: c.score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::tests::record;

    fn index() -> RatingIndex {
        vec![
            record(1, 1, 5.0, "Pop"),
            record(1, 2, 4.0, "Pop"),
            record(1, 3, 5.0, "Rock"),
            record(1, 4, 2.0, "Pop"),
            record(2, 2, 5.0, "Pop"),
            record(2, 5, 3.5, "Pop"),
            record(2, 6, 1.0, "Rock"),
        ]
        .into_iter()
        .collect()
    }

    fn neighbors() -> Vec<Neighbor> {
        vec![
            Neighbor { user_id: 1, score: 0.0 },
            Neighbor { user_id: 2, score: 1.0 },
        ]
    }

    fn ranker(index: &RatingIndex, policy: AggregationPolicy) -> Ranker<'_> {
        Ranker {
            index,
            metric: Metric::Euclidean,
            policy,
            min_rating: 3.0,
        }
    }

    fn ids(recs: &[Recommendation]) -> Vec<ItemId> {
        recs.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_threshold_with_genre_filter() {
        let index = index();
        let input: InputRatings = [(1, 5.0)].into_iter().collect();

        let recs = ranker(&index, AggregationPolicy::Threshold)
            .rank(&neighbors(), &input, Some("Pop"), 5)
            .unwrap();
        // 2: 4 + 5, 5: 3.5; 3 is Rock, 4 and 6 are not above 3.
        assert_eq!(ids(&recs), vec![2, 5]);
        assert_eq!(recs[0].score, 9.0);
        assert_eq!(recs[0].title, "Song 2");
    }

    #[test]
    fn test_threshold_without_genre() {
        let index = index();
        let input: InputRatings = [(1, 5.0)].into_iter().collect();

        let recs = ranker(&index, AggregationPolicy::Threshold)
            .rank(&neighbors(), &input, None, 5)
            .unwrap();
        assert_eq!(ids(&recs), vec![2, 3, 5]);
    }

    #[test]
    fn test_weighted_uses_neighbor_weight() {
        let index = index();
        let input: InputRatings = [(1, 5.0)].into_iter().collect();

        let recs = ranker(&index, AggregationPolicy::Weighted)
            .rank(&neighbors(), &input, Some("Rock"), 10)
            .unwrap();
        // weights: user 1 -> 1.0, user 2 -> 0.5
        let scores: HashMap<ItemId, f32> = recs.iter().map(|r| (r.id, r.score)).collect();
        assert_eq!(scores[&2], 4.0 + 2.5);
        assert_eq!(scores[&3], 5.0);
        assert_eq!(scores[&4], 2.0);
        assert_eq!(scores[&6], 0.5);
        assert_eq!(ids(&recs), vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_weighted_ignores_dissimilar_cosine_neighbors() {
        let index = index();
        let input: InputRatings = [(1, 5.0)].into_iter().collect();
        let neighbors = vec![
            Neighbor { user_id: 1, score: 0.5 },
            Neighbor { user_id: 2, score: -0.8 },
        ];
        let ranker = Ranker {
            index: &index,
            metric: Metric::Cosine,
            policy: AggregationPolicy::Weighted,
            min_rating: 3.0,
        };

        let recs = ranker.rank(&neighbors, &input, None, 10).unwrap();
        let scores: HashMap<ItemId, f32> = recs.iter().map(|r| (r.id, r.score)).collect();
        assert_eq!(scores[&2], 2.0);
        assert_eq!(scores[&3], 2.5);
        assert_eq!(scores[&5], 0.0);
        assert_eq!(scores[&6], 0.0);
    }

    #[test]
    fn test_ties_break_by_item_id_and_truncate() {
        let candidates = vec![
            Candidate { item_id: 9, score: 2.0 },
            Candidate { item_id: 3, score: 2.0 },
            Candidate { item_id: 5, score: 4.0 },
        ];
        let top = top_candidates(candidates, 2);
        let ids: Vec<ItemId> = top.iter().map(|c| c.item_id).collect();
        assert_eq!(ids, vec![5, 3]);
    }

    #[test]
    fn test_missing_catalog_entry_is_reported() {
        let catalog = ItemCatalog::default();
        let err = join_catalog(&[Candidate { item_id: 7, score: 1.0 }], &catalog).unwrap_err();
        assert!(matches!(err, RecError::ItemMissing(7)));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "Weighted".parse::<AggregationPolicy>().unwrap(),
            AggregationPolicy::Weighted
        );
        assert!("popular".parse::<AggregationPolicy>().is_err());
    }
}
