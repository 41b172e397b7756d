use std::collections::HashMap;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::{RecError, Result};
use crate::genre::dominant_genre;
use crate::index::RatingIndex;
use crate::neighbors::nearest_neighbors;
use crate::ranker::{join_catalog, top_candidates, AggregationPolicy, Ranker};
use crate::sampler::sample_items;
use crate::types::{Candidate, InputRatings, ItemId, ItemSummary, Neighbor, Recommendation};

/// Per-request overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendOptions {
    pub k: Option<usize>,
}

pub trait Recommender {
    fn recommend(&self, input: &InputRatings, options: &RecommendOptions) -> Result<Vec<Recommendation>>;
}

/// Ranks songs by how many users rated them, skipping songs in the input.
pub struct MostPopularRecommender {
    pub index: Arc<RatingIndex>,
    pub max_results: usize,
}

impl Recommender for MostPopularRecommender {
    fn recommend(&self, input: &InputRatings, _options: &RecommendOptions) -> Result<Vec<Recommendation>> {
        let mut counter: HashMap<ItemId, usize> = HashMap::new();
        for (_, ratings) in self.index.users() {
            for item_id in ratings.keys() {
                if !input.contains_key(item_id) {
                    *counter.entry(*item_id).or_insert(0) += 1;
                }
            }
        }

        let candidates = counter
            .into_iter()
            .map(|(item_id, count)| Candidate {
                item_id,
                score: count as f32,
            })
            .collect();
        join_catalog(
            &top_candidates(candidates, self.max_results),
            self.index.catalog(),
        )
    }
}

/// User-based k-nearest-neighbor recommender over a shared, read-only index.
#[derive(Debug, Clone)]
pub struct KnnRecommender {
    index: Arc<RatingIndex>,
    config: EngineConfig,
}

impl KnnRecommender {
    pub fn new(index: Arc<RatingIndex>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        if index.user_count() < config.k {
            tracing::info!(
                "k={} exceeds the {} known users, neighbor sets will be clamped",
                config.k,
                index.user_count()
            );
        }
        Ok(Self { index, config })
    }

    pub fn index(&self) -> &RatingIndex {
        &self.index
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Random songs for the user to rate before asking for recommendations.
    pub fn list_random_items(&self, n: usize) -> Vec<ItemSummary> {
        sample_items(self.index.catalog(), n, &mut rand::rng())
    }

    /// The users whose ratings feed a recommendation for `input`.
    pub fn neighbors(&self, input: &InputRatings, options: &RecommendOptions) -> Result<Vec<Neighbor>> {
        validate_ratings(input)?;
        let k = options.k.unwrap_or(self.config.k);
        nearest_neighbors(self.config.metric, input, &self.index, k)
    }

    fn ranker(&self) -> Ranker<'_> {
        Ranker {
            index: &self.index,
            metric: self.config.metric,
            policy: self.config.policy,
            min_rating: self.config.min_rating,
        }
    }
}

impl Recommender for KnnRecommender {
    fn recommend(&self, input: &InputRatings, options: &RecommendOptions) -> Result<Vec<Recommendation>> {
        if input.is_empty() {
            if self.config.allow_empty_input && self.config.policy == AggregationPolicy::Weighted {
                tracing::debug!("Empty ratings, falling back to most popular songs");
                let fallback = MostPopularRecommender {
                    index: Arc::clone(&self.index),
                    max_results: self.config.max_results,
                };
                return fallback.recommend(input, options);
            }
            return Err(RecError::InvalidInput("no ratings were sent".to_string()));
        }

        let neighbors = self.neighbors(input, options)?;
        let genre = match self.config.policy {
            AggregationPolicy::Threshold => dominant_genre(input, self.index.catalog()),
            AggregationPolicy::Weighted => None,
        };
        tracing::debug!(
            "Ranking with {} neighbors, genre filter {:?}",
            neighbors.len(),
            genre
        );
        self.ranker()
            .rank(&neighbors, input, genre.as_deref(), self.config.max_results)
    }
}

fn validate_ratings(input: &InputRatings) -> Result<()> {
    match input.iter().find(|(_, rating)| !rating.is_finite()) {
        Some((item_id, rating)) => Err(RecError::InvalidInput(format!(
            "rating for song {item_id} is not a finite number: {rating}"
        ))),
        None => Ok(()),
    }
}
