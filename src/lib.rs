//! User-based k-nearest-neighbor song recommendations from explicit ratings.
//!
//! The rating index is loaded once at startup and stays read-only, so every
//! request runs against shared state without locking.

pub mod config;
pub mod datasets;
pub mod error;
pub mod genre;
pub mod index;
pub mod neighbors;
pub mod ranker;
pub mod recommenders;
pub mod sampler;
pub mod server;
pub mod similarity;
pub mod types;

pub use config::EngineConfig;
pub use error::{RecError, Result};
pub use index::{ItemCatalog, RatingIndex};
pub use ranker::AggregationPolicy;
pub use recommenders::{KnnRecommender, MostPopularRecommender, RecommendOptions, Recommender};
pub use similarity::Metric;
pub use types::{InputRatings, ItemId, ItemSummary, Neighbor, RatingRecord, Recommendation, UserId};
