use crate::error::{RecError, Result};
use crate::index::RatingIndex;
use crate::similarity::{score_users, Metric};
use crate::types::{InputRatings, Neighbor, UserId};

/// Keeps the `k` closest users.
///
/// Scores are ordered by the metric's direction, ties by ascending user id.
/// `k` larger than the number of users is clamped; `k == 0` is rejected.
pub fn top_k(metric: Metric, scores: Vec<(UserId, f32)>, k: usize) -> Result<Vec<Neighbor>> {
    if k == 0 {
        return Err(RecError::InvalidConfig("k must be at least 1".to_string()));
    }
    let mut neighbors: Vec<Neighbor> = scores
        .into_iter()
        .map(|(user_id, score)| Neighbor { user_id, score })
        .collect();
    neighbors.sort_by(|a, b| {
        metric
            .compare(a.score, b.score)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    neighbors.truncate(k);
    Ok(neighbors)
}

/// Scores every user against `input` and selects the `k` nearest.
pub fn nearest_neighbors(
    metric: Metric,
    input: &InputRatings,
    index: &RatingIndex,
    k: usize,
) -> Result<Vec<Neighbor>> {
    let neighbors = top_k(metric, score_users(metric, input, index), k)?;
    tracing::debug!(
        "Selected {} of {} users as neighbors ({metric}, k={k})",
        neighbors.len(),
        index.user_count()
    );
    Ok(neighbors)
}
