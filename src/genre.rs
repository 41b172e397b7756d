use std::collections::HashMap;

use crate::index::ItemCatalog;
use crate::types::InputRatings;

/// Genre with the largest sum of query ratings.
///
/// Ties go to the genre that comes first in catalog order. `None` when
/// no rated song is in the catalog, which disables the genre filter
/// downstream.
pub fn dominant_genre(input: &InputRatings, catalog: &ItemCatalog) -> Option<String> {
    let mut scores: HashMap<&str, f32> = HashMap::new();
    for (&item_id, &rating) in input {
        if let Some(info) = catalog.get(item_id) {
            *scores.entry(info.genre.as_str()).or_insert(0.0) += rating;
        }
    }

    scores
        .into_iter()
        .map(|(genre, sum)| (genre, sum, catalog.genre_rank(genre).unwrap_or(usize::MAX)))
        .max_by(|(_, sum_a, rank_a), (_, sum_b, rank_b)| {
            sum_a.total_cmp(sum_b).then_with(|| rank_b.cmp(rank_a))
        })
        .map(|(genre, _, _)| genre.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::tests::record;
    use crate::index::RatingIndex;

    fn index() -> RatingIndex {
        vec![
            record(1, 1, 5.0, "Vallenato"),
            record(1, 2, 5.0, "Salsa"),
            record(1, 3, 5.0, "Salsa"),
            record(1, 4, 5.0, "Vallenato"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_weighted_sum_wins() {
        let index = index();
        let input: InputRatings = [(1, 5.0), (2, 2.0), (3, 2.0)].into_iter().collect();
        assert_eq!(dominant_genre(&input, index.catalog()).as_deref(), Some("Vallenato"));
    }

    #[test]
    fn test_tie_goes_to_first_loaded_genre() {
        let index = index();
        let input: InputRatings = [(2, 3.0), (4, 3.0)].into_iter().collect();
        // Vallenato entered the catalog before Salsa.
        assert_eq!(dominant_genre(&input, index.catalog()).as_deref(), Some("Vallenato"));

        let input: InputRatings = [(2, 4.0), (4, 4.0), (3, 0.0)].into_iter().collect();
        assert_eq!(dominant_genre(&input, index.catalog()).as_deref(), Some("Vallenato"));
    }

    #[test]
    fn test_tie_uses_current_genre_of_relabeled_song() {
        let index: RatingIndex = vec![
            record(1, 30, 3.0, "Rock"),
            record(1, 10, 3.0, "Pop"),
            record(2, 30, 3.0, "Salsa"),
        ]
        .into_iter()
        .collect();
        let input: InputRatings = [(30, 4.0), (10, 4.0)].into_iter().collect();
        assert_eq!(dominant_genre(&input, index.catalog()).as_deref(), Some("Salsa"));
    }

    #[test]
    fn test_no_cataloged_items() {
        let index = index();
        assert_eq!(dominant_genre(&InputRatings::new(), index.catalog()), None);
        let input: InputRatings = [(99, 5.0)].into_iter().collect();
        assert_eq!(dominant_genre(&input, index.catalog()), None);
    }
}
