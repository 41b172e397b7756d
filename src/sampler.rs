use rand::seq::SliceRandom;
use rand::Rng;

use crate::index::ItemCatalog;
use crate::types::ItemSummary;

/// Up to `n` distinct catalog songs, drawn uniformly without replacement.
/// Asking for more than the catalog holds returns all of it, shuffled.
pub fn sample_items<R: Rng + ?Sized>(catalog: &ItemCatalog, n: usize, rng: &mut R) -> Vec<ItemSummary> {
    let mut items = catalog.summaries();
    items.shuffle(rng);
    items.truncate(n);
    items
}
