//! In-memory user × item rating matrix and the song catalog.
//!
//! Both are built once from the dataset and never mutated afterwards, so
//! request handlers share them behind an `Arc` without locking.

use std::collections::{BTreeMap, HashMap};

use crate::types::{ItemId, ItemInfo, ItemSummary, RatingRecord, UserId};

/// Item metadata keyed by id, iterated in the order items first appeared in
/// the dataset.
#[derive(Debug, Default, Clone)]
pub struct ItemCatalog {
    entries: Vec<(ItemId, ItemInfo)>,
    positions: HashMap<ItemId, usize>,
    /// genre -> position of the first entry currently carrying it
    genres: HashMap<String, usize>,
}

impl ItemCatalog {
    /// Inserts or replaces the metadata for `id`. A replaced entry keeps its
    /// original position.
    pub fn upsert(&mut self, id: ItemId, info: ItemInfo) {
        match self.positions.get(&id) {
            Some(&pos) => {
                let relabeled = self.entries[pos].1.genre != info.genre;
                self.entries[pos].1 = info;
                if relabeled {
                    self.rank_genres();
                }
            }
            None => {
                let pos = self.entries.len();
                self.genres.entry(info.genre.clone()).or_insert(pos);
                self.positions.insert(id, pos);
                self.entries.push((id, info));
            }
        }
    }

    fn rank_genres(&mut self) {
        self.genres.clear();
        for (pos, (_, info)) in self.entries.iter().enumerate() {
            self.genres.entry(info.genre.clone()).or_insert(pos);
        }
    }

    pub fn get(&self, id: ItemId) -> Option<&ItemInfo> {
        self.positions.get(&id).map(|&pos| &self.entries[pos].1)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Insertion-order position, used as a stable tie-break.
    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Position of the first catalog entry with this genre. `None` for genres
    /// no entry carries.
    pub fn genre_rank(&self, genre: &str) -> Option<usize> {
        self.genres.get(genre).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &ItemInfo)> {
        self.entries.iter().map(|(id, info)| (*id, info))
    }

    pub fn summaries(&self) -> Vec<ItemSummary> {
        self.iter().map(|(id, info)| ItemSummary::new(id, info)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default, Clone)]
pub struct RatingIndex {
    users: BTreeMap<UserId, HashMap<ItemId, f32>>,
    norms: HashMap<UserId, f32>,
    catalog: ItemCatalog,
}

impl RatingIndex {
    /// Ratings of one user, `None` for unknown users.
    pub fn user_ratings(&self, user_id: UserId) -> Option<&HashMap<ItemId, f32>> {
        self.users.get(&user_id)
    }

    /// All users in ascending id order.
    pub fn users(&self) -> impl Iterator<Item = (UserId, &HashMap<ItemId, f32>)> {
        self.users.iter().map(|(id, ratings)| (*id, ratings))
    }

    /// Euclidean norm of a user's full rating vector (unrated items count as 0).
    pub fn user_norm(&self, user_id: UserId) -> f32 {
        self.norms.get(&user_id).copied().unwrap_or(0.0)
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn item_count(&self) -> usize {
        self.catalog.len()
    }

    pub fn rating_count(&self) -> usize {
        self.users.values().map(HashMap::len).sum()
    }
}

/// Accumulates records and freezes them into a `RatingIndex`.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    users: BTreeMap<UserId, HashMap<ItemId, f32>>,
    catalog: ItemCatalog,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record. Returns `true` when it overwrote an earlier rating for
    /// the same (user, item) pair; the later rating wins.
    pub fn insert(&mut self, record: RatingRecord) -> bool {
        let RatingRecord {
            user_id,
            item_id,
            rating,
            item_name,
            artist,
            genre,
        } = record;
        self.catalog.upsert(
            item_id,
            ItemInfo {
                name: item_name,
                artist,
                genre,
            },
        );
        self.users
            .entry(user_id)
            .or_default()
            .insert(item_id, rating)
            .is_some()
    }

    pub fn build(self) -> RatingIndex {
        let norms = self
            .users
            .iter()
            .map(|(&user_id, ratings)| {
                let sum_sq: f32 = ratings.values().map(|r| r * r).sum();
                (user_id, sum_sq.sqrt())
            })
            .collect();
        RatingIndex {
            users: self.users,
            norms,
            catalog: self.catalog,
        }
    }
}

impl FromIterator<RatingRecord> for RatingIndex {
    fn from_iter<T: IntoIterator<Item = RatingRecord>>(iter: T) -> Self {
        let mut builder = IndexBuilder::new();
        for record in iter {
            builder.insert(record);
        }
        builder.build()
    }
}
