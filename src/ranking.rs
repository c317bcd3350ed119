use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::entities::Film;

/// Higher like-count first; on a tie the higher id wins.
pub fn by_popularity(a: &Film, b: &Film) -> Ordering {
    b.rate.cmp(&a.rate).then_with(|| b.id.cmp(&a.id))
}

pub fn most_popular(mut films: Vec<Film>, count: usize) -> Vec<Film> {
    films.sort_by(by_popularity);
    films.truncate(count);
    films
}

pub fn common_ids(a: &BTreeSet<i64>, b: &BTreeSet<i64>) -> BTreeSet<i64> {
    a.intersection(b).copied().collect()
}
