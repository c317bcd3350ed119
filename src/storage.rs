//! Capability traits shared by the in-memory and relational backends.
//!
//! Every mutating call is atomic from a reader's point of view: a failed call leaves the
//! store untouched, and a successful one is never observed half-applied.

use crate::entities::{Film, Genre, MpaRating, User};
use crate::error::Result;

/// CRUD over one kind of record. Identifiers are assigned by the store, grow monotonically
/// and are never reused.
pub trait EntityStore<T> {
    fn list(&self) -> Result<Vec<T>>;
    /// Fails with NotFound for a non-positive or unknown id.
    fn get(&self, id: i64) -> Result<T>;
    /// Ignores any id on `record` and returns the stored copy with its new id.
    fn create(&self, record: T) -> Result<T>;
    /// Replaces every field of the stored record whose id matches `record.id`.
    fn update(&self, record: T) -> Result<T>;
    /// Removes the record and every relationship edge that references it.
    fn delete(&self, id: i64) -> Result<()>;
}

/// Likes (user -> film) and friendships (user <-> user).
pub trait RelationshipIndex {
    fn add_like(&self, film_id: i64, user_id: i64) -> Result<()>;
    fn remove_like(&self, film_id: i64, user_id: i64) -> Result<()>;
    /// Links both directions at once.
    fn add_friend(&self, user_id: i64, friend_id: i64) -> Result<()>;
    /// Unlinks both directions at once.
    fn remove_friend(&self, user_id: i64, friend_id: i64) -> Result<()>;
    fn friends_of(&self, user_id: i64) -> Result<Vec<User>>;
}

/// Derived, read-only views over films and friendships.
pub trait Ranking {
    /// At most `count` films by like-count descending, ties by id descending.
    fn popular(&self, count: usize) -> Result<Vec<Film>>;
    fn common_friends(&self, user_id: i64, other_id: i64) -> Result<Vec<User>>;
}

/// Static reference data, ordered by id.
pub trait ReferenceCatalog {
    fn mpa_ratings(&self) -> Result<Vec<MpaRating>>;
    fn mpa_rating(&self, id: i32) -> Result<MpaRating>;
    fn genres(&self) -> Result<Vec<Genre>>;
    fn genre(&self, id: i32) -> Result<Genre>;
}

pub trait Storage:
    EntityStore<Film> + EntityStore<User> + RelationshipIndex + Ranking + ReferenceCatalog + Send + Sync
{
}

impl<T> Storage for T where
    T: EntityStore<Film>
        + EntityStore<User>
        + RelationshipIndex
        + Ranking
        + ReferenceCatalog
        + Send
        + Sync
{
}
