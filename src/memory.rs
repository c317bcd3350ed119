//! In-process backend. The whole aggregate sits behind a single `RwLock`, so readers always
//! see either all of a mutation or none of it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;

use crate::entities::{Film, Genre, MpaRating, User};
use crate::error::{FilmorateError, Result};
use crate::ranking;
use crate::storage::{EntityStore, Ranking, ReferenceCatalog, RelationshipIndex};

pub fn default_mpa_ratings() -> Vec<MpaRating> {
    vec![
        MpaRating::new(1, "G"),
        MpaRating::new(2, "PG"),
        MpaRating::new(3, "PG-13"),
        MpaRating::new(4, "R"),
        MpaRating::new(5, "NC-17"),
    ]
}

pub fn default_genres() -> Vec<Genre> {
    vec![
        Genre::new(1, "Comedy"),
        Genre::new(2, "Drama"),
        Genre::new(3, "Animation"),
        Genre::new(4, "Thriller"),
        Genre::new(5, "Documentary"),
        Genre::new(6, "Action"),
    ]
}

#[derive(Debug)]
struct State {
    films: BTreeMap<i64, Film>,
    users: BTreeMap<i64, User>,
    // film id -> ids of users who like it
    likes: BTreeMap<i64, BTreeSet<i64>>,
    // user id -> friend ids, always mirrored
    friends: BTreeMap<i64, BTreeSet<i64>>,
    last_film_id: i64,
    last_user_id: i64,
    mpa_ratings: Vec<MpaRating>,
    genres: Vec<Genre>,
}

impl State {
    fn new() -> Self {
        Self {
            films: BTreeMap::new(),
            users: BTreeMap::new(),
            likes: BTreeMap::new(),
            friends: BTreeMap::new(),
            last_film_id: 0,
            last_user_id: 0,
            mpa_ratings: default_mpa_ratings(),
            genres: default_genres(),
        }
    }

    /// A detached copy of the film with its likes filled in.
    fn film(&self, id: i64) -> Result<Film> {
        let mut film = self
            .films
            .get(&id)
            .cloned()
            .ok_or_else(|| FilmorateError::not_found("Film not found"))?;
        film.likes = self.likes.get(&id).cloned().unwrap_or_default();
        film.rate = film.likes.len() as i32;
        Ok(film)
    }

    fn user(&self, id: i64) -> Result<User> {
        let mut user = self
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| FilmorateError::not_found("User not found"))?;
        user.friends = self.friends.get(&id).cloned().unwrap_or_default();
        Ok(user)
    }

    fn users_by_ids(&self, ids: &BTreeSet<i64>) -> Result<Vec<User>> {
        ids.iter().map(|id| self.user(*id)).collect()
    }

    fn ensure_film(&self, id: i64) -> Result<()> {
        if self.films.contains_key(&id) {
            Ok(())
        } else {
            Err(FilmorateError::not_found("Film not found"))
        }
    }

    fn ensure_user(&self, id: i64) -> Result<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(FilmorateError::not_found("User not found"))
        }
    }

    fn friend_ids(&self, id: i64) -> BTreeSet<i64> {
        self.friends.get(&id).cloned().unwrap_or_default()
    }

    fn mpa_rating(&self, id: i32) -> Result<MpaRating> {
        self.mpa_ratings
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| FilmorateError::not_found("MPA rating not found"))
    }

    fn genre(&self, id: i32) -> Result<Genre> {
        self.genres
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or_else(|| FilmorateError::not_found("Genre not found"))
    }

    /// Swaps client-supplied references for catalog entries and drops edge data, leaving
    /// the record in the shape it is stored in.
    fn prepare_film(&self, mut film: Film) -> Result<Film> {
        if let Some(mpa) = film.mpa.as_mut() {
            *mpa = self.mpa_rating(mpa.id)?;
        }
        for genre in film.genres.iter_mut() {
            *genre = self.genre(genre.id)?;
        }
        film.normalize_genres();
        film.rate = 0;
        film.likes.clear();
        Ok(film)
    }
}

#[derive(Debug)]
pub struct MemoryStorage {
    state: RwLock<State>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| anyhow!("storage lock poisoned").into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| anyhow!("storage lock poisoned").into())
    }
}

impl EntityStore<Film> for MemoryStorage {
    fn list(&self) -> Result<Vec<Film>> {
        let state = self.read()?;
        state.films.keys().map(|id| state.film(*id)).collect()
    }

    fn get(&self, id: i64) -> Result<Film> {
        self.read()?.film(id)
    }

    fn create(&self, record: Film) -> Result<Film> {
        let mut state = self.write()?;
        let mut film = state.prepare_film(record)?;
        state.last_film_id += 1;
        film.id = state.last_film_id;
        state.films.insert(film.id, film.clone());
        Ok(film)
    }

    fn update(&self, record: Film) -> Result<Film> {
        let mut state = self.write()?;
        state.ensure_film(record.id)?;
        let film = state.prepare_film(record)?;
        let id = film.id;
        state.films.insert(id, film);
        state.film(id)
    }

    fn delete(&self, id: i64) -> Result<()> {
        let mut state = self.write()?;
        state
            .films
            .remove(&id)
            .ok_or_else(|| FilmorateError::not_found("Film not found"))?;
        state.likes.remove(&id);
        Ok(())
    }
}

impl EntityStore<User> for MemoryStorage {
    fn list(&self) -> Result<Vec<User>> {
        let state = self.read()?;
        state.users.keys().map(|id| state.user(*id)).collect()
    }

    fn get(&self, id: i64) -> Result<User> {
        self.read()?.user(id)
    }

    fn create(&self, mut record: User) -> Result<User> {
        let mut state = self.write()?;
        record.normalize_name();
        record.friends.clear();
        state.last_user_id += 1;
        record.id = state.last_user_id;
        state.users.insert(record.id, record.clone());
        Ok(record)
    }

    fn update(&self, mut record: User) -> Result<User> {
        let mut state = self.write()?;
        state.ensure_user(record.id)?;
        record.normalize_name();
        record.friends.clear();
        let id = record.id;
        state.users.insert(id, record);
        state.user(id)
    }

    fn delete(&self, id: i64) -> Result<()> {
        let mut state = self.write()?;
        state
            .users
            .remove(&id)
            .ok_or_else(|| FilmorateError::not_found("User not found"))?;
        for likers in state.likes.values_mut() {
            likers.remove(&id);
        }
        if let Some(friends) = state.friends.remove(&id) {
            for friend in friends {
                if let Some(theirs) = state.friends.get_mut(&friend) {
                    theirs.remove(&id);
                }
            }
        }
        Ok(())
    }
}

impl RelationshipIndex for MemoryStorage {
    fn add_like(&self, film_id: i64, user_id: i64) -> Result<()> {
        let mut state = self.write()?;
        state.ensure_film(film_id)?;
        state.ensure_user(user_id)?;
        if !state.likes.entry(film_id).or_default().insert(user_id) {
            return Err(FilmorateError::conflict("User already likes this film"));
        }
        Ok(())
    }

    fn remove_like(&self, film_id: i64, user_id: i64) -> Result<()> {
        let mut state = self.write()?;
        state.ensure_film(film_id)?;
        state.ensure_user(user_id)?;
        let removed = state
            .likes
            .get_mut(&film_id)
            .map(|likers| likers.remove(&user_id))
            .unwrap_or(false);
        if !removed {
            return Err(FilmorateError::not_found("Like not found"));
        }
        Ok(())
    }

    fn add_friend(&self, user_id: i64, friend_id: i64) -> Result<()> {
        if user_id == friend_id {
            return Err(FilmorateError::validation(
                "Users cannot add themselves to friends",
            ));
        }
        let mut state = self.write()?;
        state.ensure_user(user_id)?;
        state.ensure_user(friend_id)?;
        if state.friend_ids(user_id).contains(&friend_id) {
            return Err(FilmorateError::conflict("Users are already friends"));
        }
        state.friends.entry(user_id).or_default().insert(friend_id);
        state.friends.entry(friend_id).or_default().insert(user_id);
        Ok(())
    }

    fn remove_friend(&self, user_id: i64, friend_id: i64) -> Result<()> {
        let mut state = self.write()?;
        state.ensure_user(user_id)?;
        state.ensure_user(friend_id)?;
        if !state.friend_ids(user_id).contains(&friend_id) {
            return Err(FilmorateError::not_found("Users are not friends"));
        }
        if let Some(friends) = state.friends.get_mut(&user_id) {
            friends.remove(&friend_id);
        }
        if let Some(friends) = state.friends.get_mut(&friend_id) {
            friends.remove(&user_id);
        }
        Ok(())
    }

    fn friends_of(&self, user_id: i64) -> Result<Vec<User>> {
        let state = self.read()?;
        state.ensure_user(user_id)?;
        state.users_by_ids(&state.friend_ids(user_id))
    }
}

impl Ranking for MemoryStorage {
    fn popular(&self, count: usize) -> Result<Vec<Film>> {
        let films = EntityStore::<Film>::list(self)?;
        Ok(ranking::most_popular(films, count))
    }

    fn common_friends(&self, user_id: i64, other_id: i64) -> Result<Vec<User>> {
        if user_id == other_id {
            return Err(FilmorateError::validation(
                "Cannot pass a pair of same ids, request the friends list instead",
            ));
        }
        let state = self.read()?;
        state.ensure_user(user_id)?;
        state.ensure_user(other_id)?;
        let common = ranking::common_ids(&state.friend_ids(user_id), &state.friend_ids(other_id));
        state.users_by_ids(&common)
    }
}

impl ReferenceCatalog for MemoryStorage {
    fn mpa_ratings(&self) -> Result<Vec<MpaRating>> {
        Ok(self.read()?.mpa_ratings.clone())
    }

    fn mpa_rating(&self, id: i32) -> Result<MpaRating> {
        self.read()?.mpa_rating(id)
    }

    fn genres(&self) -> Result<Vec<Genre>> {
        Ok(self.read()?.genres.clone())
    }

    fn genre(&self, id: i32) -> Result<Genre> {
        self.read()?.genre(id)
    }
}
