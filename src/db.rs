use std::collections::{BTreeSet, HashMap};

use anyhow::anyhow;
use diesel::connection::SimpleConnection;
use diesel::r2d2::ConnectionManager;
use diesel::{
    BoolExpressionMethods, Connection, ExpressionMethods, OptionalExtension, PgConnection,
    QueryDsl, RunQueryDsl, SelectableHelper,
};
use r2d2::{Pool, PooledConnection};

use crate::entities::{Film, Genre, MpaRating, User};
use crate::error::{FilmorateError, Result};
use crate::model::{
    FilmChanges, FilmGenreRow, FilmLikeRow, FilmRow, FriendRow, GenreRow, MpaRow, UserChanges,
    UserRow,
};
use crate::schema::{film_genres, film_likes, films, genres, mpa_ratings, user_friends, users};
use crate::storage::{EntityStore, Ranking, ReferenceCatalog, RelationshipIndex};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATION_UP: &str =
    include_str!("../migrations/2024-01-15-000000_create_filmorate/up.sql");

/// PostgreSQL backend. Every operation, reads included, runs in its own transaction.
#[derive(Clone)]
pub struct PgStorage {
    pool: DbPool,
}

impl PgStorage {
    pub fn connect(database_url: &str, pool_size: u32) -> anyhow::Result<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder().max_size(pool_size).build(manager)?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Creates missing tables and seeds the reference catalog. Safe to run repeatedly.
    pub fn run_migrations(&self) -> Result<()> {
        let mut pooled = self.conn()?;
        let conn: &mut PgConnection = &mut pooled;
        conn.batch_execute(MIGRATION_UP)?;
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>> {
        self.pool
            .get()
            .map_err(|e| anyhow!("Couldn't get db connection from pool: {}", e).into())
    }

    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T>,
    {
        let mut pooled = self.conn()?;
        let conn: &mut PgConnection = &mut pooled;
        conn.transaction(f)
    }
}

fn ensure_film(conn: &mut PgConnection, id: i64) -> Result<()> {
    films::table
        .find(id)
        .select(films::id)
        .first::<i64>(conn)
        .optional()?
        .map(|_| ())
        .ok_or_else(|| FilmorateError::not_found("Film not found"))
}

fn ensure_user(conn: &mut PgConnection, id: i64) -> Result<()> {
    users::table
        .find(id)
        .select(users::id)
        .first::<i64>(conn)
        .optional()?
        .map(|_| ())
        .ok_or_else(|| FilmorateError::not_found("User not found"))
}

/// Row locks for mutations that touch `films.rate` or a user's edges. Take the user lock
/// before the film lock.
fn lock_user(conn: &mut PgConnection, id: i64) -> Result<()> {
    users::table
        .find(id)
        .select(users::id)
        .for_update()
        .get_result::<i64>(conn)
        .optional()?
        .map(|_| ())
        .ok_or_else(|| FilmorateError::not_found("User not found"))
}

fn share_user(conn: &mut PgConnection, id: i64) -> Result<()> {
    users::table
        .find(id)
        .select(users::id)
        .for_share()
        .get_result::<i64>(conn)
        .optional()?
        .map(|_| ())
        .ok_or_else(|| FilmorateError::not_found("User not found"))
}

fn lock_film(conn: &mut PgConnection, id: i64) -> Result<()> {
    films::table
        .find(id)
        .select(films::id)
        .for_update()
        .get_result::<i64>(conn)
        .optional()?
        .map(|_| ())
        .ok_or_else(|| FilmorateError::not_found("Film not found"))
}

fn load_mpa_rating(conn: &mut PgConnection, id: i32) -> Result<MpaRating> {
    mpa_ratings::table
        .find(id)
        .select(MpaRow::as_select())
        .first::<MpaRow>(conn)
        .optional()?
        .map(MpaRating::from)
        .ok_or_else(|| FilmorateError::not_found("MPA rating not found"))
}

fn load_genre(conn: &mut PgConnection, id: i32) -> Result<Genre> {
    genres::table
        .find(id)
        .select(GenreRow::as_select())
        .first::<GenreRow>(conn)
        .optional()?
        .map(Genre::from)
        .ok_or_else(|| FilmorateError::not_found("Genre not found"))
}

fn check_references(conn: &mut PgConnection, film: &Film) -> Result<()> {
    if let Some(mpa) = &film.mpa {
        load_mpa_rating(conn, mpa.id)?;
    }
    for genre in &film.genres {
        load_genre(conn, genre.id)?;
    }
    Ok(())
}

fn replace_genres(conn: &mut PgConnection, film_id: i64, genres: &[Genre]) -> Result<()> {
    diesel::delete(film_genres::table.filter(film_genres::film_id.eq(film_id))).execute(conn)?;
    let rows: Vec<FilmGenreRow> = genres
        .iter()
        .map(|g| FilmGenreRow {
            film_id,
            genre_id: g.id,
        })
        .collect();
    if !rows.is_empty() {
        diesel::insert_into(film_genres::table)
            .values(&rows)
            .execute(conn)?;
    }
    Ok(())
}

/// Attaches MPA rating, genres and likes to bare film rows, keeping row order.
fn hydrate_films(conn: &mut PgConnection, rows: Vec<FilmRow>) -> Result<Vec<Film>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

    let ratings: HashMap<i32, MpaRating> = mpa_ratings::table
        .select(MpaRow::as_select())
        .load::<MpaRow>(conn)?
        .into_iter()
        .map(|r| (r.id, MpaRating::from(r)))
        .collect();

    let mut genres_by_film: HashMap<i64, Vec<Genre>> = HashMap::new();
    let genre_links = film_genres::table
        .inner_join(genres::table)
        .filter(film_genres::film_id.eq_any(&ids))
        .order((film_genres::film_id, genres::id))
        .select((film_genres::film_id, GenreRow::as_select()))
        .load::<(i64, GenreRow)>(conn)?;
    for (film_id, genre) in genre_links {
        genres_by_film
            .entry(film_id)
            .or_default()
            .push(Genre::from(genre));
    }

    let mut likes_by_film: HashMap<i64, BTreeSet<i64>> = HashMap::new();
    let like_links = film_likes::table
        .filter(film_likes::film_id.eq_any(&ids))
        .select((film_likes::film_id, film_likes::user_id))
        .load::<(i64, i64)>(conn)?;
    for (film_id, user_id) in like_links {
        likes_by_film.entry(film_id).or_default().insert(user_id);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let id = row.id;
            let mpa = row.mpa_rating_id.and_then(|m| ratings.get(&m).cloned());
            row.into_film(
                mpa,
                genres_by_film.remove(&id).unwrap_or_default(),
                likes_by_film.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}

fn hydrate_users(conn: &mut PgConnection, rows: Vec<UserRow>) -> Result<Vec<User>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

    let mut friends_by_user: HashMap<i64, BTreeSet<i64>> = HashMap::new();
    let links = user_friends::table
        .filter(user_friends::user_id.eq_any(&ids))
        .select((user_friends::user_id, user_friends::friend_id))
        .load::<(i64, i64)>(conn)?;
    for (user_id, friend_id) in links {
        friends_by_user.entry(user_id).or_default().insert(friend_id);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let id = row.id;
            row.into_user(friends_by_user.remove(&id).unwrap_or_default())
        })
        .collect())
}

fn load_film(conn: &mut PgConnection, id: i64) -> Result<Film> {
    let row = films::table
        .find(id)
        .select(FilmRow::as_select())
        .first::<FilmRow>(conn)
        .optional()?
        .ok_or_else(|| FilmorateError::not_found("Film not found"))?;
    hydrate_films(conn, vec![row])?
        .into_iter()
        .next()
        .ok_or_else(|| FilmorateError::not_found("Film not found"))
}

fn load_user(conn: &mut PgConnection, id: i64) -> Result<User> {
    let row = users::table
        .find(id)
        .select(UserRow::as_select())
        .first::<UserRow>(conn)
        .optional()?
        .ok_or_else(|| FilmorateError::not_found("User not found"))?;
    hydrate_users(conn, vec![row])?
        .into_iter()
        .next()
        .ok_or_else(|| FilmorateError::not_found("User not found"))
}

impl EntityStore<Film> for PgStorage {
    fn list(&self) -> Result<Vec<Film>> {
        self.transaction(|conn| {
            let rows = films::table
                .order(films::id)
                .select(FilmRow::as_select())
                .load::<FilmRow>(conn)?;
            hydrate_films(conn, rows)
        })
    }

    fn get(&self, id: i64) -> Result<Film> {
        self.transaction(|conn| load_film(conn, id))
    }

    fn create(&self, mut record: Film) -> Result<Film> {
        record.normalize_genres();
        self.transaction(|conn| {
            check_references(conn, &record)?;
            let id: i64 = diesel::insert_into(films::table)
                .values(&FilmChanges::from(&record))
                .returning(films::id)
                .get_result(conn)?;
            replace_genres(conn, id, &record.genres)?;
            load_film(conn, id)
        })
    }

    fn update(&self, mut record: Film) -> Result<Film> {
        record.normalize_genres();
        self.transaction(|conn| {
            ensure_film(conn, record.id)?;
            check_references(conn, &record)?;
            diesel::update(films::table.find(record.id))
                .set(&FilmChanges::from(&record))
                .execute(conn)?;
            replace_genres(conn, record.id, &record.genres)?;
            load_film(conn, record.id)
        })
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.transaction(|conn| {
            lock_film(conn, id)?;
            diesel::delete(film_likes::table.filter(film_likes::film_id.eq(id))).execute(conn)?;
            diesel::delete(film_genres::table.filter(film_genres::film_id.eq(id)))
                .execute(conn)?;
            diesel::delete(films::table.find(id)).execute(conn)?;
            Ok(())
        })
    }
}

impl EntityStore<User> for PgStorage {
    fn list(&self) -> Result<Vec<User>> {
        self.transaction(|conn| {
            let rows = users::table
                .order(users::id)
                .select(UserRow::as_select())
                .load::<UserRow>(conn)?;
            hydrate_users(conn, rows)
        })
    }

    fn get(&self, id: i64) -> Result<User> {
        self.transaction(|conn| load_user(conn, id))
    }

    fn create(&self, mut record: User) -> Result<User> {
        record.normalize_name();
        self.transaction(|conn| {
            let id: i64 = diesel::insert_into(users::table)
                .values(&UserChanges::from(&record))
                .returning(users::id)
                .get_result(conn)?;
            load_user(conn, id)
        })
    }

    fn update(&self, mut record: User) -> Result<User> {
        record.normalize_name();
        self.transaction(|conn| {
            let updated = diesel::update(users::table.find(record.id))
                .set(&UserChanges::from(&record))
                .execute(conn)?;
            if updated == 0 {
                return Err(FilmorateError::not_found("User not found"));
            }
            load_user(conn, record.id)
        })
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.transaction(|conn| {
            lock_user(conn, id)?;
            let liked = film_likes::table
                .filter(film_likes::user_id.eq(id))
                .select(film_likes::film_id);
            diesel::update(films::table.filter(films::id.eq_any(liked)))
                .set(films::rate.eq(films::rate - 1))
                .execute(conn)?;
            diesel::delete(film_likes::table.filter(film_likes::user_id.eq(id))).execute(conn)?;
            diesel::delete(
                user_friends::table.filter(
                    user_friends::user_id
                        .eq(id)
                        .or(user_friends::friend_id.eq(id)),
                ),
            )
            .execute(conn)?;
            diesel::delete(users::table.find(id)).execute(conn)?;
            Ok(())
        })
    }
}

impl RelationshipIndex for PgStorage {
    fn add_like(&self, film_id: i64, user_id: i64) -> Result<()> {
        self.transaction(|conn| {
            share_user(conn, user_id)?;
            lock_film(conn, film_id)?;
            let inserted = diesel::insert_into(film_likes::table)
                .values(&FilmLikeRow { film_id, user_id })
                .on_conflict_do_nothing()
                .execute(conn)?;
            if inserted == 0 {
                return Err(FilmorateError::conflict("User already likes this film"));
            }
            diesel::update(films::table.find(film_id))
                .set(films::rate.eq(films::rate + 1))
                .execute(conn)?;
            Ok(())
        })
    }

    fn remove_like(&self, film_id: i64, user_id: i64) -> Result<()> {
        self.transaction(|conn| {
            share_user(conn, user_id)?;
            lock_film(conn, film_id)?;
            let deleted = diesel::delete(
                film_likes::table.filter(
                    film_likes::film_id
                        .eq(film_id)
                        .and(film_likes::user_id.eq(user_id)),
                ),
            )
            .execute(conn)?;
            if deleted == 0 {
                return Err(FilmorateError::not_found("Like not found"));
            }
            diesel::update(films::table.find(film_id))
                .set(films::rate.eq(films::rate - 1))
                .execute(conn)?;
            Ok(())
        })
    }

    fn add_friend(&self, user_id: i64, friend_id: i64) -> Result<()> {
        if user_id == friend_id {
            return Err(FilmorateError::validation(
                "Users cannot add themselves to friends",
            ));
        }
        self.transaction(|conn| {
            share_user(conn, user_id)?;
            share_user(conn, friend_id)?;
            // lower id first: requests for the same pair from either side queue on one row
            let (low, high) = (user_id.min(friend_id), user_id.max(friend_id));
            let inserted = diesel::insert_into(user_friends::table)
                .values(&vec![
                    FriendRow {
                        user_id: low,
                        friend_id: high,
                    },
                    FriendRow {
                        user_id: high,
                        friend_id: low,
                    },
                ])
                .on_conflict_do_nothing()
                .execute(conn)?;
            if inserted != 2 {
                return Err(FilmorateError::conflict("Users are already friends"));
            }
            Ok(())
        })
    }

    fn remove_friend(&self, user_id: i64, friend_id: i64) -> Result<()> {
        self.transaction(|conn| {
            share_user(conn, user_id)?;
            share_user(conn, friend_id)?;
            let deleted = diesel::delete(
                user_friends::table.filter(
                    user_friends::user_id
                        .eq(user_id)
                        .and(user_friends::friend_id.eq(friend_id))
                        .or(user_friends::user_id
                            .eq(friend_id)
                            .and(user_friends::friend_id.eq(user_id))),
                ),
            )
            .execute(conn)?;
            if deleted == 0 {
                return Err(FilmorateError::not_found("Users are not friends"));
            }
            Ok(())
        })
    }

    fn friends_of(&self, user_id: i64) -> Result<Vec<User>> {
        self.transaction(|conn| {
            ensure_user(conn, user_id)?;
            let friend_ids = user_friends::table
                .filter(user_friends::user_id.eq(user_id))
                .select(user_friends::friend_id);
            let rows = users::table
                .filter(users::id.eq_any(friend_ids))
                .order(users::id)
                .select(UserRow::as_select())
                .load::<UserRow>(conn)?;
            hydrate_users(conn, rows)
        })
    }
}

impl Ranking for PgStorage {
    fn popular(&self, count: usize) -> Result<Vec<Film>> {
        let limit = i64::try_from(count).unwrap_or(i64::MAX);
        self.transaction(|conn| {
            let rows = films::table
                .order((films::rate.desc(), films::id.desc()))
                .limit(limit)
                .select(FilmRow::as_select())
                .load::<FilmRow>(conn)?;
            hydrate_films(conn, rows)
        })
    }

    fn common_friends(&self, user_id: i64, other_id: i64) -> Result<Vec<User>> {
        if user_id == other_id {
            return Err(FilmorateError::validation(
                "Cannot pass a pair of same ids, request the friends list instead",
            ));
        }
        self.transaction(|conn| {
            ensure_user(conn, user_id)?;
            ensure_user(conn, other_id)?;
            let friends_of_user = user_friends::table
                .filter(user_friends::user_id.eq(user_id))
                .select(user_friends::friend_id);
            let friends_of_other = user_friends::table
                .filter(user_friends::user_id.eq(other_id))
                .select(user_friends::friend_id);
            let rows = users::table
                .filter(users::id.eq_any(friends_of_user))
                .filter(users::id.eq_any(friends_of_other))
                .order(users::id)
                .select(UserRow::as_select())
                .load::<UserRow>(conn)?;
            hydrate_users(conn, rows)
        })
    }
}

impl ReferenceCatalog for PgStorage {
    fn mpa_ratings(&self) -> Result<Vec<MpaRating>> {
        self.transaction(|conn| {
            let rows = mpa_ratings::table
                .order(mpa_ratings::id)
                .select(MpaRow::as_select())
                .load::<MpaRow>(conn)?;
            Ok(rows.into_iter().map(MpaRating::from).collect())
        })
    }

    fn mpa_rating(&self, id: i32) -> Result<MpaRating> {
        self.transaction(|conn| load_mpa_rating(conn, id))
    }

    fn genres(&self) -> Result<Vec<Genre>> {
        self.transaction(|conn| {
            let rows = genres::table
                .order(genres::id)
                .select(GenreRow::as_select())
                .load::<GenreRow>(conn)?;
            Ok(rows.into_iter().map(Genre::from).collect())
        })
    }

    fn genre(&self, id: i32) -> Result<Genre> {
        self.transaction(|conn| load_genre(conn, id))
    }
}
