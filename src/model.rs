use std::collections::BTreeSet;

use chrono::NaiveDate;
use diesel::{AsChangeset, Insertable, Queryable, Selectable};

use crate::entities::{Film, Genre, MpaRating, User};
use crate::schema::*;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = films)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FilmRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    pub duration: i32,
    pub rate: i32,
    pub mpa_rating_id: Option<i32>,
}

impl FilmRow {
    pub fn into_film(self, mpa: Option<MpaRating>, genres: Vec<Genre>, likes: BTreeSet<i64>) -> Film {
        Film {
            id: self.id,
            name: self.name,
            description: self.description,
            release_date: self.release_date,
            duration: self.duration,
            rate: self.rate,
            mpa,
            genres,
            likes,
        }
    }
}

/// Client-owned film columns; `rate` is only ever touched by like/unlike.
#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = films)]
#[diesel(treat_none_as_null = true)]
pub struct FilmChanges<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub release_date: NaiveDate,
    pub duration: i32,
    pub mpa_rating_id: Option<i32>,
}

impl<'a> From<&'a Film> for FilmChanges<'a> {
    fn from(film: &'a Film) -> Self {
        Self {
            name: &film.name,
            description: &film.description,
            release_date: film.release_date,
            duration: film.duration,
            mpa_rating_id: film.mpa.as_ref().map(|m| m.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub login: String,
    pub name: String,
    pub birthday: NaiveDate,
}

impl UserRow {
    pub fn into_user(self, friends: BTreeSet<i64>) -> User {
        User {
            id: self.id,
            email: self.email,
            login: self.login,
            name: self.name,
            birthday: self.birthday,
            friends,
        }
    }
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserChanges<'a> {
    pub email: &'a str,
    pub login: &'a str,
    pub name: &'a str,
    pub birthday: NaiveDate,
}

impl<'a> From<&'a User> for UserChanges<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            email: &user.email,
            login: &user.login,
            name: &user.name,
            birthday: user.birthday,
        }
    }
}

#[derive(Debug, PartialEq, Queryable, Selectable)]
#[diesel(table_name = mpa_ratings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MpaRow {
    pub id: i32,
    pub name: String,
}

impl From<MpaRow> for MpaRating {
    fn from(row: MpaRow) -> Self {
        MpaRating {
            id: row.id,
            name: row.name,
        }
    }
}

#[derive(Debug, PartialEq, Queryable, Selectable)]
#[diesel(table_name = genres)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GenreRow {
    pub id: i32,
    pub name: String,
}

impl From<GenreRow> for Genre {
    fn from(row: GenreRow) -> Self {
        Genre {
            id: row.id,
            name: row.name,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = film_genres)]
pub struct FilmGenreRow {
    pub film_id: i64,
    pub genre_id: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = film_likes)]
pub struct FilmLikeRow {
    pub film_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_friends)]
pub struct FriendRow {
    pub user_id: i64,
    pub friend_id: i64,
}
