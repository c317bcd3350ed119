use std::collections::BTreeSet;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{FilmorateError, Result};

pub const MAX_DESCRIPTION_LENGTH: usize = 200;

/// The first public film screening; nothing may be released before it.
pub fn cinema_birth_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1895, 12, 28).unwrap_or_default()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpaRating {
    pub id: i32,
    #[serde(default)]
    pub name: String,
}

impl MpaRating {
    pub fn new(id: i32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i32,
    #[serde(default)]
    pub name: String,
}

impl Genre {
    pub fn new(id: i32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

/// A film record. `rate` and `likes` are owned by the relationship index:
/// whatever a client sends for them is ignored by the stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    pub duration: i32,
    #[serde(default)]
    pub rate: i32,
    #[serde(default)]
    pub mpa: Option<MpaRating>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub likes: BTreeSet<i64>,
}

impl Film {
    pub fn new(name: &str, description: &str, release_date: NaiveDate, duration: i32) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            description: description.to_string(),
            release_date,
            duration,
            rate: 0,
            mpa: None,
            genres: Vec::new(),
            likes: BTreeSet::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_on(today())
    }

    pub fn validate_on(&self, today: NaiveDate) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FilmorateError::validation("Film name must not be blank"));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(FilmorateError::validation(format!(
                "Film description must not exceed {} characters",
                MAX_DESCRIPTION_LENGTH
            )));
        }
        if self.release_date < cinema_birth_date() || self.release_date > today {
            return Err(FilmorateError::validation("invalid release date"));
        }
        if self.duration <= 0 {
            return Err(FilmorateError::validation("Film duration must be positive"));
        }
        Ok(())
    }

    /// Genres are unique by id and iterate in id order.
    pub fn normalize_genres(&mut self) {
        self.genres.sort_by_key(|g| g.id);
        self.genres.dedup_by_key(|g| g.id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub login: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    pub birthday: NaiveDate,
    #[serde(default)]
    pub friends: BTreeSet<i64>,
}

impl User {
    pub fn new(email: &str, login: &str, name: &str, birthday: NaiveDate) -> Self {
        Self {
            id: 0,
            email: email.to_string(),
            login: login.to_string(),
            name: name.to_string(),
            birthday,
            friends: BTreeSet::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_on(today())
    }

    pub fn validate_on(&self, today: NaiveDate) -> Result<()> {
        if self.email.trim().is_empty() || !is_email(&self.email) {
            return Err(FilmorateError::validation("User email must be a valid address"));
        }
        if self.login.is_empty() || self.login.chars().any(char::is_whitespace) {
            return Err(FilmorateError::validation(
                "User login must not be blank or contain whitespace",
            ));
        }
        if self.birthday > today {
            return Err(FilmorateError::validation("User birthday must not be in the future"));
        }
        Ok(())
    }

    /// A blank display name falls back to the login.
    pub fn normalize_name(&mut self) {
        if self.name.trim().is_empty() {
            self.name = self.login.clone();
        }
    }
}

fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn film() -> Film {
        Film::new("Nosferatu", "A symphony of horror", date(1922, 3, 4), 94)
    }

    fn user() -> User {
        User::new("max@example.com", "max", "Max", date(1990, 5, 17))
    }

    #[test]
    fn accepts_valid_film() {
        assert!(film().validate_on(date(2024, 1, 1)).is_ok());
    }

    #[test]
    fn rejects_blank_film_name() {
        let mut f = film();
        f.name = "   ".to_string();
        assert!(matches!(
            f.validate_on(date(2024, 1, 1)),
            Err(FilmorateError::Validation(_))
        ));
    }

    #[test]
    fn description_limit_counts_characters() {
        let mut f = film();
        f.description = "ж".repeat(200);
        assert!(f.validate_on(date(2024, 1, 1)).is_ok());
        f.description.push('ж');
        assert!(f.validate_on(date(2024, 1, 1)).is_err());
    }

    #[test]
    fn release_date_bounds() {
        let mut f = film();
        f.release_date = cinema_birth_date();
        assert!(f.validate_on(date(2024, 1, 1)).is_ok());
        f.release_date = date(1895, 12, 27);
        assert!(f.validate_on(date(2024, 1, 1)).is_err());
        f.release_date = date(2024, 1, 2);
        assert!(f.validate_on(date(2024, 1, 1)).is_err());
    }

    #[test]
    fn rejects_non_positive_duration() {
        let mut f = film();
        f.duration = 0;
        assert!(f.validate_on(date(2024, 1, 1)).is_err());
    }

    #[test]
    fn genres_are_deduplicated_and_ordered() {
        let mut f = film();
        f.genres = vec![Genre::new(6, ""), Genre::new(1, ""), Genre::new(6, "")];
        f.normalize_genres();
        let ids: Vec<i32> = f.genres.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![1, 6]);
    }

    #[test]
    fn user_validation() {
        let today = date(2024, 1, 1);
        assert!(user().validate_on(today).is_ok());

        let mut u = user();
        u.email = "not-an-email".to_string();
        assert!(u.validate_on(today).is_err());

        let mut u = user();
        u.login = "max power".to_string();
        assert!(u.validate_on(today).is_err());

        let mut u = user();
        u.birthday = date(2024, 1, 2);
        assert!(u.validate_on(today).is_err());
    }

    #[test]
    fn blank_name_falls_back_to_login() {
        let mut u = user();
        u.name = " ".to_string();
        u.normalize_name();
        assert_eq!(u.name, "max");
    }

    #[test]
    fn null_name_deserializes_as_blank() {
        let u: User = serde_json::from_str(
            r#"{"email":"a@b.c","login":"abc","name":null,"birthday":"2000-01-01"}"#,
        )
        .unwrap();
        assert_eq!(u.name, "");
        assert_eq!(u.id, 0);
    }

    #[test]
    fn film_uses_camel_case_fields() {
        let json = serde_json::to_value(film()).unwrap();
        assert_eq!(json["releaseDate"], "1922-03-04");
        assert!(json["mpa"].is_null());
    }
}
