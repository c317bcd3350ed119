use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

use crate::entities::Film;
use crate::error::{FilmorateError, Result};
use crate::storage::{EntityStore, Storage};

pub const DEFAULT_POPULAR_COUNT: i64 = 10;

fn check_film_id(id: i64) -> Result<()> {
    if id <= 0 {
        return Err(FilmorateError::not_found("Invalid Film ID"));
    }
    Ok(())
}

fn check_user_id(id: i64) -> Result<()> {
    if id <= 0 {
        return Err(FilmorateError::not_found("Invalid User ID"));
    }
    Ok(())
}

pub fn get_all_films(store: &dyn Storage) -> Result<Vec<Film>> {
    log::info!("Films list requested");
    EntityStore::<Film>::list(store)
}

pub fn get_film(store: &dyn Storage, id: i64) -> Result<Film> {
    check_film_id(id)?;
    log::info!("Film {} requested", id);
    EntityStore::<Film>::get(store, id)
}

pub fn add_film(store: &dyn Storage, film: Film) -> Result<Film> {
    film.validate()?;
    let film = EntityStore::<Film>::create(store, film)?;
    log::info!("Film {} added", film.id);
    Ok(film)
}

pub fn update_film(store: &dyn Storage, film: Film) -> Result<Film> {
    check_film_id(film.id)?;
    film.validate()?;
    let film = EntityStore::<Film>::update(store, film)?;
    log::info!("Film {} updated", film.id);
    Ok(film)
}

pub fn delete_film(store: &dyn Storage, id: i64) -> Result<()> {
    check_film_id(id)?;
    EntityStore::<Film>::delete(store, id)?;
    log::info!("Film {} deleted", id);
    Ok(())
}

pub fn add_like(store: &dyn Storage, film_id: i64, user_id: i64) -> Result<()> {
    check_film_id(film_id)?;
    check_user_id(user_id)?;
    store.add_like(film_id, user_id)?;
    log::info!("User {} liked film {}", user_id, film_id);
    Ok(())
}

pub fn delete_like(store: &dyn Storage, film_id: i64, user_id: i64) -> Result<()> {
    check_film_id(film_id)?;
    check_user_id(user_id)?;
    store.remove_like(film_id, user_id)?;
    log::info!("User {} no longer likes film {}", user_id, film_id);
    Ok(())
}

pub fn get_popular(store: &dyn Storage, count: i64) -> Result<Vec<Film>> {
    if count <= 0 {
        return Err(FilmorateError::validation("Illegal count value"));
    } else if count == 1 {
        log::info!("The most popular film requested");
    } else {
        log::info!("{} most popular films requested", count);
    }
    store.popular(usize::try_from(count).unwrap_or(usize::MAX))
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub count: Option<i64>,
}

#[get("/films")]
pub async fn list(store: web::Data<dyn Storage>) -> Result<HttpResponse> {
    let store = store.into_inner();
    let films = web::block(move || get_all_films(store.as_ref())).await??;
    Ok(HttpResponse::Ok().json(films))
}

#[get("/films/popular")]
pub async fn popular(
    store: web::Data<dyn Storage>,
    query: web::Query<PopularQuery>,
) -> Result<HttpResponse> {
    let store = store.into_inner();
    let count = query.count.unwrap_or(DEFAULT_POPULAR_COUNT);
    let films = web::block(move || get_popular(store.as_ref(), count)).await??;
    Ok(HttpResponse::Ok().json(films))
}

#[get("/films/{id}")]
pub async fn find(store: web::Data<dyn Storage>, path: web::Path<i64>) -> Result<HttpResponse> {
    let store = store.into_inner();
    let id = path.into_inner();
    let film = web::block(move || get_film(store.as_ref(), id)).await??;
    Ok(HttpResponse::Ok().json(film))
}

#[post("/films")]
pub async fn create(
    store: web::Data<dyn Storage>,
    film: web::Json<Film>,
) -> Result<HttpResponse> {
    let store = store.into_inner();
    let film = web::block(move || add_film(store.as_ref(), film.into_inner())).await??;
    Ok(HttpResponse::Created().json(film))
}

#[put("/films")]
pub async fn update(
    store: web::Data<dyn Storage>,
    film: web::Json<Film>,
) -> Result<HttpResponse> {
    let store = store.into_inner();
    let film = web::block(move || update_film(store.as_ref(), film.into_inner())).await??;
    Ok(HttpResponse::Ok().json(film))
}

#[delete("/films/{id}")]
pub async fn remove(store: web::Data<dyn Storage>, path: web::Path<i64>) -> Result<HttpResponse> {
    let store = store.into_inner();
    let id = path.into_inner();
    web::block(move || delete_film(store.as_ref(), id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

#[put("/films/{id}/like/{user_id}")]
pub async fn like(
    store: web::Data<dyn Storage>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let store = store.into_inner();
    let (film_id, user_id) = path.into_inner();
    web::block(move || add_like(store.as_ref(), film_id, user_id)).await??;
    Ok(HttpResponse::Ok().finish())
}

#[delete("/films/{id}/like/{user_id}")]
pub async fn unlike(
    store: web::Data<dyn Storage>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let store = store.into_inner();
    let (film_id, user_id) = path.into_inner();
    web::block(move || delete_like(store.as_ref(), film_id, user_id)).await??;
    Ok(HttpResponse::Ok().finish())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{test as actix_test, App};
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::entities::{MpaRating, User};
    use crate::memory::MemoryStorage;

    fn storage() -> Arc<dyn Storage> {
        Arc::new(MemoryStorage::new())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed_film(store: &dyn Storage, name: &str) -> Film {
        let mut film = Film::new(name, "description", date(2000, 1, 1), 100);
        film.mpa = Some(MpaRating::new(1, ""));
        add_film(store, film).unwrap()
    }

    fn seed_user(store: &dyn Storage, login: &str) -> User {
        let user = User::new(&format!("{}@example.com", login), login, "", date(1990, 1, 1));
        EntityStore::<User>::create(store, user).unwrap()
    }

    #[test]
    fn popular_rejects_non_positive_count() {
        let store = storage();
        for count in [0, -1] {
            assert!(matches!(
                get_popular(store.as_ref(), count),
                Err(FilmorateError::Validation(_))
            ));
        }
    }

    #[test]
    fn popular_returns_min_of_count_and_total() {
        let store = storage();
        for i in 1..=3 {
            seed_film(store.as_ref(), &format!("f{}", i));
        }
        assert_eq!(get_popular(store.as_ref(), 1).unwrap().len(), 1);
        assert_eq!(get_popular(store.as_ref(), 3).unwrap().len(), 3);
        assert_eq!(get_popular(store.as_ref(), 50).unwrap().len(), 3);
        let ids: Vec<i64> = get_popular(store.as_ref(), 3)
            .unwrap()
            .iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn invalid_ids_are_not_found_before_storage() {
        let store = storage();
        assert!(matches!(
            get_film(store.as_ref(), 0),
            Err(FilmorateError::NotFound(_))
        ));
        assert!(matches!(
            add_like(store.as_ref(), 1, -5),
            Err(FilmorateError::NotFound(_))
        ));
        let mut film = Film::new("no id", "description", date(2000, 1, 1), 100);
        film.id = 0;
        assert!(matches!(
            update_film(store.as_ref(), film),
            Err(FilmorateError::NotFound(_))
        ));
    }

    #[test]
    fn invalid_film_is_never_stored() {
        let store = storage();
        let film = Film::new("early", "description", date(1800, 1, 1), 100);
        assert!(matches!(
            add_film(store.as_ref(), film),
            Err(FilmorateError::Validation(_))
        ));
        assert!(get_all_films(store.as_ref()).unwrap().is_empty());
    }

    #[test]
    fn like_then_unlike() {
        let store = storage();
        let film = seed_film(store.as_ref(), "film");
        let user = seed_user(store.as_ref(), "fan");
        add_like(store.as_ref(), film.id, user.id).unwrap();
        assert_eq!(get_film(store.as_ref(), film.id).unwrap().rate, 1);
        delete_like(store.as_ref(), film.id, user.id).unwrap();
        assert_eq!(get_film(store.as_ref(), film.id).unwrap().rate, 0);
    }

    macro_rules! app {
        ($store:expr) => {
            actix_test::init_service(
                App::new()
                    .app_data(web::Data::from($store.clone()))
                    .configure(crate::configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn film_lifecycle_over_http() {
        let store = storage();
        let app = app!(store);

        let req = actix_test::TestRequest::post()
            .uri("/films")
            .set_json(json!({
                "name": "Alien",
                "description": "In space no one can hear you scream",
                "releaseDate": "1979-05-25",
                "duration": 117,
                "mpa": { "id": 4 },
                "genres": [{ "id": 4 }, { "id": 6 }, { "id": 4 }]
            }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Film = actix_test::read_body_json(resp).await;
        assert_eq!(created.id, 1);
        assert_eq!(created.mpa, Some(MpaRating::new(4, "R")));
        assert_eq!(created.genres.len(), 2);

        let req = actix_test::TestRequest::put()
            .uri("/films")
            .set_json(json!({
                "id": 1,
                "name": "Aliens",
                "description": "This time it's war",
                "releaseDate": "1986-07-18",
                "duration": 137
            }))
            .to_request();
        let updated: Film = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated.name, "Aliens");
        assert!(updated.genres.is_empty());

        let req = actix_test::TestRequest::get().uri("/films").to_request();
        let films: Vec<Film> = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(films.len(), 1);

        let req = actix_test::TestRequest::delete().uri("/films/1").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = actix_test::TestRequest::get().uri("/films/1").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn rejects_invalid_bodies() {
        let store = storage();
        let app = app!(store);

        let req = actix_test::TestRequest::post()
            .uri("/films")
            .set_json(json!({
                "name": "",
                "description": "nameless",
                "releaseDate": "2000-01-01",
                "duration": 10
            }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = actix_test::TestRequest::post()
            .uri("/films")
            .set_json(json!({ "name": "no date" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = actix_test::TestRequest::put()
            .uri("/films")
            .set_json(json!({
                "id": 9999,
                "name": "ghost",
                "description": "missing",
                "releaseDate": "2000-01-01",
                "duration": 10
            }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn likes_and_popular_over_http() {
        let store = storage();
        let app = app!(store);
        for i in 1..=3 {
            seed_film(store.as_ref(), &format!("f{}", i));
        }
        let user = seed_user(store.as_ref(), "fan");

        let req = actix_test::TestRequest::put()
            .uri(&format!("/films/1/like/{}", user.id))
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = actix_test::TestRequest::put()
            .uri(&format!("/films/1/like/{}", user.id))
            .to_request();
        assert_eq!(
            actix_test::call_service(&app, req).await.status(),
            StatusCode::CONFLICT
        );

        let req = actix_test::TestRequest::get()
            .uri("/films/popular?count=2")
            .to_request();
        let films: Vec<Film> = actix_test::call_and_read_body_json(&app, req).await;
        let ids: Vec<i64> = films.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 3]);

        let req = actix_test::TestRequest::get().uri("/films/popular").to_request();
        let films: Vec<Film> = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(films.len(), 3);

        let req = actix_test::TestRequest::get()
            .uri("/films/popular?count=0")
            .to_request();
        assert_eq!(
            actix_test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = actix_test::TestRequest::delete()
            .uri(&format!("/films/1/like/{}", user.id))
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = actix_test::TestRequest::delete()
            .uri(&format!("/films/1/like/{}", user.id))
            .to_request();
        assert_eq!(
            actix_test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }
}
