use actix_web::{get, web, HttpResponse};

use crate::entities::{Genre, MpaRating};
use crate::error::{FilmorateError, Result};
use crate::storage::Storage;

pub fn get_mpa_rating(store: &dyn Storage, id: i32) -> Result<MpaRating> {
    if id <= 0 {
        return Err(FilmorateError::not_found("Invalid MPA Rating ID"));
    }
    log::info!("MPA rating {} requested", id);
    store.mpa_rating(id)
}

pub fn get_genre(store: &dyn Storage, id: i32) -> Result<Genre> {
    if id <= 0 {
        return Err(FilmorateError::not_found("Invalid genre ID"));
    }
    log::info!("Genre {} requested", id);
    store.genre(id)
}

#[get("/mpa")]
pub async fn mpa_list(store: web::Data<dyn Storage>) -> Result<HttpResponse> {
    let store = store.into_inner();
    let ratings = web::block(move || store.mpa_ratings()).await??;
    Ok(HttpResponse::Ok().json(ratings))
}

#[get("/mpa/{id}")]
pub async fn mpa_find(store: web::Data<dyn Storage>, path: web::Path<i32>) -> Result<HttpResponse> {
    let store = store.into_inner();
    let id = path.into_inner();
    let rating = web::block(move || get_mpa_rating(store.as_ref(), id)).await??;
    Ok(HttpResponse::Ok().json(rating))
}

#[get("/genres")]
pub async fn genre_list(store: web::Data<dyn Storage>) -> Result<HttpResponse> {
    let store = store.into_inner();
    let genres = web::block(move || store.genres()).await??;
    Ok(HttpResponse::Ok().json(genres))
}

#[get("/genres/{id}")]
pub async fn genre_find(
    store: web::Data<dyn Storage>,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let store = store.into_inner();
    let id = path.into_inner();
    let genre = web::block(move || get_genre(store.as_ref(), id)).await??;
    Ok(HttpResponse::Ok().json(genre))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    use super::*;
    use crate::memory::MemoryStorage;

    #[actix_web::test]
    async fn serves_reference_data() {
        let store: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::from(store))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/mpa").to_request();
        let ratings: Vec<MpaRating> = test::call_and_read_body_json(&app, req).await;
        let names: Vec<&str> = ratings.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["G", "PG", "PG-13", "R", "NC-17"]);

        let req = test::TestRequest::get().uri("/genres/2").to_request();
        let genre: Genre = test::call_and_read_body_json(&app, req).await;
        assert_eq!(genre, Genre::new(2, "Drama"));

        let req = test::TestRequest::get().uri("/genres").to_request();
        let genres: Vec<Genre> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(genres.len(), 6);

        for uri in ["/mpa/0", "/mpa/9", "/genres/-1", "/genres/99"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            assert_eq!(
                test::call_service(&app, req).await.status(),
                StatusCode::NOT_FOUND
            );
        }
    }
}
