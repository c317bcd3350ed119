use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::entities::User;
use crate::error::{FilmorateError, Result};
use crate::storage::{EntityStore, Storage};

fn check_user_id(id: i64) -> Result<()> {
    if id <= 0 {
        return Err(FilmorateError::not_found("Invalid User ID"));
    }
    Ok(())
}

fn check_pair(user_id: i64, other_id: i64) -> Result<()> {
    if user_id == other_id {
        return Err(FilmorateError::validation(
            "Users cannot add themselves to friends",
        ));
    }
    check_user_id(user_id)?;
    check_user_id(other_id)
}

pub fn get_all_users(store: &dyn Storage) -> Result<Vec<User>> {
    log::info!("Users list requested");
    EntityStore::<User>::list(store)
}

pub fn get_user(store: &dyn Storage, id: i64) -> Result<User> {
    check_user_id(id)?;
    log::info!("User {} requested", id);
    EntityStore::<User>::get(store, id)
}

pub fn add_user(store: &dyn Storage, mut user: User) -> Result<User> {
    user.validate()?;
    user.normalize_name();
    let user = EntityStore::<User>::create(store, user)?;
    log::info!("User {} created", user.id);
    Ok(user)
}

pub fn update_user(store: &dyn Storage, mut user: User) -> Result<User> {
    check_user_id(user.id)?;
    user.validate()?;
    user.normalize_name();
    let user = EntityStore::<User>::update(store, user)?;
    log::info!("User {} updated", user.id);
    Ok(user)
}

pub fn delete_user(store: &dyn Storage, id: i64) -> Result<()> {
    check_user_id(id)?;
    EntityStore::<User>::delete(store, id)?;
    log::info!("User {} deleted", id);
    Ok(())
}

pub fn get_friends(store: &dyn Storage, id: i64) -> Result<Vec<User>> {
    check_user_id(id)?;
    log::info!("User {} friends list requested", id);
    store.friends_of(id)
}

pub fn add_friend(store: &dyn Storage, user_id: i64, friend_id: i64) -> Result<()> {
    check_pair(user_id, friend_id)?;
    store.add_friend(user_id, friend_id)?;
    log::info!("Users {} and {} are now friends", user_id, friend_id);
    Ok(())
}

pub fn delete_friend(store: &dyn Storage, user_id: i64, friend_id: i64) -> Result<()> {
    check_pair(user_id, friend_id)?;
    store.remove_friend(user_id, friend_id)?;
    log::info!("Users {} and {} are no longer friends", user_id, friend_id);
    Ok(())
}

pub fn get_common_friends(store: &dyn Storage, user_id: i64, other_id: i64) -> Result<Vec<User>> {
    if user_id == other_id {
        return Err(FilmorateError::validation(
            "Cannot pass a pair of same ids, request the friends list instead",
        ));
    }
    check_user_id(user_id)?;
    check_user_id(other_id)?;
    log::info!("Common friends of users {} and {} requested", user_id, other_id);
    store.common_friends(user_id, other_id)
}

#[get("/users")]
pub async fn list(store: web::Data<dyn Storage>) -> Result<HttpResponse> {
    let store = store.into_inner();
    let users = web::block(move || get_all_users(store.as_ref())).await??;
    Ok(HttpResponse::Ok().json(users))
}

#[get("/users/{id}")]
pub async fn find(store: web::Data<dyn Storage>, path: web::Path<i64>) -> Result<HttpResponse> {
    let store = store.into_inner();
    let id = path.into_inner();
    let user = web::block(move || get_user(store.as_ref(), id)).await??;
    Ok(HttpResponse::Ok().json(user))
}

#[post("/users")]
pub async fn create(
    store: web::Data<dyn Storage>,
    user: web::Json<User>,
) -> Result<HttpResponse> {
    let store = store.into_inner();
    let user = web::block(move || add_user(store.as_ref(), user.into_inner())).await??;
    Ok(HttpResponse::Created().json(user))
}

#[put("/users")]
pub async fn update(
    store: web::Data<dyn Storage>,
    user: web::Json<User>,
) -> Result<HttpResponse> {
    let store = store.into_inner();
    let user = web::block(move || update_user(store.as_ref(), user.into_inner())).await??;
    Ok(HttpResponse::Ok().json(user))
}

#[delete("/users/{id}")]
pub async fn remove(store: web::Data<dyn Storage>, path: web::Path<i64>) -> Result<HttpResponse> {
    let store = store.into_inner();
    let id = path.into_inner();
    web::block(move || delete_user(store.as_ref(), id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/users/{id}/friends")]
pub async fn friends(store: web::Data<dyn Storage>, path: web::Path<i64>) -> Result<HttpResponse> {
    let store = store.into_inner();
    let id = path.into_inner();
    let found = web::block(move || get_friends(store.as_ref(), id)).await??;
    Ok(HttpResponse::Ok().json(found))
}

#[get("/users/{id}/friends/common/{other_id}")]
pub async fn common_friends(
    store: web::Data<dyn Storage>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let store = store.into_inner();
    let (id, other_id) = path.into_inner();
    let found = web::block(move || get_common_friends(store.as_ref(), id, other_id)).await??;
    Ok(HttpResponse::Ok().json(found))
}

#[put("/users/{id}/friends/{friend_id}")]
pub async fn befriend(
    store: web::Data<dyn Storage>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let store = store.into_inner();
    let (id, friend_id) = path.into_inner();
    web::block(move || add_friend(store.as_ref(), id, friend_id)).await??;
    Ok(HttpResponse::Ok().finish())
}

#[delete("/users/{id}/friends/{friend_id}")]
pub async fn unfriend(
    store: web::Data<dyn Storage>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let store = store.into_inner();
    let (id, friend_id) = path.into_inner();
    web::block(move || delete_friend(store.as_ref(), id, friend_id)).await??;
    Ok(HttpResponse::Ok().finish())
}
