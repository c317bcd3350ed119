use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use dotenvy::dotenv;
use env_logger::Env;

mod catalog;
mod db;
mod entities;
mod error;
mod films;
mod memory;
mod model;
mod ranking;
mod schema;
mod settings;
mod storage;
mod users;

use crate::error::FilmorateError;
use crate::settings::{Settings, StorageKind};
use crate::storage::Storage;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let settings = Settings::load()?;
    let storage = open_storage(&settings)?;

    log::info!("Listening on {}:{}", settings.host, settings.port);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::from(storage.clone()))
            .configure(configure)
    })
    .bind((settings.host.as_str(), settings.port))?
    .run()
    .await?;
    Ok(())
}

fn open_storage(settings: &Settings) -> anyhow::Result<Arc<dyn Storage>> {
    match settings.storage {
        StorageKind::Memory => {
            log::info!("Using in-memory storage");
            Ok(Arc::new(memory::MemoryStorage::new()))
        }
        StorageKind::Database => {
            let url = settings
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("database_url must be set."))?;
            let storage = db::PgStorage::connect(url, settings.pool_size)?;
            storage.run_migrations()?;
            log::info!("Using PostgreSQL storage");
            Ok(Arc::new(storage))
        }
    }
}

/// Routes and extractor settings shared by the server and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        FilmorateError::validation(err.to_string()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        FilmorateError::validation(err.to_string()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        FilmorateError::validation(err.to_string()).into()
    }))
    // fixed segments before `{id}` patterns
    .service(films::popular)
    .service(films::list)
    .service(films::find)
    .service(films::create)
    .service(films::update)
    .service(films::remove)
    .service(films::like)
    .service(films::unlike)
    .service(users::common_friends)
    .service(users::friends)
    .service(users::list)
    .service(users::find)
    .service(users::create)
    .service(users::update)
    .service(users::remove)
    .service(users::befriend)
    .service(users::unfriend)
    .service(catalog::mpa_list)
    .service(catalog::mpa_find)
    .service(catalog::genre_list)
    .service(catalog::genre_find);
}
