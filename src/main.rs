use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info, warn};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use todolist::auth::AuthMiddleware;
use todolist::config::Config;
use todolist::routes::{self, health};
use todolist::store::{MemoryStore, PgStore};
use todolist::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let state = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            let store = PgStore::new(pool);
            store
                .migrate()
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            info!("Connected to Postgres");
            AppState::from_config(&config, Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL is not set; data is kept in memory and lost on exit");
            AppState::from_config(&config, Arc::new(MemoryStore::new()))
        }
    };
    let state = web::Data::new(state);

    info!("Starting todolist server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(routes::json_config())
            .app_data(routes::query_config())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
