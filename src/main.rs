use actix_web::{middleware::Logger, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use taskdeck::config::Config;
use taskdeck::envelope::ErrorEnvelope;
use taskdeck::routes;
use taskdeck::state::{self, AppState};
use taskdeck::store::{PgTaskStore, PgUserStore};

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| startup_error("invalid configuration", e))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|e| startup_error("failed to connect to database", e))?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| startup_error("failed to run migrations", e))?;

    let app_state = AppState::new(
        &config,
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(PgTaskStore::new(pool)),
        state::oauth_providers(&config),
    );
    app_state
        .uploads
        .ensure_dir()
        .await
        .map_err(|e| startup_error("failed to create uploads directory", e))?;

    log::info!("Starting taskdeck server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .wrap(ErrorEnvelope)
            .wrap(Logger::default())
            .wrap(state::cors(&app_state.frontend_origin))
            .configure(|cfg| routes::config(cfg, &app_state))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
