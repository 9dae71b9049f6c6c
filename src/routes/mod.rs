pub mod auth;
pub mod health;
pub mod tasks;

use actix_files::Files;
use actix_web::web;

use crate::auth::AuthMiddleware;
use crate::error::AppError;
use crate::state::AppState;

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

/// Registers shared data and every route. Profile routes sit behind the bearer guard;
/// specific `/auth` paths are registered before the `/{id}` catch.
pub fn config(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.app_data(web::Data::new(state.accounts.clone()))
        .app_data(web::Data::new(state.tasks.clone()))
        .app_data(web::Data::from(state.uploads.clone()))
        .app_data(web::Data::new(state.oauth.clone()))
        .app_data(web::Data::new(auth::FrontendOrigin(
            state.frontend_origin.clone(),
        )))
        .app_data(json_config())
        .app_data(path_config())
        .app_data(query_config())
        .service(health::health)
        .service(
            web::scope("/auth")
                .service(auth::register)
                .service(auth::login)
                .service(auth::refresh_token)
                .service(auth::google_login)
                .service(auth::google_redirect)
                .service(auth::microsoft_login)
                .service(auth::microsoft_redirect)
                .service(
                    web::resource("/deactivate/{id}")
                        .wrap(AuthMiddleware::new(state.tokens.clone()))
                        .route(web::patch().to(auth::deactivate_user)),
                )
                .service(
                    web::resource("/{id}")
                        .wrap(AuthMiddleware::new(state.tokens.clone()))
                        .route(web::get().to(auth::get_user))
                        .route(web::patch().to(auth::update_user)),
                ),
        )
        .service(
            web::scope("/tasks")
                .service(tasks::get_tasks)
                .service(tasks::create_task)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        )
        .service(Files::new("/uploads", state.uploads.dir()));
}
