//! HTTP API
//!
//! Component CRUD, the scrape trigger and health checks, served with actix-web.
//! Fixed routes are registered before the `/{component}` patterns so they win.

pub mod components;
pub mod error;
pub mod parsing;
pub mod system;

use actix_web::web;

pub use error::ApiError;

/// Register every route and the JSON extractor settings
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .route("/", web::get().to(system::root))
    .route("/health", web::get().to(system::health))
    .service(
        web::scope("/parsing")
            .route("/force-update", web::post().to(parsing::force_update))
            .route("/status", web::get().to(parsing::update_status))
            .route("/reset", web::post().to(parsing::reset_update)),
    )
    .service(
        web::resource(["/{component}", "/{component}/"])
            .route(web::get().to(components::list_components))
            .route(web::post().to(components::create_component)),
    )
    .service(web::resource("/{component}/{name}").route(web::get().to(components::search_components)));
}
