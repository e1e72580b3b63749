// Route table

use crate::api::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // public
        .route("/health", web::get().to(handlers::health_check))
        .service(
            web::resource("/login")
                .route(web::get().to(handlers::login_page))
                .route(web::post().to(handlers::login)),
        )
        // session required
        .route("/logout", web::get().to(handlers::logout))
        .route("/", web::get().to(handlers::dashboard))
        .route("/clear/{table_name}", web::get().to(handlers::clear_table))
        .route("/preview", web::post().to(handlers::upload_preview))
        // category pages; registered last so fixed paths win
        .service(
            web::resource("/{slug}")
                .route(web::get().to(handlers::view_category))
                .route(web::post().to(handlers::upload_category)),
        );
}
