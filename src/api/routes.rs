//! Route table.

use actix_web::web;

use super::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::health)).service(
        web::scope("/api")
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(handlers::register))
                    .route("/login", web::post().to(handlers::login)),
            )
            .route("/medicines/search", web::post().to(handlers::search_medicines))
            .route("/prescription/generate", web::post().to(handlers::generate_document))
            .service(
                web::scope("/patients")
                    .route("", web::get().to(handlers::list_patients))
                    // Registered before `{id}` so "search" is not parsed as one.
                    .route("/search", web::get().to(handlers::search_patients))
                    .route("/{id}", web::get().to(handlers::get_patient))
                    .route(
                        "/{id}/prescriptions",
                        web::get().to(handlers::patient_prescriptions),
                    ),
            )
            .service(
                web::scope("/prescriptions")
                    .route("", web::post().to(handlers::create_prescription))
                    .route("", web::get().to(handlers::list_prescriptions))
                    .route("/{id}", web::get().to(handlers::get_prescription)),
            ),
    );
}
