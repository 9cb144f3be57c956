//! Route table and extractor configuration.

use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::{web, HttpRequest};

use super::error::ApiError;
use super::handlers;

/// Register every patient route. Expects `web::Data<PatientRegistry>` in app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(bad_query))
        .route("/", web::get().to(handlers::hello))
        .route("/about", web::get().to(handlers::about))
        .route("/view", web::get().to(handlers::view))
        .route("/view/{patient_id}", web::get().to(handlers::view_patient))
        .route("/sort", web::get().to(handlers::sort_patients))
        .service(
            web::resource("/create")
                .app_data(web::JsonConfig::default().error_handler(bad_create_body))
                .route(web::post().to(handlers::create_patient)),
        )
        .service(
            web::resource("/edit/{patient_id}")
                .app_data(web::JsonConfig::default().error_handler(bad_update_body))
                .route(web::put().to(handlers::update_patient)),
        )
        .route("/delete/{patient_id}", web::delete().to(handlers::delete_patient));
}

fn bad_query(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(err.to_string().into()).into()
}

fn bad_create_body(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(err.to_string().into()).into()
}

fn bad_update_body(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Unprocessable(err.to_string().into()).into()
}
