//! Request handlers for the patient endpoints.

use actix_web::{web, HttpResponse};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::error::ApiError;
use crate::models::patient::{NewPatient, PatientUpdate, PatientView};
use crate::registry::PatientRegistry;

#[derive(Debug, Deserialize)]
pub struct SortQuery {
    pub sort_by: String,
    pub order: String,
}

/// `/view` body. Serialized directly so patients keep insertion order.
#[derive(Debug, Serialize)]
struct PatientsBody {
    patients: IndexMap<String, PatientView>,
}

pub async fn hello() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Patient Management System Api" }))
}

pub async fn about() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "A Fully functional Api to manage your patients records"
    }))
}

pub async fn view(registry: web::Data<PatientRegistry>) -> Result<HttpResponse, ApiError> {
    let patients = registry.list().await?;
    Ok(HttpResponse::Ok().json(PatientsBody { patients }))
}

pub async fn view_patient(
    registry: web::Data<PatientRegistry>,
    patient_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let patient = registry.get(&patient_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "patient": patient })))
}

pub async fn sort_patients(
    registry: web::Data<PatientRegistry>,
    query: web::Query<SortQuery>,
) -> Result<HttpResponse, ApiError> {
    let patients = registry.sorted(&query.sort_by, &query.order).await?;
    Ok(HttpResponse::Ok().json(patients))
}

pub async fn create_patient(
    registry: web::Data<PatientRegistry>,
    patient: web::Json<NewPatient>,
) -> Result<HttpResponse, ApiError> {
    registry
        .create(patient.into_inner())
        .await
        .map_err(ApiError::rejected_create)?;
    Ok(HttpResponse::Created().json(json!({ "message": "Patient created successfully" })))
}

pub async fn update_patient(
    registry: web::Data<PatientRegistry>,
    patient_id: web::Path<String>,
    update: web::Json<PatientUpdate>,
) -> Result<HttpResponse, ApiError> {
    registry.update(&patient_id, update.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Patient updated successfully" })))
}

pub async fn delete_patient(
    registry: web::Data<PatientRegistry>,
    patient_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    registry.delete(&patient_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Patient deleted successfully" })))
}
