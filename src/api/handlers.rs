//! HTTP route handlers. Plumbing around the engine: authentication, body
//! shapes, and store lookups already scoped to the caller.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::auth;
use crate::db::RECENT_PRESCRIPTIONS_LIMIT;
use crate::documents::{self, PrescriptionDocumentRequest};
use crate::error::AppError;
use crate::models::user::{AuthResponse, LoginRequest, RegisterRequest};
use crate::models::{PrescriptionSubmission, RecommendationQuery};

use super::middleware::AuthedUser;
use super::AppState;

type ApiResult = Result<HttpResponse, AppError>;

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Vidhya API is running" }))
}

// ===== Auth =====

pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> ApiResult {
    let request = body.into_inner();
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let password_hash = auth::hash_password(&request.password)?;
    let user_id = state
        .db
        .create_user(
            &request.email,
            &password_hash,
            &request.name,
            request.phone.as_deref(),
            request.registration_number.as_deref(),
        )
        .await?;
    let user = state
        .db
        .get_user_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    info!(user_id, "practitioner registered");
    let access_token = auth::issue_token(user_id, &state.jwt_secret)?;
    Ok(HttpResponse::Created().json(AuthResponse {
        success: true,
        access_token,
        user,
    }))
}

pub async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> ApiResult {
    let request = body.into_inner();
    let user = state
        .db
        .get_user_by_email(&request.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !auth::verify_password(&request.password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    let access_token = auth::issue_token(user.id, &state.jwt_secret)?;
    Ok(HttpResponse::Ok().json(AuthResponse {
        success: true,
        access_token,
        user,
    }))
}

// ===== Recommendations =====

pub async fn search_medicines(
    user: AuthedUser,
    state: web::Data<AppState>,
    body: web::Json<RecommendationQuery>,
) -> ApiResult {
    let mut query = body.into_inner();
    // Historical search is always scoped to the caller.
    query.user_id = Some(user.user_id);

    let response = state.engine.recommend(&query).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "diagnosis": response.diagnosis,
        "medicines": response.medicines,
        "source_info": response.source_info,
    })))
}

// ===== Patients =====

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
}

pub async fn list_patients(user: AuthedUser, state: web::Data<AppState>) -> ApiResult {
    let patients = state.db.list_patients(user.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "patients": patients })))
}

pub async fn search_patients(
    user: AuthedUser,
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> ApiResult {
    let patients = state.db.search_patients(user.user_id, &params.q).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "patients": patients })))
}

pub async fn get_patient(
    user: AuthedUser,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> ApiResult {
    let patient = state
        .db
        .get_patient(path.into_inner(), user.user_id)
        .await?
        .ok_or(AppError::NotFound("patient"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "patient": patient })))
}

pub async fn patient_prescriptions(
    user: AuthedUser,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> ApiResult {
    let patient_id = path.into_inner();
    state
        .db
        .get_patient(patient_id, user.user_id)
        .await?
        .ok_or(AppError::NotFound("patient"))?;
    let prescriptions = state
        .db
        .list_patient_prescriptions(patient_id, user.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "prescriptions": prescriptions })))
}

// ===== Prescriptions =====

pub async fn create_prescription(
    user: AuthedUser,
    state: web::Data<AppState>,
    body: web::Json<PrescriptionSubmission>,
) -> ApiResult {
    let submission = body.into_inner();
    if submission.medicines.is_empty() {
        return Err(AppError::Validation(
            "a prescription needs at least one medicine".to_string(),
        ));
    }

    let saved = state.engine.save_prescription(user.user_id, submission).await?;
    info!(
        prescription_id = saved.prescription_id,
        patient_id = saved.patient_id,
        patient_created = saved.patient_created,
        "prescription saved"
    );
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "prescription_id": saved.prescription_id,
        "patient_id": saved.patient_id,
        "patient_created": saved.patient_created,
    })))
}

pub async fn list_prescriptions(user: AuthedUser, state: web::Data<AppState>) -> ApiResult {
    let prescriptions = state
        .db
        .list_recent_prescriptions(user.user_id, RECENT_PRESCRIPTIONS_LIMIT)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "prescriptions": prescriptions })))
}

pub async fn get_prescription(
    user: AuthedUser,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> ApiResult {
    let prescription = state
        .db
        .get_prescription(path.into_inner(), user.user_id)
        .await?
        .ok_or(AppError::NotFound("prescription"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "prescription": prescription })))
}

// ===== Documents =====

pub async fn generate_document(
    _user: AuthedUser,
    body: web::Json<PrescriptionDocumentRequest>,
) -> ApiResult {
    let html = documents::render_prescription(&body.into_inner());
    Ok(HttpResponse::Ok().json(json!({ "success": true, "prescription_html": html })))
}
