//! Public submission endpoints.
//!
//! Each endpoint validates its payload, stamps and persists the record,
//! and hands an alert to the notifier without waiting for it.

use axum::{extract::State, http::StatusCode, Json};
use domain::models::{
    CreateBookingRequest, CreateEnquiryRequest, CreatePaymentRequest, Record, Submission,
};
use persistence::PersistError;
use serde::Serialize;
use tracing::debug;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::SubmissionBody;
use crate::middleware::metrics::record_submission_rejected;
use crate::services::spawn_notify;

/// Body of a successful submission.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse<R> {
    pub ok: bool,
    pub id: String,
    pub record: R,
    #[serde(rename = "confirmUrl", skip_serializing_if = "Option::is_none")]
    pub confirm_url: Option<String>,
}

type Created<R> = (StatusCode, Json<SubmissionResponse<R>>);

/// Accept a consultation booking.
///
/// POST /api/book
pub async fn create_booking(
    State(state): State<AppState>,
    SubmissionBody(request): SubmissionBody<CreateBookingRequest>,
) -> Result<Created<<CreateBookingRequest as Submission>::Record>, ApiError> {
    let record = accept(&state, request).await?;
    Ok(created(record, None))
}

/// Accept a general enquiry.
///
/// POST /api/enquire
pub async fn create_enquiry(
    State(state): State<AppState>,
    SubmissionBody(request): SubmissionBody<CreateEnquiryRequest>,
) -> Result<Created<<CreateEnquiryRequest as Submission>::Record>, ApiError> {
    let record = accept(&state, request).await?;
    Ok(created(record, None))
}

/// Record a payment intent. No payment is processed.
///
/// POST /api/payment
pub async fn create_payment(
    State(state): State<AppState>,
    SubmissionBody(request): SubmissionBody<CreatePaymentRequest>,
) -> Result<Created<<CreatePaymentRequest as Submission>::Record>, ApiError> {
    let record = accept(&state, request).await?;
    let confirm_url = Some(state.config.payment.confirm_url.clone()).filter(|u| !u.is_empty());
    Ok(created(record, confirm_url))
}

/// Validates, stamps, persists and announces one submission.
async fn accept<S: Submission>(state: &AppState, request: S) -> Result<S::Record, ApiError> {
    let kind = <S::Record as Record>::KIND;

    let persisted = match state.store.persist(request).await {
        Ok(persisted) => persisted,
        Err(PersistError::Invalid(errors)) => {
            record_submission_rejected(&kind.to_string());
            debug!(kind = %kind, errors = %errors, "Submission rejected");
            return Err(errors.into());
        }
        Err(PersistError::Local(e)) => return Err(e.into()),
    };

    spawn_notify(state.notifier.clone(), persisted.record.notification());

    Ok(persisted.record)
}

fn created<R: Record>(record: R, confirm_url: Option<String>) -> Created<R> {
    (
        StatusCode::CREATED,
        Json(SubmissionResponse {
            ok: true,
            id: record.id().to_string(),
            record,
            confirm_url,
        }),
    )
}
