//! Claims handlers

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{debug, info};
use validator::Validate;

use domain_claims::{ImageUpload, PolicyTier, Submission};

use crate::auth::Claims;
use crate::dto::claims::*;
use crate::{error::ApiError, AppState};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Submits a claim and runs it through adjudication
///
/// Multipart form fields: `image` (file), `description`, `policyTier`.
pub async fn submit_claim(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitClaimResponse>), ApiError> {
    let caller = claims.caller()?;
    let submission = read_submission(multipart).await?;

    let adjudication = state.service.submit(caller, submission).await?;
    info!(claim_id = %adjudication.claim_id, payout = %adjudication.payout, "Claim adjudicated");

    Ok((StatusCode::CREATED, Json(adjudication.into())))
}

/// Lists the caller's claims, newest first
pub async fn list_own_claims(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ClaimView>>, ApiError> {
    let views = state.service.list_own(claims.caller()?).await?;
    Ok(Json(views.into_iter().map(ClaimView::from).collect()))
}

/// Lists every claim, newest first (admin only)
pub async fn list_all_claims(
    State(state): State<AppState>,
) -> Result<Json<Vec<ClaimView>>, ApiError> {
    let views = state.service.list_all().await?;
    Ok(Json(views.into_iter().map(ClaimView::from).collect()))
}

/// Checks a description against damage types without submitting a claim
pub async fn validate_claim(
    State(state): State<AppState>,
    Json(request): Json<ValidateClaimRequest>,
) -> Result<Json<ValidateClaimResponse>, ApiError> {
    request.validate()?;

    let validation = state
        .service
        .check_consistency(&request.description, &request.damage_types)
        .await?;
    Ok(Json(ValidateClaimResponse { validation }))
}

async fn read_submission(mut multipart: Multipart) -> Result<Submission, ApiError> {
    let mut image = None;
    let mut description = None;
    let mut policy_tier = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "image" => {
                let content_type = field
                    .content_type()
                    .unwrap_or(FALLBACK_CONTENT_TYPE)
                    .to_string();
                let bytes = field.bytes().await?;
                image = Some(ImageUpload::new(bytes.to_vec(), content_type));
            }
            "description" => description = Some(field.text().await?),
            "policyTier" => {
                let tier: PolicyTier = field.text().await?.parse().map_err(ApiError::Validation)?;
                policy_tier = Some(tier);
            }
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(Submission {
        image: image.ok_or_else(|| ApiError::Validation("missing form field 'image'".to_string()))?,
        description: description
            .ok_or_else(|| ApiError::Validation("missing form field 'description'".to_string()))?,
        policy_tier: policy_tier
            .ok_or_else(|| ApiError::Validation("missing form field 'policyTier'".to_string()))?,
    })
}
