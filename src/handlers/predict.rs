//! Image classification endpoint.

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartRejection},
};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::Identity;
use crate::models::food::Language;
use crate::models::prediction::PredictionResponse;
use crate::state::AppState;

const IMAGE_FIELD: &str = "image";
const LANG_FIELD: &str = "lang";

/// Classify an uploaded food photo.
///
/// # Endpoint
///
/// `POST /api/predict` (multipart form)
///
/// # Form Fields
///
/// - `image`: the photo (JPEG, PNG, WebP, GIF or BMP)
/// - `lang`: `VN` (default) or `EN`
///
/// # Authentication
///
/// Optional. Signed-in callers get a larger quota and have the result saved
/// to their history.
///
/// # Response
///
/// - **Success (200 OK)**: label, confidence in percent, localized food info
///   and runner-up labels
/// - **Error (400)**: no image, unsupported language or undecodable image
/// - **Error (404)**: the predicted label has no food information
/// - **Error (413)**: image larger than the upload limit
/// - **Error (429)**: quota exhausted
/// - **Error (500)**: classification failed
pub async fn predict(
    State(state): State<AppState>,
    identity: Identity,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<PredictionResponse>> {
    let mut multipart = multipart?;
    let mut image: Option<Bytes> = None;
    let mut lang = Language::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(IMAGE_FIELD) => image = Some(field.bytes().await?),
            Some(LANG_FIELD) => {
                lang = Language::try_from(field.text().await?).map_err(AppError::Validation)?;
            }
            _ => {}
        }
    }

    let image = image
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| AppError::Validation("No image provided".to_string()))?;

    let response = state
        .predictions
        .predict(image, lang, identity.username())
        .await?;
    Ok(Json(response))
}
