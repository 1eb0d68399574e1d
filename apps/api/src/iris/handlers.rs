//! Axum route handlers for the Iris API.

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::iris::pipeline::{render_iris, RenderRequest};
use crate::iris::upload::{multipart_error, ScopedUpload};
use crate::state::AppState;

const IMAGE_FIELD: &str = "image";
const MODE_FIELD: &str = "pupil_mode";
const PUPIL_MM_FIELD: &str = "pupil_mm";

/// POST /api/v1/iris/render
///
/// Multipart form: `image` (file), `pupil_mode` (`natural` | `fixed`), `pupil_mm`.
/// Responds with the final image bytes.
pub async fn handle_render_iris(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("render_iris", %request_id);

    async move {
        let request = read_render_form(&mut multipart, state.config.max_upload_bytes).await?;
        let image = render_iris(state.generator.as_ref(), &state.config.frame, request).await?;

        info!(
            mode = image.mode.label(),
            radius_px = ?image.geometry.map(|g| g.radius_px),
            bytes = image.bytes.len(),
            content_type = image.content_type,
            "iris render complete"
        );

        Ok::<Response, AppError>(
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, image.content_type)],
                image.bytes,
            )
                .into_response(),
        )
    }
    .instrument(span)
    .await
}

/// Reads the multipart form into a `RenderRequest`. Unknown fields are skipped.
async fn read_render_form(
    multipart: &mut Multipart,
    max_upload_bytes: usize,
) -> Result<RenderRequest, AppError> {
    let mut request = RenderRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("malformed multipart form", e))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(IMAGE_FIELD) => {
                request.image = Some(ScopedUpload::from_field(field, max_upload_bytes).await?);
            }
            Some(MODE_FIELD) => {
                request.pupil_mode = Some(read_text(field).await?);
            }
            Some(PUPIL_MM_FIELD) => {
                request.pupil_mm = Some(read_text(field).await?);
            }
            _ => {}
        }
    }

    Ok(request)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    let name = field.name().unwrap_or_default().to_string();
    field
        .text()
        .await
        .map_err(|e| multipart_error(&format!("could not read form field '{name}'"), e))
}
