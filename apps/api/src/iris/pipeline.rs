//! Render pipeline: validate → prompt → generate → (fixed only) overlay.
//!
//! Every failure aborts the request once; nothing is retried and no partial image is
//! returned. The upload buffer is owned by this scope and released on every path.

use tracing::{debug, info};

use crate::errors::AppError;
use crate::image_client::{GenerationRequest, IrisGenerator};
use crate::iris::measurement::{PupilGeometry, RenderFrame};
use crate::iris::overlay::overlay_pupil;
use crate::iris::prompts::build_prompt;
use crate::iris::upload::ScopedUpload;
use crate::models::pupil::PupilMode;

const FALLBACK_MIME: &str = "image/png";

/// Raw, unvalidated render request as received from the form.
#[derive(Debug, Default)]
pub struct RenderRequest {
    pub image: Option<ScopedUpload>,
    pub pupil_mode: Option<String>,
    pub pupil_mm: Option<String>,
}

/// Bytes returned to the caller.
#[derive(Debug)]
pub struct FinalImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub mode: PupilMode,
    pub geometry: Option<PupilGeometry>,
}

pub async fn render_iris(
    generator: &dyn IrisGenerator,
    frame: &RenderFrame,
    request: RenderRequest,
) -> Result<FinalImage, AppError> {
    let RenderRequest {
        image,
        pupil_mode,
        pupil_mm,
    } = request;

    let mode = PupilMode::from_form(pupil_mode.as_deref(), pupil_mm.as_deref())?;
    let upload = image
        .filter(|upload| !upload.is_empty())
        .ok_or_else(|| AppError::InvalidInput("an eye image upload is required".to_string()))?;
    debug!(upload_bytes = upload.len(), mode = mode.label(), "validated render request");

    let prompt = build_prompt(&mode);
    let source_image = upload.read_all().await?;
    let source_mime = sniff_mime(&source_image)
        .or(upload.content_type().filter(|ct| ct.starts_with("image/")))
        .unwrap_or(FALLBACK_MIME)
        .to_string();
    drop(upload);

    info!(
        mode = mode.label(),
        pupil_mm = ?mode.pupil_mm(),
        upload_bytes = source_image.len(),
        strategy = generator.strategy(),
        "requesting iris render"
    );

    let generated = generator
        .generate(&GenerationRequest {
            prompt,
            source_image,
            source_mime,
            size: frame.size_param(),
        })
        .await?;

    match mode {
        PupilMode::Natural => {
            debug!(bytes = generated.len(), "natural pupil, returning generated image");
            let content_type = sniff_mime(&generated).unwrap_or(FALLBACK_MIME);
            Ok(FinalImage {
                bytes: generated,
                content_type,
                mode,
                geometry: None,
            })
        }
        PupilMode::Fixed { pupil_mm } => {
            let geometry = PupilGeometry::for_frame(pupil_mm, frame);
            info!(
                pupil_mm,
                radius_px = geometry.radius_px,
                diameter_px = geometry.diameter_px,
                side_px = frame.side_px(),
                "compositing fixed pupil"
            );

            let frame = *frame;
            let radius_px = geometry.radius_px;
            let bytes =
                tokio::task::spawn_blocking(move || overlay_pupil(&generated, radius_px, &frame))
                    .await
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("overlay task failed: {e}")))??;

            Ok(FinalImage {
                bytes,
                content_type: "image/png",
                mode,
                geometry: Some(geometry),
            })
        }
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|format| format.to_mime_type())
}
