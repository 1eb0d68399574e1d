// Prompt composition for the iris generator.
// The only caller-derived values interpolated here are the validated pupil diameter
// and its fraction of the iris; both are numbers.

use crate::iris::measurement::{pupil_fraction_of_iris, IRIS_REFERENCE_MM};
use crate::models::pupil::PupilMode;

/// Instructions shared by every render, regardless of pupil mode.
pub const BASE_INSTRUCTIONS: &str = "\
Create a single, perfectly circular human iris centered in a square frame. \
The background must be pure black (#000000) with a thin black margin around the iris. \
Do not include any eyelid, eyelashes, skin, or sclera; only the iris and its pupil are visible. \
Preserve the natural iris texture detail from the source eye: crypts, furrows, collarette and color variation. \
Render a crisp, well-defined limbal ring at the outer edge of the iris. \
Suppress reflections and catchlights from the source photo and do not add any new ones. \
No text, logos, watermarks, or borders. \
The iris must be exactly centered in the frame. \
No gradient or vignette on the background.";

/// Pupil instruction when the generator decides the pupil size.
pub const NATURAL_PUPIL_INSTRUCTION: &str = "\
Render a naturally sized pupil, as it would appear under typical indoor lighting.";

/// Appended last to every prompt.
pub const CLOSING_INSTRUCTION: &str = "\
Do not draw any extra shapes, rings, or markings: only the iris and pupil on pure black.";

/// Builds the full generator prompt for the given pupil mode. Total: never fails.
pub fn build_prompt(mode: &PupilMode) -> String {
    let pupil_instruction = match mode {
        PupilMode::Natural => NATURAL_PUPIL_INSTRUCTION.to_string(),
        PupilMode::Fixed { pupil_mm } => fixed_pupil_instruction(*pupil_mm),
    };

    format!("{BASE_INSTRUCTIONS}\n\n{pupil_instruction}\n\n{CLOSING_INSTRUCTION}")
}

fn fixed_pupil_instruction(pupil_mm: f64) -> String {
    let fraction = pupil_fraction_of_iris(pupil_mm);
    format!(
        "Anatomical constraint: the full iris corresponds to a real-world diameter of \
        {IRIS_REFERENCE_MM} mm. The pupil must have a diameter of {pupil_mm} mm, which is \
        {fraction:.3} ({percent:.1}%) of the iris diameter. Render the pupil as a round, \
        centered black disk at exactly this size.",
        percent = fraction * 100.0,
    )
}
