//! Measurement model — converts a real-world pupil diameter into pixel space.
//!
//! The generated iris is assumed (not measured) to fill `iris_fraction` of a square
//! frame of `side_px` pixels, and that disk is taken to be `IRIS_REFERENCE_MM` wide.

use thiserror::Error;

/// Real-world iris diameter in millimetres. A physical assumption, never derived from input.
pub const IRIS_REFERENCE_MM: f64 = 12.5;

pub const DEFAULT_SIDE_PX: u32 = 2048;
pub const DEFAULT_IRIS_FRACTION: f64 = 0.9;

#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("frame side must be greater than zero")]
    ZeroSide,

    #[error("iris fraction must lie in (0, 1], got {0}")]
    IrisFractionOutOfRange(f64),
}

/// Square output frame and the share of its side covered by the iris disk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderFrame {
    side_px: u32,
    iris_fraction: f64,
}

impl Default for RenderFrame {
    fn default() -> Self {
        Self {
            side_px: DEFAULT_SIDE_PX,
            iris_fraction: DEFAULT_IRIS_FRACTION,
        }
    }
}

impl RenderFrame {
    pub fn new(side_px: u32, iris_fraction: f64) -> Result<Self, FrameError> {
        if side_px == 0 {
            return Err(FrameError::ZeroSide);
        }
        if !iris_fraction.is_finite() || iris_fraction <= 0.0 || iris_fraction > 1.0 {
            return Err(FrameError::IrisFractionOutOfRange(iris_fraction));
        }
        Ok(Self {
            side_px,
            iris_fraction,
        })
    }

    pub fn side_px(&self) -> u32 {
        self.side_px
    }

    pub fn iris_fraction(&self) -> f64 {
        self.iris_fraction
    }

    pub fn iris_diameter_px(&self) -> f64 {
        f64::from(self.side_px) * self.iris_fraction
    }

    /// Pixel centre of the frame, `(side / 2, side / 2)`.
    pub fn center(&self) -> (f64, f64) {
        let half = f64::from(self.side_px) / 2.0;
        (half, half)
    }

    /// Output size in the `{width}x{height}` form the generator expects.
    pub fn size_param(&self) -> String {
        format!("{0}x{0}", self.side_px)
    }
}

/// Pupil disk in pixel space. Only ever computed for a fixed pupil size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PupilGeometry {
    pub diameter_px: f64,
    pub radius_px: f64,
}

impl PupilGeometry {
    pub fn for_frame(pupil_mm: f64, frame: &RenderFrame) -> Self {
        let radius_px = compute_pupil_radius_px(
            pupil_mm,
            frame.side_px,
            frame.iris_fraction,
            IRIS_REFERENCE_MM,
        );
        Self {
            diameter_px: radius_px * 2.0,
            radius_px,
        }
    }
}

/// Pupil radius in pixels for a pupil of `pupil_mm` on a frame of `frame_side` pixels.
///
/// `pupil_mm` must already be validated as finite and positive. The result is not
/// clamped to the frame; callers bound the input instead.
pub fn compute_pupil_radius_px(
    pupil_mm: f64,
    frame_side: u32,
    iris_fraction: f64,
    iris_reference_mm: f64,
) -> f64 {
    let iris_diameter_px = f64::from(frame_side) * iris_fraction;
    let pupil_fraction = pupil_mm / iris_reference_mm;
    let pupil_diameter_px = iris_diameter_px * pupil_fraction;
    pupil_diameter_px / 2.0
}

/// Share of the iris diameter the pupil should occupy.
pub fn pupil_fraction_of_iris(pupil_mm: f64) -> f64 {
    pupil_mm / IRIS_REFERENCE_MM
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_reference_radius_for_default_frame() {
        let r = compute_pupil_radius_px(3.5, 2048, 0.9, 12.5);
        assert!(approx_eq(r, 258.048), "got {r}");
    }

    #[test]
    fn test_full_reference_pupil_is_half_iris() {
        for (side, fraction) in [(2048u32, 0.9), (1024, 0.85), (512, 1.0)] {
            let r = compute_pupil_radius_px(IRIS_REFERENCE_MM, side, fraction, IRIS_REFERENCE_MM);
            assert!(approx_eq(r, f64::from(side) * fraction / 2.0));
        }
    }

    #[test]
    fn test_radius_scales_linearly() {
        for mm in [0.5, 2.0, 3.5, 4.25, 6.0] {
            let single = compute_pupil_radius_px(mm, 2048, 0.9, 12.5);
            let double = compute_pupil_radius_px(mm * 2.0, 2048, 0.9, 12.5);
            assert!(approx_eq(double, single * 2.0));
        }
    }

    #[test]
    fn test_radius_monotonic_in_pupil_mm() {
        let radii: Vec<f64> = (1..=40)
            .map(|step| compute_pupil_radius_px(f64::from(step) * 0.25, 2048, 0.9, 12.5))
            .collect();
        assert!(radii.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_radius_not_clamped() {
        let r = compute_pupil_radius_px(40.0, 2048, 0.9, 12.5);
        assert!(r > 1024.0);
    }

    #[test]
    fn test_geometry_for_default_frame() {
        let geometry = PupilGeometry::for_frame(3.5, &RenderFrame::default());
        assert!(approx_eq(geometry.radius_px, 258.048));
        assert!(approx_eq(geometry.diameter_px, 516.096));
    }

    #[test]
    fn test_frame_validation() {
        assert_eq!(RenderFrame::new(0, 0.9), Err(FrameError::ZeroSide));
        assert!(RenderFrame::new(2048, 0.0).is_err());
        assert!(RenderFrame::new(2048, 1.01).is_err());
        assert!(RenderFrame::new(2048, f64::NAN).is_err());
        assert!(RenderFrame::new(2048, 1.0).is_ok());
    }

    #[test]
    fn test_frame_center_and_size_param() {
        let frame = RenderFrame::new(1024, 0.9).unwrap();
        assert_eq!(frame.center(), (512.0, 512.0));
        assert_eq!(frame.size_param(), "1024x1024");
        assert!(approx_eq(frame.iris_diameter_px(), 921.6));
    }
}
