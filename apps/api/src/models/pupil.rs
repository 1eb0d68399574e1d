use crate::errors::AppError;
use crate::iris::measurement::IRIS_REFERENCE_MM;

/// How the pupil size is decided for a render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PupilMode {
    /// The generator picks a natural pupil size.
    Natural,
    /// The caller fixed the pupil diameter in millimetres; always finite and `> 0`.
    Fixed { pupil_mm: f64 },
}

impl PupilMode {
    /// Builds the mode from the raw form fields.
    ///
    /// An absent or unrecognised mode falls back to `Natural`, in which case `pupil_mm`
    /// is ignored. For `fixed`, `pupil_mm` must parse to a finite number in
    /// `(0, IRIS_REFERENCE_MM]`.
    pub fn from_form(mode: Option<&str>, pupil_mm: Option<&str>) -> Result<Self, AppError> {
        let is_fixed = mode
            .map(|m| m.trim().eq_ignore_ascii_case("fixed"))
            .unwrap_or(false);
        if !is_fixed {
            return Ok(PupilMode::Natural);
        }

        let raw = pupil_mm
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AppError::InvalidInput("pupil_mm is required when pupil_mode is 'fixed'".to_string())
            })?;

        let value: f64 = raw.parse().map_err(|_| {
            AppError::InvalidInput(format!("pupil_mm must be a number, got '{raw}'"))
        })?;

        if !value.is_finite() || value <= 0.0 {
            return Err(AppError::InvalidInput(format!(
                "pupil_mm must be a positive number, got '{raw}'"
            )));
        }
        if value > IRIS_REFERENCE_MM {
            return Err(AppError::InvalidInput(format!(
                "pupil_mm must not exceed the {IRIS_REFERENCE_MM} mm iris diameter, got '{raw}'"
            )));
        }

        Ok(PupilMode::Fixed { pupil_mm: value })
    }

    pub fn pupil_mm(&self) -> Option<f64> {
        match self {
            PupilMode::Natural => None,
            PupilMode::Fixed { pupil_mm } => Some(*pupil_mm),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PupilMode::Natural => "natural",
            PupilMode::Fixed { .. } => "fixed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_message(result: Result<PupilMode, AppError>) -> String {
        match result {
            Err(AppError::InvalidInput(msg)) => msg,
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_mode_defaults_to_natural() {
        assert_eq!(PupilMode::from_form(None, None).unwrap(), PupilMode::Natural);
    }

    #[test]
    fn test_unrecognised_mode_defaults_to_natural() {
        let mode = PupilMode::from_form(Some("dilated"), Some("abc")).unwrap();
        assert_eq!(mode, PupilMode::Natural);
    }

    #[test]
    fn test_natural_ignores_pupil_mm() {
        let mode = PupilMode::from_form(Some("natural"), Some("-3")).unwrap();
        assert_eq!(mode, PupilMode::Natural);
    }

    #[test]
    fn test_fixed_parses_decimal() {
        let mode = PupilMode::from_form(Some("fixed"), Some(" 3.5 ")).unwrap();
        assert_eq!(mode, PupilMode::Fixed { pupil_mm: 3.5 });
        assert_eq!(mode.pupil_mm(), Some(3.5));
    }

    #[test]
    fn test_fixed_mode_is_case_insensitive() {
        let mode = PupilMode::from_form(Some("FIXED"), Some("4")).unwrap();
        assert_eq!(mode.label(), "fixed");
    }

    #[test]
    fn test_fixed_requires_pupil_mm() {
        let msg = invalid_message(PupilMode::from_form(Some("fixed"), None));
        assert!(msg.contains("required"));
        let msg = invalid_message(PupilMode::from_form(Some("fixed"), Some("  ")));
        assert!(msg.contains("required"));
    }

    #[test]
    fn test_fixed_rejects_non_numeric() {
        let msg = invalid_message(PupilMode::from_form(Some("fixed"), Some("four")));
        assert!(msg.contains("number"));
    }

    #[test]
    fn test_fixed_rejects_zero_negative_and_non_finite() {
        for raw in ["0", "-1.5", "NaN", "inf", "-inf"] {
            let msg = invalid_message(PupilMode::from_form(Some("fixed"), Some(raw)));
            assert!(msg.contains("positive"), "{raw}: {msg}");
        }
    }

    #[test]
    fn test_fixed_rejects_pupil_wider_than_iris() {
        let msg = invalid_message(PupilMode::from_form(Some("fixed"), Some("12.6")));
        assert!(msg.contains("12.5"));
        assert!(PupilMode::from_form(Some("fixed"), Some("12.5")).is_ok());
    }
}
