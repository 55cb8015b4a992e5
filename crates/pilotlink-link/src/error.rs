/// Errors returned to callers of the link.
///
/// Transport failures and malformed inbound lines never show up here; they
/// are logged and, where it applies, retried where they happen.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// The construction options are unusable. The link is not created.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A command was missing required fields. Lists every missing field.
    #[error("missing required fields: [{}]", .0.join(","))]
    MissingFields(Vec<&'static str>),

    /// A numeric field was NaN or infinite. JSON has no encoding for these.
    #[error("non-finite values in fields: [{}]", .0.join(","))]
    NonFinite(Vec<&'static str>),

    /// A command could not be encoded for the wire.
    #[error("failed to encode command: {0}")]
    Encode(String),
}

impl From<pilotlink_frame::FrameError> for LinkError {
    fn from(err: pilotlink_frame::FrameError) -> Self {
        Self::Encode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;

/// Fail with [`LinkError::MissingFields`] naming every absent field.
pub(crate) fn require(fields: &[(&'static str, bool)]) -> Result<()> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(LinkError::MissingFields(missing))
    }
}

/// Fail with [`LinkError::NonFinite`] naming every present field that is
/// NaN or infinite. Absent fields pass.
pub(crate) fn require_finite(fields: &[(&'static str, Option<f64>)]) -> Result<()> {
    let bad: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| value.is_some_and(|v| !v.is_finite()))
        .map(|(name, _)| *name)
        .collect();

    if bad.is_empty() {
        Ok(())
    } else {
        Err(LinkError::NonFinite(bad))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_lists_every_missing_field_in_order() {
        let err = require(&[("M1", false), ("M2", true), ("Dist", false)]).unwrap_err();
        assert_eq!(err, LinkError::MissingFields(vec!["M1", "Dist"]));
        assert_eq!(err.to_string(), "missing required fields: [M1,Dist]");
    }

    #[test]
    fn require_passes_when_all_present() {
        assert!(require(&[("Hdg", true)]).is_ok());
        assert!(require(&[]).is_ok());
    }

    #[test]
    fn require_finite_names_nan_and_infinite_fields() {
        let err = require_finite(&[
            ("Dist", Some(f64::NAN)),
            ("Hdg", None),
            ("Pwr", Some(f64::NEG_INFINITY)),
            ("M1", Some(1.0)),
        ])
        .unwrap_err();
        assert_eq!(err, LinkError::NonFinite(vec!["Dist", "Pwr"]));
        assert_eq!(err.to_string(), "non-finite values in fields: [Dist,Pwr]");
    }
}
