use super::store::CalibrationStore;
use super::DEFAULT_CONSTANT;
use crate::prelude::{CalibrationError, CalibrationResult};
use log::{info, warn};
use std::fmt;

/// Where the effective constant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantSource {
    Override,
    Persisted,
    Default,
}

impl fmt::Display for ConstantSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConstantSource::Override => "command-line override",
            ConstantSource::Persisted => "persisted calibration",
            ConstantSource::Default => "built-in default",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedConstant {
    pub value: f64,
    pub source: ConstantSource,
}

/// Resolves the constant as: explicit override, then persisted record, then 1.0.
///
/// The store is not touched when an override is given. With `require_persisted`
/// a missing or unreadable record is an error instead of a fall back to the
/// default.
pub fn resolve_constant(
    override_constant: Option<f64>,
    store: &CalibrationStore,
    require_persisted: bool,
) -> CalibrationResult<ResolvedConstant> {
    if let Some(value) = override_constant {
        if !(value.is_finite() && value > 0.0) {
            return Err(CalibrationError::InvalidOverride(value));
        }
        return Ok(ResolvedConstant {
            value,
            source: ConstantSource::Override,
        });
    }

    match store.load() {
        Ok(record) => Ok(ResolvedConstant {
            value: record.constant(),
            source: ConstantSource::Persisted,
        }),
        Err(err) if require_persisted => Err(err),
        Err(CalibrationError::CalibrationNotFound(path)) => {
            info!(
                "no calibration at {}, using C = {}",
                path.display(),
                DEFAULT_CONSTANT
            );
            Ok(ResolvedConstant {
                value: DEFAULT_CONSTANT,
                source: ConstantSource::Default,
            })
        }
        Err(err) => {
            warn!("ignoring unreadable calibration: {}", err);
            Ok(ResolvedConstant {
                value: DEFAULT_CONSTANT,
                source: ConstantSource::Default,
            })
        }
    }
}
