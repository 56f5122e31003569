//! Errors from routing decisions and model configuration.

use std::error::Error;
use std::fmt;

use silt_core::CapacityId;

/// Errors raised by routing and dispersion models.
#[derive(Clone, Debug, PartialEq)]
pub enum RoutingError {
    /// The cumulative discharge walk never exceeded its own random
    /// threshold. Indicates an inconsistent discharge sum; the particle
    /// stays where it is for this step.
    AccumulationShortfall {
        /// Node at which routing was attempted.
        node: CapacityId,
        /// The random threshold drawn.
        threshold: f64,
        /// Discharge accumulated over all candidate connections.
        accumulated: f64,
    },
    /// A tunable parameter name is not known to the model.
    UnknownParameter {
        /// The requested name.
        name: String,
    },
    /// A configuration or parameter value is out of range.
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccumulationShortfall {
                node,
                threshold,
                accumulated,
            } => write!(
                f,
                "routing at node {node}: accumulated discharge {accumulated} never exceeded threshold {threshold}"
            ),
            Self::UnknownParameter { name } => write!(f, "unknown parameter '{name}'"),
            Self::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter '{name}': {reason}")
            }
        }
    }
}

impl Error for RoutingError {}

/// Reject non-finite or negative values.
pub(crate) fn non_negative(name: &str, value: f64) -> Result<(), RoutingError> {
    if !value.is_finite() || value < 0.0 {
        return Err(RoutingError::InvalidParameter {
            name: name.into(),
            reason: format!("must be finite and >= 0, got {value}"),
        });
    }
    Ok(())
}

/// Reject non-finite, zero or negative values.
pub(crate) fn positive(name: &str, value: f64) -> Result<(), RoutingError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(RoutingError::InvalidParameter {
            name: name.into(),
            reason: format!("must be finite and > 0, got {value}"),
        });
    }
    Ok(())
}
