use thiserror::Error;

/// Errors returned by filter construction and cuckoo filter insertion.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    /// A sizing parameter passed to a constructor was out of range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Accepted range or the reason the value was rejected.
        reason: String,
    },

    /// The cuckoo filter could not find a free slot within `max_kicks` displacements. The filter
    /// is left exactly as it was before the insert.
    #[error("filter is full: no free slot found after {max_kicks} displacements")]
    FilterFull {
        /// The displacement bound that was exhausted.
        max_kicks: usize,
    },
}

impl Error {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// A specialized `Result` type for filter operations.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn validate_item_count(expected_items: usize) -> Result<()> {
    if expected_items == 0 {
        return Err(Error::invalid_parameter(
            "expected_items",
            "must be greater than 0",
        ));
    }
    Ok(())
}

pub(crate) fn validate_fpp(fpp: f64) -> Result<()> {
    if !(fpp > 0.0 && fpp < 1.0) {
        return Err(Error::invalid_parameter(
            "target_fp_rate",
            format!("{} is not in the open interval (0, 1)", fpp),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_fpp, validate_item_count, Error};

    #[test]
    fn test_validate_item_count() {
        assert!(validate_item_count(1).is_ok());
        assert!(matches!(
            validate_item_count(0),
            Err(Error::InvalidParameter {
                name: "expected_items",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_fpp() {
        assert!(validate_fpp(0.01).is_ok());
        for fpp in &[0.0, 1.0, -0.5, 1.5, std::f64::NAN] {
            assert!(matches!(
                validate_fpp(*fpp),
                Err(Error::InvalidParameter {
                    name: "target_fp_rate",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_display() {
        let err = Error::FilterFull { max_kicks: 500 };
        assert_eq!(
            err.to_string(),
            "filter is full: no free slot found after 500 displacements",
        );
    }
}
