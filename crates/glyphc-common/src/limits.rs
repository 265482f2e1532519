//! Capacity limits enforced by the analyzer, per "Capacity" error
//! class. Named here (not in glyphc-analyzer) so `glyphc-types`'s
//! declarative-type parser can enforce the generic-argument limit without
//! depending back on the analyzer.

/// A function or initializer may declare at most this many parameters.
pub const MAX_PARAMETERS: usize = 255;

/// A single type or function may declare at most this many generic
/// parameters (and a call site may supply at most this many arguments).
pub const MAX_GENERIC_ARGUMENTS: usize = 255;

/// A compilation may link at most this many packages.
pub const MAX_PACKAGES: usize = 65_535;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityError {
    pub what: &'static str,
    pub count: usize,
    pub limit: usize,
}

impl CapacityError {
    #[must_use]
    pub fn check(what: &'static str, count: usize, limit: usize) -> Result<(), Self> {
        if count > limit {
            Err(Self { what, count, limit })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_limit_is_ok() {
        assert!(CapacityError::check("parameters", 10, MAX_PARAMETERS).is_ok());
    }

    #[test]
    fn over_limit_is_err() {
        let err = CapacityError::check("parameters", 256, MAX_PARAMETERS).unwrap_err();
        assert_eq!(err.count, 256);
        assert_eq!(err.limit, 255);
    }

    #[test]
    fn exactly_at_limit_is_ok() {
        assert!(CapacityError::check("parameters", MAX_PARAMETERS, MAX_PARAMETERS).is_ok());
    }
}
