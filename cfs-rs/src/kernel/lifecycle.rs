use super::ConfigError;

/// Constructor validation lifecycle shared by kernel structs.
pub trait KernelLifecycle: Sized {
    /// Kernel config type.
    type Config;

    /// Construct a validated kernel from config.
    fn try_new(config: Self::Config) -> Result<Self, ConfigError>;
}

/// Checks that a weight or tolerance is finite and non-negative.
pub(crate) fn validate_non_negative<F>(arg: &'static str, value: F) -> Result<(), ConfigError>
where
    F: nalgebra::RealField + Copy,
{
    if !value.is_finite() {
        return Err(ConfigError::InvalidArgument {
            arg,
            reason: "must be finite",
        });
    }
    if value < F::zero() {
        return Err(ConfigError::InvalidArgument {
            arg,
            reason: "must be non-negative",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_zero_and_positive_values() {
        assert!(validate_non_negative("gamma", 0.0f64).is_ok());
        assert!(validate_non_negative("gamma", 0.5f32).is_ok());
    }

    #[test]
    fn rejects_negative_and_non_finite_values() {
        assert_eq!(
            validate_non_negative("alpha", -1e-5f64),
            Err(ConfigError::InvalidArgument {
                arg: "alpha",
                reason: "must be non-negative",
            })
        );
        assert_eq!(
            validate_non_negative("beta", f64::NAN),
            Err(ConfigError::InvalidArgument {
                arg: "beta",
                reason: "must be finite",
            })
        );
        assert!(validate_non_negative("beta", f32::INFINITY).is_err());
    }
}
