//! Configuration validation.

use crate::config::Config;
use crate::constants::probability;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_tiling(config)?;
    validate_probabilities(config)?;

    if config.dataset.class_values.is_empty() {
        return Err(Error::ConfigValidation {
            message: "dataset.class_values must list at least one value".to_string(),
        });
    }

    Ok(())
}

/// Validate tile layout settings.
fn validate_tiling(config: &Config) -> Result<()> {
    let tiling = &config.tiling;

    if tiling.patch_size == 0 {
        return Err(Error::ConfigValidation {
            message: "patch_size must be at least 1".to_string(),
        });
    }

    if tiling.stride == 0 {
        return Err(Error::ConfigValidation {
            message: "stride must be at least 1".to_string(),
        });
    }

    // Larger strides would leave gaps between tiles.
    if tiling.stride > tiling.patch_size {
        return Err(Error::ConfigValidation {
            message: format!(
                "stride ({}) must not exceed patch_size ({})",
                tiling.stride, tiling.patch_size
            ),
        });
    }

    Ok(())
}

/// Validate probabilities and thresholds are within `[0, 1]`.
fn validate_probabilities(config: &Config) -> Result<()> {
    let checks = [
        (
            "dataset.empty_keep_probability",
            config.dataset.empty_keep_probability,
        ),
        (
            "inference.confidence_threshold",
            f64::from(config.inference.confidence_threshold),
        ),
        (
            "inference.iou_threshold",
            f64::from(config.inference.iou_threshold),
        ),
        (
            "inference.detector_iou_threshold",
            f64::from(config.inference.detector_iou_threshold),
        ),
    ];

    for (name, value) in checks {
        if !(probability::MIN..=probability::MAX).contains(&value) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "{name} must be between {} and {}, got {value}",
                    probability::MIN,
                    probability::MAX
                ),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_invalid_probability() {
        let mut config = Config::default();
        config.dataset.empty_keep_probability = 1.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_invalid_threshold() {
        let mut config = Config::default();
        config.inference.iou_threshold = -0.1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_stride() {
        let mut config = Config::default();
        config.tiling.stride = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_stride_larger_than_patch() {
        let mut config = Config::default();
        config.tiling.stride = 1024;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_stride_equal_to_patch() {
        let mut config = Config::default();
        config.tiling.stride = config.tiling.patch_size;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_no_class_values() {
        let mut config = Config::default();
        config.dataset.class_values.clear();
        assert!(validate_config(&config).is_err());
    }
}
