//! CLI argument validators.
//!
//! Shared validation functions for CLI argument parsing.

/// Parse a threshold in `[0, 1]`.
pub fn parse_threshold(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(0.0..=1.0).contains(&value) {
        return Err(format!("threshold must be between 0.0 and 1.0, got {value}"));
    }

    Ok(value)
}

/// Parse a probability in `[0, 1]`.
pub fn parse_probability(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(0.0..=1.0).contains(&value) {
        return Err(format!("probability must be between 0.0 and 1.0, got {value}"));
    }

    Ok(value)
}

/// Parse a pixel count of at least 1.
pub fn parse_pixels(s: &str) -> Result<u32, String> {
    let value: u32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid pixel count"))?;

    if value == 0 {
        return Err("pixel count must be at least 1".to_string());
    }

    Ok(value)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold("0.45").ok(), Some(0.45));
        assert_eq!(parse_threshold("1.0").ok(), Some(1.0));
        assert!(parse_threshold("1.5").is_err());
        assert!(parse_threshold("abc").is_err());
    }

    #[test]
    fn test_parse_probability() {
        assert_eq!(parse_probability("0").ok(), Some(0.0));
        assert!(parse_probability("-0.1").is_err());
    }

    #[test]
    fn test_parse_pixels() {
        assert_eq!(parse_pixels("512").ok(), Some(512));
        assert!(parse_pixels("0").is_err());
        assert!(parse_pixels("-5").is_err());
    }
}
