use std::fmt;
use std::str::FromStr;

use unicode_segmentation::UnicodeSegmentation;

const MAX_LEN: usize = 256;

/// A user supplied city name.
///
/// The name is kept exactly as supplied (no case folding), since it is also
/// part of the weather cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct City(String);

impl FromStr for City {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().is_empty() {
            return Err("City cannot be empty".into());
        }
        if value.graphemes(true).count() > MAX_LEN {
            return Err("City name too long".into());
        }
        if value.chars().any(char::is_control) {
            return Err("City name contains invalid characters".into());
        }
        Ok(Self(value.to_string()))
    }
}

impl AsRef<str> for City {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use claims::{assert_err, assert_ok};

    use super::*;

    #[test]
    fn multi_word_city_valid() {
        let city: City = assert_ok!("Ivano-Frankivsk".parse());
        assert_eq!("Ivano-Frankivsk", city.as_ref());
        assert_ok!("New York".parse::<City>());
    }

    #[test]
    fn case_is_preserved() {
        let city: City = "kYiV".parse().unwrap();
        assert_eq!("kYiV", city.as_ref());
    }

    #[test]
    fn long_city_valid() {
        assert_ok!("ї".repeat(MAX_LEN).parse::<City>());
    }

    #[test]
    fn too_long_city_invalid() {
        assert_err!("ї".repeat(MAX_LEN + 1).parse::<City>());
    }

    #[test]
    fn blank_city_invalid() {
        assert_err!("   ".parse::<City>());
        assert_err!("".parse::<City>());
    }

    #[test]
    fn control_chars_invalid() {
        assert_err!("Kyiv\n".parse::<City>());
    }
}
