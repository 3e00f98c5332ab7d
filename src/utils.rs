use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Derives a URL-safe category slug: lowercase, runs of anything that is
/// not a letter or digit collapse into a single hyphen.
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    let hyphenated = NON_ALNUM.replace_all(&lowered, "-");

    hyphenated.trim_matches('-').to_string()
}

/// Filename for a stored upload, unique per millisecond.
pub fn image_filename(extension: &str) -> String {
    format!("image-{}.{}", Utc::now().timestamp_millis(), extension)
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn test_basic() {
        assert_eq!(slugify("Main Dishes"), "main-dishes");
        assert_eq!(slugify("Desserts"), "desserts");
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(slugify("Soups & Stews"), "soups-stews");
        assert_eq!(slugify("Quick (30 min!)"), "quick-30-min");
    }

    #[test]
    fn test_leading_trailing() {
        assert_eq!(slugify("  Breakfast  "), "breakfast");
        assert_eq!(slugify("--Vegan--"), "vegan");
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(slugify("Street Food"), slugify("Street Food"));
    }

    #[test]
    fn test_empty() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }
}
