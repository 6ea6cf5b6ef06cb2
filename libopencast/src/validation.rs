//! Content validation
//!
//! Checks generated text against a category's length bounds and hashtag
//! count. Language is not checked; the prompt asks for it and the result is
//! trusted.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::ValidationError;
use crate::types::ContentRules;

fn hashtag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#\w+").expect("hashtag pattern is a valid regex"))
}

/// Length in characters, the unit every rule is expressed in
pub fn char_length(text: &str) -> usize {
    text.chars().count()
}

/// All hashtags in order of appearance, `#` included
pub fn extract_hashtags(text: &str) -> Vec<String> {
    hashtag_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Validate text against the rules, returning the first violated one
///
/// Rules are checked in order: empty, too short, too long, hashtag count.
///
/// # Examples
///
/// ```
/// use libopencast::error::ValidationError;
/// use libopencast::types::ContentRules;
/// use libopencast::validation::validate;
///
/// let rules = ContentRules::default();
/// assert_eq!(
///     validate("ok #a #b", &rules),
///     Err(ValidationError::TooShort { length: 8, min: 20 })
/// );
/// ```
pub fn validate(text: &str, rules: &ContentRules) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::Empty);
    }

    let length = char_length(text);
    if length < rules.min_length {
        return Err(ValidationError::TooShort {
            length,
            min: rules.min_length,
        });
    }
    if length > rules.max_length {
        return Err(ValidationError::TooLong {
            length,
            max: rules.max_length,
        });
    }

    let found = hashtag_pattern().find_iter(text).count();
    if found != rules.required_hashtags {
        return Err(ValidationError::WrongHashtagCount {
            expected: rules.required_hashtags,
            found,
        });
    }

    Ok(())
}

/// Shorten over-long text at a word boundary, keeping its hashtags
///
/// The hashtags are moved to the end and the remaining body is cut at the
/// last whole word that still leaves room for them. Text that already fits
/// is returned unchanged.
pub fn fit_to_length(text: &str, max_length: usize) -> String {
    if char_length(text) <= max_length {
        return text.to_string();
    }

    let hashtags = extract_hashtags(text);
    let body = hashtag_pattern().replace_all(text, "");
    let body_words: Vec<&str> = body.split_whitespace().collect();

    let tags_length: usize = hashtags.iter().map(|t| char_length(t) + 1).sum();
    let budget = max_length.saturating_sub(tags_length);

    let mut trimmed = String::new();
    for word in body_words {
        let extra = if trimmed.is_empty() { 0 } else { 1 };
        if char_length(&trimmed) + extra + char_length(word) > budget {
            break;
        }
        if extra == 1 {
            trimmed.push(' ');
        }
        trimmed.push_str(word);
    }

    if hashtags.is_empty() {
        trimmed
    } else if trimmed.is_empty() {
        hashtags.join(" ")
    } else {
        format!("{} {}", trimmed, hashtags.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(min: usize, max: usize, tags: usize) -> ContentRules {
        ContentRules {
            min_length: min,
            max_length: max,
            required_hashtags: tags,
        }
    }

    #[test]
    fn test_short_content_is_rejected() {
        let result = validate("ok #a #b", &rules(20, 220, 2));
        assert_eq!(result, Err(ValidationError::TooShort { length: 8, min: 20 }));
    }

    #[test]
    fn test_valid_content_passes() {
        let text = "Use input validation to prevent injection attacks in 2025. #Security #OWASP";
        assert!(validate(text, &rules(20, 220, 2)).is_ok());
    }

    #[test]
    fn test_empty_and_whitespace_content() {
        assert_eq!(validate("", &rules(0, 220, 0)), Err(ValidationError::Empty));
        assert_eq!(validate("   \n\t", &rules(0, 220, 0)), Err(ValidationError::Empty));
    }

    #[test]
    fn test_too_long_content() {
        let text = format!("{} #a #b", "x".repeat(250));
        let result = validate(&text, &rules(20, 220, 2));
        assert_eq!(result, Err(ValidationError::TooLong { length: 256, max: 220 }));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let text = format!("{} #a #b", "x".repeat(14));
        assert_eq!(char_length(&text), 20);
        assert!(validate(&text, &rules(20, 20, 2)).is_ok());
    }

    #[test]
    fn test_wrong_hashtag_count() {
        let text = "Rotate your credentials regularly #Security";
        assert_eq!(
            validate(text, &rules(20, 220, 2)),
            Err(ValidationError::WrongHashtagCount { expected: 2, found: 1 })
        );

        let text = "Rotate your credentials regularly #Security #Ops #Infra";
        assert_eq!(
            validate(text, &rules(20, 220, 2)),
            Err(ValidationError::WrongHashtagCount { expected: 2, found: 3 })
        );
    }

    #[test]
    fn test_lone_hash_is_not_a_hashtag() {
        assert_eq!(extract_hashtags("Item # 4 is #done"), vec!["#done".to_string()]);
    }

    #[test]
    fn test_length_counts_characters() {
        let text = "Şifrelerinizi düzenli olarak değiştirin #Güvenlik #Parola";
        assert!(validate(text, &rules(20, 57, 2)).is_ok());
    }

    #[test]
    fn test_extract_hashtags_in_order() {
        let tags = extract_hashtags("Ship it #Rust then #Tokio, then rest.");
        assert_eq!(tags, vec!["#Rust".to_string(), "#Tokio".to_string()]);
    }

    #[test]
    fn test_fit_to_length_keeps_short_text() {
        let text = "Short and sweet #a #b";
        assert_eq!(fit_to_length(text, 220), text);
    }

    #[test]
    fn test_fit_to_length_trims_at_word_boundary() {
        let text = "Always validate every single input before it reaches your database layer #Security #OWASP";
        let fitted = fit_to_length(text, 50);
        assert!(char_length(&fitted) <= 50);
        assert!(fitted.ends_with("#Security #OWASP"));
        assert!(fitted.starts_with("Always validate"));
        assert!(!fitted.contains("  "));
    }

    #[test]
    fn test_fit_to_length_without_hashtags() {
        let fitted = fit_to_length("one two three four five", 13);
        assert_eq!(fitted, "one two three");
    }
}
