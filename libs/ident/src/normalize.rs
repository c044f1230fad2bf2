//! Slug normalization.
//!
//! Turns free text into a base slug candidate made only of `[a-z0-9-]`.
//!
//! - ASCII letters are lowercased, digits are kept.
//! - Word separators (whitespace, `-`, `_`, `/`, `.`, `&`, ...) become a
//!   single `-`, and only between two kept characters.
//! - Common Latin letters with diacritics fold to ASCII (`é` -> `e`).
//! - Everything else (apostrophes, quotes, `!`, emoji) is dropped without
//!   introducing a separator, so `Men's` becomes `mens`.
//!
//! Normalization is total: it never fails, and empty or all-punctuation
//! input yields an empty string.

/// Normalizes free text into a base slug candidate.
pub fn normalize(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for ch in raw.chars() {
        for lower in ch.to_lowercase() {
            if lower.is_ascii_alphanumeric() {
                push_kept(&mut slug, &mut pending_separator, lower);
            } else if let Some(folded) = fold_latin(lower) {
                for c in folded.chars() {
                    push_kept(&mut slug, &mut pending_separator, c);
                }
            } else if is_separator(lower) {
                pending_separator = true;
            }
        }
    }

    slug
}

/// Appends a kept character, emitting a deferred separator first.
///
/// Deferring the separator until the next kept character is what keeps
/// hyphens from leading, trailing or doubling.
fn push_kept(slug: &mut String, pending_separator: &mut bool, c: char) {
    if *pending_separator && !slug.is_empty() {
        slug.push('-');
    }
    slug.push(c);
    *pending_separator = false;
}

fn is_separator(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '-' | '_' | '/' | '\\' | '.' | ',' | ':' | ';' | '|' | '+' | '&' | '=' | '~'
                | '\u{2013}' | '\u{2014}'
        )
}

/// ASCII replacement for lowercase Latin letters with diacritics.
fn fold_latin(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'đ' | 'ð' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ğ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
        'ł' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'œ' => "oe",
        'ř' => "r",
        'ś' | 'š' | 'ş' => "s",
        'ß' => "ss",
        'ť' | 'ţ' => "t",
        'þ' => "th",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("Men's Running Shoes!!", "mens-running-shoes")]
    #[case("  Hello   World  ", "hello-world")]
    #[case("already-a-slug", "already-a-slug")]
    #[case("--Leading and trailing--", "leading-and-trailing")]
    #[case("Tom & Jerry", "tom-jerry")]
    #[case("snake_case_name", "snake-case-name")]
    #[case("Café Crème", "cafe-creme")]
    #[case("Straße", "strasse")]
    #[case("ÉCLAIR", "eclair")]
    #[case("4K UHD TV 55\"", "4k-uhd-tv-55")]
    #[case("a - - b", "a-b")]
    fn test_normalize_examples(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw), expected);
    }

    #[test]
    fn test_empty_input_yields_empty_candidate() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("!!! ???"), "");
        assert_eq!(normalize("---"), "");
    }

    #[test]
    fn test_unfoldable_characters_are_dropped() {
        assert_eq!(normalize("日本 shoes"), "shoes");
        assert_eq!(normalize("rock🎸roll"), "rockroll");
    }

    fn is_well_formed(slug: &str) -> bool {
        slug.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !slug.starts_with('-')
            && !slug.ends_with('-')
            && !slug.contains("--")
    }

    proptest! {
        #[test]
        fn prop_output_is_well_formed(raw in any::<String>()) {
            let slug = normalize(&raw);
            prop_assert!(is_well_formed(&slug), "malformed slug {:?} from {:?}", slug, raw);
        }

        #[test]
        fn prop_normalize_is_idempotent(raw in "\\PC{0,64}") {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
