//! core::naming
//!
//! Slug derivation for content directories.
//!
//! A slug is the path segment a title is published under
//! (`content/<slug>/index.qmd`). Uniqueness is not enforced: two titles
//! with the same slug write to the same directory.

use unicode_normalization::UnicodeNormalization;

/// Derive a URL/path slug from a title.
///
/// - Unicode is NFKD-decomposed and non-ASCII code points dropped
///   (so accented letters keep their base letter)
/// - Anything other than alphanumerics, `_`, `-` and whitespace is removed
/// - Lowercased, runs of whitespace and hyphens collapse into one `-`
/// - Leading and trailing `-`/`_` are stripped
///
/// ```
/// use quarto_press::core::naming::slugify;
///
/// assert_eq!(slugify("My Great Paper!"), "my-great-paper");
/// assert_eq!(slugify("Café  Société"), "cafe-societe");
/// ```
pub fn slugify(title: &str) -> String {
    let ascii: String = title
        .nfkd()
        .filter(|c| c.is_ascii())
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_ascii_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    let mut slug = String::with_capacity(ascii.len());
    let mut pending_sep = false;
    for c in ascii.trim().chars() {
        if c == '-' || c.is_ascii_whitespace() {
            pending_sep = true;
            continue;
        }
        if pending_sep && !slug.is_empty() {
            slug.push('-');
        }
        pending_sep = false;
        slug.push(c);
    }

    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("My Great Paper!"), "my-great-paper");
        assert_eq!(slugify("Hello World"), "hello-world");
    }

    #[test]
    fn slugify_removes_punctuation() {
        assert_eq!(slugify("Deep RL: a survey (2023)"), "deep-rl-a-survey-2023");
        assert_eq!(slugify("foo/bar"), "foobar");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("a  -  b"), "a-b");
        assert_eq!(slugify("--leading and trailing--"), "leading-and-trailing");
    }

    #[test]
    fn slugify_keeps_underscores_inside() {
        assert_eq!(slugify("snake_case title"), "snake_case-title");
        assert_eq!(slugify("_edge_"), "edge");
    }

    #[test]
    fn slugify_folds_accents() {
        assert_eq!(slugify("Résumé of Zoë"), "resume-of-zoe");
    }

    #[test]
    fn slugify_handles_empty() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }
}
