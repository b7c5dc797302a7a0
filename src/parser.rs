//! Prompt text parsing.
//!
//! Turns free-form image-generation prompt text into normalized tags. The
//! pipeline is a length-preserving preprocessing pass ([`preprocess`]) that
//! neutralizes host control syntax, followed by a single-pass nesting-aware
//! lexer ([`tokenizer`]). Both stages are pure text transforms with no I/O;
//! malformed input degrades to literal text rather than errors.

mod preprocess;
mod tokenizer;

/// Splits prompt text into normalized tags.
///
/// Tags are the comma-separated (and, inside bracket frames, `|`/`:`
/// separated) pieces of the prompt with attention weights, escapes, meta
/// keywords, dynamic prompt selectors, and `<lora:...>` references removed.
/// Underscores read as spaces and surrounding whitespace is trimmed; empty
/// pieces are dropped.
///
/// # Examples
///
/// ```
/// use tagmine::parser::tokenize;
///
/// assert_eq!(tokenize("a, (b:1.4), [c:0.5]"), vec!["a", "b", "c"]);
/// assert_eq!(tokenize("blue_sky BREAK 1girl"), vec!["blue sky", "1girl"]);
/// assert_eq!(tokenize("<lora:detail:0.8>, flat color"), vec!["flat color"]);
/// ```
#[must_use]
pub fn tokenize(prompt: &str) -> Vec<String> {
    tokenizer::lex(&preprocess::neutralize(prompt))
}

/// Extracts positive-prompt tags from a generation parameters record.
///
/// Generation metadata stores the positive prompt, the negative prompt
/// introduced by `Negative prompt:`, and the settings block introduced by
/// `Steps:`, in that order. Only the positive prompt is tokenized. A record
/// missing either marker is not recognizable as generation metadata and
/// yields no tags.
///
/// # Examples
///
/// ```
/// use tagmine::parser::extract_tags;
///
/// let record = "1girl, solo\nNegative prompt: lowres\nSteps: 20, Sampler: Euler";
/// assert_eq!(extract_tags(record), vec!["1girl", "solo"]);
///
/// assert!(extract_tags("just some text").is_empty());
/// ```
#[must_use]
pub fn extract_tags(parameters: &str) -> Vec<String> {
    let Some((head, _)) = parameters.split_once("Steps:") else {
        return Vec::new();
    };
    let Some((positive, _)) = head.split_once("Negative prompt:") else {
        return Vec::new();
    };
    tokenize(positive)
}
