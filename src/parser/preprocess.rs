//! Length-preserving neutralization of non-tag prompt syntax.
//!
//! Runs before the lexer so that host-specific control words and dynamic
//! prompt selectors never surface as tags. Every rewrite keeps the character
//! count and the bracket structure of the input unchanged, so lexer frame
//! positions stay valid.

use std::sync::LazyLock;

use regex::Regex;

/// Control keywords with structural meaning to prompt hosts.
///
/// Matched as whole words only; `BREAKFAST` is an ordinary tag.
const META_KEYWORDS: [&str; 6] = ["BREAK", "AND", "ADDCOMM", "ADDBASE", "ADDCOL", "ADDROW"];

static META_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(r"\b({})\b", META_KEYWORDS.join("|"));
    Regex::new(&pattern).expect("meta keyword pattern is valid")
});

/// Dynamic prompt block: `{2$$opt1|opt2}` or `{1-3$$ and $$opt1|opt2}`.
/// Group 1 is the selector prefix, group 2 the option body.
static DYNAMIC_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([\d-]+\$\$(?:[^\}]+?\$\$)?)(.*)\}").expect("dynamic prompt pattern is valid")
});

/// Rewrites prompt control syntax into inert same-length text.
///
/// Meta keywords become a comma padded with spaces to the keyword length,
/// so they act as tag separators. Dynamic prompt selector prefixes are
/// blanked to spaces while the braces and option body stay in place for
/// the lexer's curly-frame handling. Unrecognized or malformed syntax is
/// left untouched.
pub(super) fn neutralize(prompt: &str) -> String {
    let prompt = META_KEYWORD.replace_all(prompt, |caps: &regex::Captures<'_>| {
        let width = caps[0].len();
        format!("{:<width$}", ",")
    });

    DYNAMIC_PROMPT
        .replace_all(&prompt, |caps: &regex::Captures<'_>| {
            let blank = " ".repeat(caps[1].chars().count());
            format!("{{{}{}}}", blank, &caps[2])
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_keywords_become_padded_commas() {
        assert_eq!(neutralize("a BREAK b"), "a ,     b");
        assert_eq!(neutralize("a AND b"), "a ,   b");
    }

    #[test]
    fn meta_keywords_match_whole_words_only() {
        assert_eq!(neutralize("BREAKFAST"), "BREAKFAST");
        assert_eq!(neutralize("HANDAND"), "HANDAND");
    }

    #[test]
    fn dynamic_prompt_selector_is_blanked() {
        assert_eq!(neutralize("{2$$a|b}"), "{   a|b}");
        assert_eq!(neutralize("{1-3$$x|y|z}"), "{     x|y|z}");
    }

    #[test]
    fn dynamic_prompt_custom_joiner_is_blanked() {
        assert_eq!(neutralize("{2$$ and $$a|b}"), "{          a|b}");
    }

    #[test]
    fn rewrites_preserve_length() {
        let inputs = [
            "a BREAK b, ADDROW c",
            "{2$$red|blue} hair",
            "{1-2$$, $$a|b} AND {3$$x|y}",
            "plain, tags, only",
        ];
        for input in inputs {
            assert_eq!(
                neutralize(input).chars().count(),
                input.chars().count(),
                "length changed for {input:?}"
            );
        }
    }

    #[test]
    fn rewrites_preserve_braces() {
        let input = "{2$$a|b} and {c|d}";
        let out = neutralize(input);
        assert_eq!(
            out.matches('{').count() + out.matches('}').count(),
            input.matches('{').count() + input.matches('}').count()
        );
    }

    #[test]
    fn malformed_dynamic_syntax_is_untouched() {
        assert_eq!(neutralize("{$$a|b}"), "{$$a|b}");
        assert_eq!(neutralize("{2$a|b}"), "{2$a|b}");
    }

    #[test]
    fn plain_prompts_pass_through() {
        assert_eq!(neutralize("a, b, c"), "a, b, c");
    }
}
