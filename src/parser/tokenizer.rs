//! Character-level lexer for prompt text.
//!
//! Walks the prompt once with an explicit nesting stack. Bracket syntax is
//! treated as attention/grouping markup, not structure to validate: a closer
//! that does not match the innermost open frame is kept as literal text, and
//! an opener that is never closed simply leaves its frame active until the
//! end of input.

/// Kind of nesting frame on the lexer stack.
///
/// `Root` is the permanent bottom frame and is never popped. `Lora` is the
/// special form of an angle frame opened by `<lora:` or `<lyco:`; its body
/// is a model reference, not prompt tags, and is dropped at the closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NestKind {
    Root,
    Paren,
    Square,
    Curly,
    Angle,
    Lora,
}

impl NestKind {
    fn for_opener(ch: char) -> Option<Self> {
        match ch {
            '(' => Some(Self::Paren),
            '[' => Some(Self::Square),
            '{' => Some(Self::Curly),
            '<' => Some(Self::Angle),
            _ => None,
        }
    }

    /// The closer this frame accepts. `Root` accepts none.
    fn closer(self) -> Option<char> {
        match self {
            Self::Root => None,
            Self::Paren => Some(')'),
            Self::Square => Some(']'),
            Self::Curly => Some('}'),
            Self::Angle | Self::Lora => Some('>'),
        }
    }

    /// Tag separators active inside this frame.
    ///
    /// `:` splits only in square frames, where it separates scheduling
    /// phases. In paren frames it stays in the buffer so the closing
    /// handler can strip an attention weight after the last colon.
    fn is_delimiter(self, ch: char) -> bool {
        match self {
            Self::Root | Self::Paren => ch == ',',
            Self::Square => matches!(ch, ',' | ':' | '|'),
            Self::Curly | Self::Angle => matches!(ch, ',' | '|'),
            Self::Lora => false,
        }
    }
}

/// Length of the `lora:` / `lyco:` marker after `<`.
const REFERENCE_PREFIX_LEN: usize = 5;

/// A buffer parses as a number when the trimmed text is a valid float.
fn is_number(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok()
}

/// Normalizes the pending buffer and emits it when non-empty.
fn flush(buffer: &mut String, tokens: &mut Vec<String>) {
    let tag = buffer.replace('_', " ");
    let tag = tag.trim();
    if !tag.is_empty() {
        tokens.push(tag.to_string());
    }
    buffer.clear();
}

/// Splits preprocessed prompt text into normalized tags.
///
/// One pass over the characters. Per character, in order: newline flushes
/// the buffer without touching the stack, an escaped character is appended
/// verbatim, `\` arms the escape, an opener pushes a frame (detecting the
/// `lora:`/`lyco:` marker for `<`), a closer matching the innermost frame
/// finalizes it (weight stripping, numeric drop, reference drop), reference
/// frame bodies accumulate verbatim, frame delimiters flush, and anything
/// else extends the buffer. End of input flushes the remainder.
pub(super) fn lex(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();

    let mut stack = vec![NestKind::Root];
    let mut escaped = false;
    let mut buffer = String::new();
    let mut tokens = Vec::new();

    let mut skip = 0usize;
    for i in 0..chars.len() {
        if skip > 0 {
            skip -= 1;
            continue;
        }
        let ch = chars[i];
        let current = *stack.last().unwrap_or(&NestKind::Root);

        if ch == '\n' {
            flush(&mut buffer, &mut tokens);
            escaped = false;
            continue;
        }
        if escaped {
            buffer.push(ch);
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }

        if let Some(opened) = NestKind::for_opener(ch) {
            let mut opened = opened;
            if opened == NestKind::Angle && chars.len() - i > REFERENCE_PREFIX_LEN {
                let marker: String = chars[i + 1..=i + REFERENCE_PREFIX_LEN].iter().collect();
                if marker == "lora:" || marker == "lyco:" {
                    opened = NestKind::Lora;
                    skip = REFERENCE_PREFIX_LEN;
                }
            }
            stack.push(opened);
            flush(&mut buffer, &mut tokens);
            continue;
        }

        if matches!(ch, ')' | ']' | '}' | '>') {
            if Some(ch) != current.closer() {
                buffer.push(ch);
                continue;
            }

            if matches!(current, NestKind::Paren | NestKind::Square) {
                if let Some(colon) = buffer.rfind(':') {
                    if is_number(&buffer[colon + 1..]) {
                        buffer.truncate(colon);
                    }
                } else if current == NestKind::Square && is_number(&buffer) {
                    buffer.clear();
                }
            } else if current == NestKind::Lora {
                buffer.clear();
            }

            stack.pop();
            flush(&mut buffer, &mut tokens);
            continue;
        }

        if current == NestKind::Lora {
            // Reference bodies keep every character except leading spaces,
            // so `<lora: name:0.8>` and `<lora:name:0.8>` read the same.
            if !buffer.is_empty() || ch != ' ' {
                buffer.push(ch);
            }
            continue;
        }

        if current.is_delimiter(ch) {
            flush(&mut buffer, &mut tokens);
            continue;
        }

        buffer.push(ch);
    }

    flush(&mut buffer, &mut tokens);
    tokens
}
