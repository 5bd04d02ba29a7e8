//! Character classification shared by the scanner.

pub const EOF: char = '\0';
pub const TAB: char = '\t';
pub const LF: char = '\n';
pub const CR: char = '\r';
pub const SPACE: char = ' ';
pub const NBSP: char = '\u{00A0}';

pub fn is_line_break(ch: char) -> bool {
    matches!(ch, LF | CR)
}

pub fn is_white_space(ch: char) -> bool {
    matches!(ch, SPACE | TAB | NBSP) || (ch.is_whitespace() && !is_line_break(ch))
}

pub fn is_digit(ch: char) -> bool {
    ch.is_ascii_digit()
}

pub fn is_hex_digit(ch: char) -> bool {
    ch.is_ascii_hexdigit()
}

pub fn is_identifier_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

/// Includes `-` so kebab-case diagnostic codes (e.g. `duplicate-property`)
/// scan as one identifier inside a `#suppress` directive.
pub fn is_identifier_continue(ch: char) -> bool {
    ch == '_' || ch == '-' || ch.is_alphanumeric()
}
