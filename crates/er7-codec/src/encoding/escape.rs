//! Escape sequence handling for field text
//!
//! Delimiter characters inside a value are written as two-character codes
//! wrapped in the escape character: `\F\` field, `\S\` component, `\T\`
//! subcomponent, `\R\` repetition and `\E\` escape. Formatting sequences that
//! are already present in the text (`\H\`, `\N\`, `\Xdd..\` and friends) are
//! passed through untouched so that escaping twice does not corrupt them.
//!
//! Only two hexadecimal sequences are decoded: `\X000d\` (carriage return) and
//! `\X000a\` (line feed). Any other `\X..\` payload stays literal in both
//! directions.

use super::characters::EncodingCharacters;
use dashmap::DashMap;
use std::sync::{Arc, LazyLock};

/// Single-character codes that form a complete sequence on their own
const SINGLE_CHARACTER_CODES: [char; 7] = ['H', 'N', 'S', 'T', 'R', 'F', 'E'];

/// Sequence prefixes followed by an even-length run of hex digits
const HEX_SEQUENCE_KINDS: [char; 4] = ['X', 'Z', 'C', 'M'];

const CARRIAGE_RETURN_CODE: &str = "X000d";
const LINE_FEED_CODE: &str = "X000a";

static TABLES: LazyLock<DashMap<EncodingCharacters, Arc<EscapeTable>>> =
    LazyLock::new(DashMap::new);

/// Lookup tables for one delimiter set
#[derive(Debug)]
struct EscapeTable {
    /// Delimiter character and its full escape sequence
    encodings: [(char, String); 5],
    /// Escape sequence and the character it decodes to
    decodings: Vec<(String, char)>,
    carriage_return: String,
}

impl EscapeTable {
    fn new(chars: &EncodingCharacters) -> Self {
        let esc = chars.escape_character();
        let wrap = |code: &str| format!("{esc}{code}{esc}");

        let encodings = [
            (chars.field_separator(), wrap("F")),
            (chars.component_separator(), wrap("S")),
            (chars.subcomponent_separator(), wrap("T")),
            (chars.repetition_separator(), wrap("R")),
            (esc, wrap("E")),
        ];

        let mut decodings: Vec<(String, char)> = encodings
            .iter()
            .map(|(c, sequence)| (sequence.clone(), *c))
            .collect();
        decodings.push((wrap(CARRIAGE_RETURN_CODE), '\r'));
        decodings.push((wrap(LINE_FEED_CODE), '\n'));

        Self {
            encodings,
            carriage_return: wrap(CARRIAGE_RETURN_CODE),
            decodings,
        }
    }

    fn encoding_of(&self, c: char) -> Option<&str> {
        self.encodings
            .iter()
            .find(|(delimiter, _)| *delimiter == c)
            .map(|(_, sequence)| sequence.as_str())
    }
}

fn table_for(chars: &EncodingCharacters) -> Arc<EscapeTable> {
    if let Some(table) = TABLES.get(chars) {
        return Arc::clone(table.value());
    }
    let table = TABLES
        .entry(*chars)
        .or_insert_with(|| Arc::new(EscapeTable::new(chars)));
    Arc::clone(table.value())
}

/// Converts between raw field text and delimiter-safe text
pub struct Escape;

impl Escape {
    /// Escape delimiter characters in `text`
    ///
    /// Recognized formatting sequences starting at an escape character are
    /// copied through unchanged; any other escape character becomes `\E\`.
    /// A bare carriage return becomes `\X000d\`. Trailing whitespace is
    /// kept as is, so `unescape(escape(text))` always gives back `text`.
    pub fn escape(text: &str, chars: &EncodingCharacters) -> String {
        if !text.chars().any(|c| c == '\r' || chars.is_delimiter(c)) {
            return text.to_string();
        }

        let table = table_for(chars);
        let esc = chars.escape_character();
        let input: Vec<char> = text.chars().collect();
        let mut result = String::with_capacity(text.len() + 8);

        let mut i = 0;
        while i < input.len() {
            let c = input[i];
            if c == esc
                && let Some(end) = recognized_sequence_end(&input, i, esc)
            {
                result.extend(&input[i..=end]);
                i = end + 1;
                continue;
            }

            match table.encoding_of(c) {
                Some(sequence) => result.push_str(sequence),
                None if c == '\r' => result.push_str(&table.carriage_return),
                None => result.push(c),
            }
            i += 1;
        }

        result
    }

    /// Replace escape sequences in `text` with the characters they stand for
    pub fn unescape(text: &str, chars: &EncodingCharacters) -> String {
        let esc = chars.escape_character();
        if !text.contains(esc) {
            return text.to_string();
        }

        let table = table_for(chars);
        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(c) = rest.chars().next() {
            if c == esc
                && let Some((sequence, decoded)) = table
                    .decodings
                    .iter()
                    .find(|(sequence, _)| rest.starts_with(sequence.as_str()))
            {
                result.push(*decoded);
                rest = &rest[sequence.len()..];
                continue;
            }
            result.push(c);
            rest = &rest[c.len_utf8()..];
        }

        result
    }

    /// Number of delimiter sets with a memoized table
    pub fn cached_tables() -> usize {
        TABLES.len()
    }
}

/// Index of the closing escape character if `input[start..]` opens a sequence
/// the text already intends, such as `\H\` or `\X0D0A\`
fn recognized_sequence_end(input: &[char], start: usize, esc: char) -> Option<usize> {
    let offset = input[start + 1..].iter().position(|c| *c == esc)?;
    let end = start + 1 + offset;

    match &input[start + 1..end] {
        [code] if SINGLE_CHARACTER_CODES.contains(code) => Some(end),
        [kind, digits @ ..]
            if HEX_SEQUENCE_KINDS.contains(kind)
                && !digits.is_empty()
                && digits.len() % 2 == 0
                && digits.iter().all(char::is_ascii_hexdigit) =>
        {
            Some(end)
        }
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chars() -> EncodingCharacters {
        EncodingCharacters::default()
    }

    #[test]
    fn test_escape_delimiters() {
        assert_eq!(Escape::escape("a|b", &chars()), "a\\F\\b");
        assert_eq!(Escape::escape("a^b", &chars()), "a\\S\\b");
        assert_eq!(Escape::escape("a&b", &chars()), "a\\T\\b");
        assert_eq!(Escape::escape("a~b", &chars()), "a\\R\\b");
        assert_eq!(Escape::escape("a\\b", &chars()), "a\\E\\b");
    }

    #[test]
    fn test_escape_plain_text_unchanged() {
        assert_eq!(Escape::escape("Smith, John  ", &chars()), "Smith, John  ");
        assert_eq!(Escape::escape("", &chars()), "");

        let escaped = Escape::escape("a|b  ", &chars());
        assert_eq!(escaped, "a\\F\\b  ");
        assert_eq!(Escape::unescape(&escaped, &chars()), "a|b  ");
    }

    #[test]
    fn test_escape_keeps_highlight_sequences() {
        let text = "\\H\\bold\\N\\ and | pipe";
        assert_eq!(Escape::escape(text, &chars()), "\\H\\bold\\N\\ and \\F\\ pipe");
    }

    #[test]
    fn test_escape_keeps_hex_sequences() {
        assert_eq!(Escape::escape("line\\X0D\\end", &chars()), "line\\X0D\\end");
        assert_eq!(Escape::escape("\\Zabcd\\", &chars()), "\\Zabcd\\");
        assert_eq!(Escape::escape("\\C2842\\", &chars()), "\\C2842\\");
    }

    #[test]
    fn test_escape_rejects_odd_hex_run() {
        // Odd number of digits is not a recognized sequence
        assert_eq!(Escape::escape("\\X0D1\\", &chars()), "\\E\\X0D1\\E\\");
        // No closing escape character
        assert_eq!(Escape::escape("\\X0D", &chars()), "\\E\\X0D");
    }

    #[test]
    fn test_escape_does_not_double_escape() {
        let once = Escape::escape("a|b", &chars());
        let twice = Escape::escape(&once, &chars());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_escape_carriage_return() {
        assert_eq!(Escape::escape("a\rb", &chars()), "a\\X000d\\b");
        assert_eq!(Escape::unescape("a\\X000d\\b", &chars()), "a\rb");
        assert_eq!(Escape::unescape("a\\X000a\\b", &chars()), "a\nb");
    }

    #[test]
    fn test_unescape_delimiters() {
        assert_eq!(
            Escape::unescape("\\F\\\\S\\\\T\\\\R\\\\E\\", &chars()),
            "|^&~\\"
        );
    }

    #[test]
    fn test_unescape_leaves_unknown_sequences() {
        assert_eq!(Escape::unescape("\\H\\bold\\N\\", &chars()), "\\H\\bold\\N\\");
        assert_eq!(Escape::unescape("\\X0D\\", &chars()), "\\X0D\\");
        assert_eq!(Escape::unescape("trailing\\", &chars()), "trailing\\");
    }

    #[test]
    fn test_custom_delimiters() {
        let custom = EncodingCharacters::new('*', "%$!@").expect("Test operation should succeed");
        assert_eq!(Escape::escape("a*b%c", &custom), "a!F!b!S!c");
        assert_eq!(Escape::unescape("a!F!b!S!c", &custom), "a*b%c");
        // The default escape character is ordinary text here
        assert_eq!(Escape::escape("a\\b", &custom), "a\\b");
    }

    #[test]
    fn test_tables_are_memoized() {
        let custom = EncodingCharacters::new('#', "^~\\&").expect("Test operation should succeed");
        let _ = Escape::unescape("x\\F\\y", &custom);
        let first = table_for(&custom);
        let second = table_for(&custom);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Escape::cached_tables() >= 1);
    }

    #[test]
    fn test_unicode_text() {
        let text = "Müller|Zoë^Ø";
        let escaped = Escape::escape(text, &chars());
        assert_eq!(escaped, "Müller\\F\\Zoë\\S\\Ø");
        assert_eq!(Escape::unescape(&escaped, &chars()), text);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        /// Text that never contains the escape character followed by a
        /// sequence the escaper would recognize
        fn raw_text() -> impl Strategy<Value = String> {
            "[a-zA-Z0-9 |^~&\r\n.,-]{0,64}"
        }

        proptest! {
            #[test]
            fn unescape_inverts_escape(text in raw_text()) {
                let escaped = Escape::escape(&text, &chars());
                prop_assert_eq!(Escape::unescape(&escaped, &chars()), text);
            }

            #[test]
            fn escaped_text_has_no_bare_delimiters(text in raw_text()) {
                let escaped = Escape::escape(&text, &chars());
                prop_assert!(!escaped.contains('|'));
                prop_assert!(!escaped.contains('^'));
                prop_assert!(!escaped.contains('~'));
                prop_assert!(!escaped.contains('&'));
                prop_assert!(!escaped.contains('\r'));
            }

            #[test]
            fn lone_escape_characters_round_trip(text in "[a-z\\\\]{0,32}") {
                let escaped = Escape::escape(&text, &chars());
                prop_assert_eq!(Escape::unescape(&escaped, &chars()), text);
            }
        }
    }
}
