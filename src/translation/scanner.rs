use crate::error::SqlDriverError;

/// Keyword dispatch table for escape clauses: case-insensitive prefix and how
/// many leading characters to blank. `escape` and `call` bodies are kept
/// whole; only their surrounding markers are removed. Order matters: `ts`
/// must win over `t`.
const KEYWORDS: &[(&[u8], usize)] = &[
    (b"fn", 2),
    (b"escape", 0),
    (b"call", 0),
    (b"oj", 2),
    (b"ts", 2),
    (b"t", 1),
    (b"d", 1),
    (b"params", 6),
];

pub(super) fn syntax(offset: usize) -> SqlDriverError {
    SqlDriverError::Syntax { offset }
}

/// Error when a scan ran past the end of the statement.
pub(super) fn check_run_over(i: usize, len: usize) -> Result<(), SqlDriverError> {
    if i >= len { Err(syntax(i)) } else { Ok(()) }
}

/// How many characters of the keyword starting at `start` get blanked.
pub(super) fn keyword_blank_len(bytes: &[u8], start: usize) -> usize {
    for (keyword, blank) in KEYWORDS {
        if matches_ignore_case(bytes, start, keyword) {
            return *blank;
        }
    }
    // unknown keywords are left untouched
    0
}

fn matches_ignore_case(bytes: &[u8], start: usize, keyword: &[u8]) -> bool {
    bytes
        .get(start..start + keyword.len())
        .is_some_and(|slice| slice.eq_ignore_ascii_case(keyword))
}

/// Skip an opaque span starting at `i` (string literal, quoted identifier,
/// line or block comment, dollar-quoted text) and return the index of its
/// last character. Returns `i` itself when the character does not actually
/// open a span. Unterminated spans error at the starting offset.
pub(super) fn skip_opaque(bytes: &[u8], i: usize) -> Result<usize, SqlDriverError> {
    let len = bytes.len();
    match bytes[i] {
        b'$' => {
            // $$ ... $$ text, only when the opener starts a token
            if i + 1 < len && bytes[i + 1] == b'$' && (i == 0 || bytes[i - 1] <= b' ') {
                match find(bytes, b"$$", i + 2) {
                    Some(j) => Ok(j + 1),
                    None => Err(syntax(i)),
                }
            } else {
                Ok(i)
            }
        }
        quote @ (b'\'' | b'"') => match position(bytes, quote, i + 1) {
            Some(j) => Ok(j),
            None => Err(syntax(i)),
        },
        b'/' => {
            check_run_over(i + 1, len)?;
            if bytes[i + 1] == b'*' {
                // block comment
                match find(bytes, b"*/", i + 2) {
                    Some(j) => Ok(j + 1),
                    None => Err(syntax(i)),
                }
            } else if bytes[i + 1] == b'/' {
                // single line comment
                Ok(line_end(bytes, i + 2))
            } else {
                Ok(i)
            }
        }
        b'-' => {
            check_run_over(i + 1, len)?;
            if bytes[i + 1] == b'-' {
                // single line comment
                Ok(line_end(bytes, i + 2))
            } else {
                Ok(i)
            }
        }
        _ => Ok(i),
    }
}

fn position(bytes: &[u8], needle: u8, from: usize) -> Option<usize> {
    bytes[from.min(bytes.len())..]
        .iter()
        .position(|&b| b == needle)
        .map(|j| from + j)
}

fn find(bytes: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|j| from + j)
}

fn line_end(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && bytes[i] != b'\r' && bytes[i] != b'\n' {
        i += 1;
    }
    i
}
