//! Vendor-neutral escape-clause translation.
//!
//! Rewrites `{fn ...}`, `{d ...}`, `{ts ...}`, `{oj ...}`, `{call ...}` and
//! friends into the engine's native form by blanking the markers and (where
//! applicable) the keyword, in a single forward scan. Substituted characters
//! become spaces, so the output always has the input's exact length and any
//! position-sensitive diagnostics downstream stay aligned.

use std::borrow::Cow;

mod scanner;

use scanner::{check_run_over, keyword_blank_len, skip_opaque, syntax};

use crate::error::SqlDriverError;

/// Translate escape clauses in `sql` into native text.
///
/// Statements without an opening `{` are returned borrowed and unchanged.
/// String literals, quoted identifiers, comments, and dollar-quoted text are
/// skipped verbatim; their contents are never interpreted as escape syntax.
///
/// # Errors
///
/// `SqlDriverError::Syntax` with the offending character offset for an
/// unterminated literal, comment, or escape bracket, an unbalanced `}`, or a
/// malformed output-parameter form.
pub fn translate_escapes(sql: &str) -> Result<Cow<'_, str>, SqlDriverError> {
    if !sql.contains('{') {
        return Ok(Cow::Borrowed(sql));
    }
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut out = bytes.to_vec();
    let mut level: i32 = 0;
    let mut i = 0;
    while i < len {
        match out[i] {
            b'\'' | b'"' | b'/' | b'-' | b'$' => {
                i = skip_opaque(bytes, i)?;
            }
            b'{' => {
                level += 1;
                out[i] = b' ';
                while out[i].is_ascii_whitespace() {
                    i += 1;
                    check_run_over(i, len)?;
                }
                if out[i].is_ascii_digit() {
                    // date/time literal body: re-materialize the bracket next
                    // to the digit and copy the body through verbatim
                    out[i - 1] = b'{';
                    loop {
                        check_run_over(i, len)?;
                        match out[i] {
                            b'}' => break,
                            b'\'' | b'"' | b'/' | b'-' => {
                                i = skip_opaque(bytes, i)?;
                            }
                            _ => {}
                        }
                        i += 1;
                    }
                    level -= 1;
                } else {
                    if out[i] == b'?' {
                        // {? = call ...} output-parameter form
                        out[i] = b' ';
                        i += 1;
                        check_run_over(i, len)?;
                        while out[i].is_ascii_whitespace() {
                            i += 1;
                            check_run_over(i, len)?;
                        }
                        if out[i] != b'=' {
                            return Err(syntax(i));
                        }
                        out[i] = b' ';
                        i += 1;
                        check_run_over(i, len)?;
                        while out[i].is_ascii_whitespace() {
                            i += 1;
                            check_run_over(i, len)?;
                        }
                    }
                    let start = i;
                    while !out[i].is_ascii_whitespace() {
                        i += 1;
                        check_run_over(i, len)?;
                    }
                    let blank = keyword_blank_len(bytes, start);
                    for slot in &mut out[start..start + blank] {
                        *slot = b' ';
                    }
                }
            }
            b'}' => {
                level -= 1;
                if level < 0 {
                    return Err(syntax(i));
                }
                out[i] = b' ';
            }
            _ => {}
        }
        i += 1;
    }
    if level != 0 {
        return Err(syntax(len - 1));
    }
    let translated =
        String::from_utf8(out).map_err(|e| SqlDriverError::Execution(e.to_string()))?;
    Ok(Cow::Owned(translated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(sql: &str) -> String {
        translate_escapes(sql).unwrap().into_owned()
    }

    fn offset_of(sql: &str) -> usize {
        match translate_escapes(sql) {
            Err(SqlDriverError::Syntax { offset }) => offset,
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn no_brace_is_borrowed_identity() {
        let sql = "SELECT A, B FROM T WHERE C = 'x'";
        let res = translate_escapes(sql).unwrap();
        assert!(matches!(res, Cow::Borrowed(_)));
        assert_eq!(res, sql);
    }

    #[test]
    fn scalar_function_blanks_marker_and_keyword() {
        let sql = "SELECT {fn ABS(?)} FROM T";
        let res = owned(sql);
        assert_eq!(res, "SELECT     ABS(?)  FROM T");
        assert_eq!(res.len(), sql.len());
    }

    #[test]
    fn call_keyword_is_left_untouched() {
        assert_eq!(owned("{call proc(?)}"), " call proc(?) ");
    }

    #[test]
    fn output_parameter_call_form() {
        assert_eq!(owned("{?= call f(?)}"), "    call f(?) ");
        assert_eq!(owned("{ ? = call f(?)}"), "      call f(?) ");
    }

    #[test]
    fn date_time_and_timestamp_literals() {
        assert_eq!(owned("{d '2020-01-31'}"), "   '2020-01-31' ");
        assert_eq!(owned("{t '12:00:01'}"), "   '12:00:01' ");
        assert_eq!(owned("{ts '2020-01-31 12:00:01'}"), "    '2020-01-31 12:00:01' ");
    }

    #[test]
    fn outer_join_and_params_keywords() {
        assert_eq!(
            owned("SELECT * FROM {oj A LEFT OUTER JOIN B ON A.X = B.X}"),
            "SELECT * FROM     A LEFT OUTER JOIN B ON A.X = B.X "
        );
        assert_eq!(owned("{params p1}"), "        p1 ");
    }

    #[test]
    fn escape_clause_body_is_kept_whole() {
        assert_eq!(
            owned("SELECT * FROM T WHERE A LIKE 'x!%' {escape '!'}"),
            "SELECT * FROM T WHERE A LIKE 'x!%'  escape '!' "
        );
    }

    #[test]
    fn digit_body_keeps_its_brackets() {
        assert_eq!(owned("CALL {0 'x'}"), "CALL {0 'x'}");
        // whitespace between marker and digit shifts the bracket inward
        assert_eq!(owned("CALL { 0 'x'}"), "CALL  {0 'x'}");
    }

    #[test]
    fn unknown_keyword_is_left_untouched() {
        assert_eq!(owned("{limit 10}"), " limit 10 ");
    }

    #[test]
    fn nested_escapes() {
        assert_eq!(owned("SELECT {fn ABS({fn ROUND(?)})}"), "SELECT     ABS(    ROUND(?) ) ");
    }

    #[test]
    fn braces_inside_literals_and_comments_are_opaque() {
        let sql = "SELECT '{notreal' FROM T";
        // no error and no rewriting for the unmatched-looking brace
        assert_eq!(translate_escapes(sql).unwrap(), sql);
        let sql = "SELECT \"{q}\" FROM T WHERE A = {fn PI()}";
        assert_eq!(owned(sql), "SELECT \"{q}\" FROM T WHERE A =     PI() ");
        let sql = "SELECT 1 -- {fn\n{d '2020-01-31'}";
        assert_eq!(owned(sql), "SELECT 1 -- {fn\n   '2020-01-31' ");
        let sql = "SELECT 1 /* {call */ {fn PI()}";
        assert_eq!(owned(sql), "SELECT 1 /* {call */     PI() ");
    }

    #[test]
    fn dollar_quoted_text_is_opaque() {
        let sql = "SELECT $$ {fn $$ {fn PI()}";
        assert_eq!(owned(sql), "SELECT $$ {fn $$     PI() ");
    }

    #[test]
    fn unterminated_escape_is_a_syntax_error() {
        assert_eq!(offset_of("{fn ABS(?)"), "{fn ABS(?)".len() - 1);
    }

    #[test]
    fn unbalanced_close_reports_its_offset() {
        // the fast path keeps brace-free text untouched, so the stray close
        // is only detected once an opening marker is present
        assert_eq!(offset_of("{fn PI()} }"), 10);
        assert_eq!(translate_escapes("SELECT 1 }").unwrap(), "SELECT 1 }");
    }

    #[test]
    fn unterminated_literal_reports_start_offset() {
        assert_eq!(offset_of("{fn ABS('x)}"), 8);
    }

    #[test]
    fn missing_equals_in_output_parameter_form() {
        assert_eq!(offset_of("{? call f()}"), 3);
    }

    #[test]
    fn translation_preserves_length() {
        for sql in [
            "SELECT {fn ABS(?)} FROM T",
            "{call proc(?)}",
            "{d '2020-01-31'}",
            "{?= call f(?)}",
            "SELECT * FROM {oj A LEFT OUTER JOIN B ON A.X = B.X}",
        ] {
            assert_eq!(owned(sql).len(), sql.len(), "length changed for {sql:?}");
        }
    }
}
