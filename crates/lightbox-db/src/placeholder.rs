//! `?` placeholder scanning.
//!
//! Builders render the neutral `?` form; PostgreSQL wants `$1..$n`. Both the count and the
//! rewrite skip quoted literals and identifiers, `--` and `/* */` comments, and
//! dollar-quoted bodies (`$$...$$`, `$tag$...$tag$`), so a `?` inside any of them is left
//! alone.

#[derive(Clone, PartialEq, Eq)]
enum State {
    Code,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment,
    DollarQuoted(String),
}

/// The `$tag$` opener at the start of `rest`, if there is one.
fn dollar_tag(rest: &str) -> Option<&str> {
    let body = rest.strip_prefix('$')?;
    let end = body.find('$')?;
    let tag = &body[..end];
    let valid = !tag.starts_with(|c: char| c.is_ascii_digit())
        && tag.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then(|| &rest[..end + 2])
}

fn scan(sql: &str, mut on_placeholder: impl FnMut(&mut String)) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut state = State::Code;
    let mut rest = sql;

    while let Some(c) = rest.chars().next() {
        let mut step = c.len_utf8();
        match &state {
            State::Code => match c {
                '?' => {
                    on_placeholder(&mut out);
                    rest = &rest[step..];
                    continue;
                }
                '\'' => state = State::SingleQuoted,
                '"' => state = State::DoubleQuoted,
                '-' if rest.starts_with("--") => {
                    state = State::LineComment;
                    step = 2;
                }
                '/' if rest.starts_with("/*") => {
                    state = State::BlockComment;
                    step = 2;
                }
                '$' => {
                    if let Some(tag) = dollar_tag(rest) {
                        step = tag.len();
                        state = State::DollarQuoted(tag.to_string());
                    }
                }
                _ => {}
            },
            // A doubled quote ('') closes and immediately reopens, which is the same state.
            State::SingleQuoted if c == '\'' => state = State::Code,
            State::DoubleQuoted if c == '"' => state = State::Code,
            State::LineComment if c == '\n' => state = State::Code,
            State::BlockComment if rest.starts_with("*/") => {
                state = State::Code;
                step = 2;
            }
            State::DollarQuoted(tag) if rest.starts_with(tag.as_str()) => {
                step = tag.len();
                state = State::Code;
            }
            _ => {}
        }
        out.push_str(&rest[..step]);
        rest = &rest[step..];
    }

    out
}

/// Number of `?` placeholders outside quoted literals and identifiers.
pub fn count_placeholders(sql: &str) -> usize {
    let mut n = 0;
    scan(sql, |out| {
        n += 1;
        out.push('?');
    });
    n
}

/// Rewrite each `?` placeholder to PostgreSQL's positional `$n`, numbering left to right.
pub fn to_positional(sql: &str) -> String {
    let mut n = 0;
    scan(sql, |out| {
        n += 1;
        out.push('$');
        out.push_str(&n.to_string());
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_left_to_right() {
        assert_eq!(
            to_positional("UPDATE t SET a=?, b=? WHERE c=?"),
            "UPDATE t SET a=$1, b=$2 WHERE c=$3"
        );
        assert_eq!(count_placeholders("UPDATE t SET a=?, b=? WHERE c=?"), 3);
    }

    #[test]
    fn skips_quoted_regions() {
        let sql = "SELECT a FROM t WHERE a=? AND b IN ('why?', 'it''s?') AND \"odd?\"=?";
        assert_eq!(count_placeholders(sql), 2);
        assert_eq!(
            to_positional(sql),
            "SELECT a FROM t WHERE a=$1 AND b IN ('why?', 'it''s?') AND \"odd?\"=$2"
        );
    }

    #[test]
    fn skips_comments_and_dollar_quotes() {
        let sql = "SELECT a -- why?\nFROM t /* or? */ WHERE a=? AND b=$$x ? y$$ \
                   AND c=$fn$ it's ? $fn$ AND d=?";
        assert_eq!(count_placeholders(sql), 2);
        assert_eq!(
            to_positional(sql),
            "SELECT a -- why?\nFROM t /* or? */ WHERE a=$1 AND b=$$x ? y$$ \
             AND c=$fn$ it's ? $fn$ AND d=$2"
        );
    }

    #[test]
    fn dollar_signs_that_are_not_quotes() {
        assert_eq!(count_placeholders("SELECT $1 + ?, 'a$' || ?"), 2);
        assert_eq!(
            to_positional("SELECT x FROM t WHERE y=$9$ AND z=?"),
            "SELECT x FROM t WHERE y=$9$ AND z=$1"
        );
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(count_placeholders("SELECT 1"), 0);
        assert_eq!(to_positional("SELECT 1"), "SELECT 1");
    }
}
