//! Normalization of raw SQL text into grouping signatures.
//!
//! Replaces literal values with `?` and canonicalizes layout so that
//! `SELECT * FROM t WHERE id=5` and `select *  from t where id = 42`
//! both become `select * from t where id = ?`.

/// Maximum length (in characters) of a signature before truncation.
pub const MAX_SIGNATURE_LEN: usize = 180;

/// Placeholder substituted for string and numeric literals.
pub const PLACEHOLDER: &str = "?";

/// Lexical rules of the server the query text came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SqlDialect {
    /// `"..."` is a string literal, `#` starts a comment, `\'` escapes a quote.
    #[default]
    MySql,
    /// `"..."` is an identifier, `#` is an operator (`#>`, `#>>`), backslash is literal.
    Postgres,
}

impl SqlDialect {
    fn double_quote_is_identifier(self) -> bool {
        self == SqlDialect::Postgres
    }

    fn hash_starts_comment(self) -> bool {
        self == SqlDialect::MySql
    }

    fn backslash_escapes(self) -> bool {
        self == SqlDialect::MySql
    }
}

/// Normalize a raw query into its signature using MySQL lexing.
///
/// 1. lowercase
/// 2. drop `/* ... */`, `-- ...` and `# ...` comments
/// 3. replace quoted string literals and standalone numbers with `?`
/// 4. re-join tokens with single spaces
/// 5. truncate to [`MAX_SIGNATURE_LEN`] characters plus `...`
pub fn normalize_query(query: &str) -> String {
    normalize_query_as(query, SqlDialect::MySql)
}

/// Same as [`normalize_query`] with the quoting and comment rules of `dialect`.
pub fn normalize_query_as(query: &str, dialect: SqlDialect) -> String {
    let lowered = query.to_lowercase();
    let tokens = tokenize(&lowered, dialect);
    truncate(&tokens.join(" "))
}

/// Split into words, literals and operator runs. Comments and whitespace vanish.
fn tokenize(s: &str, dialect: SqlDialect) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c.is_whitespace() {
            i += 1;
        } else if c == '/' && next == Some('*') {
            i = skip_block_comment(&chars, i + 2);
        } else if (c == '-' && next == Some('-')) || (c == '#' && dialect.hash_starts_comment()) {
            i = skip_line(&chars, i);
        } else if c == '`' || (c == '"' && dialect.double_quote_is_identifier()) {
            // quoted identifier: keep verbatim
            let end = chars[i + 1..]
                .iter()
                .position(|&ch| ch == c)
                .map(|p| i + 1 + p + 1)
                .unwrap_or(chars.len());
            tokens.push(chars[i..end].iter().collect());
            i = end;
        } else if c == '\'' || c == '"' {
            i = skip_string(&chars, i + 1, c, dialect.backslash_escapes());
            tokens.push(PLACEHOLDER.to_string());
        } else if is_word_char(c) {
            let start = i;
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            if is_numeric_literal(&word) {
                tokens.push(PLACEHOLDER.to_string());
            } else {
                tokens.push(word);
            }
        } else if is_operator_char(c) {
            let start = i;
            while i < chars.len() && is_operator_char(chars[i]) {
                // a comment opener ends the operator run
                if chars[i] == '-' && chars.get(i + 1) == Some(&'-') {
                    break;
                }
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
        } else {
            tokens.push(c.to_string());
            i += 1;
        }
    }

    tokens
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '.'
}

fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '=' | '<' | '>' | '!' | '+' | '-' | '*' | '/' | '%' | '|' | '&' | '^' | '~' | ':' | '#' | '@'
    )
}

/// Plain integers, decimals and hex literals. `t1` and `col.5x` are identifiers.
fn is_numeric_literal(word: &str) -> bool {
    if let Some(hex) = word.strip_prefix("0x") {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    let mut dots = 0;
    let mut digits = 0;
    for c in word.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

/// Returns the index just past the closing `*/` (or end of input).
fn skip_block_comment(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() {
        if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}

fn skip_line(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i] != '\n' {
        i += 1;
    }
    i
}

/// Returns the index just past the closing quote. Handles doubled quotes, and
/// backslash escapes when `backslash_escapes` is set.
fn skip_string(chars: &[char], mut i: usize, quote: char, backslash_escapes: bool) -> usize {
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && backslash_escapes {
            i += 2;
        } else if c == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
            } else {
                return i + 1;
            }
        } else {
            i += 1;
        }
    }
    chars.len()
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_SIGNATURE_LEN {
        return s.to_string();
    }
    let mut out: String = s.chars().take(MAX_SIGNATURE_LEN).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals_become_placeholders() {
        assert_eq!(
            normalize_query("SELECT * FROM wp_posts WHERE ID = 42"),
            "select * from wp_posts where id = ?"
        );
        assert_eq!(
            normalize_query("SELECT option_value FROM wp_options WHERE option_name = 'siteurl'"),
            "select option_value from wp_options where option_name = ?"
        );
        assert_eq!(
            normalize_query("UPDATE t SET price = 3.50, flags = 0xFF WHERE name = \"x\""),
            "update t set price = ? , flags = ? where name = ?"
        );
    }

    #[test]
    fn test_identifiers_with_digits_are_kept() {
        assert_eq!(
            normalize_query("SELECT t1.col2 FROM t1"),
            "select t1.col2 from t1"
        );
    }

    #[test]
    fn test_operator_spacing_is_irrelevant() {
        let a = normalize_query("SELECT * FROM t WHERE id=5 AND n>=2");
        let b = normalize_query("select *   from t\n where id = 7 and n >= 10");
        assert_eq!(a, b);
        assert_eq!(a, "select * from t where id = ? and n >= ?");
    }

    #[test]
    fn test_comments_are_stripped() {
        assert_eq!(
            normalize_query("/* app:web */ SELECT 1 -- trailing\nFROM dual # mysql style"),
            "select ? from dual"
        );
    }

    #[test]
    fn test_escaped_quotes_stay_inside_literal() {
        assert_eq!(
            normalize_query("SELECT * FROM t WHERE a = 'it''s' AND b = 'x\\'y'"),
            "select * from t where a = ? and b = ?"
        );
    }

    #[test]
    fn test_in_lists_keep_shape() {
        assert_eq!(
            normalize_query("SELECT * FROM t WHERE id IN (1,2,3)"),
            "select * from t where id in ( ? , ? , ? )"
        );
    }

    #[test]
    fn test_long_signatures_are_truncated() {
        let query = format!("SELECT {} FROM t", vec!["column_name"; 40].join(", "));
        let sig = normalize_query(&query);
        assert!(sig.ends_with("..."));
        assert_eq!(sig.chars().count(), MAX_SIGNATURE_LEN + 3);
    }

    #[test]
    fn test_postgres_quoted_identifiers_keep_queries_apart() {
        let users = normalize_query_as(
            "SELECT \"id\" FROM \"users\" WHERE \"age\" > 3",
            SqlDialect::Postgres,
        );
        let orders = normalize_query_as(
            "SELECT \"sku\" FROM \"orders\" WHERE \"qty\" > 9",
            SqlDialect::Postgres,
        );
        assert_eq!(users, "select \"id\" from \"users\" where \"age\" > ?");
        assert_ne!(users, orders);
    }

    #[test]
    fn test_postgres_json_operators_are_not_comments() {
        assert_eq!(
            normalize_query_as("SELECT data #>> '{a,b}' FROM t WHERE x = 1", SqlDialect::Postgres),
            "select data #>> ? from t where x = ?"
        );
        assert_eq!(
            normalize_query_as("SELECT payload #> '{k}', payload->>'n' FROM t", SqlDialect::Postgres),
            "select payload #> ? , payload ->> ? from t"
        );
    }

    #[test]
    fn test_postgres_backslash_is_literal() {
        // standard_conforming_strings: the string ends at the second quote
        assert_eq!(
            normalize_query_as("SELECT * FROM t WHERE p = 'c:\\' AND id = 2", SqlDialect::Postgres),
            "select * from t where p = ? and id = ?"
        );
    }

    #[test]
    fn test_mysql_keeps_hash_comments_and_string_quotes() {
        assert_eq!(
            normalize_query("SELECT \"a\" FROM t # note"),
            normalize_query_as("SELECT 'b' FROM t", SqlDialect::MySql)
        );
    }

    #[test]
    fn test_backtick_identifiers_are_kept() {
        assert_eq!(
            normalize_query("SELECT * FROM `wp_posts` WHERE `ID` = 1"),
            "select * from `wp_posts` where `id` = ?"
        );
    }
}
