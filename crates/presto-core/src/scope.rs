//! Scope: a named regular expression and the finite set of substrings
//! of the file index that it matches.

use serde::{Deserialize, Serialize};

/// Immutable once constructed. `values` is the sorted set of distinct
/// matched substrings, each already escaped so it is itself a valid
/// regex matching only that literal text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub name: String,
    pub expression: String,
    pub values: Vec<String>,
}

impl Scope {
    pub fn new(name: impl Into<String>, expression: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            values,
        }
    }
}

/// Escape characters reserved by regular expressions so the returned
/// string matches only the literal input.
///
/// Mirrors `escape_reserved_re_char`'s character class exactly:
/// `()[]{}*+?|.^$\`.
pub fn escape_reserved_re_char(input: &str) -> String {
    const RESERVED: &str = r"()[]{}*+?|.^$\";
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if RESERVED.contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn escapes_every_reserved_char() {
        for c in r"()[]{}*+?|.^$\".chars() {
            let escaped = escape_reserved_re_char(&c.to_string());
            assert_eq!(escaped, format!("\\{c}"));
            let re = Regex::new(&escaped).unwrap();
            assert!(re.is_match(&c.to_string()));
            // And matches only the single-character string.
            let m = re.find(&c.to_string()).unwrap();
            assert_eq!(m.as_str(), c.to_string());
        }
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(escape_reserved_re_char("scope_1"), "scope_1");
    }
}
