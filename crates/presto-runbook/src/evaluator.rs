//! Reference evaluation: substitutes `${name}` (static) and
//! `?{name}`/`?{name->scope}` (dynamic) references inside a string
//! against a symbol table and a file index.
//!
//! Grounded on `Evaluator.evaluate`'s loop (alternating static/dynamic
//! passes until no reference remains) and `variables.rs`'s
//! `replace_all`-driven interpolation for the surrounding Rust idiom.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use presto_core::{Error, Result};

use crate::data_model::{FileIndex, SymbolTable};

static STATIC_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{(.*?)\}").unwrap());
static DYNAMIC_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\?\{(.*?)\}").unwrap());
static REDIRECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)^(.*?)->(.*)$").unwrap());

/// Evaluates references against a fixed symbol table and file index,
/// in the context of one scope value (the empty string for a
/// top-level evaluation with no current scope).
pub struct Evaluator<'a> {
    symbols: &'a SymbolTable,
    files: &'a FileIndex,
    cur_scope_value: String,
}

impl<'a> Evaluator<'a> {
    pub fn new(symbols: &'a SymbolTable, files: &'a FileIndex) -> Self {
        Self {
            symbols,
            files,
            cur_scope_value: String::new(),
        }
    }

    pub fn with_scope_value(symbols: &'a SymbolTable, files: &'a FileIndex, cur_scope_value: impl Into<String>) -> Self {
        Self {
            symbols,
            files,
            cur_scope_value: cur_scope_value.into(),
        }
    }

    /// Repeatedly resolve static then dynamic references until the
    /// string contains neither.
    pub fn evaluate(&self, input: &str) -> Result<String> {
        let mut string = input.to_string();
        loop {
            let static_match = STATIC_REF.captures(&string);
            let dynamic_match = DYNAMIC_REF.captures(&string);

            if static_match.is_none() && dynamic_match.is_none() {
                return Ok(string);
            }

            if let Some(caps) = static_match {
                let key = caps.get(1).unwrap().as_str().to_string();
                string = self.evaluate_static(&string, &key)?;
                continue;
            }

            let caps = dynamic_match.expect("checked above");
            let key = caps.get(1).unwrap().as_str().to_string();
            string = self.evaluate_dynamic(&string, &key)?;
        }
    }

    fn evaluate_static(&self, string: &str, key: &str) -> Result<String> {
        let value = self.symbols.get(key)?;
        let pattern = format!(r"\$\{{{}\}}", regex::escape(key));
        let re = Regex::new(&pattern).map_err(|source| Error::BadRegex {
            pattern,
            source,
        })?;
        Ok(re.replace(string, regex::NoExpand(&value)).into_owned())
    }

    fn evaluate_dynamic(&self, string: &str, key: &str) -> Result<String> {
        let (lookup_key, scope_value) = match REDIRECT.captures(key) {
            Some(caps) => {
                let lookup_key = caps.get(1).unwrap().as_str().to_string();
                let scope_name = caps.get(2).unwrap().as_str();
                let scope = self
                    .symbols
                    .scope(scope_name)
                    .ok_or_else(|| Error::UnknownScopeOverride(scope_name.to_string()))?;
                let expr = self.evaluate(&scope.expression)?;
                let re = Regex::new(&expr).map_err(|source| Error::BadRegex {
                    pattern: expr.clone(),
                    source,
                })?;
                let m = re
                    .find(&self.cur_scope_value)
                    .ok_or_else(|| Error::UnknownSymbol(key.to_string()))?;
                (lookup_key, m.as_str().to_string())
            }
            None => (key.to_string(), self.cur_scope_value.clone()),
        };

        let scope_re = Regex::new(&scope_value).map_err(|source| Error::BadRegex {
            pattern: scope_value.clone(),
            source,
        })?;
        let matching_files: Vec<&str> = self
            .files
            .iter()
            .filter(|f| scope_re.is_match(f))
            .map(|s| s.as_str())
            .collect();

        let nested = Evaluator::with_scope_value(self.symbols, self.files, scope_value.clone());
        let raw_pattern = self.symbols.get(&lookup_key)?;
        let resolved_pattern = nested.evaluate(&raw_pattern)?;
        let re = Regex::new(&resolved_pattern).map_err(|source| Error::BadRegex {
            pattern: resolved_pattern.clone(),
            source,
        })?;

        let mut found: BTreeSet<String> = BTreeSet::new();
        for f in &matching_files {
            if let Some(m) = re.find(f) {
                found.insert(m.as_str().to_string());
            }
        }

        if found.len() != 1 {
            return Err(Error::AmbiguousMatch {
                key: key.to_string(),
                context: string.to_string(),
                candidates: found.into_iter().collect(),
            });
        }

        let new_value = found.into_iter().next().unwrap();
        let pattern = format!(r"\?\{{{}\}}", regex::escape(key));
        let re = Regex::new(&pattern).map_err(|source| Error::BadRegex { pattern, source })?;
        Ok(re.replace(string, regex::NoExpand(&new_value)).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::SymbolTable;

    #[test]
    fn resolves_static_reference() {
        let mut symbols = SymbolTable::new();
        symbols.insert("name", "hello");
        let files: FileIndex = FileIndex::default();
        let evaluator = Evaluator::new(&symbols, &files);
        assert_eq!(evaluator.evaluate("say ${name}").unwrap(), "say hello");
    }

    #[test]
    fn unknown_static_reference_is_an_error() {
        let symbols = SymbolTable::new();
        let files: FileIndex = FileIndex::default();
        let evaluator = Evaluator::new(&symbols, &files);
        assert!(evaluator.evaluate("${missing}").is_err());
    }

    #[test]
    fn static_reference_resolves_before_dynamic_name() {
        let mut symbols = SymbolTable::new();
        symbols.insert("NAME", "by_ext");
        symbols.insert("by_ext", r"\w+\.rs$");
        let files = FileIndex::from_iter(["a.rs".to_string()]);
        let evaluator = Evaluator::with_scope_value(&symbols, &files, "rs");
        assert_eq!(evaluator.evaluate("?{${NAME}}").unwrap(), "a.rs");
    }

    #[test]
    fn dynamic_reference_requires_exactly_one_match() {
        let mut symbols = SymbolTable::new();
        symbols.insert("by_ext", r"\w+\.rs$");
        let files = FileIndex::from_iter(["a.rs".to_string(), "b.rs".to_string()]);
        let evaluator = Evaluator::with_scope_value(&symbols, &files, "rs");
        let err = evaluator.evaluate("?{by_ext}").unwrap_err();
        assert!(matches!(err, Error::AmbiguousMatch { .. }));
    }
}
