//! The data model: a root directory's file index plus the compiled
//! scopes derived from it, and the symbol table `${...}` references
//! resolve against.
//!
//! Grounded on the `DataModel` class's scope compilation:
//! `re.search(".*?" + expression, f)` against every file, escaping
//! each match before storing it as a scope value.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use regex::Regex;

use presto_core::{escape_reserved_re_char, Error, Result, Scope};

/// Every string value declared at the top level of the runbook
/// (`__ROOT__`, `__SCOPES__` entries, user-defined keys, and any
/// `--override_scope` overrides), looked up by `${name}`/`?{name}`.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    values: HashMap<String, String>,
    scopes: HashMap<String, RawScope>,
}

#[derive(Debug, Clone)]
struct RawScope {
    expression: String,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn insert_scope_expression(&mut self, name: impl Into<String>, expression: impl Into<String>) {
        self.scopes.insert(name.into(), RawScope { expression: expression.into() });
    }

    pub fn get(&self, key: &str) -> Result<String> {
        self.values.get(key).cloned().ok_or_else(|| Error::UnknownSymbol(key.to_string()))
    }

    /// Look up a declared scope's raw (pre-evaluation) expression, for
    /// use by dynamic reference redirection (`?{name->scope}`).
    pub fn scope(&self, name: &str) -> Option<ScopeRef<'_>> {
        self.scopes.get(name).map(|s| ScopeRef { expression: &s.expression })
    }
}

/// A declared scope's raw expression, as seen by the evaluator before
/// it is itself evaluated.
pub struct ScopeRef<'a> {
    pub expression: &'a str,
}

/// The flat list of file paths under the compiled root, relative to
/// that root, in sorted order (matches `sorted(walkfiles())`).
#[derive(Debug, Clone, Default)]
pub struct FileIndex(Vec<String>);

impl FileIndex {
    pub fn from_root(root: &Path) -> Result<Self> {
        let mut files = Vec::new();
        collect_files(root, root, &mut files)?;
        files.sort();
        Ok(Self(files))
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl FromIterator<String> for FileIndex {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut files: Vec<String> = iter.into_iter().collect();
        files.sort();
        Self(files)
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path: PathBuf = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            out.push(relative.to_string_lossy().into_owned());
        }
    }
    Ok(())
}

/// Compile one `__SCOPES__` entry's raw regular expression into a
/// [`Scope`] by matching it against every file in `files`. Each scope
/// value is the substring of a matching file path from its start up
/// to the end of the first match of `expression` (mirrors
/// `re.search(".*?" + expression, f).group(0)`), escaped so it is
/// itself usable as a literal-matching regex.
pub fn compile_scope(name: &str, expression: &str, files: &FileIndex) -> Result<Scope> {
    let prefixed = format!(".*?{expression}");
    let re = Regex::new(&prefixed).map_err(|source| Error::BadRegex {
        pattern: prefixed.clone(),
        source,
    })?;

    let mut values: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
    for f in files.iter() {
        if let Some(m) = re.find(f) {
            values.insert(escape_reserved_re_char(m.as_str()));
        }
    }

    Ok(Scope::new(name, expression, values.into_iter().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_scope_values_from_path_prefix() {
        let files = FileIndex::from_iter([
            "project_a/src/main.rs".to_string(),
            "project_b/src/main.rs".to_string(),
        ]);
        let scope = compile_scope("project", r"project_\w+", &files).unwrap();
        assert_eq!(scope.values, vec!["project_a".to_string(), "project_b".to_string()]);
    }

    #[test]
    fn bad_expression_is_reported() {
        let files = FileIndex::default();
        let err = compile_scope("broken", "(unterminated", &files).unwrap_err();
        assert!(matches!(err, Error::BadRegex { .. }));
    }
}
