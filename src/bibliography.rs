//! BibTeX records and the citation-key index entries are joined against.

use std::fmt;

use anyhow::{bail, Result};
use indexmap::IndexMap;

/// Fields holding lists of persons rather than plain text.
const PERSON_FIELDS: [&str; 2] = ["author", "editor"];

// ---------------------------------------------------------------------------
// BibliographyRecord
// ---------------------------------------------------------------------------

/// A single BibTeX entry, e.g. `@article{alves_2011_electrochemistry_6010, ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct BibliographyRecord {
    /// Citation key.
    pub key: String,
    /// Lowercase entry type (`article`, `book`, ...).
    pub entry_type: String,
    /// Plain fields in file order, names lowercased.
    pub fields: Vec<(String, String)>,
    /// Person fields (`author`, `editor`) split into names.
    pub persons: Vec<(String, Vec<String>)>,
}

impl BibliographyRecord {
    pub fn new(key: &str, entry_type: &str) -> Self {
        BibliographyRecord {
            key: key.to_string(),
            entry_type: entry_type.to_ascii_lowercase(),
            fields: Vec::new(),
            persons: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn persons(&self, role: &str) -> &[String] {
        self.persons
            .iter()
            .find(|(r, _)| r.eq_ignore_ascii_case(role))
            .map(|(_, names)| names.as_slice())
            .unwrap_or_default()
    }

    pub fn authors(&self) -> &[String] {
        self.persons("author")
    }

    pub fn title(&self) -> Option<&str> {
        self.field("title")
    }

    pub fn year(&self) -> Option<&str> {
        self.field("year")
    }
}

/// Writes the record back as BibTeX.
impl fmt::Display for BibliographyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@{}{{{},", self.entry_type, self.key)?;
        for (role, names) in &self.persons {
            writeln!(f, "  {role} = {{{}}},", names.join(" and "))?;
        }
        for (name, value) in &self.fields {
            writeln!(f, "  {name} = {{{value}}},")?;
        }
        write!(f, "}}")
    }
}

// ---------------------------------------------------------------------------
// Bibliography – citation key → record
// ---------------------------------------------------------------------------

/// Records indexed by their citation key.
///
/// Keys are matched case-insensitively, as BibTeX does. Records keep the
/// order in which they were first inserted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bibliography {
    /// Lowercased citation key → record.
    entries: IndexMap<String, BibliographyRecord>,
}

impl Bibliography {
    /// Parse all entries of a BibTeX document.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(parse_bibtex(text)?.into_iter().collect())
    }

    pub fn get(&self, key: &str) -> Option<&BibliographyRecord> {
        self.entries.get(&key.to_lowercase())
    }

    /// Insert a record under its own key. A record with the same key
    /// replaces the earlier one in its position.
    pub fn insert(&mut self, record: BibliographyRecord) {
        self.entries.insert(record.key.to_lowercase(), record);
    }

    /// Citation keys as written in the records, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|r| r.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &BibliographyRecord> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<BibliographyRecord> for Bibliography {
    fn from_iter<I: IntoIterator<Item = BibliographyRecord>>(iter: I) -> Self {
        let mut bibliography = Bibliography::default();
        for record in iter {
            bibliography.insert(record);
        }
        bibliography
    }
}

impl Extend<BibliographyRecord> for Bibliography {
    fn extend<I: IntoIterator<Item = BibliographyRecord>>(&mut self, iter: I) {
        for record in iter {
            self.insert(record);
        }
    }
}

impl IntoIterator for Bibliography {
    type Item = BibliographyRecord;
    type IntoIter = indexmap::map::IntoValues<String, BibliographyRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

// ---------------------------------------------------------------------------
// BibTeX parser
// ---------------------------------------------------------------------------

/// Parse the entries of a BibTeX document.
///
/// Text outside of `@type{...}` blocks is ignored, as are `@comment`,
/// `@preamble` and `@string` blocks. Values keep their LaTeX markup; only the
/// outer delimiters are removed.
pub fn parse_bibtex(text: &str) -> Result<Vec<BibliographyRecord>> {
    let mut scanner = Scanner::new(text);
    let mut records = Vec::new();

    while scanner.skip_to('@') {
        scanner.bump();
        let entry_type = scanner.take_while(|c| c.is_alphanumeric()).to_ascii_lowercase();
        scanner.skip_whitespace();

        let close = match scanner.bump() {
            Some('{') => '}',
            Some('(') => ')',
            _ => bail!("line {}: expected '{{' after @{entry_type}", scanner.line()),
        };

        if matches!(entry_type.as_str(), "comment" | "preamble" | "string") {
            scanner.skip_balanced(close)?;
            continue;
        }

        let key = scanner.take_while(|c| c != ',' && c != close).trim().to_string();
        if key.is_empty() {
            bail!("line {}: @{entry_type} without citation key", scanner.line());
        }

        let mut record = BibliographyRecord::new(&key, &entry_type);
        loop {
            scanner.skip_while(|c| c.is_whitespace() || c == ',');
            match scanner.peek() {
                Some(c) if c == close => {
                    scanner.bump();
                    break;
                }
                None => bail!("unterminated entry '{key}'"),
                _ => {}
            }

            let name = scanner.take_while(|c| c != '=' && c != close).trim().to_ascii_lowercase();
            if scanner.bump() != Some('=') {
                bail!("line {}: field '{name}' in '{key}' has no value", scanner.line());
            }
            let value = scanner.value(close)?;

            if PERSON_FIELDS.contains(&name.as_str()) {
                record.persons.push((name, split_persons(&value)));
            } else {
                record.fields.push((name, value));
            }
        }
        records.push(record);
    }

    Ok(records)
}

fn split_persons(value: &str) -> Vec<String> {
    value
        .split(" and ")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn new(text: &str) -> Self {
        Scanner {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn line(&self) -> usize {
        1 + self.chars[..self.pos.min(self.chars.len())]
            .iter()
            .filter(|&&c| c == '\n')
            .count()
    }

    /// Advance to the next `target`; false at end of input.
    fn skip_to(&mut self, target: char) -> bool {
        self.skip_while(|c| c != target);
        self.peek().is_some()
    }

    fn skip_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        self.skip_while(char::is_whitespace);
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        self.skip_while(pred);
        self.chars[start..self.pos].iter().collect()
    }

    /// Skip up to and including `close`, honouring nested braces.
    fn skip_balanced(&mut self, close: char) -> Result<()> {
        let mut depth = 0usize;
        while let Some(c) = self.bump() {
            match c {
                '{' => depth += 1,
                '}' if depth > 0 => depth -= 1,
                c if c == close && depth == 0 => return Ok(()),
                _ => {}
            }
        }
        bail!("unterminated block")
    }

    /// Text inside `{...}`; the opening brace has been consumed.
    fn braced(&mut self) -> Result<String> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.bump() {
            match c {
                '{' => depth += 1,
                '}' if depth == 0 => {
                    return Ok(self.chars[start..self.pos - 1].iter().collect());
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        bail!("unterminated '{{' starting on line {}", self.line())
    }

    /// Text inside `"..."`; the opening quote has been consumed.
    fn quoted(&mut self) -> Result<String> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.bump() {
            match c {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                '"' if depth == 0 => {
                    return Ok(self.chars[start..self.pos - 1].iter().collect());
                }
                _ => {}
            }
        }
        bail!("unterminated '\"' starting on line {}", self.line())
    }

    /// A field value: `{...}`, `"..."` or a bare word, joined by `#`.
    fn value(&mut self, close: char) -> Result<String> {
        let mut value = String::new();
        loop {
            self.skip_whitespace();
            let part = match self.peek() {
                Some('{') => {
                    self.bump();
                    self.braced()?
                }
                Some('"') => {
                    self.bump();
                    self.quoted()?
                }
                Some(_) => self.take_while(|c| c != ',' && c != '#' && c != close && !c.is_whitespace()),
                None => bail!("unexpected end of input in field value"),
            };
            value.push_str(&part);

            self.skip_whitespace();
            if self.peek() == Some('#') {
                self.bump();
            } else {
                break;
            }
        }
        Ok(collapse_whitespace(&value))
    }
}
