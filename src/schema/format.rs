//! The annotated schema text, and the mini-grammar used to read it back.
//!
//! Each table is rendered as a header line followed by one indented line per column:
//!
//! ```text
//! orders (
//!   id INTEGER [PK],
//!   user_id INTEGER [FK->users.id|accounts.id]
//! )
//! ```
//!
//! When reading text back:
//!
//! - a table starts at a line-anchored `NAME (` header and ends at the matching `)`, or at the end
//!   of the text if there is none;
//! - the first whitespace-delimited token of a column line is the column name, a trailing `,` is
//!   ignored;
//! - annotations come from a trailing `[...]` block, separated by `,`. `PK` marks a primary key,
//!   `FK->target` a foreign key. Of several `|`-separated targets, only the first is kept.
//!
//! Names that are not plain identifiers are written in double quotes (`"order items" (`), and
//! nothing inside quotes counts as grammar.

use std::{fmt::Write, sync::LazyLock};

use itertools::Itertools;
use regex::Regex;

use super::{Column, ForeignKeyTarget, Schema, quote_identifier};

#[allow(clippy::unwrap_used)]
static TABLE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^("(?:[^"\n]|"")*"|[^\s()\[\],"]+) \("#).unwrap());

/// A table as recovered from annotated schema text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTable {
    pub name: String,
    pub columns: Vec<ParsedColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedColumn {
    pub name: String,
    pub primary_key: bool,
    pub foreign_key: Option<ForeignKeyTarget>,
}

/// Render `schema` as annotated schema text.
#[must_use]
pub fn format_schema(schema: &Schema) -> String {
    let mut out = String::new();

    for table in &schema.tables {
        let _ = writeln!(out, "{} (", quote_identifier(&table.name));

        for (i, column) in table.columns.iter().enumerate() {
            let _ = write!(out, "  {}", quote_identifier(&column.name));

            if !column.type_name.is_empty() {
                let _ = write!(out, " {}", column.type_name);
            }

            let annotations = annotations(column);
            if !annotations.is_empty() {
                let _ = write!(out, " [{}]", annotations.iter().join(", "));
            }

            if i + 1 < table.columns.len() {
                out.push(',');
            }
            out.push('\n');
        }

        out.push_str(")\n");
    }

    out
}

fn annotations(column: &Column) -> Vec<String> {
    let mut annotations = Vec::new();

    if column.primary_key {
        annotations.push("PK".to_string());
    }

    if !column.foreign_key_targets.is_empty() {
        annotations.push(format!(
            "FK->{}",
            column
                .foreign_key_targets
                .iter()
                .map(|e| format!("{}.{}", quote_identifier(&e.table), quote_identifier(&e.column)))
                .join("|")
        ));
    }

    annotations
}

/// Names of all tables declared in `text`, in order of appearance and without duplicates.
#[must_use]
pub fn parse_table_names(text: &str) -> Vec<String> {
    TABLE_HEADER
        .captures_iter(text)
        .map(|e| unquote(&e[1]))
        .unique()
        .collect()
}

/// All tables declared in `text`, in order of appearance.
#[must_use]
pub fn parse_tables(text: &str) -> Vec<ParsedTable> {
    TABLE_HEADER
        .captures_iter(text)
        .filter_map(|e| {
            let header = e.get(0)?;
            let body = enclosed_body(&text[header.end()..]);

            Some(ParsedTable {
                name: unquote(&e[1]),
                columns: body.lines().filter_map(parse_column_line).collect(),
            })
        })
        .collect()
}

/// Characters of `s` outside double-quoted names, with their byte offsets.
fn unquoted(s: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut quoted = false;

    s.char_indices().filter(move |&(_, c)| {
        if c == '"' {
            quoted = !quoted;
            return false;
        }
        !quoted
    })
}

fn split_unquoted(s: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;

    for (i, _) in unquoted(s).filter(|&(_, c)| c == separator) {
        parts.push(&s[start..i]);
        start = i + separator.len_utf8();
    }
    parts.push(&s[start..]);

    parts
}

/// `name` with surrounding double quotes removed and doubled quotes collapsed.
fn unquote(name: &str) -> String {
    let name = name.trim();

    match name.strip_prefix('"').and_then(|e| e.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => name.to_string(),
    }
}

/// Everything up to the `)` closing an already opened `(`.
fn enclosed_body(rest: &str) -> &str {
    let mut depth = 1usize;

    for (i, c) in unquoted(rest) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return &rest[..i];
                }
            }
            _ => {}
        }
    }

    rest
}

fn parse_column_line(line: &str) -> Option<ParsedColumn> {
    let line = line.trim().trim_end_matches(',').trim_end();

    let open = unquoted(line).find(|&(_, c)| c == '[').map(|(i, _)| i);
    let close = unquoted(line)
        .filter(|&(_, c)| c == ']')
        .map(|(i, _)| i)
        .max();

    let (definition, annotations) = match (open, close) {
        (Some(open), Some(close)) if open < close => (&line[..open], &line[open + 1..close]),
        _ => (line, ""),
    };

    let definition = definition.trim_start();
    let name_end = unquoted(definition)
        .find(|&(_, c)| c.is_whitespace())
        .map_or(definition.len(), |(i, _)| i);

    if name_end == 0 {
        return None;
    }

    let mut column = ParsedColumn {
        name: unquote(&definition[..name_end]),
        primary_key: false,
        foreign_key: None,
    };

    for annotation in split_unquoted(annotations, ',').into_iter().map(str::trim) {
        if annotation == "PK" {
            column.primary_key = true;
        } else if let Some(targets) = annotation.strip_prefix("FK->") {
            column.foreign_key = split_unquoted(targets, '|').first().copied().and_then(parse_target);
        }
    }

    Some(column)
}

/// `table.column`, split at the first unquoted `.`.
fn parse_target(target: &str) -> Option<ForeignKeyTarget> {
    let target = target.trim();
    let (dot, _) = unquoted(target).find(|&(_, c)| c == '.')?;

    let table = unquote(&target[..dot]);
    let column = unquote(&target[dot + 1..]);

    (!table.is_empty() && !column.is_empty()).then(|| ForeignKeyTarget::new(table, column))
}
