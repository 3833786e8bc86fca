//! Line-oriented session scripts.
//!
//! Each non-blank line that does not start with `#` is one view event:
//!
//! ```text
//! begin
//! title Vacation photos
//! kind image
//! file ./beach.jpg image/jpeg
//! text Dear diary,\nIt rained.
//! back | cancel | state | list
//! remove 3
//! open 3
//! search report
//! sort title desc
//! filter video | filter all
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::domain::{ContentKind, EntryId};
use crate::library::{SortDirection, SortKey};

/// One parsed script line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    Begin,
    Title(String),
    Kind(ContentKind),
    Text(String),
    File {
        path: PathBuf,
        media_type: Option<String>,
    },
    Back,
    Cancel,
    Remove(EntryId),
    Open(EntryId),
    Search(String),
    Sort(SortKey, SortDirection),
    Filter(Option<ContentKind>),
    List,
    State,
}

/// Parse a whole script, skipping blanks and comments
pub fn parse_script(source: &str) -> Result<Vec<(usize, ScriptCommand)>> {
    let mut commands = Vec::new();

    for (index, line) in source.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let command =
            parse_line(trimmed).with_context(|| format!("Line {}: {}", line_no, trimmed))?;
        commands.push((line_no, command));
    }

    Ok(commands)
}

/// Parse a single non-blank line
pub fn parse_line(line: &str) -> Result<ScriptCommand> {
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_lowercase().as_str() {
        "begin" => ScriptCommand::Begin,
        "title" => ScriptCommand::Title(rest.to_string()),
        "kind" => ScriptCommand::Kind(rest.parse()?),
        "text" => ScriptCommand::Text(unescape(rest)),
        "file" => {
            let mut parts = rest.split_whitespace();
            let path = parts.next().context("Missing file path")?;
            ScriptCommand::File {
                path: PathBuf::from(path),
                media_type: parts.next().map(str::to_string),
            }
        }
        "back" => ScriptCommand::Back,
        "cancel" => ScriptCommand::Cancel,
        "remove" => ScriptCommand::Remove(rest.parse()?),
        "open" => ScriptCommand::Open(rest.parse()?),
        "search" => ScriptCommand::Search(rest.to_string()),
        "sort" => {
            let mut parts = rest.split_whitespace();
            let key = parts.next().context("Missing sort key")?.parse()?;
            let direction = match parts.next() {
                Some(d) => d.parse()?,
                None => SortDirection::Ascending,
            };
            ScriptCommand::Sort(key, direction)
        }
        "filter" => match rest.to_lowercase().as_str() {
            "" | "all" => ScriptCommand::Filter(None),
            _ => ScriptCommand::Filter(Some(rest.parse()?)),
        },
        "list" => ScriptCommand::List,
        "state" => ScriptCommand::State,
        other => anyhow::bail!("Unknown command: {}", other),
    };

    Ok(command)
}

/// Expand `\n`, `\t` and `\\` in inline text
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}
