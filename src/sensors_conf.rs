/*
 * This file is part of Sensorview.
 *
 * Copyright (C) 2025 Sensorview contributors
 *
 * Sensorview is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Sensorview is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Sensorview. If not, see <https://www.gnu.org/licenses/>.
 */

//! Read-only subset of the lm-sensors `sensors.conf` format.
//!
//! ```text
//! chip "nct6775-*" "it87-*"
//!     label fan1 "CPU fan"
//!     ignore in5
//! ```
//!
//! `set`, `compute` and `bus` statements are parsed past and ignored.

use std::fs;
use std::path::Path;

use serde_json::json;

use crate::error::{Result, SensorsError};
use crate::logger;
use crate::topology::ChipName;

#[derive(Debug, Clone, PartialEq)]
pub struct ChipSection {
    pub patterns: Vec<ChipName>,
    pub labels: Vec<(String, String)>,
    pub ignores: Vec<String>,
    /// Line of the `chip` statement.
    pub line: usize,
}

impl ChipSection {
    fn applies_to(&self, chip: &ChipName) -> bool {
        self.patterns.iter().any(|p| chip.matches(p))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorsConfig {
    sections: Vec<ChipSection>,
}

impl SensorsConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut sections: Vec<ChipSection> = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let tokens = tokenize(raw, line)?;
            let Some((keyword, args)) = tokens.split_first() else { continue };

            match keyword.as_str() {
                "chip" => {
                    if args.is_empty() {
                        return Err(parse_error(line, "chip statement needs at least one name"));
                    }
                    let patterns = args
                        .iter()
                        .map(|a| ChipName::parse(a))
                        .collect::<Result<Vec<_>>>()
                        .map_err(|e| parse_error(line, e))?;
                    sections.push(ChipSection { patterns, labels: Vec::new(), ignores: Vec::new(), line });
                }
                "label" => {
                    let section = sections
                        .last_mut()
                        .ok_or_else(|| parse_error(line, "label statement before first chip statement"))?;
                    match args {
                        [feature, text] => section.labels.push((feature.clone(), text.clone())),
                        _ => return Err(parse_error(line, "label needs a feature and a text")),
                    }
                }
                "ignore" => {
                    let section = sections
                        .last_mut()
                        .ok_or_else(|| parse_error(line, "ignore statement before first chip statement"))?;
                    match args {
                        [feature] => section.ignores.push(feature.clone()),
                        _ => return Err(parse_error(line, "ignore needs exactly one feature")),
                    }
                }
                "set" | "compute" | "bus" => {
                    logger::log_event(
                        "config_statement_skipped",
                        json!({ "line": line, "statement": keyword }),
                    );
                }
                other => return Err(parse_error(line, format!("unknown statement '{}'", other))),
            }
        }

        Ok(Self { sections })
    }

    pub fn sections(&self) -> &[ChipSection] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Configured label for `feature` on `chip`. Later sections win.
    pub fn label_for(&self, chip: &ChipName, feature: &str) -> Option<&str> {
        self.sections
            .iter()
            .rev()
            .filter(|s| s.applies_to(chip))
            .flat_map(|s| s.labels.iter().rev())
            .find(|(name, _)| name == feature)
            .map(|(_, text)| text.as_str())
    }

    pub fn is_ignored(&self, chip: &ChipName, feature: &str) -> bool {
        self.sections
            .iter()
            .filter(|s| s.applies_to(chip))
            .any(|s| s.ignores.iter().any(|f| f == feature))
    }
}

fn parse_error(line: usize, message: impl ToString) -> SensorsError {
    SensorsError::ConfigParse { line, message: message.to_string() }
}

/// Bare words and double-quoted strings; `#` starts a comment outside quotes.
fn tokenize(raw: &str, line: usize) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = raw.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '#' {
            break;
        } else if c == '"' {
            chars.next();
            let mut s = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('n') => s.push('\n'),
                        Some(other) => s.push(other),
                        None => return Err(parse_error(line, "unterminated string")),
                    },
                    Some(other) => s.push(other),
                    None => return Err(parse_error(line, "unterminated string")),
                }
            }
            tokens.push(s);
        } else {
            let mut s = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '"' || c == '#' {
                    break;
                }
                s.push(c);
                chars.next();
            }
            tokens.push(s);
        }
    }

    Ok(tokens)
}
