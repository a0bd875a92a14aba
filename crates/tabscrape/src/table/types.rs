use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::clean::parse_number;
use super::parser::ParseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    pub fn from_text(text: String) -> Self {
        if text.is_empty() {
            Cell::Missing
        } else {
            Cell::Text(text)
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(text) => parse_number(text),
            Cell::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(text) => write!(f, "{}", text),
            Cell::Missing => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSelector {
    Index(usize),
    Css(String),
}

impl Default for TableSelector {
    fn default() -> Self {
        TableSelector::Index(0)
    }
}

impl Display for TableSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableSelector::Index(index) => write!(f, "table #{}", index),
            TableSelector::Css(css) => write!(f, "selector '{}'", css),
        }
    }
}

/// A parsed HTML table. Every row holds exactly one cell per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTable")]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Deserialize)]
struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl From<RawTable> for Table {
    fn from(raw: RawTable) -> Self {
        Table::new(raw.columns, raw.rows)
    }
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() > width {
                    log::debug!(
                        "Truncating row of {} cells to {} columns",
                        row.len(),
                        width
                    );
                }
                row.resize(width, Cell::Missing);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, ParseError> {
        let wanted = name.trim();
        self.columns
            .iter()
            .position(|c| c == wanted)
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| ParseError::UnknownColumn(name.to_string()))
    }

    pub fn rename_columns(&mut self, renames: &[(String, String)]) -> Result<(), ParseError> {
        for (old, new) in renames {
            let idx = self.column_index(old)?;
            self.columns[idx] = new.clone();
        }
        Ok(())
    }

    /// Converts a column to numbers in place. Cells that do not parse become
    /// [`Cell::Missing`]; the number of converted cells is returned.
    pub fn coerce_numeric(&mut self, column: &str) -> Result<usize, ParseError> {
        let idx = self.column_index(column)?;
        let mut converted = 0;

        for row in &mut self.rows {
            let cell = &mut row[idx];
            *cell = match cell.as_number() {
                Some(n) => {
                    converted += 1;
                    Cell::Number(n)
                }
                None => {
                    if !cell.is_missing() {
                        log::debug!("Column '{}': could not parse '{}'", column, cell);
                    }
                    Cell::Missing
                }
            };
        }

        Ok(converted)
    }

    pub fn numeric_column(&self, column: &str) -> Result<Vec<Option<f64>>, ParseError> {
        let idx = self.column_index(column)?;
        Ok(self.rows.iter().map(|row| row[idx].as_number()).collect())
    }

    pub fn text_column(&self, column: &str) -> Result<Vec<String>, ParseError> {
        let idx = self.column_index(column)?;
        Ok(self.rows.iter().map(|row| row[idx].to_string()).collect())
    }

    pub fn records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| {
                        let value = match cell {
                            Cell::Number(n) => serde_json::Number::from_f64(*n)
                                .map(serde_json::Value::Number)
                                .unwrap_or(serde_json::Value::Null),
                            Cell::Text(text) => serde_json::Value::String(text.clone()),
                            Cell::Missing => serde_json::Value::Null,
                        };
                        (column.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                rendered
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let write_line = |f: &mut std::fmt::Formatter<'_>, cells: &[String]| {
            let line = cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = width))
                .collect::<Vec<_>>()
                .join(" │ ");
            writeln!(f, "{}", line.trim_end())
        };

        write_line(f, &self.columns)?;
        let rule = widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─");
        writeln!(f, "{}", rule)?;
        for row in &rendered {
            write_line(f, row)?;
        }
        write!(f, "({} row(s), {} column(s))", self.len(), self.width())
    }
}
