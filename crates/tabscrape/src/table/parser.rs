use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::clean::normalize_whitespace;
use super::types::{Cell, Table, TableSelector};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("No table matched {0}")]
    TableNotFound(String),
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}

static SEL_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("invalid selector: table"));

static SEL_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("invalid selector: tr"));

fn elem_text(element: ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

fn owning_table(row: ElementRef) -> Option<ElementRef> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "table")
}

fn row_cells(row: ElementRef) -> Vec<ElementRef> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| matches!(e.value().name(), "td" | "th"))
        .collect()
}

fn in_thead(row: ElementRef, table: ElementRef) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|e| *e != table)
        .any(|e| e.value().name() == "thead")
}

const MAX_SPAN: usize = 1000;

fn span(cell: ElementRef, attr: &str) -> usize {
    cell.value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
        .min(MAX_SPAN)
}

type Carried = Vec<Option<(String, usize)>>;

fn take_carried(carried: &mut Carried, col: usize) -> Option<String> {
    let slot = carried.get_mut(col)?;
    let (text, left) = slot.as_mut()?;
    let text = text.clone();
    *left -= 1;
    if *left == 0 {
        *slot = None;
    }
    Some(text)
}

/// Lays the rows out on a grid: `colspan` cells fill every slot they cover and
/// `rowspan` cells are repeated in the rows below.
fn expand_rows(rows: &[ElementRef]) -> Vec<Vec<String>> {
    let mut carried: Carried = Vec::new();
    let mut grid = Vec::with_capacity(rows.len());

    for row in rows {
        let mut line: Vec<String> = Vec::new();

        for cell in row_cells(*row) {
            while let Some(text) = take_carried(&mut carried, line.len()) {
                line.push(text);
            }

            let text = elem_text(cell);
            let rowspan = span(cell, "rowspan");
            for _ in 0..span(cell, "colspan") {
                if rowspan > 1 {
                    let col = line.len();
                    if carried.len() <= col {
                        carried.resize(col + 1, None);
                    }
                    carried[col] = Some((text.clone(), rowspan - 1));
                }
                line.push(text.clone());
            }
        }

        if let Some(last) = carried.iter().rposition(Option::is_some) {
            while line.len() <= last {
                let text = take_carried(&mut carried, line.len()).unwrap_or_default();
                line.push(text);
            }
        }

        grid.push(line);
    }

    grid
}

fn parse_table_element(table: ElementRef) -> Table {
    let rows: Vec<ElementRef> = table
        .select(&SEL_ROW)
        .filter(|row| owning_table(*row) == Some(table))
        .collect();

    let header_pos = rows
        .iter()
        .position(|row| in_thead(*row, table))
        .or_else(|| {
            rows.iter().position(|row| {
                let cells = row_cells(*row);
                !cells.is_empty() && cells.iter().all(|c| c.value().name() == "th")
            })
        });

    let mut grid = expand_rows(&rows);

    let body: Vec<Vec<Cell>> = rows
        .iter()
        .zip(grid.iter_mut())
        .enumerate()
        .filter(|(i, (row, _))| {
            header_pos != Some(*i)
                && row_cells(**row).iter().any(|c| c.value().name() == "td")
        })
        .map(|(_, (_, line))| line.drain(..).map(Cell::from_text).collect())
        .collect();

    let columns: Vec<String> = match header_pos {
        Some(pos) => std::mem::take(&mut grid[pos])
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                if name.is_empty() {
                    format!("column_{}", i)
                } else {
                    name
                }
            })
            .collect(),
        None => {
            let width = body.iter().map(Vec::len).max().unwrap_or(0);
            (0..width).map(|i| format!("column_{}", i)).collect()
        }
    };

    Table::new(columns, body)
}

pub fn parse_tables(html: &str) -> Vec<Table> {
    let document = Html::parse_document(html);
    document.select(&SEL_TABLE).map(parse_table_element).collect()
}

pub fn select_table(html: &str, selector: &TableSelector) -> Result<Table, ParseError> {
    match selector {
        TableSelector::Index(index) => parse_tables(html)
            .into_iter()
            .nth(*index)
            .ok_or_else(|| ParseError::TableNotFound(selector.to_string())),
        TableSelector::Css(css) => {
            let sel = Selector::parse(css).map_err(|e| ParseError::InvalidSelector {
                selector: css.clone(),
                reason: e.to_string(),
            })?;

            let document = Html::parse_document(html);
            let matches: Vec<ElementRef> = document.select(&sel).collect();
            if matches.len() > 1 {
                log::warn!(
                    "{} elements matched '{}', using the first one",
                    matches.len(),
                    css
                );
            }

            let first = matches
                .first()
                .ok_or_else(|| ParseError::TableNotFound(selector.to_string()))?;

            let table = if first.value().name() == "table" {
                *first
            } else {
                first
                    .select(&SEL_TABLE)
                    .next()
                    .ok_or_else(|| ParseError::TableNotFound(selector.to_string()))?
            };

            Ok(parse_table_element(table))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
            <table class="infobox"><tr><td>Motto</td><td>Harambee</td></tr></table>
            <table class="wikitable sortable" id="counties">
                <thead>
                    <tr><th>Code</th><th>County</th><th>Population<sup>[1]</sup></th><th>Area (km²)</th></tr>
                </thead>
                <tbody>
                    <tr><td>47</td><td>Nairobi</td><td>4,397,073</td><td>703.9</td></tr>
                    <tr><td>1</td><td>Mombasa</td><td>1,208,333</td><td>219.9</td></tr>
                    <tr><td>22</td><td>Kiambu</td><td>2,417,735</td><td>—</td></tr>
                </tbody>
            </table>
            <table class="wikitable">
                <tr><th>Year</th><th>Turnout</th></tr>
                <tr><td>2013</td><td>86%</td></tr>
                <tr><td>2017</td><td>
                    <table><tr><td>nested</td></tr></table>
                    78%
                </td></tr>
            </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_tables_counts_every_table() {
        let tables = parse_tables(PAGE);
        // the nested table is a table too
        assert_eq!(tables.len(), 4);
        assert_eq!(tables[1].width(), 4);
        assert_eq!(tables[1].len(), 3);
    }

    #[test]
    fn test_headerless_table_gets_synthetic_columns() {
        let tables = parse_tables(PAGE);
        assert_eq!(tables[0].columns, vec!["column_0", "column_1"]);
        assert_eq!(tables[0].rows[0][1], Cell::Text("Harambee".into()));
    }

    #[test]
    fn test_header_from_th_row_without_thead() {
        let tables = parse_tables(PAGE);
        let turnout = &tables[2];
        assert_eq!(turnout.columns, vec!["Year", "Turnout"]);
        assert_eq!(turnout.len(), 2, "nested table rows must not leak");
    }

    #[test]
    fn test_select_by_index() {
        let table = select_table(PAGE, &TableSelector::Index(1)).unwrap();
        assert_eq!(table.columns[1], "County");
        assert_eq!(table.columns[2], "Population[1]");
    }

    #[test]
    fn test_select_by_index_out_of_range() {
        let err = select_table(PAGE, &TableSelector::Index(9)).unwrap_err();
        assert!(matches!(err, ParseError::TableNotFound(_)));
    }

    #[test]
    fn test_select_by_css_id() {
        let mut table = select_table(PAGE, &TableSelector::Css("#counties".into())).unwrap();
        assert_eq!(table.len(), 3);

        table.coerce_numeric("Population[1]").unwrap();
        table.coerce_numeric("Area (km²)").unwrap();
        assert_eq!(table.rows[0][2], Cell::Number(4_397_073.0));
        assert_eq!(table.rows[2][3], Cell::Missing);
    }

    #[test]
    fn test_select_ambiguous_css_takes_first() {
        let table = select_table(PAGE, &TableSelector::Css("table.wikitable".into())).unwrap();
        assert_eq!(table.columns[0], "Code");
    }

    #[test]
    fn test_select_css_container_finds_inner_table() {
        let html = r#"<div id="results"><p>Results</p><table><tr><th>A</th></tr><tr><td>1</td></tr></table></div>"#;
        let table = select_table(html, &TableSelector::Css("#results".into())).unwrap();
        assert_eq!(table.columns, vec!["A"]);
        assert_eq!(table.rows, vec![vec![Cell::Text("1".into())]]);
    }

    #[test]
    fn test_select_css_no_match() {
        let err = select_table(PAGE, &TableSelector::Css("#missing".into())).unwrap_err();
        assert!(matches!(err, ParseError::TableNotFound(_)));
    }

    #[test]
    fn test_select_invalid_css() {
        let err = select_table(PAGE, &TableSelector::Css("table[".into())).unwrap_err();
        assert!(matches!(err, ParseError::InvalidSelector { .. }));
    }

    #[test]
    fn test_rowspan_cells_carry_down() {
        let html = r#"<table>
            <tr><th>County</th><th>Constituency</th><th>Votes</th></tr>
            <tr><td rowspan="2">Nairobi</td><td>Westlands</td><td>53,000</td></tr>
            <tr><td>Kibra</td><td>24,108</td></tr>
            <tr><td>Mombasa</td><td>Nyali</td><td>30,100</td></tr>
        </table>"#;

        let table = select_table(html, &TableSelector::Index(0)).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(
            table.rows[1],
            vec![
                Cell::Text("Nairobi".into()),
                Cell::Text("Kibra".into()),
                Cell::Text("24,108".into()),
            ]
        );
        assert_eq!(
            table.numeric_column("Votes").unwrap(),
            vec![Some(53_000.0), Some(24_108.0), Some(30_100.0)]
        );
    }

    #[test]
    fn test_rowspan_in_last_column_fills_trailing_slot() {
        let html = r#"<table>
            <tr><th>Candidate</th><th>Result</th></tr>
            <tr><td>A</td><td rowspan="2">Runoff</td></tr>
            <tr><td>B</td></tr>
        </table>"#;

        let table = &parse_tables(html)[0];
        assert_eq!(table.rows[1][1], Cell::Text("Runoff".into()));
    }

    #[test]
    fn test_colspan_cells_fill_every_slot() {
        let html = r#"<table>
            <thead><tr><th>Name</th><th colspan="2">Votes</th><th>Share</th></tr></thead>
            <tbody>
                <tr><td>A</td><td>10</td><td>x</td><td>5%</td></tr>
                <tr><td colspan="3">Withdrawn</td><td>0%</td></tr>
            </tbody>
        </table>"#;

        let table = &parse_tables(html)[0];

        assert_eq!(table.columns, vec!["Name", "Votes", "Votes", "Share"]);
        assert_eq!(table.numeric_column("Share").unwrap(), vec![Some(5.0), Some(0.0)]);
        assert_eq!(table.rows[1][2], Cell::Text("Withdrawn".into()));
    }

    #[test]
    fn test_malformed_spans_count_as_one() {
        let html = r#"<table>
            <tr><th>A</th><th>B</th></tr>
            <tr><td colspan="zero" rowspan="0">1</td><td>2</td></tr>
            <tr><td>3</td><td>4</td></tr>
        </table>"#;

        let table = &parse_tables(html)[0];
        assert_eq!(
            table.rows,
            vec![
                vec![Cell::Text("1".into()), Cell::Text("2".into())],
                vec![Cell::Text("3".into()), Cell::Text("4".into())],
            ]
        );
    }
}
