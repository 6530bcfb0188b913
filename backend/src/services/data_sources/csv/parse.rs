//! Turns delimited text into [`DataRow`]s.
//!
//! The delimiter is whichever of `, ; \t |` occurs most often on the header
//! line. Header cells are normalized and must be non-empty and unique. Cells
//! are typed as booleans, numbers or text; an empty cell becomes `Null`.

use crate::pipeline::error::{PipelineError, Result};
use actix_web::{HttpResponse, Responder};
use common::model::row::{DataRow, Scalar};
use csv::{ReaderBuilder, Trim};
use log::debug;
use regex::Regex;
use std::collections::HashSet;

const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// `POST /api/data_sources/csv/parse`: the body is CSV text, the answer the
/// typed rows as JSON.
pub(crate) async fn process(body: String) -> impl Responder {
    match rows_from_csv(&body) {
        Ok(rows) => HttpResponse::Ok().json(rows),
        Err(e) => HttpResponse::BadRequest().body(format!("Error: {}", e)),
    }
}

pub fn rows_from_csv(text: &str) -> Result<Vec<DataRow>> {
    let text = text.trim_start_matches('\u{feff}');
    let header_line = text.lines().next().unwrap_or_default();
    let delimiter = detect_delimiter(header_line);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let titles = normalize_titles(reader.headers()?.iter())?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        if record.len() > titles.len() {
            return Err(PipelineError::DataSource(format!(
                "row {} has {} cells but the header has {}",
                line + 2,
                record.len(),
                titles.len()
            )));
        }
        let mut row = DataRow::new();
        for (index, title) in titles.iter().enumerate() {
            let cell = record.get(index).map(normalize_cell).unwrap_or_default();
            row.insert(title.clone(), typed(&cell));
        }
        rows.push(row);
    }
    debug!(
        "parsed {} rows with {} columns (delimiter {:?})",
        rows.len(),
        titles.len(),
        delimiter as char
    );
    Ok(rows)
}

/// Most frequent candidate on the header line; `,` when none occurs.
pub fn detect_delimiter(header_line: &str) -> u8 {
    DELIMITERS
        .iter()
        .copied()
        .filter(|d| header_line.contains(*d as char))
        .max_by_key(|d| header_line.matches(*d as char).count())
        .unwrap_or(b',')
}

/// Trims, strips one pair of outer quotes and replaces non-breaking spaces.
pub fn normalize_cell(cell: &str) -> String {
    let s = cell.trim();
    let s = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(s);
    s.replace('\u{00A0}', " ").trim().to_string()
}

fn normalize_titles<'a>(cells: impl Iterator<Item = &'a str>) -> Result<Vec<String>> {
    let spaces = Regex::new(r"\s+").map_err(|e| PipelineError::DataSource(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut titles = Vec::new();
    for (index, cell) in cells.enumerate() {
        let title = spaces.replace_all(&normalize_cell(cell), "_").into_owned();
        if title.is_empty() {
            return Err(PipelineError::DataSource(format!(
                "header cell {} is empty",
                index + 1
            )));
        }
        if !seen.insert(title.clone()) {
            return Err(PipelineError::DataSource(format!(
                "header {:?} appears more than once",
                title
            )));
        }
        titles.push(title);
    }
    if titles.is_empty() {
        return Err(PipelineError::DataSource("missing header line".into()));
    }
    Ok(titles)
}

fn typed(cell: &str) -> Scalar {
    if cell.is_empty() {
        return Scalar::Null;
    }
    match cell.to_ascii_lowercase().as_str() {
        "true" => return Scalar::Bool(true),
        "false" => return Scalar::Bool(false),
        _ => {}
    }
    // leading zeros mark identifiers such as postal codes
    let looks_like_code = cell.len() > 1 && cell.starts_with('0') && !cell.starts_with("0.");
    match cell.parse::<f64>() {
        Ok(n) if n.is_finite() && !looks_like_code => Scalar::Number(n),
        _ => Scalar::Text(cell.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_delimiters() {
        assert_eq!(detect_delimiter("a,b,c"), b',');
        assert_eq!(detect_delimiter("a;b;c"), b';');
        assert_eq!(detect_delimiter("a\tb"), b'\t');
        assert_eq!(detect_delimiter("a|b|c,d"), b'|');
        assert_eq!(detect_delimiter("single"), b',');
    }

    #[test]
    fn parses_typed_rows_in_column_order() {
        let rows = rows_from_csv("name;score;passed;note\nAda;98.5;true;\n\"Grace Hopper\";7;FALSE;ok\n")
            .unwrap();
        assert_eq!(rows.len(), 2);
        let columns: Vec<&str> = rows[0].iter().map(|(c, _)| c).collect();
        assert_eq!(columns, vec!["name", "score", "passed", "note"]);
        assert_eq!(rows[0].get("score"), Some(&Scalar::Number(98.5)));
        assert_eq!(rows[0].get("passed"), Some(&Scalar::Bool(true)));
        assert_eq!(rows[0].get("note"), Some(&Scalar::Null));
        assert_eq!(rows[1].get("name"), Some(&Scalar::Text("Grace Hopper".into())));
        assert_eq!(rows[1].get("passed"), Some(&Scalar::Bool(false)));
    }

    #[test]
    fn normalizes_headers() {
        let rows = rows_from_csv("\u{feff} full name ,'course'\nAda,Math\n").unwrap();
        assert_eq!(rows[0].get("full_name"), Some(&Scalar::Text("Ada".into())));
        assert_eq!(rows[0].get("course"), Some(&Scalar::Text("Math".into())));
    }

    #[test]
    fn short_rows_fill_with_null_and_blank_lines_are_skipped() {
        let rows = rows_from_csv("a,b\n1\n,\n2,3\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("b"), Some(&Scalar::Null));
        assert_eq!(rows[1].get("b"), Some(&Scalar::Number(3.0)));
    }

    #[test]
    fn keeps_leading_zero_codes_as_text() {
        let rows = rows_from_csv("zip,ratio\n02134,0.5\n").unwrap();
        assert_eq!(rows[0].get("zip"), Some(&Scalar::Text("02134".into())));
        assert_eq!(rows[0].get("ratio"), Some(&Scalar::Number(0.5)));
    }

    #[test]
    fn rejects_bad_headers() {
        assert!(rows_from_csv("a,,c\n1,2,3\n").is_err());
        assert!(rows_from_csv("a,a\n1,2\n").is_err());
        assert!(rows_from_csv("a,b\n1,2,3\n").is_err());
    }
}
