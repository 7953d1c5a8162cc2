//! Parsing of the delimited-text wholesale price dataset (`getCsv`).

use csv::ReaderBuilder;
use nscat_core::CsvRow;

use crate::endpoint::Endpoint;
use crate::error::SupplierError;

/// Picks the delimiter occurring most often in the header line.
///
/// Ties prefer `;`, then tab, then `,`.
#[must_use]
pub fn detect_delimiter(header_line: &str) -> u8 {
    let count = |c: char| header_line.matches(c).count();
    let (semi, tab, comma) = (count(';'), count('\t'), count(','));
    let max = semi.max(tab).max(comma);
    if max == semi {
        b';'
    } else if max == tab {
        b'\t'
    } else {
        b','
    }
}

/// Parses CSV text into rows keyed by trimmed header names.
///
/// Blank lines are skipped. Rows shorter than the header get `None` for
/// the missing cells; surplus cells are ignored.
///
/// # Errors
///
/// Returns [`SupplierError::DataFormat`] when the header line is empty or
/// the text is not readable as CSV.
pub fn parse_csv_rows(body: &str) -> Result<Vec<CsvRow>, SupplierError> {
    let endpoint = Endpoint::WholesaleCsv.name();
    let body = body.strip_prefix('\u{feff}').unwrap_or(body);
    let header_line = body
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_default();
    if header_line.trim().is_empty() {
        return Err(SupplierError::data_format(endpoint, "empty CSV header", body));
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(detect_delimiter(header_line))
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| SupplierError::data_format(endpoint, format!("unreadable CSV header: {e}"), body))?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result
            .map_err(|e| SupplierError::data_format(endpoint, format!("unreadable CSV row: {e}"), body))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let cells = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| (header.clone(), record.get(idx).map(ToOwned::to_owned)))
            .collect();
        rows.push(CsvRow::new(cells));
    }

    tracing::debug!(rows = rows.len(), columns = headers.len(), "parsed wholesale CSV");
    Ok(rows)
}
