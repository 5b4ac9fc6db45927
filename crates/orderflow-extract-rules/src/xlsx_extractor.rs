//! XLSX extraction (spec §4.2): first sheet, merged cells filled from their
//! top-left value, then the same header detection/mapping as CSV.

use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Dimensions, Reader, Xlsx};
use orderflow_error::{OrderflowError, Result};
use orderflow_model::CanonicalOrderOutput;

use crate::csv_extractor::{assemble, parse_flexible_date};
use crate::headers::{find_header_row, map_headers, scan_header_region};

pub const EXTRACTOR_VERSION: &str = "rule_xlsx_v1";

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// For each merge range, copy the top-left cell's value into every other
/// cell in the range that is still blank.
fn fill_merged_cells(grid: &mut [Vec<String>], merges: &[Dimensions]) {
    for &((row_start, col_start), (row_end, col_end)) in merges {
        let top_left = grid
            .get(row_start as usize)
            .and_then(|row| row.get(col_start as usize))
            .cloned()
            .unwrap_or_default();
        for r in row_start..=row_end {
            for c in col_start..=col_end {
                if r == row_start && c == col_start {
                    continue;
                }
                if let Some(cell) = grid.get_mut(r as usize).and_then(|row| row.get_mut(c as usize)) {
                    if cell.trim().is_empty() {
                        *cell = top_left.clone();
                    }
                }
            }
        }
    }
}

/// Extract a Canonical Order Output from the first sheet of an XLSX
/// workbook's raw bytes.
pub fn extract_xlsx(bytes: &[u8]) -> Result<CanonicalOrderOutput> {
    let cursor = Cursor::new(bytes);
    let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor)
        .map_err(|e| OrderflowError::validation(format!("failed to open XLSX: {e}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| OrderflowError::validation("XLSX workbook has no sheets"))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| OrderflowError::validation(format!("failed to read sheet {sheet_name}: {e}")))?;
    let merges = workbook.worksheet_merge_cells(&sheet_name).unwrap_or_default();

    let mut grid: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    fill_merged_cells(&mut grid, &merges);

    if grid.is_empty() {
        return Err(OrderflowError::validation("XLSX sheet has no rows"));
    }

    let text_lines: Vec<String> = grid.iter().map(|row| row.join(" ")).collect();
    let text_refs: Vec<&str> = text_lines.iter().map(|s| s.as_str()).collect();
    let header_region = scan_header_region(&text_refs);

    let header_row_idx = find_header_row(&grid)
        .ok_or_else(|| OrderflowError::validation("no header row detected in XLSX"))?;
    let headers = grid[header_row_idx].clone();
    let mappings = map_headers(&headers);
    let data_rows = &grid[header_row_idx + 1..];

    assemble(
        EXTRACTOR_VERSION,
        &headers,
        &mappings,
        data_rows,
        header_region.external_order_number,
        header_region.order_date_raw.as_deref().and_then(parse_flexible_date),
        serde_json::json!({"sheet": sheet_name, "header_row_index": header_row_idx}),
    )
}
