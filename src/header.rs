//! Collapses stacked header rows into one logical header per column.
//!
//! Ledger exports typically spread a column title over several rows
//! (`"Sale"` / `"Price"` / `"Ex Vat"`). [`synthesise_header()`] joins the
//! non-empty fragments of each column top-to-bottom.

pub const DEFAULT_HEADER_ROWS: usize = 3;

pub fn synthesise_header(rows: &[Vec<String>]) -> Vec<String> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    (0..width)
        .map(|column| {
            let fragments = rows
                .iter()
                .filter_map(|row| row.get(column))
                .map(|cell| cell.replace('\r', ""))
                .map(|cell| cell.trim().to_string())
                .filter(|cell| !cell.is_empty())
                .collect::<Vec<_>>();
            collapse_whitespace(&fragments.join(" "))
        })
        .collect()
}

/// Splits a raw table into its header group and body.
pub fn split_header_rows(rows: &[Vec<String>], depth: usize) -> (&[Vec<String>], &[Vec<String>]) {
    rows.split_at(depth.min(rows.len()))
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn joins_fragments_top_to_bottom() {
        let rows = vec![row(&["Sale", "Price", ""]), row(&["", "Ex Vat", ""])];
        assert_eq!(synthesise_header(&rows), vec!["Sale", "Price Ex Vat", ""]);
    }

    #[test]
    fn width_follows_the_widest_row() {
        let rows = vec![row(&["Stock"]), row(&["Code", "Manu/", "Internet"]), row(&[])];
        let header = synthesise_header(&rows);
        assert_eq!(header, vec!["Stock Code", "Manu/", "Internet"]);
    }

    #[test]
    fn strips_carriage_returns_and_collapses_runs() {
        let rows = vec![row(&["  Stock \r"]), row(&["Value\r\n  (GBP) "])];
        assert_eq!(synthesise_header(&rows), vec!["Stock Value (GBP)"]);
    }

    #[test]
    fn empty_group_yields_empty_header() {
        assert!(synthesise_header(&[]).is_empty());
    }

    #[test]
    fn split_header_rows_clamps_depth() {
        let rows = vec![row(&["a"]), row(&["b"])];
        let (head, body) = split_header_rows(&rows, 3);
        assert_eq!(head.len(), 2);
        assert!(body.is_empty());
    }
}
