//! Table rendering using comfy-table

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, ContentArrangement, Table};

/// Build a table with bold cyan headers, colouring status cells
pub fn build_table(headers: &[&str], rows: &[Vec<String>]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);

    // Constrain table width to terminal width minus indent
    if let Ok((cols, _)) = crossterm::terminal::size() {
        table.set_width(cols.saturating_sub(4));
    }
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).add_attribute(Attribute::Bold).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        let cells: Vec<Cell> = row
            .iter()
            .map(|cell_text| {
                let cell = Cell::new(cell_text);
                if cell_text.starts_with('✓') {
                    cell.fg(Color::Green)
                } else if cell_text.starts_with('✗') {
                    cell.fg(Color::Red)
                } else if cell_text.starts_with('⚠') {
                    cell.fg(Color::Yellow)
                } else {
                    cell
                }
            })
            .collect();
        table.add_row(cells);
    }

    table
}

/// Print a formatted table, indented under the section header
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    for line in build_table(headers, rows).to_string().lines() {
        println!("    {}", line);
    }
}
