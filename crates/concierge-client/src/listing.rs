use std::io::{self, Write};

use crate::discover::DiscoveredTarget;
use crate::text::wrap_lines;

const LISTING_TOTAL_WIDTH: usize = 120;
const LISTING_COLUMN_GAP: usize = 2;
const DESCRIPTION_WRAP_WIDTH: usize = 40;

fn column_widths(total: usize) -> (usize, usize) {
    let usable = total - LISTING_COLUMN_GAP;
    let name_width = usable / 2;
    (name_width, usable - name_width)
}

fn pad_column(lines: &mut Vec<String>, rows: usize, width: usize) {
    for line in lines.iter_mut() {
        let mut filled = line.chars().count();
        while filled < width {
            line.push(' ');
            filled += 1;
        }
    }
    while lines.len() < rows {
        lines.push(" ".repeat(width));
    }
}

/// Prints discovered targets in two aligned columns, wrapping long names
/// (continuations indented) and descriptions.
pub fn render_target_listing(
    targets: &[DiscoveredTarget],
    out: &mut dyn Write,
) -> io::Result<()> {
    let (name_width, description_width) = column_widths(LISTING_TOTAL_WIDTH);
    for target in targets {
        let mut names = wrap_lines(&target.name, name_width, "  ");
        let description = target.description.as_deref().unwrap_or("");
        let mut descriptions = wrap_lines(description, DESCRIPTION_WRAP_WIDTH, "");
        let rows = names.len().max(descriptions.len()).max(1);
        pad_column(&mut names, rows, name_width);
        pad_column(&mut descriptions, rows, description_width);
        for (name_line, description_line) in names.iter().zip(descriptions.iter()) {
            writeln!(out, "{} {}", name_line, description_line.trim_end())?;
        }
    }
    Ok(())
}
