//! Result rendering: a capped table preview for the prompt and a CSV
//! writer for full result sets.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use comfy_table::Table;
use index::KeyValue;

use crate::store::ProjectedRow;

pub const MAX_DISPLAY_ROWS: usize = 50;

pub fn format_value(value: &KeyValue) -> String {
    match value {
        KeyValue::Int(number) => number.to_string(),
        KeyValue::Real(number) => number.to_string(),
        KeyValue::Text(text) => text.clone(),
    }
}

pub fn format_table(columns: &[&str], rows: &[ProjectedRow]) -> String {
    let mut table = Table::new();
    let mut header = vec!["id".to_string()];
    header.extend(columns.iter().map(|column| column.to_string()));
    table.set_header(header);

    for row in rows.iter().take(MAX_DISPLAY_ROWS) {
        let mut cells = vec![row.id.to_string()];
        cells.extend(row.values.iter().map(format_value));
        table.add_row(cells);
    }
    table.to_string()
}

pub fn write_csv(path: &Path, columns: &[&str], rows: &[ProjectedRow]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    let mut header = vec!["id".to_string()];
    header.extend(columns.iter().map(|column| column.to_string()));
    writeln!(writer, "{}", header.join(","))?;

    for row in rows {
        let mut fields = vec![row.id.to_string()];
        fields.extend(row.values.iter().map(|value| escape_csv(&format_value(value))));
        writeln!(writer, "{}", fields.join(","))?;
    }
    writer.flush()
}

fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
