use std::path::Path;

use crate::report::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Text content of one metadata cell, with blanks collapsed to `None`.
/// Numeric cells are accepted: exports often hold codes as numbers.
pub fn cell_to_string(cell: &calamine::DataType) -> Option<String> {
    let s = match cell {
        calamine::DataType::String(s) => s.trim().to_string(),
        calamine::DataType::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        calamine::DataType::Float(f) => format!("{}", f),
        calamine::DataType::Int(i) => format!("{}", i),
        calamine::DataType::Bool(b) => format!("{}", b),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Integer content of one metadata cell. Errors out on non-numeric text,
/// which always indicates a malformed metadata table.
pub fn cell_to_u32(cell: &calamine::DataType, row: usize) -> ReportResult<Option<u32>> {
    match cell_to_string(cell) {
        None => Ok(None),
        Some(s) => match s.parse::<u32>() {
            Ok(n) => Ok(Some(n)),
            Err(_) => ExcelWrongCellTypeSnafu {
                row,
                detail: format!("expected an integer, found {:?}", s),
            }
            .fail(),
        },
    }
}

/// Parses one optional integer field of a CSV metadata row.
pub fn field_to_u32(field: &str, line: usize) -> ReportResult<Option<u32>> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<u32>() {
        Ok(n) => Ok(Some(n)),
        Err(_) => ExcelWrongCellTypeSnafu {
            row: line,
            detail: format!("expected an integer, found {:?}", trimmed),
        }
        .fail(),
    }
}

/// Blank-collapsing accessor for one CSV field.
pub fn field_to_string(field: &str) -> Option<String> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_cells_become_plain_strings() {
        assert_eq!(
            cell_to_string(&calamine::DataType::Float(3.0)),
            Some("3".to_string())
        );
        assert_eq!(
            cell_to_string(&calamine::DataType::String("  Q5 ".to_string())),
            Some("Q5".to_string())
        );
        assert_eq!(cell_to_string(&calamine::DataType::Empty), None);
    }

    #[test]
    fn non_numeric_sequence_is_an_error() {
        let err = cell_to_u32(&calamine::DataType::String("abc".to_string()), 7)
            .expect_err("not a number");
        assert!(matches!(err, ReportError::ExcelWrongCellType { row: 7, .. }));
    }

    #[test]
    fn file_names_are_simplified() {
        assert_eq!(simplify_file_name("/a/b/data_map.xlsx"), "data_map.xlsx");
    }
}
