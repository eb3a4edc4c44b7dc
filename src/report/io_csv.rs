// Primitives for reading the metadata table from CSV files.

use std::io::Read;

use crate::report::{
    io_common::{field_to_string, field_to_u32},
    *,
};

use survey_report::MetaRecord;

// Column order of the flat metadata layout.
const COL_MARKER: usize = 0;
const COL_QUESTION: usize = 1;
const COL_TEXT: usize = 2;
const COL_SIGNATURE: usize = 3;
const COL_CHILD: usize = 4;
const COL_CODE: usize = 5;
const COL_OPTION: usize = 6;
const COL_LABEL: usize = 7;

pub fn read_metadata_file(path: &str) -> ReportResult<Vec<MetaRecord>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu {
            path: path.to_string(),
        })?;
    parse_records(rdr)
}

/// Reader-based variant, used by tests and by callers that already hold
/// the bytes.
pub fn read_metadata<R: Read>(input: R) -> ReportResult<Vec<MetaRecord>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);
    parse_records(rdr)
}

fn parse_records<R: Read>(rdr: csv::Reader<R>) -> ReportResult<Vec<MetaRecord>> {
    let mut res: Vec<MetaRecord> = Vec::new();
    let mut records = rdr.into_records();
    // The first row holds the column headers.
    _ = records.next();
    for (idx, line_r) in records.enumerate() {
        // Line numbers are 1-based and account for the header row.
        let line = idx + 2;
        let row = line_r.context(CsvLineParseSnafu { line })?;
        debug!("{:?} {:?}", line, row);
        let field = |i: usize| row.get(i).unwrap_or("");
        let marker = match field_to_string(field(COL_MARKER)) {
            Some(m) => m,
            // Wholly blank lines are common at the end of hand-edited files.
            None => continue,
        };
        res.push(MetaRecord {
            marker,
            question_number: field_to_u32(field(COL_QUESTION), line)?,
            question_text: field_to_string(field(COL_TEXT)),
            type_signature: field_to_string(field(COL_SIGNATURE)),
            child_sequence: field_to_u32(field(COL_CHILD), line)?,
            option_code: field_to_string(field(COL_CODE)),
            option_text: field_to_string(field(COL_OPTION)),
            label_text: field_to_string(field(COL_LABEL)),
        });
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_column_and_option_rows() {
        let csv = "\
marker,question,text,signature,child,code,option,label
Q1,1,Do you commute?,single select,,,,
Q1,1,,,,1,Yes,
Q1,1,,,,2,No,

";
        let records = read_metadata(csv.as_bytes()).expect("parse");
        assert_eq!(records.len(), 3);
        assert!(!records[0].is_option());
        assert_eq!(records[0].question_text.as_deref(), Some("Do you commute?"));
        assert!(records[1].is_option());
        assert_eq!(records[1].option_code.as_deref(), Some("1"));
        assert_eq!(records[2].option_text.as_deref(), Some("No"));
    }

    #[test]
    fn short_rows_are_padded_with_blanks() {
        let csv = "marker,question\nQ3,3\n";
        let records = read_metadata(csv.as_bytes()).expect("parse");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].marker, "Q3");
        assert_eq!(records[0].question_number, Some(3));
        assert!(records[0].type_signature.is_none());
    }

    #[test]
    fn bad_sequence_reports_the_line() {
        let csv = "marker,question,text,signature,child\nQ4_1,4,Rate,matrix,first\n";
        let err = read_metadata(csv.as_bytes()).expect_err("bad child sequence");
        assert!(matches!(err, ReportError::ExcelWrongCellType { row: 2, .. }));
    }
}
