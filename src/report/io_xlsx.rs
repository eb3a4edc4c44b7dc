// Primitives for reading the metadata table from Excel workbooks.

use calamine::{open_workbook, Reader, Xlsx};

use crate::report::{
    io_common::{cell_to_string, cell_to_u32},
    *,
};

use survey_report::MetaRecord;

static EMPTY_CELL: calamine::DataType = calamine::DataType::Empty;

/// Reads the metadata worksheet of a workbook. The worksheet is selected
/// by name when given, otherwise the first worksheet is used. The first
/// row holds the column headers and is skipped.
pub fn read_metadata_workbook(
    path: &str,
    worksheet_name: &Option<String>,
) -> ReportResult<Vec<MetaRecord>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu {
        path: path.to_string(),
    })?;
    let wrange = match worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu {
                path: path.to_string(),
            })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu {
                path: path.to_string(),
            })?,
    };

    let mut iter = wrange.rows().enumerate();
    let header = iter.next().context(EmptyExcelSnafu {})?;
    debug!("header: {:?}", header);

    let mut res: Vec<MetaRecord> = Vec::new();
    for (idx, row) in iter {
        // 1-based, as displayed by spreadsheet programs.
        let rowno = idx + 1;
        debug!("workbook row {}: {:?}", rowno, row);
        let cell = |i: usize| row.get(i).unwrap_or(&EMPTY_CELL);
        let marker = match cell_to_string(cell(0)) {
            Some(m) => m,
            None => continue,
        };
        res.push(MetaRecord {
            marker,
            question_number: cell_to_u32(cell(1), rowno)?,
            question_text: cell_to_string(cell(2)),
            type_signature: cell_to_string(cell(3)),
            child_sequence: cell_to_u32(cell(4), rowno)?,
            option_code: cell_to_string(cell(5)),
            option_text: cell_to_string(cell(6)),
            label_text: cell_to_string(cell(7)),
        });
    }
    Ok(res)
}
