// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The structural kind of a survey question, inferred from its
/// column markers and type signature.
///
/// In most cases, it is enough to use the higher-level builder API to
/// assemble metadata and let the classifier decide the kind.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum QuestionKind {
    /// One raw column, one enumerated answer per respondent.
    SingleSelect,
    /// Single select with an extra free-text "Other Specify" column.
    SingleSelectWithOther,
    /// Several child columns sharing one response scale.
    Matrix,
    /// Ranked/looped question. Structurally grouped like a matrix;
    /// ranking-specific semantics are deliberately not inferred.
    RankLoop,
    /// The markers or signature could not be recognized.
    /// Excluded from report generation, never fatal.
    Unknown,
}

/// One row of the metadata table that accompanies the raw export.
///
/// A record carrying an option code or option text describes one response
/// option of a question; any other record maps one raw-table column.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct MetaRecord {
    pub marker: String,
    pub question_number: Option<u32>,
    pub question_text: Option<String>,
    pub type_signature: Option<String>,
    pub child_sequence: Option<u32>,
    pub option_code: Option<String>,
    pub option_text: Option<String>,
    pub label_text: Option<String>,
}

impl MetaRecord {
    /// True when this record describes a response option rather than a column.
    pub fn is_option(&self) -> bool {
        self.option_code.is_some() || self.option_text.is_some()
    }
}

// ******** Question model *********

/// One answerable value within a question (or within a matrix child).
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResponseOption {
    /// The coded value as stored in the raw data. Empty for an Other slot.
    pub code: String,
    pub label: String,
    /// True only for the free-text "Other Specify" slot; such an option is
    /// matched by a presence check, never by an enumerated code.
    pub is_other: bool,
    /// Set for blank or duplicated codes. The option is retained and the
    /// generated formulas still reference it.
    pub suspect: bool,
}

/// One sub-item of a Matrix or RankLoop question. Children share the
/// parent question's response option list.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MatrixChild {
    /// 1-based position, matching the order of `Question::columns`.
    pub sequence: u32,
    pub label: String,
}

/// A fully classified logical survey question.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Question {
    pub number: u32,
    pub kind: QuestionKind,
    pub text: String,
    /// Raw-table column markers belonging to this question. Length 1 for
    /// single-select kinds; one entry per child for Matrix/RankLoop, in
    /// child-sequence order.
    pub columns: Vec<String>,
    /// The free-text column for SingleSelectWithOther. Excluded from
    /// `columns` so the enumerated logic never scans it.
    pub other_column: Option<String>,
    /// Response options in first-seen metadata order. Never re-sorted:
    /// downstream row indices depend on this order.
    pub options: Vec<ResponseOption>,
    /// Child rows for Matrix/RankLoop, empty otherwise.
    pub children: Vec<MatrixChild>,
}

// ******** Cross-tab filters *********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum FilterCategory {
    /// One of the two free "Filter Q" slots bound at configuration time.
    Slot,
    Gender,
    Age,
    Employment,
    Location,
}

/// A demographic/segment predicate against one raw-table column.
/// The set of filters is fixed at catalog-build time and read-only after.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CrossCutFilter {
    pub category: FilterCategory,
    pub label: String,
    pub predicate_column: String,
    pub predicate_value: String,
    /// Rendering of `predicate_column=predicate_value` for audit output.
    pub human_readable: String,
}

/// A free filter slot supplied by run configuration.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FilterSlot {
    pub label: String,
    pub predicate_column: String,
    pub predicate_value: String,
}

/// The configuration the filter catalog is built from. Column names map the
/// fixed demographic taxonomy onto this survey's raw table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FilterDefinitions {
    pub slot1: Option<FilterSlot>,
    pub slot2: Option<FilterSlot>,
    pub gender_column: String,
    pub age_column: String,
    pub employment_column: String,
    pub location_column: String,
}

impl Default for FilterDefinitions {
    fn default() -> FilterDefinitions {
        FilterDefinitions {
            slot1: None,
            slot2: None,
            gender_column: "S2".to_string(),
            age_column: "S3".to_string(),
            employment_column: "S4".to_string(),
            location_column: "S5".to_string(),
        }
    }
}

// ******** Derived expressions *********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ExpressionKind {
    Count,
    Percentage,
    ValidityCheck,
}

/// A logical (tab, row, column) location. Rows and columns are 1-based.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct CellRef {
    pub tab: String,
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    /// A1-style rendering of the row/column part, e.g. `D6`.
    pub fn to_a1(&self) -> String {
        format!("{}{}", column_letter(self.col), self.row)
    }

    /// Absolute A1-style rendering, e.g. `$D$6`.
    pub fn to_a1_absolute(&self) -> String {
        format!("${}${}", column_letter(self.col), self.row)
    }
}

/// Converts a 1-based column index to its spreadsheet letter form.
pub fn column_letter(col: u32) -> String {
    let mut n = col;
    let mut letters = String::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters
}

/// The synthesizer's output unit: one formula destined for one cell.
/// Created once per question/option/filter combination and never mutated;
/// the composer only places it.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DerivedExpression {
    pub kind: ExpressionKind,
    pub target_cell_ref: CellRef,
    pub expression_text: String,
}

// ******** Output data structures *********

/// A literal (non-formula) cell placed by the composer: labels, codes,
/// audit text. The persistence collaborator styles and writes these.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PlacedText {
    pub at: CellRef,
    pub text: String,
}

/// One report tab, fully laid out and ready for the styling collaborator.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ReportTab {
    pub name: String,
    pub cells: Vec<PlacedText>,
    pub expressions: Vec<DerivedExpression>,
}

/// Per-question classification outcome, for diagnostic display.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuestionDiagnostic {
    pub question: u32,
    pub kind: QuestionKind,
    pub option_count: usize,
    /// Present when the tab was left empty, with the reason.
    pub skipped: Option<String>,
}

/// The full run output: one tab per in-range question number (possibly
/// empty), in ascending question order, plus one diagnostic per question.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ReportSummary {
    pub tabs: Vec<ReportTab>,
    pub diagnostics: Vec<QuestionDiagnostic>,
}

// ******** Errors *********

/// Errors raised by the synthesis engine.
///
/// `DataIntegrity` is fatal for the affected question only: the run loop
/// catches it at the question boundary, logs it and leaves that tab empty.
/// `FilterConfiguration` invalidates every question's cross-cuts uniformly
/// and is raised before any question processing begins.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SurveyError {
    DataIntegrity { question: u32, reason: String },
    FilterConfiguration { reason: String },
    EmptyQuestionRange,
}

impl Error for SurveyError {}

impl Display for SurveyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurveyError::DataIntegrity { question, reason } => {
                write!(f, "data integrity error in question {}: {}", question, reason)
            }
            SurveyError::FilterConfiguration { reason } => {
                write!(f, "invalid filter configuration: {}", reason)
            }
            SurveyError::EmptyQuestionRange => write!(f, "empty question number range"),
        }
    }
}

// ********* Configuration **********

/// The configuration surface of a run. The classifier and the filter
/// catalog read from here; nothing is discovered from data at run time.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunOptions {
    /// Inclusive range of question numbers to process.
    pub question_number_range: (u32, u32),
    /// Marker suffix identifying the free-text "Other Specify" column.
    pub other_suffix_token: String,
    /// Token the type signature must contain for single-select kinds.
    pub single_select_token: String,
    pub matrix_signature_token: String,
    pub rankloop_signature_token: String,
    /// The raw-table column whose non-blank cells identify real respondents.
    pub identity_column: String,
    /// Number of data rows the rendered formulas scan in the raw table.
    pub raw_data_rows: u32,
    pub filters: FilterDefinitions,
}

impl Default for RunOptions {
    fn default() -> RunOptions {
        RunOptions {
            question_number_range: (1, 10),
            other_suffix_token: "_other".to_string(),
            single_select_token: "single select".to_string(),
            matrix_signature_token: "matrix".to_string(),
            rankloop_signature_token: "rank".to_string(),
            identity_column: "record".to_string(),
            raw_data_rows: 500,
            filters: FilterDefinitions::default(),
        }
    }
}
