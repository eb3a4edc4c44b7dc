pub use crate::config::*;

/// A builder for assembling the metadata records of one question.
///
/// This is the convenient way to describe a question in tests or when the
/// metadata does not come from a file.
///
/// ```
/// pub use survey_report::builder::MetadataBuilder;
/// pub use survey_report::{classify_question, Classified, RunOptions};
/// # use survey_report::SurveyError;
///
/// let records = MetadataBuilder::new(5, "How did you hear about us?", "single select")
///     .column("Q5")
///     .option("1", "Search engine")
///     .option("2", "A friend")
///     .other_column("Q5_other")
///     .other_option("Other (specify)")
///     .records();
///
/// let classified = classify_question(5, &records, &RunOptions::default())?;
/// assert!(matches!(classified, Classified::Known(_)));
///
/// # Ok::<(), SurveyError>(())
/// ```
pub struct MetadataBuilder {
    pub(crate) _number: u32,
    pub(crate) _text: String,
    pub(crate) _signature: String,
    pub(crate) _records: Vec<MetaRecord>,
}

impl MetadataBuilder {
    pub fn new(number: u32, text: &str, signature: &str) -> MetadataBuilder {
        MetadataBuilder {
            _number: number,
            _text: text.to_string(),
            _signature: signature.to_string(),
            _records: Vec::new(),
        }
    }

    fn column_record(&self, marker: &str) -> MetaRecord {
        MetaRecord {
            marker: marker.to_string(),
            question_number: Some(self._number),
            question_text: Some(self._text.clone()),
            type_signature: Some(self._signature.clone()),
            ..MetaRecord::default()
        }
    }

    /// Adds the main raw-table column of a single-select question.
    pub fn column(mut self, marker: &str) -> MetadataBuilder {
        let record = self.column_record(marker);
        self._records.push(record);
        self
    }

    /// Adds one child column of a Matrix or RankLoop question.
    pub fn child_column(mut self, marker: &str, sequence: u32, label: &str) -> MetadataBuilder {
        let mut record = self.column_record(marker);
        record.child_sequence = Some(sequence);
        record.label_text = Some(label.to_string());
        self._records.push(record);
        self
    }

    /// Adds the free-text "Other Specify" column. Pair it with
    /// [`MetadataBuilder::other_option`], or classification will reject the
    /// question.
    pub fn other_column(mut self, marker: &str) -> MetadataBuilder {
        let record = self.column_record(marker);
        self._records.push(record);
        self
    }

    /// Adds one enumerated response option.
    pub fn option(mut self, code: &str, text: &str) -> MetadataBuilder {
        self._records.push(MetaRecord {
            marker: format!("Q{}", self._number),
            question_number: Some(self._number),
            option_code: Some(code.to_string()),
            option_text: Some(text.to_string()),
            ..MetaRecord::default()
        });
        self
    }

    /// Adds the Other slot's option row. It has no code and carries the
    /// `_other`-suffixed marker of the free-text column.
    pub fn other_option(mut self, text: &str) -> MetadataBuilder {
        self._records.push(MetaRecord {
            marker: format!("Q{}_other", self._number),
            question_number: Some(self._number),
            option_code: Some("".to_string()),
            option_text: Some(text.to_string()),
            ..MetaRecord::default()
        });
        self
    }

    pub fn records(self) -> Vec<MetaRecord> {
        self._records
    }
}
