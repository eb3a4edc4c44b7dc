use crate::report::*;

use serde::{Deserialize, Serialize};

use survey_report::{FilterDefinitions, FilterSlot, RunOptions};

/// One filter slot binding, as written in the configuration file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SlotConfig {
    pub label: Option<String>,
    #[serde(rename = "predicateColumn")]
    pub predicate_column: String,
    #[serde(rename = "predicateValue")]
    pub predicate_value: String,
}

/// The demographic column mapping and slot bindings of the filter catalog.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(rename = "filterSlot1")]
    pub filter_slot_1: Option<SlotConfig>,
    #[serde(rename = "filterSlot2")]
    pub filter_slot_2: Option<SlotConfig>,
    #[serde(rename = "genderColumn")]
    pub gender_column: Option<String>,
    #[serde(rename = "ageColumn")]
    pub age_column: Option<String>,
    #[serde(rename = "employmentColumn")]
    pub employment_column: Option<String>,
    #[serde(rename = "locationColumn")]
    pub location_column: Option<String>,
}

/// The run configuration file. Every field is optional and falls back to
/// the engine defaults, so `{}` is a valid configuration.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(rename = "questionNumberRange")]
    pub question_number_range: Option<[u32; 2]>,
    #[serde(rename = "otherSuffixToken")]
    pub other_suffix_token: Option<String>,
    #[serde(rename = "singleSelectToken")]
    pub single_select_token: Option<String>,
    #[serde(rename = "matrixSignatureToken")]
    pub matrix_signature_token: Option<String>,
    #[serde(rename = "rankLoopSignatureToken")]
    pub rank_loop_signature_token: Option<String>,
    #[serde(rename = "identityColumn")]
    pub identity_column: Option<String>,
    #[serde(rename = "rawDataRows")]
    pub raw_data_rows: Option<u32>,
    #[serde(rename = "filterDefinitions")]
    pub filter_definitions: Option<FilterConfig>,
    #[serde(rename = "metadataFile")]
    pub metadata_file: Option<String>,
    #[serde(rename = "outputFile")]
    pub output_file: Option<String>,
}

fn slot_to_options(slot: &SlotConfig) -> FilterSlot {
    FilterSlot {
        label: slot.label.clone().unwrap_or_default(),
        predicate_column: slot.predicate_column.clone(),
        predicate_value: slot.predicate_value.clone(),
    }
}

impl ReportConfig {
    /// Merges this configuration over the engine defaults.
    pub fn to_run_options(&self) -> RunOptions {
        let mut options = RunOptions::default();
        if let Some([lo, hi]) = self.question_number_range {
            options.question_number_range = (lo, hi);
        }
        if let Some(t) = &self.other_suffix_token {
            options.other_suffix_token = t.clone();
        }
        if let Some(t) = &self.single_select_token {
            options.single_select_token = t.to_lowercase();
        }
        if let Some(t) = &self.matrix_signature_token {
            options.matrix_signature_token = t.to_lowercase();
        }
        if let Some(t) = &self.rank_loop_signature_token {
            options.rankloop_signature_token = t.to_lowercase();
        }
        if let Some(c) = &self.identity_column {
            options.identity_column = c.clone();
        }
        if let Some(n) = self.raw_data_rows {
            options.raw_data_rows = n;
        }
        if let Some(fc) = &self.filter_definitions {
            let defaults = FilterDefinitions::default();
            options.filters = FilterDefinitions {
                slot1: fc.filter_slot_1.as_ref().map(slot_to_options),
                slot2: fc.filter_slot_2.as_ref().map(slot_to_options),
                gender_column: fc.gender_column.clone().unwrap_or(defaults.gender_column),
                age_column: fc.age_column.clone().unwrap_or(defaults.age_column),
                employment_column: fc
                    .employment_column
                    .clone()
                    .unwrap_or(defaults.employment_column),
                location_column: fc
                    .location_column
                    .clone()
                    .unwrap_or(defaults.location_column),
            };
        }
        options
    }
}

pub fn read_summary(path: String) -> ReportResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_configuration_is_the_defaults() {
        let config: ReportConfig = serde_json::from_str("{}").expect("parse");
        let options = config.to_run_options();
        assert_eq!(options, RunOptions::default());
    }

    #[test]
    fn parses_a_full_configuration() {
        let config: ReportConfig = serde_json::from_str(
            r#"{
                "questionNumberRange": [2, 8],
                "otherSuffixToken": "_oth",
                "identityColumn": "uuid",
                "rawDataRows": 1200,
                "filterDefinitions": {
                    "filterSlot1": {
                        "label": "Owns a car",
                        "predicateColumn": "Q3",
                        "predicateValue": "1"
                    },
                    "genderColumn": "D1"
                },
                "metadataFile": "data_map.xlsx",
                "outputFile": "report.json"
            }"#,
        )
        .expect("parse");
        let options = config.to_run_options();
        assert_eq!(options.question_number_range, (2, 8));
        assert_eq!(options.other_suffix_token, "_oth");
        assert_eq!(options.identity_column, "uuid");
        assert_eq!(options.raw_data_rows, 1200);
        let slot1 = options.filters.slot1.expect("slot 1");
        assert_eq!(slot1.label, "Owns a car");
        assert_eq!(slot1.predicate_column, "Q3");
        assert!(options.filters.slot2.is_none());
        assert_eq!(options.filters.gender_column, "D1");
        // Unset demographic columns keep their defaults.
        assert_eq!(options.filters.age_column, "S3");
        assert_eq!(config.metadata_file.as_deref(), Some("data_map.xlsx"));
        assert_eq!(config.output_file.as_deref(), Some("report.json"));
    }

    #[test]
    fn signature_tokens_are_lowercased() {
        let config: ReportConfig =
            serde_json::from_str(r#"{"singleSelectToken": "Single Select"}"#).expect("parse");
        assert_eq!(config.to_run_options().single_select_token, "single select");
    }
}
