//! The cross-tab filter catalog.
//!
//! The set of cross-cut filters is fixed per run: two configurable slots
//! followed by the demographic taxonomy (gender, age bands, employment,
//! location). Every question's cross-cut section iterates this catalog in
//! the same order, which is what makes tabs comparable side by side.

use log::info;

use crate::config::*;

const AGE_BANDS: [&str; 6] = ["18-24", "25-34", "35-44", "45-54", "55-64", "65+"];
const EMPLOYMENT_KINDS: [&str; 6] = [
    "Employed full-time",
    "Employed part-time",
    "Self-employed",
    "Unemployed",
    "Student",
    "Retired",
];
const LOCATION_KINDS: [&str; 4] = ["Urban", "Suburban", "Rural", "Remote"];

/// The resolved, validated filter list for one run.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FilterCatalog {
    filters: Vec<CrossCutFilter>,
}

fn slot_filter(
    idx: u32,
    slot: &Option<FilterSlot>,
    identity_column: &str,
) -> Result<CrossCutFilter, SurveyError> {
    let default_label = format!("Filter Q #{}", idx);
    match slot {
        Some(s) => {
            if s.predicate_column.trim().is_empty() {
                return Err(SurveyError::FilterConfiguration {
                    reason: format!("filter slot {} has a blank predicate column", idx),
                });
            }
            if s.predicate_value.trim().is_empty() {
                return Err(SurveyError::FilterConfiguration {
                    reason: format!("filter slot {} has a blank predicate value", idx),
                });
            }
            let label = if s.label.trim().is_empty() {
                default_label
            } else {
                s.label.clone()
            };
            Ok(CrossCutFilter {
                category: FilterCategory::Slot,
                label,
                predicate_column: s.predicate_column.clone(),
                predicate_value: s.predicate_value.clone(),
                human_readable: format!("{}={}", s.predicate_column, s.predicate_value),
            })
        }
        // Unbound slot: degrade to a pass-through presence check so the tab
        // layout keeps the same shape whether or not the slot is used.
        None => Ok(CrossCutFilter {
            category: FilterCategory::Slot,
            label: default_label,
            predicate_column: identity_column.to_string(),
            predicate_value: "<>".to_string(),
            human_readable: "No filter".to_string(),
        }),
    }
}

fn demographic_filters(
    category: FilterCategory,
    prefix: &str,
    column: &str,
    labels: &[&str],
) -> Result<Vec<CrossCutFilter>, SurveyError> {
    if column.trim().is_empty() {
        return Err(SurveyError::FilterConfiguration {
            reason: format!("{} filters have a blank predicate column", prefix),
        });
    }
    Ok(labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let code = (i + 1).to_string();
            CrossCutFilter {
                category,
                label: format!("{} - {}", prefix, label),
                predicate_column: column.to_string(),
                predicate_value: code.clone(),
                human_readable: format!("{}={}", column, code),
            }
        })
        .collect())
}

impl FilterCatalog {
    /// Builds and validates the full catalog. Called once per run, before
    /// any question is processed: a bad filter configuration poisons every
    /// tab, so it fails the run outright.
    pub fn from_definitions(
        defs: &FilterDefinitions,
        identity_column: &str,
    ) -> Result<FilterCatalog, SurveyError> {
        let mut filters: Vec<CrossCutFilter> = Vec::new();
        filters.push(slot_filter(1, &defs.slot1, identity_column)?);
        filters.push(slot_filter(2, &defs.slot2, identity_column)?);
        filters.extend(demographic_filters(
            FilterCategory::Gender,
            "Gender",
            &defs.gender_column,
            &["Male", "Female"],
        )?);
        filters.extend(demographic_filters(
            FilterCategory::Age,
            "Age",
            &defs.age_column,
            &AGE_BANDS,
        )?);
        filters.extend(demographic_filters(
            FilterCategory::Employment,
            "Employment",
            &defs.employment_column,
            &EMPLOYMENT_KINDS,
        )?);
        filters.extend(demographic_filters(
            FilterCategory::Location,
            "Location",
            &defs.location_column,
            &LOCATION_KINDS,
        )?);

        for (i, f) in filters.iter().enumerate() {
            if filters[i + 1..].iter().any(|g| g.label == f.label) {
                return Err(SurveyError::FilterConfiguration {
                    reason: format!("duplicate filter label: {}", f.label),
                });
            }
        }
        info!("Cross-cut catalog assembled: {} filters", filters.len());
        Ok(FilterCatalog { filters })
    }

    pub fn filters_for_run(&self) -> &[CrossCutFilter] {
        &self.filters
    }
}
