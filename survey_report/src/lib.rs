pub mod builder;
mod config;
mod expr;
mod filters;
pub mod manual;

mod layout;

use std::collections::HashMap;

use log::{debug, info, warn};

pub use crate::config::*;
pub use crate::expr::{
    render, synthesize_question, CrossTerm, Expr, Loc, RenderContext, Synthesized,
};
pub use crate::filters::FilterCatalog;
pub use crate::layout::{compose_empty_tab, TabComposer};

// **** Classification ****

/// The classification outcome for one question number.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Classified {
    Known(Question),
    /// The markers or signature did not match any supported shape. Not an
    /// error: the question gets an empty tab and the run continues.
    Unknown { reason: String },
}

/// Splits a column marker into its question root, optional child sequence
/// and the Other flag. `Q5` -> (`Q5`, None, false); `Q7_2` -> (`Q7`,
/// Some(2), false); `Q5_other` -> (`Q5`, None, true).
fn marker_parts<'a>(marker: &'a str, other_suffix: &str) -> (&'a str, Option<u32>, bool) {
    if let Some(root) = marker.strip_suffix(other_suffix) {
        return (root, None, true);
    }
    if let Some(idx) = marker.rfind('_') {
        if let Ok(seq) = marker[idx + 1..].parse::<u32>() {
            return (&marker[..idx], Some(seq), false);
        }
    }
    (marker, None, false)
}

/// Extracts the response options of a question, in first-seen metadata
/// order. Blank or duplicated codes mark the option as suspect but never
/// remove it: the analyst sees the full list and decides.
///
/// The Other slot is recognized by its `_other`-suffixed marker. For
/// metadata files that reuse the root marker on every option row, the
/// option label is consulted instead, but only when the question actually
/// carries an Other column: an enumerated option that merely mentions
/// "other" in its label keeps its code. At most one slot is kept; any
/// further claimant is demoted to a suspect enumerated option.
fn extract_options(
    records: &[&MetaRecord],
    other_suffix: &str,
    has_other_column: bool,
) -> Vec<ResponseOption> {
    let mut options: Vec<ResponseOption> = Vec::new();
    for r in records {
        let code = r.option_code.clone().unwrap_or_default();
        let label = r
            .option_text
            .clone()
            .or_else(|| r.label_text.clone())
            .unwrap_or_else(|| code.clone());
        let claims_other = r.marker.ends_with(other_suffix)
            || (has_other_column && label.to_lowercase().contains("other"));
        let demoted = claims_other && options.iter().any(|o| o.is_other);
        let is_other = claims_other && !demoted;
        if demoted {
            warn!(
                "Option {:?} also looks like an Other slot; keeping the first one only",
                label
            );
        }
        let blank = code.trim().is_empty() && !is_other;
        let duplicate = !code.trim().is_empty() && options.iter().any(|o| o.code == code);
        if blank || duplicate {
            warn!(
                "Suspect option (code {:?}, label {:?}): {}",
                code,
                label,
                if blank { "blank code" } else { "duplicated code" }
            );
        }
        options.push(ResponseOption {
            code,
            label,
            is_other,
            suspect: blank || duplicate || demoted,
        });
    }
    options
}

/// Infers the shape of one question from its metadata records.
///
/// Returns `Classified::Unknown` for shapes this engine does not model,
/// and a `DataIntegrity` error for metadata that contradicts itself
/// (duplicate markers, malformed child sequences, an Other column without
/// its Other option row).
pub fn classify_question(
    number: u32,
    records: &[MetaRecord],
    options: &RunOptions,
) -> Result<Classified, SurveyError> {
    if records.is_empty() {
        return Ok(Classified::Unknown {
            reason: "no markers found".to_string(),
        });
    }
    let column_records: Vec<&MetaRecord> = records.iter().filter(|r| !r.is_option()).collect();
    let option_records: Vec<&MetaRecord> = records.iter().filter(|r| r.is_option()).collect();
    if column_records.is_empty() {
        return Ok(Classified::Unknown {
            reason: "no column markers, only option rows".to_string(),
        });
    }

    let text = column_records
        .iter()
        .find_map(|r| r.question_text.clone())
        .unwrap_or_default();
    let signature = match column_records.iter().find_map(|r| r.type_signature.clone()) {
        Some(s) => s.to_lowercase(),
        None => {
            return Ok(Classified::Unknown {
                reason: "missing type signature".to_string(),
            })
        }
    };
    debug!(
        "classify_question: Q{}: {} column markers, {} option rows, signature {:?}",
        number,
        column_records.len(),
        option_records.len(),
        signature
    );

    if signature.contains(&options.single_select_token) {
        let mut main_column: Option<String> = None;
        let mut other_column: Option<String> = None;
        for r in &column_records {
            let (_, _, is_other) = marker_parts(&r.marker, &options.other_suffix_token);
            let slot = if is_other {
                &mut other_column
            } else {
                &mut main_column
            };
            if slot.is_some() {
                return Err(SurveyError::DataIntegrity {
                    question: number,
                    reason: format!("duplicate column marker {}", r.marker),
                });
            }
            *slot = Some(r.marker.clone());
        }
        let main_column = main_column.ok_or_else(|| SurveyError::DataIntegrity {
            question: number,
            reason: "single-select question without a main column".to_string(),
        })?;
        let opts = extract_options(
            &option_records,
            &options.other_suffix_token,
            other_column.is_some(),
        );
        let kind = if other_column.is_some() {
            if !opts.iter().any(|o| o.is_other) {
                return Err(SurveyError::DataIntegrity {
                    question: number,
                    reason: "Other column present but no Other option row".to_string(),
                });
            }
            QuestionKind::SingleSelectWithOther
        } else {
            QuestionKind::SingleSelect
        };
        return Ok(Classified::Known(Question {
            number,
            kind,
            text,
            columns: vec![main_column],
            other_column,
            options: opts,
            children: vec![],
        }));
    }

    let is_matrix = signature.contains(&options.matrix_signature_token);
    let is_rank = signature.contains(&options.rankloop_signature_token);
    if is_matrix || is_rank {
        let mut children: Vec<(u32, String, String)> = Vec::new();
        for r in &column_records {
            let (_, parsed_seq, _) = marker_parts(&r.marker, &options.other_suffix_token);
            let seq = match r.child_sequence.or(parsed_seq) {
                Some(s) => s,
                None => {
                    return Err(SurveyError::DataIntegrity {
                        question: number,
                        reason: format!("malformed child sequence for marker {}", r.marker),
                    })
                }
            };
            if children.iter().any(|(s, _, _)| *s == seq) {
                return Err(SurveyError::DataIntegrity {
                    question: number,
                    reason: format!("duplicate child sequence {} (marker {})", seq, r.marker),
                });
            }
            let label = r.label_text.clone().unwrap_or_else(|| r.marker.clone());
            children.push((seq, label, r.marker.clone()));
        }
        children.sort_by_key(|(s, _, _)| *s);
        let kind = if is_matrix {
            QuestionKind::Matrix
        } else {
            QuestionKind::RankLoop
        };
        return Ok(Classified::Known(Question {
            number,
            kind,
            text,
            columns: children.iter().map(|(_, _, m)| m.clone()).collect(),
            other_column: None,
            options: extract_options(&option_records, &options.other_suffix_token, false),
            children: children
                .into_iter()
                .map(|(sequence, label, _)| MatrixChild { sequence, label })
                .collect(),
        }));
    }

    Ok(Classified::Unknown {
        reason: format!("unrecognized type signature: {}", signature),
    })
}

/// Derives a question number for one metadata record: the explicit number
/// when present, otherwise the number of a `Q<digits>` marker root
/// (`Q12_3` -> 12). Screener and demographic markers like `S2` do not
/// follow the question convention and yield nothing.
fn infer_question_number(record: &MetaRecord, other_suffix: &str) -> Option<u32> {
    if record.question_number.is_some() {
        return record.question_number;
    }
    let (root, _, _) = marker_parts(&record.marker, other_suffix);
    let digits = root.strip_prefix('Q')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// **** Run orchestration ****

/// Runs the full synthesis: classifies every question number in the
/// configured range, synthesizes its derived expressions and composes its
/// tab. One tab and one diagnostic are produced per number, in ascending
/// order, so two runs over the same inputs give identical summaries.
///
/// Filter configuration problems fail the run before any question is
/// looked at. Per-question integrity problems only empty that question's
/// tab.
pub fn run_report_synthesis(
    records: &[MetaRecord],
    options: &RunOptions,
) -> Result<ReportSummary, SurveyError> {
    info!(
        "Processing {:?} metadata records, questions {:?}..={:?}",
        records.len(),
        options.question_number_range.0,
        options.question_number_range.1
    );
    let catalog = FilterCatalog::from_definitions(&options.filters, &options.identity_column)?;

    let (lo, hi) = options.question_number_range;
    if lo == 0 || lo > hi {
        return Err(SurveyError::EmptyQuestionRange);
    }

    let mut by_question: HashMap<u32, Vec<MetaRecord>> = HashMap::new();
    for r in records {
        if let Some(n) = infer_question_number(r, &options.other_suffix_token) {
            by_question.entry(n).or_default().push(r.clone());
        } else {
            debug!("Ignoring record without a question number: {:?}", r.marker);
        }
    }

    let ctx = RenderContext::new(options);
    let mut tabs: Vec<ReportTab> = Vec::new();
    let mut diagnostics: Vec<QuestionDiagnostic> = Vec::new();
    for n in lo..=hi {
        let empty: Vec<MetaRecord> = Vec::new();
        let q_records = by_question.get(&n).unwrap_or(&empty);
        match classify_question(n, q_records, options) {
            Err(err) => {
                warn!("Question {} left empty: {}", n, err);
                tabs.push(compose_empty_tab(n, &err.to_string()));
                diagnostics.push(QuestionDiagnostic {
                    question: n,
                    kind: QuestionKind::Unknown,
                    option_count: 0,
                    skipped: Some(err.to_string()),
                });
            }
            Ok(Classified::Unknown { reason }) => {
                warn!("Question {} not recognized: {}", n, reason);
                tabs.push(compose_empty_tab(n, &reason));
                diagnostics.push(QuestionDiagnostic {
                    question: n,
                    kind: QuestionKind::Unknown,
                    option_count: 0,
                    skipped: Some(reason),
                });
            }
            Ok(Classified::Known(question)) if question.options.is_empty() => {
                warn!("Question {} has no response options", n);
                tabs.push(compose_empty_tab(n, &question.text));
                diagnostics.push(QuestionDiagnostic {
                    question: n,
                    kind: question.kind,
                    option_count: 0,
                    skipped: Some("no response options".to_string()),
                });
            }
            Ok(Classified::Known(question)) => {
                info!(
                    "Question {}: {:?}, {} options, {} columns",
                    n,
                    question.kind,
                    question.options.len(),
                    question.columns.len()
                );
                let synthesized =
                    synthesize_question(&question, catalog.filters_for_run(), options);
                let mut composer = TabComposer::new(&question);
                composer.place_options(&question);
                composer.place_cross_cuts(&question, catalog.filters_for_run());
                tabs.push(composer.finish(&synthesized, &ctx));
                diagnostics.push(QuestionDiagnostic {
                    question: n,
                    kind: question.kind,
                    option_count: question.options.len(),
                    skipped: None,
                });
            }
        }
    }
    info!("Synthesis done: {} tabs", tabs.len());
    Ok(ReportSummary { tabs, diagnostics })
}
