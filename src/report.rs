use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use survey_report::*;

use crate::args::Args;
use crate::report::config_reader::*;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum ReportError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display(""))]
    EmptyExcel {},
    #[snafu(display(""))]
    OpeningJson { source: std::io::Error },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading record at line {line}"))]
    CsvLineParse { source: csv::Error, line: usize },
    #[snafu(display("Cell at row {row} does not have the expected type: {detail}"))]
    ExcelWrongCellType { row: usize, detail: String },
    #[snafu(display("Error writing summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    Synthesis { source: SurveyError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ReportResult<T> = Result<T, ReportError>;

fn kind_label(kind: ExpressionKind) -> &'static str {
    match kind {
        ExpressionKind::Count => "count",
        ExpressionKind::Percentage => "percentage",
        ExpressionKind::ValidityCheck => "validity",
    }
}

fn cell_label(cell: &CellRef) -> String {
    format!("{}!{}", cell.tab, cell.to_a1())
}

fn tabs_to_json(summary: &ReportSummary) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for tab in summary.tabs.iter() {
        let mut cells: JSMap<String, JSValue> = JSMap::new();
        for placed in tab.cells.iter() {
            cells.insert(placed.at.to_a1(), json!(placed.text));
        }
        let formulas: Vec<JSValue> = tab
            .expressions
            .iter()
            .map(|e| {
                json!({
                    "kind": kind_label(e.kind),
                    "cell": cell_label(&e.target_cell_ref),
                    "text": e.expression_text,
                })
            })
            .collect();
        l.push(json!({"name": tab.name, "cells": cells, "formulas": formulas}));
    }
    l
}

fn diagnostics_to_json(summary: &ReportSummary) -> Vec<JSValue> {
    summary
        .diagnostics
        .iter()
        .map(|d| {
            json!({
                "question": d.question,
                "kind": format!("{:?}", d.kind),
                "optionCount": d.option_count,
                "skipped": d.skipped,
            })
        })
        .collect()
}

fn build_summary_js(summary: &ReportSummary) -> JSValue {
    json!({
        "tabs": tabs_to_json(summary),
        "diagnostics": diagnostics_to_json(summary),
    })
}

fn read_metadata(
    path: &str,
    input_type: &Option<String>,
    worksheet_name: &Option<String>,
) -> ReportResult<Vec<MetaRecord>> {
    let inferred = input_type.clone().unwrap_or_else(|| {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("csv")
            .to_lowercase()
    });
    info!(
        "Reading metadata from {} (format {})",
        io_common::simplify_file_name(path),
        inferred
    );
    match inferred.as_str() {
        "xlsx" | "xls" => io_xlsx::read_metadata_workbook(path, worksheet_name),
        "csv" => io_csv::read_metadata_file(path),
        x => whatever!("Unknown input type {:?}", x),
    }
}

pub fn run_report(args: &Args) -> ReportResult<()> {
    let config: ReportConfig = match &args.config {
        Some(path) => {
            let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
            serde_json::from_str(&contents).context(ParsingJsonSnafu {})?
        }
        None => ReportConfig::default(),
    };
    debug!("config: {:?}", config);

    let metadata_path = match args.input.clone().or_else(|| config.metadata_file.clone()) {
        Some(p) => p,
        None => whatever!("No metadata input provided (use --input or the configuration file)"),
    };

    let records = read_metadata(&metadata_path, &args.input_type, &args.excel_worksheet_name)?;
    info!("Read {} metadata records", records.len());

    let options = config.to_run_options();
    let summary = run_report_synthesis(&records, &options).context(SynthesisSnafu {})?;

    let result_js = build_summary_js(&summary);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    let out = args.out.clone().or_else(|| config.output_file.clone());
    match out.as_deref() {
        None | Some("stdout") => {
            println!("summary:{}", pretty_js_stats);
        }
        Some(path) => {
            fs::write(path, &pretty_js_stats).context(WritingOutputSnafu {
                path: path.to_string(),
            })?;
            info!("Summary written to {}", path);
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p.clone())?;
        debug!("reference summary: {:?}", summary_ref);
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between synthesized summary and reference summary")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_report::builder::MetadataBuilder;

    #[test]
    fn summary_json_has_one_entry_per_tab() {
        let mut options = RunOptions::default();
        options.question_number_range = (1, 2);
        let records = MetadataBuilder::new(1, "Pick one", "single select")
            .column("Q1")
            .option("1", "Yes")
            .option("2", "No")
            .records();
        let summary = run_report_synthesis(&records, &options).expect("run");
        let js = build_summary_js(&summary);
        let tabs = js["tabs"].as_array().expect("tabs array");
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[0]["name"], "Q1");
        assert_eq!(tabs[0]["cells"]["A1"], "1");
        assert!(!tabs[0]["formulas"].as_array().expect("formulas").is_empty());
        // Q2 has no metadata and comes out as an empty tab.
        assert_eq!(tabs[1]["name"], "Q2");
        assert!(tabs[1]["formulas"].as_array().expect("formulas").is_empty());
        let diags = js["diagnostics"].as_array().expect("diagnostics");
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[1]["kind"], "Unknown");
    }

    #[test]
    fn end_to_end_from_csv_metadata() {
        let csv = "\
marker,question,text,signature,child,code,option,label
Q1,1,Do you commute?,single select,,,,
Q1,1,,,,1,Yes,
Q1,1,,,,2,No,
Q2_1,2,Rate each,matrix,1,,,Item A
Q2_2,2,Rate each,matrix,2,,,Item B
Q2,2,,,,1,Good,
Q2,2,,,,2,Bad,
";
        let records = io_csv::read_metadata(csv.as_bytes()).expect("csv parse");
        assert_eq!(records.len(), 7);
        let mut options = RunOptions::default();
        options.question_number_range = (1, 2);
        let summary = run_report_synthesis(&records, &options).expect("run");
        assert_eq!(summary.tabs.len(), 2);
        assert!(summary.diagnostics.iter().all(|d| d.skipped.is_none()));
        // The matrix question has two children, each with its own table.
        let q2 = &summary.tabs[1];
        let sums = q2
            .expressions
            .iter()
            .filter(|e| e.expression_text.starts_with("=SUM("))
            .count();
        assert_eq!(sums, 2);
    }
}
