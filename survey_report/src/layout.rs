//! Tab composition.
//!
//! [`TabComposer`] lays out one question's report tab: the header block,
//! the per-option response table and the cross-cut section. Placement is
//! forward-only (rows are consumed top to bottom and never revisited), so
//! the composer is a small state machine and panics on out-of-order calls.
//! While placing literal cells it assigns a physical [`CellRef`] to every
//! logical position the synthesizer may target; `finish` then renders the
//! synthesized expressions against that assignment.

use std::collections::HashMap;

use log::debug;

use crate::config::*;
use crate::expr::{render, Loc, RenderContext, Synthesized};

// Fixed columns of the response table.
const COL_SECTION: u32 = 2; // B
const COL_LABEL: u32 = 3; // C
const COL_COUNT: u32 = 4; // D
const COL_PERCENT: u32 = 5; // E
/// First column of the cross-cut count band; the percentage band follows it.
const COL_BAND_START: u32 = 6; // F

const HEADER_ROW: u32 = 4;
const FIRST_OPTION_ROW: u32 = 6;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum TabState {
    Initialized,
    OptionsPlaced,
    CrossCutsPlaced,
    Done,
}

pub struct TabComposer {
    name: String,
    state: TabState,
    cells: Vec<PlacedText>,
    locs: HashMap<Loc, CellRef>,
    next_row: u32,
}

impl TabComposer {
    /// Starts a tab for one question: number in A1, question text in C2.
    pub fn new(question: &Question) -> TabComposer {
        let name = format!("Q{}", question.number);
        let mut composer = TabComposer {
            name: name.clone(),
            state: TabState::Initialized,
            cells: Vec::new(),
            locs: HashMap::new(),
            next_row: HEADER_ROW,
        };
        composer.put(1, 1, question.number.to_string());
        composer.put(2, COL_LABEL, question.text.clone());
        composer
    }

    fn put(&mut self, row: u32, col: u32, text: String) {
        self.cells.push(PlacedText {
            at: CellRef {
                tab: self.name.clone(),
                row,
                col,
            },
            text,
        });
    }

    fn bind(&mut self, loc: Loc, row: u32, col: u32) {
        let cell = CellRef {
            tab: self.name.clone(),
            row,
            col,
        };
        let previous = self.locs.insert(loc, cell);
        assert!(previous.is_none(), "logical position bound twice: {:?}", loc);
    }

    /// The per-child blocks of a question, in placement order. Single-select
    /// kinds have exactly one anonymous block.
    fn blocks(question: &Question) -> Vec<(Option<u32>, Option<String>)> {
        match question.kind {
            QuestionKind::Matrix | QuestionKind::RankLoop => question
                .children
                .iter()
                .map(|c| (Some(c.sequence), Some(c.label.clone())))
                .collect(),
            _ => vec![(None, None)],
        }
    }

    /// Places the response table: header row, one row per option with its
    /// count and percentage cells, and a Total row. Matrix children get one
    /// stacked block each, preceded by the child label.
    pub fn place_options(&mut self, question: &Question) {
        assert!(
            self.state == TabState::Initialized,
            "options must be placed first on tab {}",
            self.name
        );
        let k = question.options.len() as u32;
        assert!(k > 0, "cannot place an empty option table");

        for (child, label) in Self::blocks(question) {
            let mut header_row = self.next_row;
            if let Some(label) = label {
                self.put(header_row, COL_LABEL, label);
                header_row += 1;
            }
            self.put(header_row, COL_LABEL, "Response Text".to_string());
            self.put(header_row, COL_COUNT, "N".to_string());
            self.put(header_row, COL_PERCENT, "%".to_string());

            let first = header_row + (FIRST_OPTION_ROW - HEADER_ROW);
            for (i, opt) in question.options.iter().enumerate() {
                let row = first + i as u32;
                self.put(row, COL_LABEL, opt.label.clone());
                self.bind(
                    Loc::OptionCount {
                        child,
                        option: i as u32,
                    },
                    row,
                    COL_COUNT,
                );
                self.bind(
                    Loc::OptionPercent {
                        child,
                        option: i as u32,
                    },
                    row,
                    COL_PERCENT,
                );
            }
            let total_row = first + k;
            self.put(total_row, COL_LABEL, "Total".to_string());
            self.bind(Loc::OptionTotal { child }, total_row, COL_COUNT);
            self.next_row = total_row + 2;
        }
        self.state = TabState::OptionsPlaced;
    }

    /// Places the cross-cut section: one row per catalog filter, carrying
    /// the filter label, its audit text, the validity marker and the
    /// per-option count and percentage bands.
    pub fn place_cross_cuts(&mut self, question: &Question, filters: &[CrossCutFilter]) {
        assert!(
            self.state == TabState::OptionsPlaced,
            "cross-cuts must follow options on tab {}",
            self.name
        );
        let k = question.options.len() as u32;

        self.put(self.next_row, COL_SECTION, "x".to_string());
        self.put(self.next_row, COL_LABEL, "Cross Cut".to_string());
        self.next_row += 1;

        for (child, label) in Self::blocks(question) {
            if let Some(label) = label {
                self.put(self.next_row, COL_LABEL, label);
                self.next_row += 1;
            }
            let header_row = self.next_row;
            self.put(header_row, COL_LABEL, "Filter".to_string());
            self.put(header_row, COL_COUNT, "Predicate".to_string());
            self.put(header_row, COL_PERCENT, "Valid".to_string());
            for (i, opt) in question.options.iter().enumerate() {
                self.put(header_row, COL_BAND_START + i as u32, opt.label.clone());
                self.put(
                    header_row,
                    COL_BAND_START + k + i as u32,
                    format!("{} %", opt.label),
                );
            }

            for (f, filter) in filters.iter().enumerate() {
                let f = f as u32;
                let row = header_row + 1 + f;
                self.put(row, COL_LABEL, filter.label.clone());
                self.put(row, COL_COUNT, filter.human_readable.clone());
                self.bind(Loc::CrossValidity { child, filter: f }, row, COL_PERCENT);
                for i in 0..k {
                    self.bind(
                        Loc::CrossCount {
                            child,
                            filter: f,
                            option: i,
                        },
                        row,
                        COL_BAND_START + i,
                    );
                    self.bind(
                        Loc::CrossPercent {
                            child,
                            filter: f,
                            option: i,
                        },
                        row,
                        COL_BAND_START + k + i,
                    );
                }
            }
            self.next_row = header_row + 1 + filters.len() as u32 + 1;
        }
        self.state = TabState::CrossCutsPlaced;
    }

    /// Resolves every synthesized expression against the cells assigned
    /// during placement and seals the tab.
    pub fn finish(mut self, synthesized: &[Synthesized], ctx: &RenderContext) -> ReportTab {
        assert!(
            self.state == TabState::CrossCutsPlaced,
            "tab {} sealed before layout completed",
            self.name
        );
        let locs = &self.locs;
        let resolver = |loc: Loc| -> CellRef {
            locs.get(&loc)
                .unwrap_or_else(|| panic!("unbound logical position: {:?}", loc))
                .clone()
        };
        let expressions: Vec<DerivedExpression> = synthesized
            .iter()
            .map(|s| DerivedExpression {
                kind: s.kind,
                target_cell_ref: resolver(s.target),
                expression_text: render(&s.expr, ctx, &resolver),
            })
            .collect();
        debug!(
            "Tab {}: {} literal cells, {} expressions",
            self.name,
            self.cells.len(),
            expressions.len()
        );
        self.state = TabState::Done;
        ReportTab {
            name: self.name,
            cells: self.cells,
            expressions,
        }
    }
}

/// A tab for a question that produced nothing to tabulate: number and an
/// explanatory note only. Goes straight from initialization to done.
pub fn compose_empty_tab(number: u32, note: &str) -> ReportTab {
    let name = format!("Q{}", number);
    ReportTab {
        name: name.clone(),
        cells: vec![
            PlacedText {
                at: CellRef {
                    tab: name.clone(),
                    row: 1,
                    col: 1,
                },
                text: number.to_string(),
            },
            PlacedText {
                at: CellRef {
                    tab: name,
                    row: 2,
                    col: COL_LABEL,
                },
                text: note.to_string(),
            },
        ],
        expressions: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::synthesize_question;
    use crate::filters::FilterCatalog;

    fn two_option_question() -> Question {
        Question {
            number: 4,
            kind: QuestionKind::SingleSelect,
            text: "Do you commute?".to_string(),
            columns: vec!["Q4".to_string()],
            other_column: None,
            options: vec![
                ResponseOption {
                    code: "1".to_string(),
                    label: "Yes".to_string(),
                    is_other: false,
                    suspect: false,
                },
                ResponseOption {
                    code: "2".to_string(),
                    label: "No".to_string(),
                    is_other: false,
                    suspect: false,
                },
            ],
            children: vec![],
        }
    }

    fn text_at(tab: &ReportTab, row: u32, col: u32) -> &str {
        tab.cells
            .iter()
            .find(|c| c.at.row == row && c.at.col == col)
            .map(|c| c.text.as_str())
            .unwrap_or_else(|| panic!("no cell at ({}, {})", row, col))
    }

    fn compose(q: &Question) -> ReportTab {
        let opts = RunOptions::default();
        let catalog = FilterCatalog::from_definitions(&opts.filters, &opts.identity_column)
            .expect("default catalog");
        let synthesized = synthesize_question(q, catalog.filters_for_run(), &opts);
        let mut composer = TabComposer::new(q);
        composer.place_options(q);
        composer.place_cross_cuts(q, catalog.filters_for_run());
        composer.finish(&synthesized, &RenderContext::new(&opts))
    }

    #[test]
    fn single_select_layout_is_anchored() {
        let q = two_option_question();
        let tab = compose(&q);
        assert_eq!(tab.name, "Q4");
        assert_eq!(text_at(&tab, 1, 1), "4");
        assert_eq!(text_at(&tab, 2, 3), "Do you commute?");
        assert_eq!(text_at(&tab, 4, 3), "Response Text");
        assert_eq!(text_at(&tab, 4, 4), "N");
        assert_eq!(text_at(&tab, 4, 5), "%");
        assert_eq!(text_at(&tab, 6, 3), "Yes");
        assert_eq!(text_at(&tab, 7, 3), "No");
        assert_eq!(text_at(&tab, 8, 3), "Total");
    }

    #[test]
    fn every_expression_lands_in_its_tab() {
        let q = two_option_question();
        let tab = compose(&q);
        assert!(!tab.expressions.is_empty());
        for e in &tab.expressions {
            assert_eq!(e.target_cell_ref.tab, "Q4");
            assert!(e.expression_text.starts_with('='));
        }
        // Percentage of the first option divides by the absolute total cell.
        let pct = tab
            .expressions
            .iter()
            .find(|e| e.target_cell_ref.row == 6 && e.target_cell_ref.col == 5)
            .expect("first percentage");
        assert_eq!(pct.kind, ExpressionKind::Percentage);
        assert_eq!(pct.expression_text, "=IF($D$8=0, 0, D6/$D$8)");
    }

    #[test]
    fn cross_cut_rows_follow_catalog_order() {
        let opts = RunOptions::default();
        let catalog = FilterCatalog::from_definitions(&opts.filters, &opts.identity_column)
            .expect("default catalog");
        let q = two_option_question();
        let tab = compose(&q);
        // Section header sits two rows below the Total row.
        assert_eq!(text_at(&tab, 10, 2), "x");
        assert_eq!(text_at(&tab, 10, 3), "Cross Cut");
        assert_eq!(text_at(&tab, 11, 3), "Filter");
        assert_eq!(text_at(&tab, 11, 4), "Predicate");
        assert_eq!(text_at(&tab, 11, 5), "Valid");
        for (f, filter) in catalog.filters_for_run().iter().enumerate() {
            let row = 12 + f as u32;
            assert_eq!(text_at(&tab, row, 3), filter.label);
            assert_eq!(text_at(&tab, row, 4), filter.human_readable);
        }
    }

    #[test]
    fn matrix_children_get_stacked_blocks() {
        let q = Question {
            number: 7,
            kind: QuestionKind::Matrix,
            text: "Rate each brand".to_string(),
            columns: vec!["Q7_1".to_string(), "Q7_2".to_string()],
            other_column: None,
            options: vec![
                ResponseOption {
                    code: "1".to_string(),
                    label: "Good".to_string(),
                    is_other: false,
                    suspect: false,
                },
                ResponseOption {
                    code: "2".to_string(),
                    label: "Bad".to_string(),
                    is_other: false,
                    suspect: false,
                },
            ],
            children: vec![
                MatrixChild {
                    sequence: 1,
                    label: "Brand A".to_string(),
                },
                MatrixChild {
                    sequence: 2,
                    label: "Brand B".to_string(),
                },
            ],
        };
        let tab = compose(&q);
        // First child block: label, header, two options, total.
        assert_eq!(text_at(&tab, 4, 3), "Brand A");
        assert_eq!(text_at(&tab, 5, 3), "Response Text");
        assert_eq!(text_at(&tab, 7, 3), "Good");
        assert_eq!(text_at(&tab, 8, 3), "Bad");
        assert_eq!(text_at(&tab, 9, 3), "Total");
        // Second child block starts after a one-row gap.
        assert_eq!(text_at(&tab, 11, 3), "Brand B");
        // Both children contribute expressions for their own blocks.
        let totals: Vec<&DerivedExpression> = tab
            .expressions
            .iter()
            .filter(|e| e.expression_text.starts_with("=SUM("))
            .collect();
        assert_eq!(totals.len(), 2);
    }

    #[test]
    #[should_panic(expected = "cross-cuts must follow options")]
    fn cross_cuts_cannot_be_placed_first() {
        let q = two_option_question();
        let opts = RunOptions::default();
        let catalog = FilterCatalog::from_definitions(&opts.filters, &opts.identity_column)
            .expect("default catalog");
        let mut composer = TabComposer::new(&q);
        composer.place_cross_cuts(&q, catalog.filters_for_run());
    }

    #[test]
    fn empty_tab_has_note_and_no_expressions() {
        let tab = compose_empty_tab(9, "no markers found");
        assert_eq!(tab.name, "Q9");
        assert_eq!(text_at(&tab, 1, 1), "9");
        assert_eq!(text_at(&tab, 2, 3), "no markers found");
        assert!(tab.expressions.is_empty());
    }
}
