//! Abstract derived expressions and their lowering to spreadsheet formulas.
//!
//! The synthesizer emits an expression *tree* parameterized by logical
//! positions ([`Loc`]); the composer resolves logical positions to physical
//! cells and only then lowers the tree to formula text. This keeps the
//! counting/percentage logic independent of the concrete tab layout and of
//! the output formula dialect.

use crate::config::*;

/// Logical position of a derived cell inside one question's tab.
///
/// `child` is the matrix child sequence, `None` for single-select kinds.
/// Option and filter indices are 0-based positions in the question's option
/// list and in the run's filter catalog.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Loc {
    OptionCount { child: Option<u32>, option: u32 },
    OptionPercent { child: Option<u32>, option: u32 },
    OptionTotal { child: Option<u32> },
    CrossCount { child: Option<u32>, filter: u32, option: u32 },
    CrossPercent { child: Option<u32>, filter: u32, option: u32 },
    CrossValidity { child: Option<u32>, filter: u32 },
}

/// One extra equality criterion in a conditional count, read from a
/// catalog entry or from the run options. Never hardcoded by the caller.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CrossTerm {
    pub column: String,
    pub value: String,
}

/// The expression tree. Counting nodes reference raw-table columns by
/// marker name; ratio and marker nodes reference sibling cells by [`Loc`].
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Expr {
    /// Conditional count over one raw-table column, with optional extra
    /// criteria (identity presence, cross-cut predicates).
    CountMatches {
        column: String,
        code: String,
        cross: Vec<CrossTerm>,
    },
    /// Sum of the contiguous cell range spanned by two logical positions.
    SumOf { from: Loc, to: Loc },
    /// `numerator / denominator`, resolving to 0 when the denominator is 0.
    RatioOfCell { numerator: Loc, denominator: Loc },
    /// `numerator / SUM(range)`, resolving to 0 when the sum is 0.
    RatioOfSum { numerator: Loc, from: Loc, to: Loc },
    /// 1 when the range has any non-zero entry, 0 otherwise.
    NonZeroMarker { from: Loc, to: Loc },
}

/// One synthesized expression, not yet bound to a physical cell.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Synthesized {
    pub target: Loc,
    pub kind: ExpressionKind,
    pub expr: Expr,
}

/// Fixed band of the raw-data sheet that holds the column headers.
/// Wide enough for any export this system has seen.
const RAW_HEADER_LAST_COL: &str = "AJC";

/// Rendering parameters for lowering an [`Expr`] to formula text.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RenderContext {
    pub raw_sheet: String,
    /// First raw-table data row (headers live in the row above).
    pub first_data_row: u32,
    pub data_rows: u32,
}

impl RenderContext {
    pub fn new(options: &RunOptions) -> RenderContext {
        RenderContext {
            raw_sheet: "raw data".to_string(),
            first_data_row: 3,
            data_rows: options.raw_data_rows,
        }
    }

    /// Name-driven reference to one raw-table column: the column is located
    /// by matching its marker in the header row, so the rendered formula
    /// stays correct when raw columns move.
    fn raw_column(&self, marker: &str) -> String {
        let last = self.first_data_row + self.data_rows - 1;
        format!(
            "OFFSET('{sheet}'!$C${first}:$C${last}, 0, MATCH(\"{marker}\", '{sheet}'!$C$2:${hdr}$2, 0)-1)",
            sheet = self.raw_sheet,
            first = self.first_data_row,
            last = last,
            marker = marker,
            hdr = RAW_HEADER_LAST_COL,
        )
    }
}

/// Lowers an expression tree to formula text. `resolve` is supplied by the
/// composer and maps logical positions to the physical cells it assigned.
pub fn render(expr: &Expr, ctx: &RenderContext, resolve: &dyn Fn(Loc) -> CellRef) -> String {
    match expr {
        Expr::CountMatches {
            column,
            code,
            cross,
        } => {
            let mut parts = vec![format!("{}, \"{}\"", ctx.raw_column(column), code)];
            for term in cross {
                parts.push(format!(
                    "{}, \"{}\"",
                    ctx.raw_column(&term.column),
                    term.value
                ));
            }
            format!("=COUNTIFS({})", parts.join(", "))
        }
        Expr::SumOf { from, to } => {
            format!("=SUM({}:{})", resolve(*from).to_a1(), resolve(*to).to_a1())
        }
        Expr::RatioOfCell {
            numerator,
            denominator,
        } => {
            let num = resolve(*numerator).to_a1();
            let den = resolve(*denominator).to_a1_absolute();
            format!("=IF({den}=0, 0, {num}/{den})", den = den, num = num)
        }
        Expr::RatioOfSum {
            numerator,
            from,
            to,
        } => {
            let num = resolve(*numerator).to_a1();
            let range = format!(
                "{}:{}",
                resolve(*from).to_a1_absolute(),
                resolve(*to).to_a1_absolute()
            );
            format!("=IF(SUM({range})=0, 0, {num}/SUM({range}))", range = range, num = num)
        }
        Expr::NonZeroMarker { from, to } => {
            let range = format!(
                "{}:{}",
                resolve(*from).to_a1_absolute(),
                resolve(*to).to_a1_absolute()
            );
            format!("=IF(SUM({})=0, 0, 1)", range)
        }
    }
}

/// The criterion matching one response option against its raw column:
/// an enumerated code comparison, or a presence check for the Other slot
/// (which has no fixed code and lives in its own free-text column).
fn option_criterion<'a>(question: &'a Question, column: &'a str, option: &'a ResponseOption) -> (&'a str, &'a str) {
    if option.is_other {
        match &question.other_column {
            Some(other) => (other.as_str(), "<>"),
            // The classifier only attaches an Other slot together with its
            // column; fall back to a presence check on the main column.
            None => (column, "<>"),
        }
    } else {
        (column, option.code.as_str())
    }
}

/// Produces every derived expression needed to render one question's tab:
/// per-option counts and percentages, per-(option, filter) cross-cut counts
/// and percentages, and one validity marker per filter row. For Matrix and
/// RankLoop questions the full set is emitted once per child, each child
/// targeting its own raw column.
pub fn synthesize_question(
    question: &Question,
    filters: &[CrossCutFilter],
    options: &RunOptions,
) -> Vec<Synthesized> {
    let mut out: Vec<Synthesized> = Vec::new();
    let n_opts = question.options.len() as u32;
    if n_opts == 0 {
        return out;
    }

    // One block per child column; single-select kinds have exactly one.
    let blocks: Vec<(Option<u32>, &str)> = match question.kind {
        QuestionKind::Matrix | QuestionKind::RankLoop => question
            .children
            .iter()
            .zip(question.columns.iter())
            .map(|(c, col)| (Some(c.sequence), col.as_str()))
            .collect(),
        _ => question
            .columns
            .first()
            .map(|col| (None, col.as_str()))
            .into_iter()
            .collect(),
    };

    for (child, column) in blocks {
        for (i, opt) in question.options.iter().enumerate() {
            let i = i as u32;
            let (col, code) = option_criterion(question, column, opt);
            out.push(Synthesized {
                target: Loc::OptionCount { child, option: i },
                kind: ExpressionKind::Count,
                expr: Expr::CountMatches {
                    column: col.to_string(),
                    code: code.to_string(),
                    cross: vec![],
                },
            });
            out.push(Synthesized {
                target: Loc::OptionPercent { child, option: i },
                kind: ExpressionKind::Percentage,
                expr: Expr::RatioOfCell {
                    numerator: Loc::OptionCount { child, option: i },
                    denominator: Loc::OptionTotal { child },
                },
            });
        }
        out.push(Synthesized {
            target: Loc::OptionTotal { child },
            kind: ExpressionKind::Count,
            expr: Expr::SumOf {
                from: Loc::OptionCount { child, option: 0 },
                to: Loc::OptionCount {
                    child,
                    option: n_opts - 1,
                },
            },
        });

        for (f, filter) in filters.iter().enumerate() {
            let f = f as u32;
            for (i, opt) in question.options.iter().enumerate() {
                let i = i as u32;
                let (col, code) = option_criterion(question, column, opt);
                out.push(Synthesized {
                    target: Loc::CrossCount {
                        child,
                        filter: f,
                        option: i,
                    },
                    kind: ExpressionKind::Count,
                    expr: Expr::CountMatches {
                        column: col.to_string(),
                        code: code.to_string(),
                        cross: vec![
                            CrossTerm {
                                column: options.identity_column.clone(),
                                value: "<>".to_string(),
                            },
                            CrossTerm {
                                column: filter.predicate_column.clone(),
                                value: filter.predicate_value.clone(),
                            },
                        ],
                    },
                });
                out.push(Synthesized {
                    target: Loc::CrossPercent {
                        child,
                        filter: f,
                        option: i,
                    },
                    kind: ExpressionKind::Percentage,
                    expr: Expr::RatioOfSum {
                        numerator: Loc::CrossCount {
                            child,
                            filter: f,
                            option: i,
                        },
                        from: Loc::CrossCount {
                            child,
                            filter: f,
                            option: 0,
                        },
                        to: Loc::CrossCount {
                            child,
                            filter: f,
                            option: n_opts - 1,
                        },
                    },
                });
            }
            out.push(Synthesized {
                target: Loc::CrossValidity { child, filter: f },
                kind: ExpressionKind::ValidityCheck,
                expr: Expr::NonZeroMarker {
                    from: Loc::CrossCount {
                        child,
                        filter: f,
                        option: 0,
                    },
                    to: Loc::CrossCount {
                        child,
                        filter: f,
                        option: n_opts - 1,
                    },
                },
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterCatalog;

    fn sample_question() -> Question {
        Question {
            number: 1,
            kind: QuestionKind::SingleSelect,
            text: "Gender".to_string(),
            columns: vec!["Q1".to_string()],
            other_column: None,
            options: vec![
                ResponseOption {
                    code: "1".to_string(),
                    label: "Male".to_string(),
                    is_other: false,
                    suspect: false,
                },
                ResponseOption {
                    code: "2".to_string(),
                    label: "Female".to_string(),
                    is_other: false,
                    suspect: false,
                },
            ],
            children: vec![],
        }
    }

    fn fixed_resolver(loc: Loc) -> CellRef {
        // Deterministic fake layout, good enough to exercise rendering.
        let row = match loc {
            Loc::OptionCount { option, .. } => 6 + option,
            Loc::OptionPercent { option, .. } => 6 + option,
            Loc::OptionTotal { .. } => 10,
            Loc::CrossCount { filter, .. } => 20 + filter,
            Loc::CrossPercent { filter, .. } => 20 + filter,
            Loc::CrossValidity { filter, .. } => 20 + filter,
        };
        CellRef {
            tab: "Q1".to_string(),
            row,
            col: 4,
        }
    }

    #[test]
    fn count_renders_name_driven_countifs() {
        let ctx = RenderContext::new(&RunOptions::default());
        let e = Expr::CountMatches {
            column: "Q1".to_string(),
            code: "1".to_string(),
            cross: vec![],
        };
        let text = render(&e, &ctx, &fixed_resolver);
        assert_eq!(
            text,
            "=COUNTIFS(OFFSET('raw data'!$C$3:$C$502, 0, MATCH(\"Q1\", 'raw data'!$C$2:$AJC$2, 0)-1), \"1\")"
        );
    }

    #[test]
    fn ratio_is_zero_guarded() {
        let ctx = RenderContext::new(&RunOptions::default());
        let e = Expr::RatioOfCell {
            numerator: Loc::OptionCount {
                child: None,
                option: 0,
            },
            denominator: Loc::OptionTotal { child: None },
        };
        let text = render(&e, &ctx, &fixed_resolver);
        assert_eq!(text, "=IF($D$10=0, 0, D6/$D$10)");
    }

    #[test]
    fn cross_cut_reads_catalog_parameters() {
        let opts = RunOptions::default();
        let catalog = FilterCatalog::from_definitions(&opts.filters, &opts.identity_column)
            .expect("default catalog");
        let q = sample_question();
        let synthesized = synthesize_question(&q, catalog.filters_for_run(), &opts);

        let male = catalog
            .filters_for_run()
            .iter()
            .position(|f| f.label == "Gender - Male")
            .expect("male filter") as u32;
        let cross = synthesized
            .iter()
            .find(|s| {
                s.target
                    == Loc::CrossCount {
                        child: None,
                        filter: male,
                        option: 0,
                    }
            })
            .expect("cross count");
        match &cross.expr {
            Expr::CountMatches { cross, .. } => {
                assert_eq!(cross[0].column, opts.identity_column);
                assert_eq!(cross[0].value, "<>");
                assert_eq!(cross[1].column, opts.filters.gender_column);
                assert_eq!(cross[1].value, "1");
            }
            other => panic!("unexpected expression {:?}", other),
        }
    }

    #[test]
    fn gender_cross_cut_text_composes_all_three_criteria() {
        let opts = RunOptions::default();
        let ctx = RenderContext::new(&opts);
        let e = Expr::CountMatches {
            column: "Q1".to_string(),
            code: "1".to_string(),
            cross: vec![
                CrossTerm {
                    column: "record".to_string(),
                    value: "<>".to_string(),
                },
                CrossTerm {
                    column: "S2".to_string(),
                    value: "1".to_string(),
                },
            ],
        };
        let text = render(&e, &ctx, &fixed_resolver);
        assert!(text.starts_with("=COUNTIFS("));
        assert!(text.contains("MATCH(\"record\""));
        assert!(text.contains("MATCH(\"S2\""));
        assert!(text.contains("\"<>\""));
        assert!(text.contains("\"1\""));
    }

    #[test]
    fn synthesis_is_deterministic() {
        let opts = RunOptions::default();
        let catalog = FilterCatalog::from_definitions(&opts.filters, &opts.identity_column)
            .expect("default catalog");
        let q = sample_question();
        let a = synthesize_question(&q, catalog.filters_for_run(), &opts);
        let b = synthesize_question(&q, catalog.filters_for_run(), &opts);
        assert_eq!(a, b);

        let ctx = RenderContext::new(&opts);
        let ta: Vec<String> = a.iter().map(|s| render(&s.expr, &ctx, &fixed_resolver)).collect();
        let tb: Vec<String> = b.iter().map(|s| render(&s.expr, &ctx, &fixed_resolver)).collect();
        assert_eq!(ta, tb);
    }

    #[test]
    fn other_slot_uses_presence_check() {
        let mut q = sample_question();
        q.kind = QuestionKind::SingleSelectWithOther;
        q.other_column = Some("Q1_other".to_string());
        q.options.push(ResponseOption {
            code: "".to_string(),
            label: "Other (specify)".to_string(),
            is_other: true,
            suspect: false,
        });
        let opts = RunOptions::default();
        let synthesized = synthesize_question(&q, &[], &opts);
        let other_count = synthesized
            .iter()
            .find(|s| {
                s.target
                    == Loc::OptionCount {
                        child: None,
                        option: 2,
                    }
            })
            .expect("other count");
        match &other_count.expr {
            Expr::CountMatches { column, code, .. } => {
                assert_eq!(column, "Q1_other");
                assert_eq!(code, "<>");
            }
            other => panic!("unexpected expression {:?}", other),
        }
    }
}
