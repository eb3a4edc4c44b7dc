/*!

This is the long-form manual for `survey_report` and `surveytab`.

## Input formats

The metadata table accompanying a raw survey export can be read from:
* `xlsx` Excel workbooks (the data map worksheet)
* `csv` Comma Separated Values

Both formats carry the same flat layout: one row per raw-table column or
per response option, with the columns

```text
marker, question number, question text, type signature, child sequence, option code, option text, label
```

A row with a non-empty option code or option text describes one response
option; any other row maps one raw-table column. Rows belonging to the
same question share its number, and the column rows carry the question
text and type signature.

### Markers

The `marker` column holds the header of one raw-table column, as written
in row 2 of the raw data worksheet. Markers follow the export's naming
discipline:

* `Q5` the main column of a single-select question
* `Q5_other` the free-text "Other Specify" column of the same question
* `Q7_1`, `Q7_2`, ... the child columns of a matrix or rank-loop question

### Type signatures

The classifier only looks for substrings inside the signature, so the
exact wording of the export does not matter:

| signature contains | kind                 |
|--------------------|----------------------|
| `single select`    | single select        |
| `matrix`           | matrix               |
| `rank`             | rank loop            |
| anything else      | unknown (tab left empty) |

## Generated tabs

One tab is generated per question number in the configured range, named
`Q1`, `Q2` and so on, in ascending order. Each tab holds the question
number in `A1`, the question text in `C2`, the per-option response table
(label, count formula, percentage formula, then a Total row) and the
cross-cut section with one row per filter of the catalog. Matrix and
rank-loop questions repeat the table once per child.

All counting is deferred: the tabs contain `COUNTIFS`-based formulas that
locate their raw column by matching the marker in the raw data header
row, so the output stays correct when raw columns are reordered.

## Cross-cut filters

The catalog is fixed per run: two free filter slots followed by the
demographic taxonomy (gender, six age bands, six employment kinds, four
location kinds). An unbound slot degrades to a pass-through row labeled
`No filter`, so every tab has the same cross-cut shape. Each cross-cut
row shows the filter label, its `column=value` audit text, a validity
marker (1 when the filter matched anything at all) and the per-option
count and percentage bands.

## Configuration

`surveytab` comes with sensible defaults but users may want to bind the
filter slots or adjust the survey conventions. The program accepts a
configuration file in JSON:

```json
{
    "questionNumberRange": [1, 10],
    "otherSuffixToken": "_other",
    "singleSelectToken": "single select",
    "matrixSignatureToken": "matrix",
    "rankLoopSignatureToken": "rank",
    "identityColumn": "record",
    "rawDataRows": 500,
    "filterDefinitions": {
        "filterSlot1": {
            "label": "Owns a car",
            "predicateColumn": "Q3",
            "predicateValue": "1"
        },
        "genderColumn": "S2",
        "ageColumn": "S3",
        "employmentColumn": "S4",
        "locationColumn": "S5"
    }
}
```

Every field is optional and falls back to the default shown by
`RunOptions::default()`. `filterSlot2` takes the same shape as
`filterSlot1`. The demographic columns map the fixed taxonomy onto this
survey's raw table; their predicate values are the 1-based codes of the
taxonomy entries.

 */
