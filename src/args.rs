use clap::Parser;

/// This is a survey cross-tab report synthesizer.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The run configuration in JSON format: question range,
    /// survey conventions and filter slot bindings. For more information about the
    /// file format, read the documentation at
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference file containing a previously generated summary in JSON format.
    /// If provided, surveytab will check that the synthesized output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the report will be written
    /// in JSON format to the given location. Setting this option overrides the path that may
    /// be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) The metadata table describing the survey's raw columns and
    /// response options. Setting this option overrides what may be specified with the
    /// --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default inferred from the extension) The type of the metadata input, `xlsx` or `csv`.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default first worksheet) When using an Excel file, indicates the name of the
    /// worksheet holding the metadata table.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
