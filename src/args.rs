use clap::Parser;

/// This is a monitor of the digitalization survey of the Chilean municipalities.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file with the location of the sources and the timeouts.
    /// For more information about the file format, read the manual of the muni_digital crate.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path, optional) If specified, the survey is read from this file instead of being
    /// downloaded. Setting this option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (csv or xlsx, default from the file extension) The type of the input file.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default: first worksheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (URL, optional) The address of the survey CSV.
    #[clap(long, value_parser)]
    pub survey_url: Option<String>,

    /// (directory, optional) If specified, the DPA tables are read from the files comunas.json,
    /// provincias.json and regiones.json in this directory instead of the DPA API.
    #[clap(long, value_parser)]
    pub geo_dir: Option<String>,

    /// (region name, optional) Restricts the report to this region and adds the regional explorer.
    #[clap(long, value_parser)]
    pub region: Option<String>,

    /// (municipality name, optional) Adds the profile of this municipality to the explorer.
    /// The name must be written exactly as in the survey.
    #[clap(short, long, value_parser)]
    pub municipality: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the report will be written in JSON format to the given
    /// location. Otherwise it is printed on the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing a report in JSON format. If provided, munimonitor will
    /// check that the computed report matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard error.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
