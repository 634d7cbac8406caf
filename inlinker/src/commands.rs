use crate::CLAP_STYLING;
use clap::{arg, command};
use inlinker_core::crawl::MAX_WORKERS;
use inlinker_core::report::{DEFAULT_RESULTS_FILENAME, DEFAULT_TEMPLATE_FILENAME};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("inlinker")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("inlinker")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and progress output").required(false))
        .arg(
            arg!(-v --"verbose" "Log crawl activity to stderr (repeat for more detail)")
                .required(false)
                .action(clap::ArgAction::Count),
        )
        .subcommand_required(false)
        .subcommand(
            command!("scan")
                .about(
                    "Fetch every URL in a keyword sheet and report paragraphs that mention \
                another row's keyword.",
                )
                .arg(
                    arg!(-i --"input" <PATH>)
                        .required(true)
                        .help("CSV or spreadsheet (.xlsx, .xls, .ods) with a keyword column and a URL column"),
                )
                .arg(
                    arg!(-k --"keyword-column" <NAME>)
                        .required(false)
                        .help("Name of the column holding keywords")
                        .default_value("Keyword"),
                )
                .arg(
                    arg!(-u --"url-column" <NAME>)
                        .required(false)
                        .help("Name of the column holding each keyword's URL")
                        .default_value("URL"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help(format!(
                            "Save report to file, e.g. {} (default: display to screen)",
                            DEFAULT_RESULTS_FILENAME
                        )),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: csv, xlsx, json, text (default: from --output extension, else text)")
                        .value_parser(["csv", "xlsx", "json", "text"]),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64).range(1..=120))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"user-agent" <UA>)
                        .required(false)
                        .help("User-Agent header sent with every request (default: desktop Chrome)"),
                )
                .arg(
                    arg!(--"delay-ms" <MILLIS>)
                        .required(false)
                        .help("Minimum delay between requests in milliseconds")
                        .value_parser(clap::value_parser!(u64).range(0..=60_000))
                        .default_value("500"),
                )
                .arg(
                    arg!(-t --"workers" <NUM_WORKERS>)
                        .required(false)
                        .help("Pages fetched concurrently. 1 crawls strictly in order.")
                        .value_parser(clap::value_parser!(u64).range(1..=MAX_WORKERS as u64))
                        .default_value("1"),
                ),
        )
        .subcommand(
            command!("template")
                .about("Write a sample keyword sheet to start from")
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Where to write the template: .xlsx, .csv, or '-' for CSV on stdout")
                        .default_value(DEFAULT_TEMPLATE_FILENAME),
                )
                .arg(
                    arg!(--"force")
                        .required(false)
                        .help("Overwrite an existing file")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
