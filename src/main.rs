mod attendance;
mod format;
mod query;
mod table;

use attendance::Attendee;
use clap::Parser;
use format::Template;
use std::path::PathBuf;
use std::process::ExitCode;
use table::Encoding;

#[derive(Parser)]
#[command(
    name = "mstatq",
    about = "Process a Microsoft Teams meeting attendance tsv."
)]
struct Cli {
    #[arg(help = "tsv file to process")]
    file: PathBuf,

    #[arg(help = "filter query string")]
    query: Option<String>,

    #[arg(
        long,
        env = "MSTATQ_ENCODING",
        default_value = "utf-8",
        help = "use an alternate encoding"
    )]
    encoding: Encoding,

    #[arg(long, help = "use utf-16 encoding")]
    utf16: bool,

    #[arg(
        short,
        long,
        env = "MSTATQ_FORMAT",
        default_value = "{name}",
        help = "set format string for each line"
    )]
    format: String,

    #[arg(short, long, help = "show debug logging and query error details")]
    verbose: bool,
}

fn init_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let template = match Template::parse(&cli.format) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Format error: {}", e);
            return ExitCode::from(2);
        }
    };

    let predicate = match query::compile(cli.query.as_deref().unwrap_or("")) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Invalid query entered!");
            if cli.verbose {
                eprintln!("{}", e);
            }
            return ExitCode::from(2);
        }
    };

    let encoding = if cli.utf16 {
        Encoding::Utf16
    } else {
        cli.encoding
    };

    let attendees = match table::read_attendance_file(&cli.file, encoding) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    run_query_mode(&attendees, &predicate, &template)
}

fn run_query_mode(
    attendees: &[Attendee],
    predicate: &query::Predicate,
    template: &Template,
) -> ExitCode {
    let mut selected = Vec::new();
    for attendee in attendees {
        match predicate.evaluate(attendee) {
            Ok(true) => selected.push(attendee),
            Ok(false) => {}
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(2);
            }
        }
    }

    log::info!("{} of {} attendees matched", selected.len(), attendees.len());

    for attendee in &selected {
        println!("{}", template.render(*attendee));
    }

    if selected.is_empty() {
        ExitCode::from(1)
    } else {
        ExitCode::from(0)
    }
}
