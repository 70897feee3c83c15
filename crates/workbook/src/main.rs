// probe-workbook - generate the thread-safety test workbook from CSV sheets

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use gridprobe_workbook::{build, default_layout};

#[derive(Parser)]
#[command(name = "probe-workbook")]
#[command(about = "Generate the probe test workbook from CSV sheet definitions")]
#[command(version)]
struct Cli {
    /// Directory containing the CSV sheet files
    #[arg(long, default_value = ".")]
    csv_dir: PathBuf,

    /// Output .xlsx path
    #[arg(long, default_value = "probe-tests.xlsx")]
    out: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match build(&cli.csv_dir, &default_layout(), &cli.out) {
        Ok(report) => {
            for skipped in &report.skipped {
                eprintln!("warning: CSV not found, sheet skipped: {skipped}");
            }
            println!("{}", report.log_line());
            println!("saved: {}", cli.out.display());
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
