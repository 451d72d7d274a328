use log::{debug, info, warn};

use rla_cost::builder::Builder;
use rla_cost::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use crate::args::Args;
use crate::audit::config_reader::*;

pub mod config_reader;
mod io_common;
mod io_house;
mod io_mit;
mod io_npr;
mod report;

#[derive(Debug, Snafu)]
pub enum AuditError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Error reading worksheet {sheet} of {path}"))]
    ReadingWorksheet {
        source: calamine::XlsxError,
        path: String,
        sheet: String,
    },
    #[snafu(display("Missing worksheet {sheet} in {path}"))]
    MissingWorksheet { path: String, sheet: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("{path}: line {lineno}: could not read the record"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: u64,
    },
    #[snafu(display("{path}: line {lineno}: malformed row: {message}"))]
    MalformedRow {
        path: String,
        lineno: u64,
        message: String,
    },
    #[snafu(display("Error reading file {path}"))]
    OpeningText {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("{path}: unexpected layout: {message}"))]
    NprLayout { path: String, message: String },
    #[snafu(display("Error opening JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("{path}: invalid data"))]
    InvalidData {
        source: rla_cost::AuditErrors,
        path: String,
    },
    #[snafu(display("Cost estimation failed"))]
    Pipeline { source: rla_cost::AuditErrors },
    #[snafu(display("Error creating directory {path}"))]
    CreatingDir {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing report {path}"))]
    WritingReport { source: csv::Error, path: String },
    #[snafu(display("Error flushing report {path}"))]
    FlushingReport {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("{count} report(s) differ from the reference in {path}"))]
    ReferenceMismatch { count: usize, path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type AuditResult<T> = Result<T, AuditError>;

fn display(p: &Path) -> String {
    p.display().to_string()
}

fn load_sources(settings: &AuditSettings, builder: &mut Builder) -> AuditResult<()> {
    let inputs = &settings.inputs;
    let strict = settings.strict;

    if let Some(p) = &inputs.house_chart {
        info!("Attempting to read House chart {:?}", p);
        let districts =
            io_house::read_house_chart(&display(p), settings.first_year, builder.states(), strict)?;
        info!("Read {} House districts", districts.len());
        for d in districts {
            builder.add_house_district(d);
        }
    }

    if let Some(p) = &inputs.house_results {
        info!("Attempting to read House results {:?}", p);
        let totals =
            io_mit::read_ballots_cast(&display(p), settings.first_year, builder.states(), strict)?;
        info!("Read {} House ballot totals", totals.len());
        for (year, state, ballots) in totals {
            builder.add_ballots_cast(year, state, ballots);
        }
    }

    let statewide = [
        (ContestType::Senate, &inputs.senate_results),
        (ContestType::President, &inputs.president_results),
    ];
    for (contest, path) in statewide {
        if let Some(p) = path {
            info!("Attempting to read {} results {:?}", contest.name(), p);
            let rows = io_mit::read_candidate_votes(
                &display(p),
                contest,
                settings.first_year,
                builder.states(),
                strict,
            )?;
            info!("Read {} {} result rows", rows.len(), contest.name());
            for r in rows {
                builder.add_candidate_votes(contest, r);
            }
        }
    }

    if let Some(p) = &inputs.president_2024 {
        info!("Attempting to read 2024 presidential results {:?}", p);
        let margins = io_npr::read_npr_president(&display(p), builder.states())?;
        info!("Read {} 2024 presidential margins", margins.len());
        for m in margins {
            builder.add_margin(m);
        }
    }
    Ok(())
}

/// Reads all the sources, runs the cost model and writes the reports.
pub fn run_audit(args: &Args) -> AuditResult<()> {
    let settings = resolve_settings(args)?;
    info!("settings: {:?}", settings);

    let states = match &settings.inputs.state_abbreviations {
        Some(p) => io_common::read_state_table(&display(p))?,
        None => StateTable::builtin(),
    };
    debug!("run_audit: {} states", states.len());

    let mut builder = Builder::new(&settings.model, states).context(PipelineSnafu {})?;
    load_sources(&settings, &mut builder)?;

    let estimate = builder.run().context(PipelineSnafu {})?;

    let out_dir = settings.output_directory.clone();
    fs::create_dir_all(&out_dir).context(CreatingDirSnafu {
        path: display(&out_dir),
    })?;
    let written = report::write_reports(&estimate, &out_dir)?;
    info!("Wrote {} reports to {:?}", written.len(), out_dir);

    // The reference reports, if provided for comparison
    if let Some(reference) = &args.reference {
        let ref_dir = PathBuf::from(reference);
        let mismatches = report::compare_with_reference(&out_dir, &ref_dir, &written)?;
        if mismatches > 0 {
            warn!("Found differences with the reference reports");
            return ReferenceMismatchSnafu {
                count: mismatches,
                path: display(&ref_dir),
            }
            .fail();
        }
        info!("All reports match the reference in {:?}", ref_dir);
    }

    Ok(())
}
