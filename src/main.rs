use clap::Parser;
use log::{debug, LevelFilter};
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};

use varwalk::cursor::{CursorOptions, TargetCursor};
use varwalk::error::VarwalkError;
use varwalk::reference::IndexedFastaProvider;
use varwalk::report::{write_report_header, write_vcf_header, ReportSink, TextReportSink};
use varwalk::repository::{AlignmentSource, BamAlignmentSource};
use varwalk::samples::load_samples;
use varwalk::settings::{Cli, Settings};
use varwalk::targets::{load_targets, synthesize_targets};

fn main() {
    let cli = Cli::parse();

    let settings = match Settings::new(cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(settings) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(settings: &Settings) -> Result<(), VarwalkError> {
    let stderr_level = if settings.debug || settings.debug2 {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        stderr_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    if settings.record {
        if let Some(log_path) = &settings.log {
            loggers.push(WriteLogger::new(
                LevelFilter::Debug,
                Config::default(),
                File::create(log_path)?,
            ));
        }
    }

    CombinedLogger::init(loggers)
        .map_err(|e| VarwalkError::ConfigError(format!("unable to install logger: {}", e)))
}

fn run(settings: Settings) -> Result<(), VarwalkError> {
    init_logging(&settings)?;

    debug!("opening alignment input file: {}", settings.bam);
    let source = BamAlignmentSource::new(&settings.bam)?;

    debug!("processing fasta reference {}", settings.fasta);
    let reference = IndexedFastaProvider::new(&settings.fasta)?;

    let samples = load_samples(settings.samples.as_deref(), source.header_text())?;
    debug!("found {} samples", samples.len());

    let targets = match &settings.targets {
        Some(path) => load_targets(path, &reference)?,
        None => synthesize_targets(source.reference_table().entries()),
    };
    debug!("number of target regions: {}", targets.len());

    if let Some(path) = &settings.vcf {
        let mut vcf = BufWriter::new(File::create(path)?);
        write_vcf_header(&mut vcf, &settings, &samples)?;
        vcf.flush()?;
    }

    let writer: Box<dyn Write> = match &settings.rpt {
        Some(path) => {
            let mut file = BufWriter::new(File::create(path)?);
            write_report_header(&mut file, &settings)?;
            Box::new(file)
        }
        None => Box::new(io::stdout()),
    };
    let mut sink = TextReportSink::new(writer);

    let options = CursorOptions::from_settings(&settings);
    let mut cursor = TargetCursor::new(source, reference, targets, options)?;

    let mut alleles = Vec::new();
    while cursor.get_next_alleles(&mut alleles)? {
        sink.emit(
            &cursor.current_target().seq_name,
            cursor.position(),
            &alleles,
        )?;
    }

    debug!("no more valid targets, finishing");
    Ok(())
}
