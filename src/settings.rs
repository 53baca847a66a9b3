use crate::error::VarwalkError;
use clap::{Parser, ValueEnum};
use std::fmt;

/// Scheme for deriving a sample id from a read name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SampleNaming {
    /// Multiplexed read names: the sample id is the first `sampleDel`-delimited field.
    Multi,
    /// The whole read name is the sample id.
    Single,
}

impl fmt::Display for SampleNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleNaming::Multi => write!(f, "multi"),
            SampleNaming::Single => write!(f, "single"),
        }
    }
}

/// How the base quality of a deletion is combined from its flanking bases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DeletionQuality {
    Max,
    Min,
}

impl fmt::Display for DeletionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletionQuality::Max => write!(f, "max"),
            DeletionQuality::Min => write!(f, "min"),
        }
    }
}

#[derive(Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Alignment file path. Must be coordinate-sorted and indexed (.bai in the same directory).
    #[arg(value_name = "BAM")]
    pub bam: String,

    /// Indexed FASTA reference (.fai in the same directory).
    #[arg(short = 'f', long = "fasta", value_name = "PATH")]
    pub fasta: String,

    /// Target file: whitespace/tab-delimited `seq left right [desc]` lines,
    /// 1-based, right-exclusive. Defaults to one target per reference sequence.
    #[arg(short = 't', long = "targets", value_name = "PATH")]
    pub targets: Option<String>,

    /// Sample file: one sample id per line (first whitespace-delimited token).
    /// Defaults to sample names parsed from @RG header records.
    #[arg(short = 's', long = "samples", value_name = "PATH")]
    pub samples: Option<String>,

    /// Report output file.
    #[arg(long = "rpt", value_name = "PATH")]
    pub rpt: Option<String>,

    /// Variant output file (header only; calling is downstream).
    #[arg(long = "vcf", value_name = "PATH")]
    pub vcf: Option<String>,

    /// Log file, written when --record is set.
    #[arg(long = "log", value_name = "PATH")]
    pub log: Option<String>,

    /// Include the reference as an allele at covered positions.
    #[arg(long = "useRefAllele")]
    pub use_ref_allele: bool,

    /// Always include the reference allele, even when unobserved.
    #[arg(long = "forceRefAllele")]
    pub force_ref_allele: bool,

    /// Mapping quality assigned to reference-allele placeholders.
    #[arg(long = "MQR", default_value_t = 100)]
    pub mqr: u8,

    /// Base quality assigned to reference-allele placeholders.
    #[arg(long = "BQR", default_value_t = 60)]
    pub bqr: u8,

    #[arg(long = "ploidy", default_value_t = 2)]
    pub ploidy: u32,

    /// Scheme for deriving sample ids from read names.
    #[arg(long = "sampleNaming", value_enum, default_value_t = SampleNaming::Multi)]
    pub sample_naming: SampleNaming,

    /// Delimiter used by the sample-naming scheme.
    #[arg(long = "sampleDel", default_value = "-")]
    pub sample_del: String,

    #[arg(long = "BQL0", default_value_t = 40)]
    pub bql0: u8,

    #[arg(long = "MQL0", default_value_t = 40)]
    pub mql0: u8,

    #[arg(long = "BQL1", default_value_t = 30)]
    pub bql1: u8,

    #[arg(long = "MQL1", default_value_t = 20)]
    pub mql1: u8,

    /// Base-quality threshold for emitting SNP, insertion and deletion alleles.
    #[arg(long = "BQL2", default_value_t = 10)]
    pub bql2: u8,

    /// Maximum mismatches per alignment; alignments exceeding it contribute no alleles.
    #[arg(long = "RMU", default_value_t = 10_000_000)]
    pub rmu: u32,

    #[arg(long = "IDW", default_value_t = 0)]
    pub idw: i32,

    #[arg(long = "TH", default_value_t = 1e-3)]
    pub th: f64,

    #[arg(long = "PVL", default_value_t = 0.0)]
    pub pvl: f64,

    #[arg(long = "algorithm", default_value = "banded")]
    pub algorithm: String,

    #[arg(long = "RDF", default_value_t = 0.9)]
    pub rdf: f64,

    #[arg(long = "WB", default_value_t = 2)]
    pub wb: i32,

    #[arg(long = "TB", default_value_t = 1)]
    pub tb: i32,

    #[arg(long = "includeMonoB")]
    pub include_mono_b: bool,

    #[arg(long = "TR", default_value_t = 6)]
    pub tr: i32,

    #[arg(long = "I", default_value_t = 0)]
    pub i: i32,

    /// Combiner for deletion flanking-base qualities.
    #[arg(long = "delQual", value_enum, default_value_t = DeletionQuality::Max)]
    pub del_qual: DeletionQuality,

    /// Trace progress to stderr.
    #[arg(long)]
    pub debug: bool,

    /// Trace per-target detail to stderr.
    #[arg(long)]
    pub debug2: bool,

    /// Record progress traces into the log file.
    #[arg(long)]
    pub record: bool,
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bam: String,
    pub fasta: String,
    pub targets: Option<String>,
    pub samples: Option<String>,
    pub rpt: Option<String>,
    pub vcf: Option<String>,
    pub log: Option<String>,

    pub use_ref_allele: bool,
    pub force_ref_allele: bool,
    pub mqr: u8,
    pub bqr: u8,
    pub ploidy: u32,
    pub sample_naming: SampleNaming,
    pub sample_del: String,
    pub bql0: u8,
    pub mql0: u8,
    pub bql1: u8,
    pub mql1: u8,
    pub bql2: u8,
    pub rmu: u32,
    pub idw: i32,
    pub th: f64,
    pub pvl: f64,
    pub algorithm: String,
    pub rdf: f64,
    pub wb: i32,
    pub tb: i32,
    pub include_mono_b: bool,
    pub tr: i32,
    pub i: i32,
    pub del_qual: DeletionQuality,
    pub debug: bool,
    pub debug2: bool,
    pub record: bool,
}

impl Settings {
    pub fn new(cli: Cli) -> Result<Self, VarwalkError> {
        if cli.record && cli.log.is_none() {
            return Err(VarwalkError::CliError(
                "--record requires --log <PATH>".to_string(),
            ));
        }

        if cli.sample_del.is_empty() {
            return Err(VarwalkError::CliError(
                "--sampleDel cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            bam: cli.bam,
            fasta: cli.fasta,
            targets: cli.targets,
            samples: cli.samples,
            rpt: cli.rpt,
            vcf: cli.vcf,
            log: cli.log,
            use_ref_allele: cli.use_ref_allele || cli.force_ref_allele,
            force_ref_allele: cli.force_ref_allele,
            mqr: cli.mqr,
            bqr: cli.bqr,
            ploidy: cli.ploidy,
            sample_naming: cli.sample_naming,
            sample_del: cli.sample_del,
            bql0: cli.bql0,
            mql0: cli.mql0,
            bql1: cli.bql1,
            mql1: cli.mql1,
            bql2: cli.bql2,
            rmu: cli.rmu,
            idw: cli.idw,
            th: cli.th,
            pvl: cli.pvl,
            algorithm: cli.algorithm,
            rdf: cli.rdf,
            wb: cli.wb,
            tb: cli.tb,
            include_mono_b: cli.include_mono_b,
            tr: cli.tr,
            i: cli.i,
            del_qual: cli.del_qual,
            debug: cli.debug,
            debug2: cli.debug2,
            record: cli.record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(args)
    }

    #[test]
    fn record_requires_log() {
        let cli = parse(&["varwalk", "a.bam", "-f", "ref.fa", "--record"]);
        assert!(Settings::new(cli).is_err());
    }

    #[test]
    fn defaults() {
        let cli = parse(&["varwalk", "a.bam", "-f", "ref.fa"]);
        let settings = Settings::new(cli).unwrap();
        assert_eq!(settings.bql2, 10);
        assert_eq!(settings.sample_del, "-");
        assert_eq!(settings.sample_naming, SampleNaming::Multi);
        assert_eq!(settings.del_qual, DeletionQuality::Max);
        assert!(!settings.use_ref_allele);
    }

    #[test]
    fn force_implies_use() {
        let cli = parse(&["varwalk", "a.bam", "-f", "ref.fa", "--forceRefAllele"]);
        let settings = Settings::new(cli).unwrap();
        assert!(settings.use_ref_allele);
    }
}
