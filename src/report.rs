use crate::allele::Allele;
use crate::error::VarwalkError;
use crate::settings::Settings;
use chrono::Local;
use itertools::Itertools;
use std::io::Write;

/// Consumer of the per-position allele vector.
pub trait ReportSink {
    fn emit(
        &mut self,
        seq_name: &str,
        position: usize,
        alleles: &[Allele],
    ) -> Result<(), VarwalkError>;
}

/// Writes one tab-delimited line per observed allele.
pub struct TextReportSink<W: Write> {
    writer: W,
}

impl<W: Write> TextReportSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> ReportSink for TextReportSink<W> {
    fn emit(
        &mut self,
        _seq_name: &str,
        _position: usize,
        alleles: &[Allele],
    ) -> Result<(), VarwalkError> {
        for allele in alleles {
            writeln!(self.writer, "{}", allele)?;
        }
        Ok(())
    }
}

/// Echo every configuration option, one `#   --key = value` line each.
pub fn write_report_header(writer: &mut impl Write, settings: &Settings) -> Result<(), VarwalkError> {
    let opt = |value: &Option<String>| value.clone().unwrap_or_default();

    writeln!(writer, "# Complete list of parameter values:")?;
    writeln!(writer, "#   --bam = {}", settings.bam)?;
    writeln!(writer, "#   --fasta = {}", settings.fasta)?;
    writeln!(writer, "#   --targets = {}", opt(&settings.targets))?;
    writeln!(writer, "#   --samples = {}", opt(&settings.samples))?;
    writeln!(writer, "#   --rpt = {}", opt(&settings.rpt))?;
    writeln!(writer, "#   --vcf = {}", opt(&settings.vcf))?;
    writeln!(writer, "#   --log = {}", opt(&settings.log))?;
    writeln!(writer, "#   --useRefAllele = {}", settings.use_ref_allele)?;
    writeln!(writer, "#   --forceRefAllele = {}", settings.force_ref_allele)?;
    writeln!(writer, "#   --MQR = {}", settings.mqr)?;
    writeln!(writer, "#   --BQR = {}", settings.bqr)?;
    writeln!(writer, "#   --ploidy = {}", settings.ploidy)?;
    writeln!(writer, "#   --sampleNaming = {}", settings.sample_naming)?;
    writeln!(writer, "#   --sampleDel = {}", settings.sample_del)?;
    writeln!(writer, "#   --BQL0 = {}", settings.bql0)?;
    writeln!(writer, "#   --MQL0 = {}", settings.mql0)?;
    writeln!(writer, "#   --BQL1 = {}", settings.bql1)?;
    writeln!(writer, "#   --MQL1 = {}", settings.mql1)?;
    writeln!(writer, "#   --BQL2 = {}", settings.bql2)?;
    writeln!(writer, "#   --RMU = {}", settings.rmu)?;
    writeln!(writer, "#   --delQual = {}", settings.del_qual)?;
    writeln!(writer, "#   --IDW = {}", settings.idw)?;
    writeln!(writer, "#   --TH = {}", settings.th)?;
    writeln!(writer, "#   --PVL = {}", settings.pvl)?;
    writeln!(writer, "#   --algorithm = {}", settings.algorithm)?;
    writeln!(writer, "#   --RDF = {}", settings.rdf)?;
    writeln!(writer, "#   --WB = {}", settings.wb)?;
    writeln!(writer, "#   --TB = {}", settings.tb)?;
    writeln!(writer, "#   --includeMonoB = {}", settings.include_mono_b)?;
    writeln!(writer, "#   --TR = {}", settings.tr)?;
    writeln!(writer, "#   --I = {}", settings.i)?;
    writeln!(writer, "#   --debug = {}", settings.debug)?;
    writeln!(writer, "#   --debug2 = {}", settings.debug2)?;
    writeln!(writer, "#   --record = {}", settings.record)?;
    writeln!(writer, "#")?;
    Ok(())
}

/// Variant-file header: format/date/source/reference/phasing/notes lines,
/// INFO and FORMAT declarations, and the column line ending with the
/// tab-joined sample ids.
pub fn write_vcf_header(
    writer: &mut impl Write,
    settings: &Settings,
    samples: &[String],
) -> Result<(), VarwalkError> {
    let date = Local::now().format("%Y%m%d %H:%M:%S");

    writeln!(writer, "##format=VCFv3.3")?;
    writeln!(writer, "##fileDate={}", date)?;
    writeln!(writer, "##source=varwalk")?;
    writeln!(writer, "##reference={}", settings.fasta)?;
    writeln!(writer, "##phasing=none")?;
    writeln!(
        writer,
        "##notes=\"All FORMAT fields matching *i* (e.g. NiBAll, NiA) refer to individuals.\""
    )?;
    writeln!(writer, "##INFO=NS,1,Integer,\"total number of samples\"")?;
    writeln!(
        writer,
        "##INFO=ND,1,Integer,\"total number of non-duplicate samples\""
    )?;
    writeln!(
        writer,
        "##INFO=DP,1,Integer,\"total read depth at this base\""
    )?;
    writeln!(
        writer,
        "##INFO=AC,1,Integer,\"total number of alternate alleles in called genotypes\""
    )?;
    writeln!(writer, "##FORMAT=GT,1,String,\"Genotype\"")?;
    writeln!(writer, "##FORMAT=GQ,1,Integer,\"Genotype Quality\"")?;
    writeln!(writer, "##FORMAT=DP,1,Integer,\"Read Depth\"")?;
    writeln!(writer, "##FORMAT=HQ,2,Integer,\"Haplotype Quality\"")?;
    writeln!(writer, "##FORMAT=QiB,1,Integer,\"Total base quality\"")?;
    writeln!(
        writer,
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\t{}",
        samples.iter().join("\t")
    )?;
    Ok(())
}
