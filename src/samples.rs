use crate::error::VarwalkError;
use crate::settings::SampleNaming;
use log::warn;
use std::fs::File;
use std::io::{BufRead, BufReader};

/// Sample identity derived from a read name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleInfo {
    pub sample_id: String,
}

/// Derive the sample id for a read according to the configured naming scheme.
pub fn extract_sample_info(read_name: &str, naming: SampleNaming, delimiter: &str) -> SampleInfo {
    let sample_id = match naming {
        SampleNaming::Multi => read_name
            .split(delimiter)
            .next()
            .unwrap_or(read_name)
            .to_string(),
        SampleNaming::Single => read_name.to_string(),
    };

    SampleInfo { sample_id }
}

/// Ordered sample ids, either from a sample file or from `@RG` header records.
/// Duplicates are preserved in input order.
pub fn load_samples(
    sample_path: Option<&str>,
    header_text: &str,
) -> Result<Vec<String>, VarwalkError> {
    match sample_path {
        Some(path) => load_sample_file(path),
        None => Ok(samples_from_header(header_text)),
    }
}

/// Every line whose leading non-whitespace token is non-empty contributes
/// that token as a sample id.
fn load_sample_file(path: &str) -> Result<Vec<String>, VarwalkError> {
    let file = File::open(path).map_err(|e| {
        VarwalkError::ConfigError(format!("unable to open sample file {}: {}", path, e))
    })?;

    let mut samples = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if let Some(token) = line.split_whitespace().next() {
            samples.push(token.to_string());
        }
    }

    Ok(samples)
}

/// Scan header lines for read groups. Lines look like
/// `@RG     ID:-    SM:NA11832      CN:BCM  PL:454`; the sample name is the
/// last `:`-component of the third field.
fn samples_from_header(header_text: &str) -> Vec<String> {
    let mut samples = Vec::new();
    for line in header_text.lines() {
        if !line.starts_with("@RG") {
            continue;
        }

        let mut fields = line.split([' ', '\t']).filter(|f| !f.is_empty());
        match fields.nth(2).and_then(|field| field.split(':').next_back()) {
            Some(name) => samples.push(name.to_string()),
            None => warn!("skipping malformed read-group line: {}", line),
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sample_id_from_multiplexed_read_name() {
        let info = extract_sample_info("NA12878-37-1182", SampleNaming::Multi, "-");
        assert_eq!(info.sample_id, "NA12878");
    }

    #[test]
    fn sample_id_from_whole_read_name() {
        let info = extract_sample_info("NA12878-37-1182", SampleNaming::Single, "-");
        assert_eq!(info.sample_id, "NA12878-37-1182");
    }

    #[test]
    fn header_read_groups_in_order_with_duplicates() {
        let header = "@HD\tVN:1.6\tSO:coordinate\n\
                      @SQ\tSN:chr1\tLN:1000\n\
                      @RG\tID:-\tSM:NA11832\tCN:BCM\tPL:454\n\
                      @RG\tID:x\tSM:NA12878\n\
                      @RG\tID:y\tSM:NA11832\n";
        assert_eq!(
            samples_from_header(header),
            vec!["NA11832", "NA12878", "NA11832"]
        );
    }

    #[test]
    fn malformed_read_group_lines_are_skipped() {
        let header = "@RG\tID:only\n@RG\tID:x\tSM:NA12878\n";
        assert_eq!(samples_from_header(header), vec!["NA12878"]);
    }

    #[test]
    fn sample_file_takes_first_token_per_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"NA12878 father\n\nNA12891\n  NA12892\ttrailing\n")
            .unwrap();
        file.flush().unwrap();

        let samples = load_sample_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(samples, vec!["NA12878", "NA12891", "NA12892"]);
    }
}
