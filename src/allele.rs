use std::fmt;

/// Phred scores are capped here; beyond this the error probability underflows.
pub const MAX_PHRED: u8 = 93;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlleleKind {
    Snp,
    Insertion,
    Deletion,
    Reference,
}

impl fmt::Display for AlleleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlleleKind::Snp => write!(f, "snp"),
            AlleleKind::Insertion => write!(f, "ins"),
            AlleleKind::Deletion => write!(f, "del"),
            AlleleKind::Reference => write!(f, "ref"),
        }
    }
}

/// An observed sequence variation relative to the reference at a specific
/// position, annotated with provenance and quality.
///
/// Conventions per kind:
/// - Snp: length 1, one reference base against one read base.
/// - Deletion: `alt_bases` empty, `ref_bases` holds the deleted run.
/// - Insertion: `ref_bases` empty, `alt_bases` holds the inserted run;
///   `base_quality` is the joint quality of the inserted bases.
/// - Reference: placeholder observation of the reference base itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allele {
    pub kind: AlleleKind,
    pub seq_name: String,
    /// 1-based start on the reference.
    pub position: usize,
    pub length: usize,
    pub ref_bases: String,
    pub alt_bases: String,
    pub sample_id: String,
    pub forward_strand: bool,
    pub base_quality: u8,
    pub map_quality: u8,
}

impl fmt::Display for Allele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dot = |s: &str| if s.is_empty() { ".".to_string() } else { s.to_string() };
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.seq_name,
            self.position,
            self.kind,
            self.length,
            dot(&self.ref_bases),
            dot(&self.alt_bases),
            dot(&self.sample_id),
            if self.forward_strand { '+' } else { '-' },
            self.base_quality,
            self.map_quality,
        )
    }
}

/// Decode a printable (Phred+33) quality character.
pub fn phred(c: u8) -> u8 {
    c.saturating_sub(33)
}

/// Phred score of the event "at least one of these bases is an error".
///
/// Treats each score as an independent error probability `10^(-q/10)`;
/// the joint score is `-10 log10(1 - prod(1 - p_i))`, rounded, saturated
/// at [`MAX_PHRED`] when the product underflows.
pub fn joint_quality(quals: &[u8]) -> u8 {
    let p_no_error: f64 = quals
        .iter()
        .map(|&q| 1.0 - 10f64.powf(-(f64::from(q)) / 10.0))
        .product();

    let p_any_error = 1.0 - p_no_error;
    if p_any_error <= 0.0 {
        return MAX_PHRED;
    }

    let q = (-10.0 * p_any_error.log10()).round();
    if q >= f64::from(MAX_PHRED) {
        MAX_PHRED
    } else if q <= 0.0 {
        0
    } else {
        q as u8
    }
}
