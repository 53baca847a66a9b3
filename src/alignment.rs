use crate::error::VarwalkError;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::RecordBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarKind {
    Match,
    Insertion,
    Deletion,
    SoftClip,
    Skip,
    HardClip,
    Pad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub kind: CigarKind,
    pub len: usize,
}

impl CigarOp {
    pub fn new(kind: CigarKind, len: usize) -> Self {
        Self { kind, len }
    }
}

/// Whether the operation consumes reference.
/// Yes: M/D/N/=/X. No: I/S/H/P.
/// See: https://samtools.github.io/hts-specs/SAMv1.pdf
pub fn consumes_reference(kind: CigarKind) -> bool {
    matches!(
        kind,
        CigarKind::Match | CigarKind::Deletion | CigarKind::Skip
    )
}

/// Whether the operation consumes read bases.
/// Yes: M/I/S/=/X. No: D/N/H/P.
pub fn consumes_read(kind: CigarKind) -> bool {
    matches!(
        kind,
        CigarKind::Match | CigarKind::Insertion | CigarKind::SoftClip
    )
}

/// An alignment as consumed by the registration pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub name: String,

    /// Read bases, ASCII.
    pub query_bases: Vec<u8>,

    /// Per-base Phred scores, printable (+33) encoding.
    pub qualities: Vec<u8>,

    pub ref_id: usize,

    /// 0-based inclusive start on the reference.
    pub ref_start: usize,

    /// Reference span of the cigar.
    pub length: usize,

    pub cigar: Vec<CigarOp>,

    pub is_mapped: bool,
    pub is_reverse_strand: bool,
    pub map_quality: u8,
}

impl Alignment {
    /// 1-based position of the first aligned base.
    pub fn start_1based(&self) -> usize {
        self.ref_start + 1
    }

    /// 1-based inclusive end on the reference.
    pub fn end_1based(&self) -> usize {
        self.ref_start + self.length
    }

    /// Convert a decoded BAM record. Returns `Ok(None)` for records without
    /// a reference placement (they carry nothing registrable).
    pub fn from_record_buf(record: &RecordBuf) -> Result<Option<Self>, VarwalkError> {
        let (Some(ref_id), Some(start)) = (record.reference_sequence_id(), record.alignment_start())
        else {
            return Ok(None);
        };

        let name = record
            .name()
            .map(|n| n.to_string())
            .unwrap_or_default();

        let query_bases = record.sequence().as_ref().to_vec();
        let qualities: Vec<u8> = record
            .quality_scores()
            .as_ref()
            .iter()
            .map(|&q| q.saturating_add(33))
            .collect();

        if query_bases.len() != qualities.len() {
            return Err(VarwalkError::InvalidAlignment(format!(
                "read {}: {} bases but {} quality scores",
                name,
                query_bases.len(),
                qualities.len()
            )));
        }

        let mut cigar = Vec::new();
        for op in record.cigar().as_ref() {
            if op.len() == 0 {
                return Err(VarwalkError::InvalidAlignment(format!(
                    "read {}: zero-length cigar operation",
                    name
                )));
            }
            let kind = match op.kind() {
                Kind::Match | Kind::SequenceMatch | Kind::SequenceMismatch => CigarKind::Match,
                Kind::Insertion => CigarKind::Insertion,
                Kind::Deletion => CigarKind::Deletion,
                Kind::SoftClip => CigarKind::SoftClip,
                Kind::Skip => CigarKind::Skip,
                Kind::HardClip => CigarKind::HardClip,
                Kind::Pad => CigarKind::Pad,
            };
            cigar.push(CigarOp::new(kind, op.len()));
        }

        let length = reference_span(&cigar);
        let flags = record.flags();

        Ok(Some(Self {
            name,
            query_bases,
            qualities,
            ref_id,
            ref_start: usize::from(start) - 1,
            length,
            cigar,
            is_mapped: !flags.is_unmapped(),
            is_reverse_strand: flags.is_reverse_complemented(),
            map_quality: record.mapping_quality().map(u8::from).unwrap_or(0),
        }))
    }
}

/// Total reference length consumed by a cigar.
pub fn reference_span(cigar: &[CigarOp]) -> usize {
    cigar
        .iter()
        .filter(|op| consumes_reference(op.kind))
        .map(|op| op.len)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_span_counts_m_d_n_only() {
        let cigar = vec![
            CigarOp::new(CigarKind::SoftClip, 5),
            CigarOp::new(CigarKind::Match, 10),
            CigarOp::new(CigarKind::Insertion, 2),
            CigarOp::new(CigarKind::Deletion, 3),
            CigarOp::new(CigarKind::Skip, 7),
            CigarOp::new(CigarKind::Match, 4),
            CigarOp::new(CigarKind::HardClip, 1),
        ];
        assert_eq!(reference_span(&cigar), 10 + 3 + 7 + 4);
    }

    #[test]
    fn coordinate_accessors() {
        let alignment = Alignment {
            name: "r1".to_string(),
            query_bases: b"ACGT".to_vec(),
            qualities: b"IIII".to_vec(),
            ref_id: 0,
            ref_start: 9,
            length: 4,
            cigar: vec![CigarOp::new(CigarKind::Match, 4)],
            is_mapped: true,
            is_reverse_strand: false,
            map_quality: 60,
        };
        assert_eq!(alignment.start_1based(), 10);
        assert_eq!(alignment.end_1based(), 13);
    }
}
