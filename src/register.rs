use crate::alignment::{consumes_read, Alignment, CigarKind};
use crate::allele::{joint_quality, phred, Allele, AlleleKind};
use crate::samples::extract_sample_info;
use crate::settings::{DeletionQuality, SampleNaming, Settings};
use crate::targets::Target;
use log::debug;

/// The subset of the configuration the classifier consumes.
#[derive(Debug, Clone)]
pub struct RegisterOptions {
    pub bql2: u8,
    pub sample_naming: SampleNaming,
    pub sample_del: String,
    pub del_qual: DeletionQuality,
}

impl RegisterOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            bql2: settings.bql2,
            sample_naming: settings.sample_naming,
            sample_del: settings.sample_del.clone(),
            del_qual: settings.del_qual,
        }
    }
}

/// An alignment paired with the allele observations extracted against the
/// current target's reference substring.
#[derive(Debug, Clone)]
pub struct RegisteredAlignment {
    pub alignment: Alignment,
    pub alleles: Vec<Allele>,
    pub mismatches: u32,
}

/// The three parallel coordinates walked across an alignment:
/// `sp` (1-based reference), `ssp` (0-based into the target subsequence,
/// where index 0 is the base at `target.left`), `rp` (0-based read).
///
/// Invariant after every operation: `sp == target.left + ssp`.
struct OpCursor {
    sp: usize,
    ssp: usize,
    rp: usize,
}

impl OpCursor {
    fn check(&self, left: usize) {
        debug_assert_eq!(self.sp, left + self.ssp);
    }
}

/// Classify one alignment against the current target and its reference
/// substring, emitting the deviating allele observations.
///
/// The substring's base 0 sits at 1-based position `target.left`. Alignment
/// parts outside `[target.left, target.right)` are trimmed away in whole
/// cigar operations before the walk. Out-of-bounds indexing caused by a
/// malformed alignment skips the offending operation rather than failing the
/// registration.
pub fn register_alignment(
    alignment: Alignment,
    target: &Target,
    subsequence: &[u8],
    options: &RegisterOptions,
) -> RegisteredAlignment {
    let sample =
        extract_sample_info(&alignment.name, options.sample_naming, &options.sample_del).sample_id;
    let forward_strand = !alignment.is_reverse_strand;

    let mut alleles: Vec<Allele> = Vec::new();
    let mut mismatches: u32 = 0;

    let mut sp = alignment.ref_start + 1;
    let mut rp: usize = 0;
    let mut ssp = sp as i64 - target.left as i64;

    // Trim cigar operations ahead of the target. The op containing the trim
    // boundary is consumed whole from the bumped coordinates.
    let mut op_start = 0;
    let left_gap = target.left as i64 - sp as i64;
    if left_gap > 0 {
        let left_gap = left_gap as usize;
        sp += left_gap;
        rp += left_gap;
        ssp += left_gap as i64;

        let mut consumed = 0;
        while let Some(op) = alignment.cigar.get(op_start) {
            let read_len = if consumes_read(op.kind) { op.len } else { 0 };
            if consumed + read_len < rp {
                consumed += read_len;
                op_start += 1;
            } else {
                break;
            }
        }
    }
    let mut cursor = OpCursor {
        sp,
        ssp: ssp.max(0) as usize,
        rp,
    };

    // Trim cigar operations after the target, dropping whole trailing ops
    // while the effective end stays beyond the right bound.
    let mut op_end = alignment.cigar.len();
    let right_gap = alignment.end_1based() as i64 - (target.right as i64 - 1);
    if right_gap > 0 {
        let mut end_pos = alignment.end_1based();
        while op_end > op_start {
            let op = alignment.cigar[op_end - 1];
            if end_pos.saturating_sub(op.len) > target.right {
                end_pos -= op.len;
                op_end -= 1;
            } else {
                break;
            }
        }
    }

    for op in &alignment.cigar[op_start..op_end] {
        match op.kind {
            CigarKind::SoftClip => {
                cursor.rp += op.len;
            }

            CigarKind::Match => {
                let mut i = 0;
                while i < op.len && cursor.sp < target.right {
                    match (
                        alignment.query_bases.get(cursor.rp),
                        alignment.qualities.get(cursor.rp),
                        subsequence.get(cursor.ssp),
                    ) {
                        (Some(&b), Some(&qc), Some(&ref_base)) => {
                            let qual = phred(qc);
                            if b != ref_base && qual >= options.bql2 {
                                mismatches += 1;
                                alleles.push(Allele {
                                    kind: AlleleKind::Snp,
                                    seq_name: target.seq_name.clone(),
                                    position: cursor.sp,
                                    length: 1,
                                    ref_bases: (ref_base as char).to_string(),
                                    alt_bases: (b as char).to_string(),
                                    sample_id: sample.clone(),
                                    forward_strand,
                                    base_quality: qual,
                                    map_quality: alignment.map_quality,
                                });
                            }
                        }
                        _ => {
                            debug!(
                                "read {}: match base at rp {} out of bounds, skipping",
                                alignment.name, cursor.rp
                            );
                        }
                    }

                    cursor.sp += 1;
                    cursor.ssp += 1;
                    cursor.rp += 1;
                    i += 1;
                }
            }

            CigarKind::Deletion => {
                let flanking = (
                    alignment.qualities.get(cursor.rp),
                    alignment.qualities.get(cursor.rp + 1),
                );
                let deleted = subsequence.get(cursor.ssp..cursor.ssp + op.len);

                match (flanking, deleted) {
                    ((Some(&left), Some(&right)), Some(deleted)) => {
                        let (q_left, q_right) = (phred(left), phred(right));
                        let qual = match options.del_qual {
                            DeletionQuality::Max => q_left.max(q_right),
                            DeletionQuality::Min => q_left.min(q_right),
                        };
                        if qual >= options.bql2 && cursor.sp < target.right {
                            alleles.push(Allele {
                                kind: AlleleKind::Deletion,
                                seq_name: target.seq_name.clone(),
                                position: cursor.sp,
                                length: op.len,
                                ref_bases: String::from_utf8_lossy(deleted).into_owned(),
                                alt_bases: String::new(),
                                sample_id: sample.clone(),
                                forward_strand,
                                base_quality: qual,
                                map_quality: alignment.map_quality,
                            });
                        }
                    }
                    _ => {
                        debug!(
                            "read {}: deletion at sp {} out of bounds, skipping",
                            alignment.name, cursor.sp
                        );
                    }
                }

                cursor.sp += op.len;
                cursor.ssp += op.len;
            }

            CigarKind::Insertion => {
                let inserted = alignment.query_bases.get(cursor.rp..cursor.rp + op.len);
                let quals = alignment.qualities.get(cursor.rp..cursor.rp + op.len);

                match (inserted, quals) {
                    (Some(inserted), Some(quals)) => {
                        let quals: Vec<u8> = quals.iter().map(|&c| phred(c)).collect();
                        let qual = joint_quality(&quals);
                        if qual >= options.bql2 && cursor.sp < target.right {
                            alleles.push(Allele {
                                kind: AlleleKind::Insertion,
                                seq_name: target.seq_name.clone(),
                                position: cursor.sp,
                                length: op.len,
                                ref_bases: String::new(),
                                alt_bases: String::from_utf8_lossy(inserted).into_owned(),
                                sample_id: sample.clone(),
                                forward_strand,
                                base_quality: qual,
                                map_quality: alignment.map_quality,
                            });
                        }
                    }
                    _ => {
                        debug!(
                            "read {}: insertion at rp {} out of bounds, skipping",
                            alignment.name, cursor.rp
                        );
                    }
                }

                cursor.rp += op.len;
            }

            CigarKind::Skip => {
                cursor.sp += op.len;
                cursor.ssp += op.len;
            }

            CigarKind::HardClip | CigarKind::Pad => {}
        }

        cursor.check(target.left);
    }

    RegisteredAlignment {
        alignment,
        alleles,
        mismatches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{CigarOp, reference_span};
    use rstest::rstest;

    const REF: &[u8] = b"ACGTACGT";

    fn target(left: usize, right: usize) -> Target {
        Target {
            seq_name: "chr1".to_string(),
            left,
            right,
            desc: String::new(),
        }
    }

    fn subsequence(target: &Target) -> Vec<u8> {
        REF[target.left - 1..target.right - 1].to_vec()
    }

    fn options() -> RegisterOptions {
        RegisterOptions {
            bql2: 20,
            sample_naming: SampleNaming::Multi,
            sample_del: "-".to_string(),
            del_qual: DeletionQuality::Max,
        }
    }

    fn aln(ref_start: usize, bases: &[u8], quals: &[u8], cigar: Vec<CigarOp>) -> Alignment {
        Alignment {
            name: "NA12878-1".to_string(),
            query_bases: bases.to_vec(),
            qualities: quals.to_vec(),
            ref_id: 0,
            ref_start,
            length: reference_span(&cigar),
            cigar,
            is_mapped: true,
            is_reverse_strand: false,
            map_quality: 60,
        }
    }

    fn m(len: usize) -> CigarOp {
        CigarOp::new(CigarKind::Match, len)
    }

    #[test]
    fn pure_match_emits_nothing() {
        let target = target(1, 9);
        let alignment = aln(0, b"ACGTACGT", b"IIIIIIII", vec![m(8)]);
        let ra = register_alignment(alignment, &target, &subsequence(&target), &options());
        assert!(ra.alleles.is_empty());
        assert_eq!(ra.mismatches, 0);
    }

    #[test]
    fn single_mismatch_emits_one_snp() {
        let target = target(1, 9);
        // C -> T at 1-based position 6.
        let alignment = aln(0, b"ACGTATGT", b"IIIIIIII", vec![m(8)]);
        let ra = register_alignment(alignment, &target, &subsequence(&target), &options());

        assert_eq!(ra.mismatches, 1);
        assert_eq!(ra.alleles.len(), 1);
        let allele = &ra.alleles[0];
        assert_eq!(allele.kind, AlleleKind::Snp);
        assert_eq!(allele.seq_name, "chr1");
        assert_eq!(allele.position, 6);
        assert_eq!(allele.length, 1);
        assert_eq!(allele.ref_bases, "C");
        assert_eq!(allele.alt_bases, "T");
        assert_eq!(allele.sample_id, "NA12878");
        assert!(allele.forward_strand);
        assert_eq!(allele.base_quality, 40);
        assert_eq!(allele.map_quality, 60);
    }

    #[test]
    fn deletion_emitted_once_at_first_deleted_base() {
        let target = target(1, 9);
        let alignment = aln(
            0,
            b"ACGACGT",
            b"IIIIIII",
            vec![m(3), CigarOp::new(CigarKind::Deletion, 1), m(4)],
        );
        let ra = register_alignment(alignment, &target, &subsequence(&target), &options());

        assert_eq!(ra.mismatches, 0);
        assert_eq!(ra.alleles.len(), 1);
        let allele = &ra.alleles[0];
        assert_eq!(allele.kind, AlleleKind::Deletion);
        assert_eq!(allele.position, 4);
        assert_eq!(allele.length, 1);
        assert_eq!(allele.ref_bases, "T");
        assert_eq!(allele.alt_bases, "");
        assert_eq!(allele.base_quality, 40);
    }

    #[test]
    fn insertion_emitted_at_current_reference_position() {
        let target = target(1, 9);
        let alignment = aln(
            0,
            b"ACGNTACGT",
            b"IIIIIIIII",
            vec![m(3), CigarOp::new(CigarKind::Insertion, 1), m(5)],
        );
        let ra = register_alignment(alignment, &target, &subsequence(&target), &options());

        assert_eq!(ra.mismatches, 0);
        assert_eq!(ra.alleles.len(), 1);
        let allele = &ra.alleles[0];
        assert_eq!(allele.kind, AlleleKind::Insertion);
        assert_eq!(allele.position, 4);
        assert_eq!(allele.length, 1);
        assert_eq!(allele.ref_bases, "");
        assert_eq!(allele.alt_bases, "N");
        assert_eq!(allele.base_quality, 40);
    }

    #[test]
    fn multi_base_insertion_uses_joint_quality() {
        let target = target(1, 9);
        // Two inserted bases at Phred 20 each: joint quality 17.
        let alignment = aln(
            0,
            b"ACGNNTACGT",
            b"III55IIIII",
            vec![m(3), CigarOp::new(CigarKind::Insertion, 2), m(5)],
        );
        let ra = register_alignment(alignment, &target, &subsequence(&target), &options());

        assert_eq!(ra.alleles.len(), 1);
        assert_eq!(ra.alleles[0].alt_bases, "NN");
        assert_eq!(ra.alleles[0].length, 2);
        assert_eq!(ra.alleles[0].base_quality, 17);
    }

    #[rstest]
    // Phred 19 (`4`) sits below the threshold of 20; nothing is reported.
    #[case(b"ACGTATGT", b"IIIII4II", 0)]
    // Phred 20 (`5`) is at the threshold and is reported.
    #[case(b"ACGTATGT", b"IIIII5II", 1)]
    fn snp_gated_by_base_quality(
        #[case] bases: &[u8],
        #[case] quals: &[u8],
        #[case] expected: usize,
    ) {
        let target = target(1, 9);
        let alignment = aln(0, bases, quals, vec![m(8)]);
        let ra = register_alignment(alignment, &target, &subsequence(&target), &options());
        assert_eq!(ra.alleles.len(), expected);
        assert_eq!(ra.mismatches as usize, expected);
    }

    #[rstest]
    #[case(DeletionQuality::Max, 40)]
    #[case(DeletionQuality::Min, 20)]
    fn deletion_quality_combiner(#[case] del_qual: DeletionQuality, #[case] expected: u8) {
        let target = target(1, 9);
        // Flanking qualities 20 (`5`) and 40 (`I`).
        let alignment = aln(
            0,
            b"ACGACGT",
            b"III5III",
            vec![m(3), CigarOp::new(CigarKind::Deletion, 1), m(4)],
        );
        let ra = register_alignment(
            alignment,
            &target,
            &subsequence(&target),
            &RegisterOptions {
                del_qual,
                ..options()
            },
        );
        assert_eq!(ra.alleles.len(), 1);
        assert_eq!(ra.alleles[0].base_quality, expected);
    }

    #[test]
    fn leading_soft_clip_shifts_read_position_only() {
        let target = target(1, 9);
        // Two clipped bases, then the same single mismatch at position 6.
        let alignment = aln(
            0,
            b"GGACGTATGT",
            b"IIIIIIIIII",
            vec![CigarOp::new(CigarKind::SoftClip, 2), m(8)],
        );
        let ra = register_alignment(alignment, &target, &subsequence(&target), &options());
        assert_eq!(ra.alleles.len(), 1);
        assert_eq!(ra.alleles[0].position, 6);
        assert_eq!(ra.alleles[0].alt_bases, "T");
    }

    #[test]
    fn skip_advances_reference_but_not_read() {
        let target = target(1, 9);
        // 3M 2N 3M: read bases ACG + CGT, mismatch in the second block.
        let alignment = aln(
            0,
            b"ACGCTT",
            b"IIIIII",
            vec![m(3), CigarOp::new(CigarKind::Skip, 2), m(3)],
        );
        // Reference block after the skip is ACGTA|CGT -> positions 6..8 = CGT;
        // read has CTT: mismatch at position 7 (G -> T).
        let ra = register_alignment(alignment, &target, &subsequence(&target), &options());
        assert_eq!(ra.alleles.len(), 1);
        assert_eq!(ra.alleles[0].position, 7);
        assert_eq!(ra.alleles[0].ref_bases, "G");
        assert_eq!(ra.alleles[0].alt_bases, "T");
    }

    #[test]
    fn left_trim_confines_observations_to_the_target() {
        // The same spanning read registered against a later target reports
        // only the in-target part.
        let target = target(6, 9);
        // Mismatch at 1-based position 7 (read index 6).
        let alignment = aln(0, b"ACGTACTT", b"IIIIIIII", vec![m(8)]);
        let ra = register_alignment(alignment, &target, &subsequence(&target), &options());

        assert_eq!(ra.alleles.len(), 1);
        assert_eq!(ra.alleles[0].position, 7);
        assert_eq!(ra.alleles[0].ref_bases, "G");
        assert_eq!(ra.alleles[0].alt_bases, "T");
    }

    #[test]
    fn match_loop_stops_at_right_bound() {
        let target = target(1, 5);
        // Mismatches at positions 2 and 6; only the first is inside [1, 5).
        let alignment = aln(0, b"AGGTATGT", b"IIIIIIII", vec![m(8)]);
        let ra = register_alignment(alignment, &target, &REF[0..4], &options());
        assert_eq!(ra.alleles.len(), 1);
        assert_eq!(ra.alleles[0].position, 2);
    }

    #[test]
    fn deletion_at_read_end_is_skipped_not_fatal() {
        let target = target(1, 9);
        let alignment = aln(
            0,
            b"ACG",
            b"III",
            vec![m(3), CigarOp::new(CigarKind::Deletion, 2)],
        );
        let ra = register_alignment(alignment, &target, &subsequence(&target), &options());
        assert!(ra.alleles.is_empty());
    }

    #[test]
    fn classification_is_idempotent() {
        let target = target(1, 9);
        let alignment = aln(0, b"ACGTATGT", b"IIIIIIII", vec![m(8)]);
        let first = register_alignment(
            alignment.clone(),
            &target,
            &subsequence(&target),
            &options(),
        );
        let second = register_alignment(alignment, &target, &subsequence(&target), &options());
        assert_eq!(first.alleles, second.alleles);
        assert_eq!(first.mismatches, second.mismatches);
    }

    #[test]
    fn eleven_mismatches_counted() {
        let target = Target {
            seq_name: "chr1".to_string(),
            left: 1,
            right: 13,
            desc: String::new(),
        };
        let reference = b"AAAAAAAAAAAA";
        let alignment = aln(0, b"CCCCCCCCCCC", b"IIIIIIIIIII", vec![m(11)]);
        let ra = register_alignment(alignment, &target, reference, &options());
        assert_eq!(ra.mismatches, 11);
        assert_eq!(ra.alleles.len(), 11);
    }
}
