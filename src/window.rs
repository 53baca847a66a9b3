use crate::alignment::Alignment;
use crate::allele::Allele;
use crate::error::VarwalkError;
use crate::register::{register_alignment, RegisterOptions, RegisteredAlignment};
use crate::repository::AlignmentSource;
use crate::targets::Target;
use std::collections::VecDeque;

/// Sliding buffer of registered alignments overlapping the cursor position,
/// newest at the front, plus the one-record look-ahead into the source.
pub struct AlignmentWindow {
    queue: VecDeque<RegisteredAlignment>,
    pending: Option<Alignment>,
    rmu: u32,
}

impl AlignmentWindow {
    pub fn new(rmu: u32) -> Self {
        Self {
            queue: VecDeque::new(),
            pending: None,
            rmu,
        }
    }

    /// Drop all buffered registrations and the look-ahead (used on target jumps).
    pub fn clear(&mut self) {
        self.queue.clear();
        self.pending = None;
    }

    /// Pull the first alignment after a seek. Returns false when the source
    /// has nothing at or after the seek point.
    pub fn prime(&mut self, source: &mut impl AlignmentSource) -> Result<bool, VarwalkError> {
        self.pending = source.next()?;
        Ok(self.pending.is_some())
    }

    /// Register and admit alignments whose 1-based start is at or before
    /// `pos`. Mapped alignments whose mismatch count stays within the
    /// configured cap are pushed to the front; the look-ahead always advances.
    pub fn extend(
        &mut self,
        pos: usize,
        source: &mut impl AlignmentSource,
        target: &Target,
        subsequence: &[u8],
        options: &RegisterOptions,
    ) -> Result<(), VarwalkError> {
        while let Some(alignment) = self.pending.take() {
            if alignment.start_1based() > pos {
                self.pending = Some(alignment);
                break;
            }

            if alignment.is_mapped {
                let ra = register_alignment(alignment, target, subsequence, options);
                if ra.mismatches <= self.rmu {
                    self.queue.push_front(ra);
                }
            }

            self.pending = source.next()?;
        }

        Ok(())
    }

    /// Pop registrations whose reference span ends before `pos`.
    pub fn evict(&mut self, pos: usize) {
        while self
            .queue
            .back()
            .is_some_and(|ra| pos > ra.alignment.end_1based())
        {
            self.queue.pop_back();
        }
    }

    /// Collect the alleles observed at exactly `pos`, in window traversal
    /// order, then allele order within each registration. No deduplication.
    pub fn alleles_at(&self, pos: usize, out: &mut Vec<Allele>) {
        for ra in &self.queue {
            for allele in &ra.alleles {
                if allele.position == pos {
                    out.push(allele.clone());
                }
            }
        }
    }

    /// Whether any buffered alignment spans `pos`.
    pub fn overlaps(&self, pos: usize) -> bool {
        self.queue
            .iter()
            .any(|ra| ra.alignment.start_1based() <= pos && pos <= ra.alignment.end_1based())
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
