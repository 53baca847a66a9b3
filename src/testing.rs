//! In-memory fakes for the provider seams, used by window and cursor tests.

use crate::alignment::Alignment;
use crate::error::VarwalkError;
use crate::reference::ReferenceProvider;
use crate::repository::{AlignmentSource, ReferenceTable};

/// A coordinate-sorted in-memory alignment source with the same
/// seek/next contract as the BAM-backed one.
pub struct VecAlignmentSource {
    table: ReferenceTable,
    alignments: Vec<Alignment>,
    cursor: usize,
    query_ref_id: usize,
    active: bool,
}

impl VecAlignmentSource {
    pub fn new(table: Vec<(String, usize)>, alignments: Vec<Alignment>) -> Self {
        Self {
            table: ReferenceTable::new(table),
            alignments,
            cursor: 0,
            query_ref_id: 0,
            active: false,
        }
    }
}

impl AlignmentSource for VecAlignmentSource {
    fn header_text(&self) -> &str {
        ""
    }

    fn reference_table(&self) -> &ReferenceTable {
        &self.table
    }

    fn seek(&mut self, ref_id: usize, pos: usize) -> Result<bool, VarwalkError> {
        self.query_ref_id = ref_id;
        self.cursor = self.alignments.len();
        for (i, alignment) in self.alignments.iter().enumerate() {
            if alignment.ref_id == ref_id && alignment.end_1based() >= pos {
                self.cursor = i;
                break;
            }
        }
        self.active = self.cursor < self.alignments.len();
        Ok(self.active)
    }

    fn next(&mut self) -> Result<Option<Alignment>, VarwalkError> {
        if !self.active {
            return Ok(None);
        }
        match self.alignments.get(self.cursor) {
            Some(alignment) if alignment.ref_id == self.query_ref_id => {
                self.cursor += 1;
                Ok(Some(alignment.clone()))
            }
            _ => {
                self.active = false;
                Ok(None)
            }
        }
    }
}

/// Named sequences held in memory.
pub struct MapReferenceProvider {
    sequences: Vec<(String, Vec<u8>)>,
}

impl MapReferenceProvider {
    pub fn new(sequences: Vec<(&str, Vec<u8>)>) -> Self {
        Self {
            sequences: sequences
                .into_iter()
                .map(|(name, bases)| (name.to_string(), bases))
                .collect(),
        }
    }

    fn get(&self, name: &str) -> Result<&[u8], VarwalkError> {
        self.sequences
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, bases)| bases.as_slice())
            .ok_or_else(|| {
                VarwalkError::ReferenceError(format!("unknown reference sequence {}", name))
            })
    }
}

impl ReferenceProvider for MapReferenceProvider {
    fn sequence_name_starting_with(&self, prefix: &str) -> Result<String, VarwalkError> {
        self.sequences
            .iter()
            .find(|(name, _)| name == prefix || name.starts_with(prefix))
            .map(|(name, _)| name.clone())
            .ok_or_else(|| {
                VarwalkError::ReferenceError(format!(
                    "no reference sequence named or starting with {}",
                    prefix
                ))
            })
    }

    fn sequence_length(&self, name: &str) -> Result<usize, VarwalkError> {
        Ok(self.get(name)?.len())
    }

    fn sequence(&mut self, name: &str) -> Result<Vec<u8>, VarwalkError> {
        Ok(self.get(name)?.to_vec())
    }

    fn subsequence(
        &mut self,
        name: &str,
        start0: usize,
        length: usize,
    ) -> Result<Vec<u8>, VarwalkError> {
        let bases = self.get(name)?;
        bases
            .get(start0..start0 + length)
            .map(|s| s.to_vec())
            .ok_or_else(|| {
                VarwalkError::ReferenceError(format!(
                    "subsequence {}:{}+{} outside of sequence bounds (length {})",
                    name,
                    start0,
                    length,
                    bases.len()
                ))
            })
    }
}
