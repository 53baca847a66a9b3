use crate::error::VarwalkError;
use noodles::core::{Position, Region};
use noodles::fasta::io::{indexed_reader::IndexedReader, BufReader};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Indexed random access to named reference sequences.
pub trait ReferenceProvider {
    /// First indexed sequence whose name equals or begins with `prefix`.
    /// Index keys are the whitespace-delimited first token of the FASTA header.
    fn sequence_name_starting_with(&self, prefix: &str) -> Result<String, VarwalkError>;

    fn sequence_length(&self, name: &str) -> Result<usize, VarwalkError>;

    fn sequence(&mut self, name: &str) -> Result<Vec<u8>, VarwalkError>;

    /// `start0` is 0-based; `start0 + length` must not exceed the sequence end.
    fn subsequence(
        &mut self,
        name: &str,
        start0: usize,
        length: usize,
    ) -> Result<Vec<u8>, VarwalkError>;
}

pub struct IndexedFastaProvider {
    reader: IndexedReader<BufReader<File>>,
    names: Vec<String>,
    lengths: HashMap<String, usize>,
}

impl IndexedFastaProvider {
    pub fn new(fasta_path: &str) -> Result<Self, VarwalkError> {
        if !Path::new(fasta_path).exists() {
            return Err(VarwalkError::ConfigError(format!(
                "FASTA file {} not found",
                fasta_path
            )));
        }

        let reader = noodles::fasta::io::indexed_reader::Builder::default()
            .build_from_path(fasta_path)
            .map_err(|e| {
                VarwalkError::ConfigError(format!(
                    "unable to open indexed FASTA {}: {}",
                    fasta_path, e
                ))
            })?;

        let mut names = Vec::new();
        let mut lengths = HashMap::new();
        for record in reader.index().as_ref() {
            let name = record.name().to_string();
            lengths.insert(name.clone(), record.length() as usize);
            names.push(name);
        }

        Ok(Self {
            reader,
            names,
            lengths,
        })
    }

    fn query(&mut self, name: &str, start1: usize, end1: usize) -> Result<Vec<u8>, VarwalkError> {
        let start = Position::try_from(start1)
            .map_err(|e| VarwalkError::ReferenceError(e.to_string()))?;
        let end = Position::try_from(end1)
            .map_err(|e| VarwalkError::ReferenceError(e.to_string()))?;

        let region = Region::new(name.to_string(), start..=end);
        let record = self
            .reader
            .query(&region)
            .map_err(|e| VarwalkError::ReferenceError(format!("{}: {}", name, e)))?;

        Ok(record.sequence().as_ref().to_vec())
    }
}

impl ReferenceProvider for IndexedFastaProvider {
    fn sequence_name_starting_with(&self, prefix: &str) -> Result<String, VarwalkError> {
        self.names
            .iter()
            .find(|name| name.as_str() == prefix || name.starts_with(prefix))
            .cloned()
            .ok_or_else(|| {
                VarwalkError::ReferenceError(format!(
                    "no reference sequence named or starting with {}",
                    prefix
                ))
            })
    }

    fn sequence_length(&self, name: &str) -> Result<usize, VarwalkError> {
        self.lengths.get(name).copied().ok_or_else(|| {
            VarwalkError::ReferenceError(format!("unknown reference sequence {}", name))
        })
    }

    fn sequence(&mut self, name: &str) -> Result<Vec<u8>, VarwalkError> {
        let length = self.sequence_length(name)?;
        self.query(name, 1, length)
    }

    fn subsequence(
        &mut self,
        name: &str,
        start0: usize,
        length: usize,
    ) -> Result<Vec<u8>, VarwalkError> {
        let sequence_length = self.sequence_length(name)?;
        if length == 0 || start0 + length > sequence_length {
            return Err(VarwalkError::ReferenceError(format!(
                "subsequence {}:{}+{} outside of sequence bounds (length {})",
                name, start0, length, sequence_length
            )));
        }
        self.query(name, start0 + 1, start0 + length)
    }
}
