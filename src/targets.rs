use crate::error::VarwalkError;
use crate::reference::ReferenceProvider;
use std::fs::File;
use std::io::{BufRead, BufReader};

/// A half-open `[left, right)` interval of 1-based reference coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub seq_name: String,
    pub left: usize,
    pub right: usize,
    pub desc: String,
}

impl Target {
    /// Last position inside the interval.
    pub fn last_position(&self) -> usize {
        self.right - 1
    }
}

/// Parse a target file: whitespace/tab-delimited `seq left right [desc]`
/// lines, 1-based, right-exclusive. Sequence names are resolved against the
/// reference index (prefix match on the first header token).
pub fn load_targets(
    path: &str,
    reference: &impl ReferenceProvider,
) -> Result<Vec<Target>, VarwalkError> {
    let file = File::open(path).map_err(|e| {
        VarwalkError::ConfigError(format!("unable to open target file {}: {}", path, e))
    })?;

    let mut targets = Vec::new();
    for (line_number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let mut fields = line.split_whitespace();

        let Some(seq) = fields.next() else {
            continue;
        };

        let (Some(left), Some(right)) = (fields.next(), fields.next()) else {
            return Err(VarwalkError::ParsingError(format!(
                "target file {} line {}: expected `seq left right [desc]`",
                path,
                line_number + 1
            )));
        };
        let left: usize = left.parse()?;
        let right: usize = right.parse()?;
        let desc = fields.collect::<Vec<_>>().join(" ");

        let seq_name = reference.sequence_name_starting_with(seq)?;
        if left < 1 || right < left || right >= reference.sequence_length(&seq_name)? {
            return Err(VarwalkError::ConfigError(format!(
                "target region {}:{}-{} outside of reference sequence bounds",
                seq, left, right
            )));
        }

        targets.push(Target {
            seq_name,
            left,
            right,
            desc,
        });
    }

    Ok(targets)
}

/// One target per reference sequence, covering `[1, length)`.
pub fn synthesize_targets(reference_table: &[(String, usize)]) -> Vec<Target> {
    reference_table
        .iter()
        .map(|(name, length)| Target {
            seq_name: name.clone(),
            left: 1,
            right: *length,
            desc: String::new(),
        })
        .collect()
}
