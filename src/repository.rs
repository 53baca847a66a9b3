use crate::alignment::Alignment;
use crate::error::VarwalkError;
use log::debug;
use noodles::bam;
use noodles::bgzf;
use noodles::core::{region::Interval, Position};
use noodles::csi::binning_index::index::reference_sequence::bin::Chunk;
use noodles::csi::BinningIndex;
use noodles::sam::{self, alignment::RecordBuf};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Reference-sequence table of the alignment file: id <-> name <-> length,
/// in header order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    entries: Vec<(String, usize)>,
    ids: HashMap<String, usize>,
}

impl ReferenceTable {
    pub fn new(entries: Vec<(String, usize)>) -> Self {
        let ids = entries
            .iter()
            .enumerate()
            .map(|(id, (name, _))| (name.clone(), id))
            .collect();
        Self { entries, ids }
    }

    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    pub fn id_of(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    pub fn length_of(&self, name: &str) -> Option<usize> {
        self.ids.get(name).map(|&id| self.entries[id].1)
    }
}

/// Streaming, forward-only producer of alignments with a seek operation.
///
/// After a successful `seek(r, p)`, `next` yields, in coordinate order, the
/// alignments on reference `r` that overlap `p` or start at/after it, until
/// the reference is exhausted.
pub trait AlignmentSource {
    fn header_text(&self) -> &str;

    fn reference_table(&self) -> &ReferenceTable;

    /// Position the stream. Returns false when the region holds no alignments.
    fn seek(&mut self, ref_id: usize, pos: usize) -> Result<bool, VarwalkError>;

    /// `None` at end of the seeked reference.
    fn next(&mut self) -> Result<Option<Alignment>, VarwalkError>;
}

#[derive(Clone, Copy)]
enum QueryState {
    Seek,
    Read(bgzf::VirtualPosition),
    Done,
}

/// Indexed BAM reader. The `.bai` companion must sit next to the BAM file.
pub struct BamAlignmentSource {
    reader: bam::io::Reader<bgzf::io::Reader<File>>,
    index: bam::bai::Index,
    header: sam::Header,
    header_text: String,
    reference_table: ReferenceTable,
    record: bam::Record,

    chunks: Vec<Chunk>,
    chunk_index: usize,
    state: QueryState,
    query_ref_id: usize,
    query_start: usize,
}

impl BamAlignmentSource {
    pub fn new(bam_path: &str) -> Result<Self, VarwalkError> {
        if !Path::new(bam_path).exists() {
            return Err(VarwalkError::ConfigError(format!(
                "BAM file {} not found",
                bam_path
            )));
        }

        let bai_path = format!("{}.bai", bam_path);
        if !Path::new(&bai_path).exists() {
            return Err(VarwalkError::ConfigError(format!(
                "BAM index file {} not found. Only indexed BAM files are supported.",
                bai_path
            )));
        }

        let mut reader = File::open(bam_path).map(bam::io::Reader::new)?;
        let header = reader
            .read_header()
            .map_err(|e| VarwalkError::AlignmentFileError(format!("{}: {}", bam_path, e)))?;
        let index = bam::bai::fs::read(&bai_path)
            .map_err(|e| VarwalkError::AlignmentFileError(format!("{}: {}", bai_path, e)))?;

        let header_text = serialize_header(&header)?;
        let reference_table = ReferenceTable::new(
            header
                .reference_sequences()
                .iter()
                .map(|(name, map)| (name.to_string(), usize::from(map.length())))
                .collect(),
        );

        Ok(Self {
            reader,
            index,
            header,
            header_text,
            reference_table,
            record: bam::Record::default(),
            chunks: Vec::new(),
            chunk_index: 0,
            state: QueryState::Done,
            query_ref_id: 0,
            query_start: 1,
        })
    }

    fn next_chunk(&mut self) -> Result<QueryState, VarwalkError> {
        let Some(chunk) = self.chunks.get(self.chunk_index).copied() else {
            return Ok(QueryState::Done);
        };
        self.chunk_index += 1;
        self.reader.get_mut().seek(chunk.start())?;
        Ok(QueryState::Read(chunk.end()))
    }
}

impl AlignmentSource for BamAlignmentSource {
    fn header_text(&self) -> &str {
        &self.header_text
    }

    fn reference_table(&self) -> &ReferenceTable {
        &self.reference_table
    }

    fn seek(&mut self, ref_id: usize, pos: usize) -> Result<bool, VarwalkError> {
        let Some((_, length)) = self.reference_table.entries().get(ref_id).cloned() else {
            return Err(VarwalkError::AlignmentFileError(format!(
                "reference id {} not in the alignment header",
                ref_id
            )));
        };

        if pos < 1 || pos > length {
            self.chunks.clear();
        } else {
            let start = Position::try_from(pos)
                .map_err(|e| VarwalkError::AlignmentFileError(e.to_string()))?;
            let end = Position::try_from(length)
                .map_err(|e| VarwalkError::AlignmentFileError(e.to_string()))?;
            self.chunks = self
                .index
                .query(ref_id, Interval::from(start..=end))
                .map_err(|e| VarwalkError::AlignmentFileError(e.to_string()))?;
        }

        self.chunk_index = 0;
        self.state = QueryState::Seek;
        self.query_ref_id = ref_id;
        self.query_start = pos;

        Ok(!self.chunks.is_empty())
    }

    fn next(&mut self) -> Result<Option<Alignment>, VarwalkError> {
        loop {
            match self.state {
                QueryState::Seek => {
                    self.state = self.next_chunk()?;
                }
                QueryState::Read(chunk_end) => {
                    if self.reader.read_record(&mut self.record)? == 0 {
                        self.state = QueryState::Seek;
                        continue;
                    }

                    if self.reader.get_ref().virtual_position() >= chunk_end {
                        self.state = QueryState::Seek;
                    }

                    let record = match RecordBuf::try_from_alignment_record(
                        &self.header,
                        &self.record,
                    ) {
                        Ok(record) => record,
                        Err(e) => {
                            debug!("skipping undecodable record: {}", e);
                            continue;
                        }
                    };

                    let alignment = match Alignment::from_record_buf(&record) {
                        Ok(Some(alignment)) => alignment,
                        Ok(None) => continue,
                        Err(e) => {
                            debug!("skipping invalid record: {}", e);
                            continue;
                        }
                    };

                    if alignment.ref_id == self.query_ref_id
                        && alignment.end_1based() >= self.query_start
                    {
                        return Ok(Some(alignment));
                    }
                }
                QueryState::Done => return Ok(None),
            }
        }
    }
}

fn serialize_header(header: &sam::Header) -> Result<String, VarwalkError> {
    let mut buf = Vec::new();
    {
        let mut writer = sam::io::Writer::new(&mut buf);
        writer
            .write_header(header)
            .map_err(|e| VarwalkError::AlignmentFileError(e.to_string()))?;
    }
    Ok(String::from_utf8(buf)?)
}
