use crate::allele::{Allele, AlleleKind};
use crate::error::VarwalkError;
use crate::reference::ReferenceProvider;
use crate::register::RegisterOptions;
use crate::repository::AlignmentSource;
use crate::settings::Settings;
use crate::targets::Target;
use crate::window::AlignmentWindow;
use log::debug;

/// Configuration consumed by the cursor and the pipeline below it.
#[derive(Debug, Clone)]
pub struct CursorOptions {
    pub register: RegisterOptions,
    pub rmu: u32,
    pub use_ref_allele: bool,
    pub force_ref_allele: bool,
    pub bqr: u8,
    pub mqr: u8,
}

impl CursorOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            register: RegisterOptions::from_settings(settings),
            rmu: settings.rmu,
            use_ref_allele: settings.use_ref_allele,
            force_ref_allele: settings.force_ref_allele,
            bqr: settings.bqr,
            mqr: settings.mqr,
        }
    }
}

/// The position iterator driving the pipeline: owns the current target, the
/// 1-based cursor position, the target's reference substring and the sliding
/// alignment window. Positions advance strictly within a target and reset to
/// the next target's left bound on crossing.
pub struct TargetCursor<S, R> {
    source: S,
    reference: R,
    targets: Vec<Target>,
    options: CursorOptions,

    target_index: usize,
    position: usize,
    subsequence: Vec<u8>,
    ref_id: usize,
    window: AlignmentWindow,
    started: bool,
}

impl<S: AlignmentSource, R: ReferenceProvider> TargetCursor<S, R> {
    /// Set up at the first target and pull the window up to its left bound.
    /// Fails when the source holds no alignment at or after the first target.
    pub fn new(
        source: S,
        reference: R,
        targets: Vec<Target>,
        options: CursorOptions,
    ) -> Result<Self, VarwalkError> {
        if targets.is_empty() {
            return Err(VarwalkError::ConfigError(
                "no target regions to process".to_string(),
            ));
        }

        let window = AlignmentWindow::new(options.rmu);
        let mut cursor = Self {
            source,
            reference,
            targets,
            options,
            target_index: 0,
            position: 0,
            subsequence: Vec::new(),
            ref_id: 0,
            window,
            started: false,
        };

        cursor.position = cursor.targets[0].left;
        cursor.ref_id = cursor.resolve_ref_id(0)?;
        cursor.load_subsequence(0)?;

        if !cursor.source.seek(cursor.ref_id, cursor.position)?
            || !cursor.window.prime(&mut cursor.source)?
        {
            let target = &cursor.targets[0];
            return Err(VarwalkError::AlignmentFileError(format!(
                "alignment file has no alignments at or after {}:{}",
                target.seq_name, target.left
            )));
        }

        cursor.update_window()?;
        Ok(cursor)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn current_target(&self) -> &Target {
        &self.targets[self.target_index]
    }

    /// Step to the next in-target position, crossing targets as needed.
    /// Returns false once every target is exhausted.
    pub fn advance(&mut self) -> Result<bool, VarwalkError> {
        self.position += 1;
        if self.position >= self.current_target().right && !self.switch_target()? {
            return Ok(false);
        }
        self.update_window()?;
        Ok(true)
    }

    /// Advance and collect the alleles observed at the new position into
    /// `out`. The first call reports the first target's left bound itself.
    /// Returns false when the targets are exhausted (`out` left empty).
    pub fn get_next_alleles(&mut self, out: &mut Vec<Allele>) -> Result<bool, VarwalkError> {
        out.clear();

        if self.started {
            if !self.advance()? {
                return Ok(false);
            }
        } else {
            self.started = true;
        }

        self.collect_alleles(out);
        Ok(true)
    }

    /// Alleles observed at `pos` by the buffered alignments, in window
    /// traversal order, then allele order within each registration.
    pub fn alleles_at(&self, pos: usize, out: &mut Vec<Allele>) {
        self.window.alleles_at(pos, out);
    }

    /// Move to the next target: clear the window, reset the position, reload
    /// the reference substring and re-seek the source. Returns false at the
    /// end of the target list, or when the seek finds no alignments.
    fn switch_target(&mut self) -> Result<bool, VarwalkError> {
        if self.target_index + 1 >= self.targets.len() {
            return Ok(false);
        }
        self.target_index += 1;

        let target = &self.targets[self.target_index];
        debug!(
            "processing target {} {}:{}-{}",
            target.desc, target.seq_name, target.left, target.right
        );

        self.window.clear();
        self.position = self.targets[self.target_index].left;
        self.ref_id = self.resolve_ref_id(self.target_index)?;
        self.load_subsequence(self.target_index)?;

        if !self.source.seek(self.ref_id, self.position)? {
            return Ok(false);
        }
        self.window.prime(&mut self.source)
    }

    fn resolve_ref_id(&self, target_index: usize) -> Result<usize, VarwalkError> {
        let target = &self.targets[target_index];
        self.source
            .reference_table()
            .id_of(&target.seq_name)
            .ok_or_else(|| {
                VarwalkError::ConfigError(format!(
                    "target sequence {} not present in the alignment header",
                    target.seq_name
                ))
            })
    }

    fn load_subsequence(&mut self, target_index: usize) -> Result<(), VarwalkError> {
        let target = &self.targets[target_index];
        self.subsequence = self.reference.subsequence(
            &target.seq_name,
            target.left - 1,
            target.right - target.left,
        )?;
        Ok(())
    }

    fn update_window(&mut self) -> Result<(), VarwalkError> {
        self.window.extend(
            self.position,
            &mut self.source,
            &self.targets[self.target_index],
            &self.subsequence,
            &self.options.register,
        )?;
        self.window.evict(self.position);
        Ok(())
    }

    fn collect_alleles(&self, out: &mut Vec<Allele>) {
        self.window.alleles_at(self.position, out);

        if self.options.force_ref_allele
            || (self.options.use_ref_allele && self.window.overlaps(self.position))
        {
            let target = self.current_target();
            if let Some(&base) = self.subsequence.get(self.position - target.left) {
                let base = (base as char).to_string();
                out.insert(
                    0,
                    Allele {
                        kind: AlleleKind::Reference,
                        seq_name: target.seq_name.clone(),
                        position: self.position,
                        length: 1,
                        ref_bases: base.clone(),
                        alt_bases: base,
                        sample_id: String::new(),
                        forward_strand: true,
                        base_quality: self.options.bqr,
                        map_quality: self.options.mqr,
                    },
                );
            }
        }
    }
}
