use crate::error::Result;
use crate::segment::{Segment, segments_of};
use crate::types::{ConflictCheckResult, ConflictTarget, SlotId, SlotSpec, WeeklySlot};

/// A pure engine for weekly-interval overlap detection.
pub struct ConflictEngine;

impl ConflictEngine {
    /// Two segments clash when they share a weekday and their half-open
    /// ranges intersect.
    pub fn check_pair(a: &Segment, b: &Segment) -> bool {
        a.overlaps(b)
    }

    /// Pairwise scan of `a × b`, stopping at the first overlapping pair.
    pub fn overlaps(a: &[Segment], b: &[Segment]) -> bool {
        a.iter().any(|x| b.iter().any(|y| Self::check_pair(x, y)))
    }

    /// Checks a candidate interval against the stored slots of one course.
    ///
    /// The slot whose id equals `exclude` is skipped, so an update never
    /// clashes with its own previous version.
    pub fn check(
        candidate: &SlotSpec,
        existing: &[WeeklySlot],
        exclude: Option<SlotId>,
    ) -> Result<ConflictCheckResult> {
        let candidate_segments = segments_of(candidate)?;

        for slot in existing {
            if Some(slot.id) == exclude {
                continue;
            }

            let existing_segments = segments_of(&slot.spec())?;
            if Self::overlaps(&candidate_segments, &existing_segments) {
                return Ok(ConflictCheckResult::conflict(ConflictTarget::Slot(slot.id)));
            }
        }

        Ok(ConflictCheckResult::clear())
    }

    /// Every clashing index pair `(i, j)` with `i < j` in a list of intervals.
    pub fn find_clashes(specs: &[SlotSpec]) -> Result<Vec<(usize, usize)>> {
        let segmented = specs.iter().map(segments_of).collect::<Result<Vec<_>>>()?;

        let mut clashes = Vec::new();
        for i in 0..segmented.len() {
            for j in (i + 1)..segmented.len() {
                if Self::overlaps(&segmented[i], &segmented[j]) {
                    clashes.push((i, j));
                }
            }
        }
        Ok(clashes)
    }
}
