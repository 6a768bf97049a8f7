// Segment store - Ordered collection of user-defined segments

use crate::domain::errors::DomainError;
use crate::domain::model::{Segment, SegmentId};
use crate::domain::rules::SegmentNaming;

/// Ordered, validated collection of segments for one session
#[derive(Debug, Default)]
pub struct SegmentStore {
    segments: Vec<Segment>,
    next_id: u64,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new segment; the range is validated before anything changes
    pub fn add(
        &mut self,
        start_time: f64,
        end_time: f64,
        name: Option<String>,
    ) -> Result<Segment, DomainError> {
        Segment::validate_range(start_time, end_time)?;

        self.next_id += 1;
        let segment = Segment {
            id: SegmentId(self.next_id),
            start_time,
            end_time,
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| SegmentNaming::default_name(self.segments.len())),
        };
        self.segments.push(segment.clone());
        Ok(segment)
    }

    /// Swap the record for `id` in place, keeping its id and position
    pub fn replace(
        &mut self,
        id: SegmentId,
        start_time: f64,
        end_time: f64,
        name: String,
    ) -> Result<Segment, DomainError> {
        Segment::validate_range(start_time, end_time)?;
        let slot = self
            .segments
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(DomainError::UnknownSegment(id.0))?;

        *slot = Segment {
            id,
            start_time,
            end_time,
            name,
        };
        Ok(slot.clone())
    }

    /// Remove by id. Unknown ids are ignored; returns whether anything was removed
    pub fn remove(&mut self, id: SegmentId) -> bool {
        let before = self.segments.len();
        self.segments.retain(|s| s.id != id);
        self.segments.len() != before
    }

    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.get(id).is_some()
    }

    /// Segments in insertion order
    pub fn list(&self) -> &[Segment] {
        &self.segments
    }

    /// Owned copy of the current order, used to fix a batch at its start
    pub fn snapshot(&self) -> Vec<Segment> {
        self.segments.clone()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Drop every segment. Ids keep increasing so stale ids never match again
    pub fn clear(&mut self) {
        self.segments.clear();
    }
}
