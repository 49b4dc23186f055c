//! Trails: the ordered marks one ant laid down, walkable in both directions.

use std::collections::BTreeMap;

use formica_core::{ObjectId, TrailId};

use crate::error::TrailError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trail {
    id: TrailId,
    /// Marks in the order they were laid.
    marks: Vec<ObjectId>,
    positions: BTreeMap<ObjectId, usize>,
}

impl Trail {
    pub fn new(id: TrailId) -> Self {
        Self {
            id,
            marks: Vec::new(),
            positions: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> TrailId {
        self.id
    }

    pub fn append(&mut self, mark: ObjectId) {
        self.positions.insert(mark, self.marks.len());
        self.marks.push(mark);
    }

    pub fn marks(&self) -> &[ObjectId] {
        &self.marks
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn contains(&self, mark: ObjectId) -> bool {
        self.positions.contains_key(&mark)
    }

    /// The candidate laid earliest on this trail.
    pub fn find_closest_to_start(&self, candidates: &[ObjectId]) -> Result<ObjectId, TrailError> {
        self.members(candidates)?
            .min_by_key(|(position, _)| *position)
            .map(|(_, mark)| mark)
            .ok_or(TrailError::NotOnTrail(self.id))
    }

    /// The candidate laid latest on this trail.
    pub fn find_closest_to_end(&self, candidates: &[ObjectId]) -> Result<ObjectId, TrailError> {
        self.members(candidates)?
            .max_by_key(|(position, _)| *position)
            .map(|(_, mark)| mark)
            .ok_or(TrailError::NotOnTrail(self.id))
    }

    fn members<'a>(
        &'a self,
        candidates: &'a [ObjectId],
    ) -> Result<impl Iterator<Item = (usize, ObjectId)> + 'a, TrailError> {
        if candidates.is_empty() {
            return Err(TrailError::NoCandidates);
        }
        Ok(candidates
            .iter()
            .filter_map(move |mark| self.positions.get(mark).map(|position| (*position, *mark))))
    }
}

/// Every trail laid so far, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct TrailBook {
    trails: BTreeMap<TrailId, Trail>,
    next_id: u32,
}

impl TrailBook {
    pub fn create(&mut self) -> TrailId {
        let id = TrailId(self.next_id);
        self.next_id += 1;
        self.trails.insert(id, Trail::new(id));
        id
    }

    pub fn get(&self, id: TrailId) -> Result<&Trail, TrailError> {
        self.trails.get(&id).ok_or(TrailError::UnknownTrail(id))
    }

    pub fn get_mut(&mut self, id: TrailId) -> Result<&mut Trail, TrailError> {
        self.trails.get_mut(&id).ok_or(TrailError::UnknownTrail(id))
    }

    pub fn len(&self) -> usize {
        self.trails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }
}
