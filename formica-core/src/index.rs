//! Uniform grid index over scene positions.
//!
//! Cells are half-open: `[k·step, (k+1)·step)` on both axes, so a point
//! lying exactly on a cell's right or bottom edge belongs to the next cell.
//! The far world edge itself is folded into the last column/row.

use std::collections::BTreeMap;

use log::trace;
use smallvec::SmallVec;

use crate::error::{CoreError, Result};
use crate::geometry::{grid_dimensions, Bounds, Vec2};
use crate::object::ObjectId;

type Cell = BTreeMap<ObjectId, Vec2>;

#[derive(Debug, Clone)]
pub struct GridIndex {
    step: f32,
    bounds: Bounds,
    columns: usize,
    rows: usize,
    cells: Vec<Cell>,
}

impl GridIndex {
    pub fn new(step: f32, size: Vec2) -> Result<Self> {
        let (columns, rows) = grid_dimensions(step, size).ok_or(CoreError::InvalidGrid {
            step,
            width: size.x,
            height: size.y,
        })?;
        Ok(Self {
            step,
            bounds: Bounds { size },
            columns,
            rows,
            cells: vec![Cell::new(); columns * rows],
        })
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.cells.iter().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(BTreeMap::is_empty)
    }

    pub fn register(&mut self, id: ObjectId, position: Vec2) -> Result<()> {
        let cell = self.cell_of(position)?;
        self.cells[cell].insert(id, position);
        trace!("indexed {} in cell {}", id, cell);
        Ok(())
    }

    /// Removes `id` from the cell that `position` maps to.
    pub fn unregister(&mut self, id: ObjectId, position: Vec2) -> Result<()> {
        let cell = self.cell_of(position)?;
        self.cells[cell]
            .remove(&id)
            .map(|_| ())
            .ok_or(CoreError::StaleIndexEntry {
                id,
                x: position.x,
                y: position.y,
            })
    }

    /// Every object within `radius` of `center`, ordered by id.
    ///
    /// The cell scan is a superset; the exact Euclidean distance decides.
    /// An object sitting at `center` is included.
    pub fn all_in_radius(&self, center: Vec2, radius: f32) -> Vec<ObjectId> {
        if !(radius >= 0.0) {
            return Vec::new();
        }
        let (left, right) = self.span(center.x - radius, center.x + radius, self.columns);
        let (top, bottom) = self.span(center.y - radius, center.y + radius, self.rows);

        let mut found: SmallVec<[ObjectId; 32]> = SmallVec::new();
        for row in top..=bottom {
            for column in left..=right {
                let cell = &self.cells[row * self.columns + column];
                found.extend(
                    cell.iter()
                        .filter(|(_, position)| position.distance(center) <= radius)
                        .map(|(id, _)| *id),
                );
            }
        }
        found.sort_unstable();
        found.into_vec()
    }

    /// Moves each object from the cell of its previous position to the cell
    /// of its new one. `moved[i]` pairs with `previous[i]`.
    ///
    /// Every entry is checked before anything is written, so a stale entry
    /// leaves the index untouched.
    pub fn notify_position_update_batch(
        &mut self,
        moved: &[(ObjectId, Vec2)],
        previous: &[Vec2],
    ) -> Result<()> {
        if moved.len() != previous.len() {
            return Err(CoreError::BatchLengthMismatch {
                left: moved.len(),
                right: previous.len(),
            });
        }

        let mut plan = Vec::with_capacity(moved.len());
        for (&(id, position), &prev) in moved.iter().zip(previous) {
            let from = self.cell_of(prev)?;
            if !self.cells[from].contains_key(&id) {
                return Err(CoreError::StaleIndexEntry {
                    id,
                    x: prev.x,
                    y: prev.y,
                });
            }
            let to = self.cell_of(position)?;
            plan.push((id, position, from, to));
        }

        for (id, position, from, to) in plan {
            self.cells[from].remove(&id);
            self.cells[to].insert(id, position);
        }
        Ok(())
    }

    /// Flattened cell number: `columns * row + column`.
    pub fn cell_of(&self, position: Vec2) -> Result<usize> {
        if !self.bounds.contains(position) {
            return Err(CoreError::PositionOutOfBounds {
                x: position.x,
                y: position.y,
            });
        }
        let column = ((position.x / self.step).floor() as usize).min(self.columns - 1);
        let row = ((position.y / self.step).floor() as usize).min(self.rows - 1);
        Ok(self.columns * row + column)
    }

    fn span(&self, low: f32, high: f32, count: usize) -> (usize, usize) {
        let last = (count - 1) as f32;
        let first = (low / self.step).floor().clamp(0.0, last) as usize;
        let end = (high / self.step).floor().clamp(0.0, last) as usize;
        (first, end)
    }
}
