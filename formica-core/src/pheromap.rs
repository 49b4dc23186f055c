//! Scalar scent field laid over the world on its own grid.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use log::trace;
use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::geometry::{grid_dimensions, Bounds, Vec2};

/// The eight neighbors of a cell, in the order `read_surrounding_at` reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Column/row offset of the neighbor. Rows grow southwards.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    /// Heading pointing at the neighbor, in the clockwise screen convention.
    pub fn rotation(self) -> f32 {
        match self {
            Direction::East => 0.0,
            Direction::SouthEast => FRAC_PI_4,
            Direction::South => FRAC_PI_2,
            Direction::SouthWest => FRAC_PI_2 + FRAC_PI_4,
            Direction::West => PI,
            Direction::NorthWest => PI + FRAC_PI_4,
            Direction::North => PI + FRAC_PI_2,
            Direction::NorthEast => PI + FRAC_PI_2 + FRAC_PI_4,
        }
    }
}

pub fn pheromone_by_direction(direction: Direction, readings: &[f32; 8]) -> f32 {
    readings[direction.index()]
}

#[derive(Debug, Clone)]
pub struct Pheromap {
    step: f32,
    bounds: Bounds,
    columns: usize,
    rows: usize,
    nodes: Vec<f32>,
}

impl Pheromap {
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
            nodes: vec![0.0; columns * rows],
        })
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Adds `amount` to the start cell of every move that left its cell.
    ///
    /// Moves are assumed to cover at most one cell per call; intra-cell
    /// motion deposits nothing.
    pub fn update_batch(&mut self, starts: &[Vec2], ends: &[Vec2], amount: f32) -> Result<()> {
        if starts.len() != ends.len() {
            return Err(CoreError::BatchLengthMismatch {
                left: starts.len(),
                right: ends.len(),
            });
        }
        if amount < 0.0 {
            return Err(CoreError::NegativeAmount(amount));
        }
        let mut deposits = Vec::with_capacity(starts.len());
        for (start, end) in starts.iter().zip(ends) {
            let (from_column, from_row) = self.coordinates(*start)?;
            let (to_column, to_row) = self.coordinates(*end)?;
            debug_assert!(
                from_column.abs_diff(to_column) <= 1 && from_row.abs_diff(to_row) <= 1,
                "move from {} to {} skips a pheromone cell",
                start,
                end
            );
            if (from_column, from_row) != (to_column, to_row) {
                deposits.push(from_row * self.columns + from_column);
            }
        }
        trace!("pheromone deposits: {}", deposits.len());
        for cell in deposits {
            self.nodes[cell] += amount;
        }
        Ok(())
    }

    /// Intensities of the eight neighbors of `position`'s cell, ordered as
    /// [`Direction::ALL`]. Neighbors beyond the grid read as zero.
    pub fn read_surrounding_at(&self, position: Vec2) -> Result<[f32; 8]> {
        let (column, row) = self.coordinates(position)?;
        let mut readings = [0.0; 8];
        for direction in Direction::ALL {
            let (dx, dy) = direction.offset();
            readings[direction.index()] = self
                .node(column as isize + dx, row as isize + dy)
                .unwrap_or(0.0);
        }
        Ok(readings)
    }

    pub fn intensity_at(&self, position: Vec2) -> Result<f32> {
        Ok(self.nodes[self.cell_of(position)?])
    }

    /// Lowers every cell by `amount`, never below zero.
    pub fn evaporate(&mut self, amount: f32) {
        for node in &mut self.nodes {
            *node = (*node - amount).max(0.0);
        }
    }

    pub fn total(&self) -> f32 {
        self.nodes.iter().sum()
    }

    fn node(&self, column: isize, row: isize) -> Option<f32> {
        if column < 0 || row < 0 || column as usize >= self.columns || row as usize >= self.rows {
            return None;
        }
        Some(self.nodes[row as usize * self.columns + column as usize])
    }

    fn cell_of(&self, position: Vec2) -> Result<usize> {
        let (column, row) = self.coordinates(position)?;
        Ok(row * self.columns + column)
    }

    fn coordinates(&self, position: Vec2) -> Result<(usize, usize)> {
        if !self.bounds.contains(position) {
            return Err(CoreError::PositionOutOfBounds {
                x: position.x,
                y: position.y,
            });
        }
        let column = ((position.x / self.step).floor() as usize).min(self.columns - 1);
        let row = ((position.y / self.step).floor() as usize).min(self.rows - 1);
        Ok((column, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(map: &Pheromap, x: f32, y: f32, direction: Direction) -> f32 {
        pheromone_by_direction(direction, &map.read_surrounding_at(Vec2::new(x, y)).unwrap())
    }

    /// Walks a single agent `moves` times by `delta`, one batch per move.
    fn walk(map: &mut Pheromap, start: Vec2, delta: Vec2, moves: usize, amount: f32) {
        let mut start = start;
        for _ in 0..moves {
            let end = start + delta;
            map.update_batch(&[start], &[end], amount).unwrap();
            start = end;
        }
    }

    #[test]
    fn deposits_behind_the_agent() {
        let mut map = Pheromap::new(2.0, Vec2::splat(10.0)).unwrap();
        walk(&mut map, Vec2::new(0.2, 0.2), Vec2::new(1.0, 0.0), 6, 10.0);

        assert_eq!(read(&map, 3.0, 3.0, Direction::North), 10.0);
        assert_eq!(read(&map, 3.0, 3.0, Direction::NorthEast), 10.0);
        assert_eq!(read(&map, 3.0, 3.0, Direction::East), 0.0);
        assert_eq!(read(&map, 3.0, 3.0, Direction::SouthEast), 0.0);
        assert_eq!(read(&map, 3.0, 3.0, Direction::South), 0.0);
        assert_eq!(read(&map, 3.0, 3.0, Direction::SouthWest), 0.0);
        assert_eq!(read(&map, 3.0, 3.0, Direction::West), 0.0);
        assert_eq!(read(&map, 3.0, 3.0, Direction::NorthWest), 10.0);
    }

    #[test]
    fn batch_update_covers_every_agent() {
        let mut map = Pheromap::new(2.0, Vec2::splat(10.0)).unwrap();
        let mut starts = [Vec2::new(0.2, 0.2), Vec2::new(0.2, 5.2)];
        let delta = Vec2::new(2.0, 0.0);
        for _ in 0..3 {
            let ends = [starts[0] + delta, starts[1] + delta];
            map.update_batch(&starts, &ends, 10.0).unwrap();
            starts = ends;
        }

        let readings = map.read_surrounding_at(Vec2::new(3.0, 3.0)).unwrap();
        assert_eq!(readings, [10.0, 10.0, 0.0, 10.0, 10.0, 10.0, 0.0, 10.0]);
    }

    #[test]
    fn diagonal_movement_marks_diagonal_cells() {
        let mut map = Pheromap::new(2.0, Vec2::splat(10.0)).unwrap();
        walk(&mut map, Vec2::new(0.1, 0.1), Vec2::new(1.0, 1.0), 6, 10.0);

        let readings = map.read_surrounding_at(Vec2::new(2.5, 4.5)).unwrap();
        assert_eq!(readings, [10.0, 0.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "skips a pheromone cell")]
    fn moves_longer_than_a_cell_are_caught() {
        let mut map = Pheromap::new(2.0, Vec2::splat(10.0)).unwrap();
        let _ = map.update_batch(&[Vec2::new(0.5, 0.5)], &[Vec2::new(6.5, 0.5)], 10.0);
    }

    #[test]
    fn moving_within_a_cell_deposits_nothing() {
        let mut map = Pheromap::new(5.0, Vec2::splat(20.0)).unwrap();
        walk(&mut map, Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0), 2, 10.0);
        assert_eq!(map.total(), 0.0);
    }

    #[test]
    fn evaporation_is_clamped_at_zero() {
        let mut map = Pheromap::new(2.0, Vec2::splat(10.0)).unwrap();
        walk(&mut map, Vec2::ZERO, Vec2::new(1.0, 0.0), 2, 4.0);

        assert_eq!(read(&map, 1.0, 3.0, Direction::North), 4.0);
        assert_eq!(read(&map, 1.0, 3.0, Direction::South), 0.0);

        map.evaporate(2.0);
        assert_eq!(read(&map, 1.0, 3.0, Direction::North), 2.0);

        map.evaporate(2.0);
        assert_eq!(read(&map, 1.0, 3.0, Direction::North), 0.0);

        map.evaporate(2.0);
        assert_eq!(read(&map, 1.0, 3.0, Direction::North), 0.0);
        assert_eq!(read(&map, 1.0, 3.0, Direction::South), 0.0);
    }

    #[test]
    fn repeated_evaporation_subtracts_linearly() {
        let mut map = Pheromap::new(1.0, Vec2::splat(4.0)).unwrap();
        map.update_batch(&[Vec2::new(0.5, 0.5)], &[Vec2::new(1.5, 0.5)], 7.0)
            .unwrap();
        map.update_batch(&[Vec2::new(2.5, 2.5)], &[Vec2::new(2.5, 3.5)], 3.0)
            .unwrap();

        for n in 1..=8 {
            map.evaporate(1.0);
            let k = n as f32;
            assert_eq!(map.intensity_at(Vec2::new(0.5, 0.5)).unwrap(), (7.0 - k).max(0.0));
            assert_eq!(map.intensity_at(Vec2::new(2.5, 2.5)).unwrap(), (3.0 - k).max(0.0));
            assert!(map.nodes.iter().all(|node| *node >= 0.0));
        }
    }

    #[test]
    fn corner_neighbors_outside_grid_read_zero() {
        let map = Pheromap::new(2.0, Vec2::splat(10.0)).unwrap();
        assert_eq!(map.read_surrounding_at(Vec2::ZERO).unwrap(), [0.0; 8]);
        assert_eq!(map.read_surrounding_at(Vec2::splat(10.0)).unwrap(), [0.0; 8]);
    }

    #[test]
    fn directions_point_at_their_neighbor() {
        for direction in Direction::ALL {
            let (dx, dy) = direction.offset();
            let heading = crate::geometry::heading(direction.rotation());
            assert!((heading.x - dx as f32 / ((dx * dx + dy * dy) as f32).sqrt()).abs() < 1e-5);
            assert!((heading.y - dy as f32 / ((dx * dx + dy * dy) as f32).sqrt()).abs() < 1e-5);
        }
    }
}
