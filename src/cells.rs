use smallvec::SmallVec;
use std::convert::From;
use std::fmt;

use crate::units::{ColumnIndex, RowIndex, Width};

/// A cell position on the maze floor. `x` runs left to right, `z` runs back to front.
#[derive(Hash, Eq, PartialEq, Copy, Clone, Debug, Ord, PartialOrd)]
pub struct GridCoordinate {
    pub x: u32,
    pub z: u32,
}

pub type CoordinateSmallVec = SmallVec<[GridCoordinate; 4]>;
pub type CoordinateOptionSmallVec = SmallVec<[Option<GridCoordinate>; 4]>;
pub type DirectionSmallVec = SmallVec<[Direction; 4]>;

impl GridCoordinate {
    pub fn new(x: u32, z: u32) -> GridCoordinate {
        GridCoordinate { x, z }
    }

    #[inline]
    pub fn from_row_major_index(index: usize, width: Width) -> GridCoordinate {
        let Width(w) = width;
        let x = index % w;
        let z = index / w;
        GridCoordinate::new(x as u32, z as u32)
    }

    #[inline]
    pub fn from_row_column_indices(col_index: ColumnIndex, row_index: RowIndex) -> GridCoordinate {
        let (ColumnIndex(col), RowIndex(row)) = (col_index, row_index);
        GridCoordinate::new(col as u32, row as u32)
    }

    /// `|dx| + |dz|`, the number of orthogonal steps between two cells ignoring walls.
    #[inline]
    pub fn manhattan_distance(&self, other: GridCoordinate) -> u32 {
        let dx = if self.x > other.x { self.x - other.x } else { other.x - self.x };
        let dz = if self.z > other.z { self.z - other.z } else { other.z - self.z };
        dx + dz
    }

    /// The direction to step in from `self` to reach `other`, if they are orthogonally adjacent.
    pub fn direction_to(&self, other: GridCoordinate) -> Option<Direction> {
        Direction::all()
            .iter()
            .cloned()
            .find(|dir| offset_coordinate(*self, *dir) == Some(other))
    }
}

impl From<(u32, u32)> for GridCoordinate {
    fn from(x_z_pair: (u32, u32)) -> GridCoordinate {
        GridCoordinate::new(x_z_pair.0, x_z_pair.1)
    }
}

impl fmt::Display for GridCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// The four sides of a cell.
/// Right is towards `x + 1`, Left towards `x - 1`, Front towards `z + 1` and Back towards `z - 1`.
#[derive(Hash, Eq, PartialEq, Copy, Clone, Debug)]
pub enum Direction {
    Right,
    Left,
    Front,
    Back,
}

impl Direction {
    /// All directions, in the order neighbours are probed by the path finder.
    #[inline]
    pub fn all() -> [Direction; 4] {
        [Direction::Right, Direction::Left, Direction::Front, Direction::Back]
    }

    #[inline]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Right => Direction::Left,
            Direction::Left => Direction::Right,
            Direction::Front => Direction::Back,
            Direction::Back => Direction::Front,
        }
    }

    #[inline]
    fn wall_bit(self) -> u8 {
        match self {
            Direction::Left => 0b0001,
            Direction::Right => 0b0010,
            Direction::Front => 0b0100,
            Direction::Back => 0b1000,
        }
    }
}

/// Creates a new `GridCoordinate` offset 1 cell away in the given direction.
/// Returns None if the coordinate is not representable, which only happens when stepping off the
/// left or back edge. The upper bounds depend on the grid and are checked there.
pub fn offset_coordinate(coord: GridCoordinate, dir: Direction) -> Option<GridCoordinate> {
    let (x, z) = (coord.x, coord.z);
    match dir {
        Direction::Right => x.checked_add(1).map(|x| GridCoordinate { x, z }),
        Direction::Left => x.checked_sub(1).map(|x| GridCoordinate { x, z }),
        Direction::Front => z.checked_add(1).map(|z| GridCoordinate { x, z }),
        Direction::Back => z.checked_sub(1).map(|z| GridCoordinate { x, z }),
    }
}

const ALL_WALLS: u8 = 0b1111;

/// One cell of the maze. Every wall starts standing and the cell starts unvisited.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub struct MazeCell {
    visited: bool,
    walls: u8,
}

impl Default for MazeCell {
    fn default() -> MazeCell {
        MazeCell {
            visited: false,
            walls: ALL_WALLS,
        }
    }
}

impl MazeCell {
    #[inline]
    pub fn is_visited(&self) -> bool {
        self.visited
    }

    #[inline]
    pub fn has_wall(&self, dir: Direction) -> bool {
        self.walls & dir.wall_bit() != 0
    }

    #[inline]
    pub fn has_left_wall(&self) -> bool {
        self.has_wall(Direction::Left)
    }

    #[inline]
    pub fn has_right_wall(&self) -> bool {
        self.has_wall(Direction::Right)
    }

    #[inline]
    pub fn has_front_wall(&self) -> bool {
        self.has_wall(Direction::Front)
    }

    #[inline]
    pub fn has_back_wall(&self) -> bool {
        self.has_wall(Direction::Back)
    }

    /// Directions with no wall standing.
    pub fn open_directions(&self) -> DirectionSmallVec {
        Direction::all()
            .iter()
            .cloned()
            .filter(|dir| !self.has_wall(*dir))
            .collect()
    }

    // Wall pairs must stay mirrored, so only the grid clears walls.
    #[inline]
    pub(crate) fn clear_wall(&mut self, dir: Direction) {
        self.walls &= !dir.wall_bit();
    }

    #[inline]
    pub(crate) fn visit(&mut self) {
        self.visited = true;
    }
}
