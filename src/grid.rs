use std::fmt;
use std::rc::Rc;

use error_chain::bail;
use petgraph::algo::connected_components;
use petgraph::graph::{Graph, NodeIndex};
use petgraph::Undirected;

use crate::cells::{offset_coordinate, CoordinateOptionSmallVec, CoordinateSmallVec, Direction,
                   GridCoordinate, MazeCell};
use crate::errors::*;
use crate::grid_displays::GridDisplay;
use crate::grid_iterators::{BatchIter, BatchIterType, CellIter};
use crate::units::{Depth, EdgesCount, NodesCount, Width};

/// Passages of a maze as an undirected graph, one node per cell in row major order.
pub type PassageGraph = Graph<GridCoordinate, (), Undirected>;

// Each wall pair is owned by the cell on its left or back side.
static FORWARD_DIRECTIONS: [Direction; 2] = [Direction::Right, Direction::Front];

/// A fixed `width x depth` floor of cells. Cells are never added or removed after allocation
/// and the wall flags of every adjacent pair always mirror each other.
#[derive(Clone)]
pub struct Grid {
    width: Width,
    depth: Depth,
    cells: Vec<MazeCell>,
    grid_display: Option<Rc<dyn GridDisplay>>,
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Grid :: width: {:?}, depth: {:?}, visited: {}, passages: {}",
               self.width, self.depth, self.visited_count(), self.links_count())
    }
}

impl Grid {
    /// All cells unvisited with every wall standing.
    pub fn allocate(width: Width, depth: Depth) -> Result<Grid> {
        let (Width(w), Depth(d)) = (width, depth);
        if w == 0 || d == 0 {
            return Err(ErrorKind::InvalidDimension(w, d).into());
        }
        let cells_count = w.checked_mul(d)
            .filter(|&count| count <= u32::MAX as usize)
            .ok_or_else(|| Error::from(ErrorKind::InvalidDimension(w, d)))?;

        Ok(Grid {
            width,
            depth,
            cells: vec![MazeCell::default(); cells_count],
            grid_display: None,
        })
    }

    #[inline]
    pub fn set_grid_display(&mut self, grid_display: Option<Rc<dyn GridDisplay>>) {
        self.grid_display = grid_display;
    }

    #[inline]
    pub fn grid_display(&self) -> &Option<Rc<dyn GridDisplay>> {
        &self.grid_display
    }

    #[inline]
    pub fn width(&self) -> Width {
        self.width
    }

    #[inline]
    pub fn depth(&self) -> Depth {
        self.depth
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Capacity hints for a graph over this grid: every cell, and every interior wall pair.
    pub fn graph_size(&self) -> (NodesCount, EdgesCount) {
        let (Width(w), Depth(d)) = (self.width, self.depth);
        let interior_walls = (w - 1) * d + w * (d - 1);
        (NodesCount(self.size()), EdgesCount(interior_walls))
    }

    /// The cell at `coord`, or None if the coordinate is outside of the grid.
    #[inline]
    pub fn cell_at(&self, coord: GridCoordinate) -> Option<&MazeCell> {
        self.grid_coordinate_to_index(coord).map(|index| &self.cells[index])
    }

    /// Convert a grid coordinate to a one dimensional index in the range 0...grid.size().
    /// Returns None if the grid coordinate is invalid.
    #[inline]
    pub fn grid_coordinate_to_index(&self, coord: GridCoordinate) -> Option<usize> {
        if self.is_valid_coordinate(coord) {
            Some(coord.z as usize * self.width.0 + coord.x as usize)
        } else {
            None
        }
    }

    /// Is the grid coordinate within the grid's dimensions
    #[inline]
    pub fn is_valid_coordinate(&self, coord: GridCoordinate) -> bool {
        (coord.x as usize) < self.width.0 && (coord.z as usize) < self.depth.0
    }

    /// Cells that are Right, Left, Front or Back of a particular cell, but not
    /// necessarily connected by a passage.
    pub fn neighbours(&self, coord: GridCoordinate) -> CoordinateSmallVec {
        Direction::all()
            .iter()
            .filter_map(|dir| self.neighbour_at_direction(coord, *dir))
            .collect()
    }

    pub fn neighbours_at_directions(&self,
                                    coord: GridCoordinate,
                                    dirs: &[Direction])
                                    -> CoordinateOptionSmallVec {
        dirs.iter()
            .map(|direction| self.neighbour_at_direction(coord, *direction))
            .collect()
    }

    pub fn neighbour_at_direction(&self,
                                  coord: GridCoordinate,
                                  direction: Direction)
                                  -> Option<GridCoordinate> {
        if !self.is_valid_coordinate(coord) {
            return None;
        }
        offset_coordinate(coord, direction).filter(|neighbour| self.is_valid_coordinate(*neighbour))
    }

    /// Is the wall on the `direction` side of the cell standing?
    /// Coordinates outside of the grid are treated as solid.
    #[inline]
    pub fn has_wall(&self, coord: GridCoordinate, direction: Direction) -> bool {
        self.cell_at(coord).map_or(true, |cell| cell.has_wall(direction))
    }

    /// Are two cells connected by a passage?
    pub fn is_linked(&self, a: GridCoordinate, b: GridCoordinate) -> bool {
        if !self.is_valid_coordinate(b) {
            return false;
        }
        a.direction_to(b)
            .map_or(false, |dir| !self.has_wall(a, dir))
    }

    pub fn is_neighbour_linked(&self, coord: GridCoordinate, direction: Direction) -> bool {
        self.neighbour_at_direction(coord, direction)
            .map_or(false, |neighbour_coord| self.is_linked(coord, neighbour_coord))
    }

    /// Cells that are connected to a particular cell by a passage.
    /// Returns None for a coordinate outside of the grid.
    pub fn links(&self, coord: GridCoordinate) -> Option<CoordinateSmallVec> {
        self.cell_at(coord).map(|cell| {
            cell.open_directions()
                .iter()
                .filter_map(|dir| self.neighbour_at_direction(coord, *dir))
                .collect()
        })
    }

    /// The number of cleared wall pairs.
    pub fn links_count(&self) -> usize {
        self.iter_links().count()
    }

    pub fn visited_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_visited()).count()
    }

    pub fn is_visited(&self, coord: GridCoordinate) -> bool {
        self.cell_at(coord).map_or(false, |cell| cell.is_visited())
    }

    /// Remove the wall pair shared by two orthogonally adjacent cells.
    ///
    /// Fails with `InvalidState` if either cell is outside of the grid or the cells are not
    /// adjacent. The grid is untouched on failure.
    pub fn clear_wall_between(&mut self, a: GridCoordinate, b: GridCoordinate) -> Result<()> {
        if !self.is_valid_coordinate(a) || !self.is_valid_coordinate(b) {
            bail!(ErrorKind::InvalidState(format!("cannot clear a wall between {} and {} outside of the grid", a, b)));
        }
        let direction = a.direction_to(b)
            .ok_or_else(|| {
                Error::from(ErrorKind::InvalidState(format!("cells {} and {} are not adjacent", a, b)))
            })?;
        self.clear_wall(a, direction);
        Ok(())
    }

    /// Clears the wall on the `direction` side of `coord` together with its mirror on the neighbour.
    /// Returns the neighbour, or None without touching anything when there is no neighbour
    /// (the outer boundary is never opened).
    pub(crate) fn clear_wall(&mut self, coord: GridCoordinate, direction: Direction) -> Option<GridCoordinate> {
        let neighbour = self.neighbour_at_direction(coord, direction)?;
        let index = self.grid_coordinate_to_index(coord)?;
        let neighbour_index = self.grid_coordinate_to_index(neighbour)?;
        self.cells[index].clear_wall(direction);
        self.cells[neighbour_index].clear_wall(direction.opposite());
        Some(neighbour)
    }

    /// Marks a cell visited. Returns false if the cell does not exist or was already visited.
    pub(crate) fn visit(&mut self, coord: GridCoordinate) -> bool {
        match self.grid_coordinate_to_index(coord) {
            Some(index) if !self.cells[index].is_visited() => {
                self.cells[index].visit();
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn iter(&self) -> CellIter {
        CellIter::new(self.width, self.depth)
    }

    #[inline]
    pub fn iter_row(&self) -> BatchIter {
        BatchIter::new(BatchIterType::Row, self.width, self.depth)
    }

    #[inline]
    pub fn iter_column(&self) -> BatchIter {
        BatchIter::new(BatchIterType::Column, self.width, self.depth)
    }

    /// Every cleared wall pair exactly once, as (cell, cell to its right or front).
    pub fn iter_links(&self) -> impl Iterator<Item = (GridCoordinate, GridCoordinate)> + '_ {
        self.iter().flat_map(move |coord| {
            FORWARD_DIRECTIONS.iter().filter_map(move |dir| {
                if self.is_neighbour_linked(coord, *dir) {
                    self.neighbour_at_direction(coord, *dir).map(|neighbour| (coord, neighbour))
                } else {
                    None
                }
            })
        })
    }

    /// The passages as a graph: node `i` is the cell with row major index `i`.
    pub fn passage_graph(&self) -> PassageGraph {
        let (NodesCount(nodes), EdgesCount(edges)) = self.graph_size();
        let mut graph = PassageGraph::with_capacity(nodes, edges);
        for coord in self.iter() {
            let _ = graph.add_node(coord);
        }
        for (a, b) in self.iter_links() {
            if let (Some(a_index), Some(b_index)) = (self.grid_coordinate_to_index(a),
                                                     self.grid_coordinate_to_index(b)) {
                let _ = graph.add_edge(NodeIndex::new(a_index), NodeIndex::new(b_index), ());
            }
        }
        graph
    }

    /// A perfect maze has exactly one simple path between any two cells: the passages form a
    /// spanning tree, so they are connected and there is one less passage than there are cells.
    pub fn is_perfect_maze(&self) -> bool {
        let graph = self.passage_graph();
        graph.edge_count() == self.size() - 1 && connected_components(&graph) == 1
    }
}
