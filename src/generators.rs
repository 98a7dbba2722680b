//! Maze generation by randomized depth first backtracking.
//!
//! The generator is an explicit state machine rather than a recursive function, so a caller can
//! drive it one step at a time and observe every cell visit and cleared wall in between.
use std::fmt;

use error_chain::bail;
use log::{debug, trace};
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::cells::{Direction, DirectionSmallVec, GridCoordinate};
use crate::errors::*;
use crate::grid::Grid;
use crate::units::{Depth, Width};

/// What happened during one step of maze generation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    CellVisited(GridCoordinate),
    /// The wall pair between two adjacent cells was removed, the first cell is the one carved from.
    WallCleared(GridCoordinate, GridCoordinate),
    /// Every neighbour of the cell has been visited, generation resumes from the cell it was entered from.
    Backtracked(GridCoordinate),
    GenerationComplete,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GenerationState {
    NotStarted,
    InProgress,
    Complete,
}

/// A cell on the exploration stack and the directions from it that are still to be tried,
/// shuffled when the cell is entered.
#[derive(Debug, Clone)]
struct Frame {
    cell: GridCoordinate,
    untried: DirectionSmallVec,
}

impl Frame {
    fn enter<R: Rng>(cell: GridCoordinate, rng: &mut R) -> Frame {
        let mut untried: DirectionSmallVec = Direction::all().iter().cloned().collect();
        untried.shuffle(rng);
        Frame { cell, untried }
    }
}

/// Carves a perfect maze into a grid it owns until generation completes or the caller gives up.
///
/// Every cell is visited exactly once and exactly `size - 1` wall pairs are cleared, so the
/// passages form a spanning tree of the grid.
pub struct MazeGenerator<R: Rng = ThreadRng> {
    grid: Grid,
    start: GridCoordinate,
    rng: R,
    state: GenerationState,
    stack: Vec<Frame>,
    pending: Option<GenerationEvent>,
}

impl<R: Rng> fmt::Debug for MazeGenerator<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MazeGenerator :: start: {}, state: {:?}, stack depth: {}, grid: {:?}",
               self.start, self.state, self.stack.len(), self.grid)
    }
}

impl<R: Rng> MazeGenerator<R> {
    /// A generator over a freshly allocated `width x depth` grid.
    pub fn new(width: Width, depth: Depth, start: GridCoordinate, rng: R) -> Result<MazeGenerator<R>> {
        let grid = Grid::allocate(width, depth)?;
        MazeGenerator::on_grid(grid, start, rng)
    }

    /// A generator over an existing, untouched grid.
    /// Fails with `InvalidState` if the start cell is not on the grid, or if any cell of the grid
    /// has already been visited or had a wall cleared.
    pub fn on_grid(grid: Grid, start: GridCoordinate, rng: R) -> Result<MazeGenerator<R>> {
        if !grid.is_valid_coordinate(start) {
            bail!(ErrorKind::InvalidState(format!("start cell {} is not on the grid", start)));
        }
        let (visited, passages) = (grid.visited_count(), grid.links_count());
        if visited != 0 || passages != 0 {
            bail!(ErrorKind::InvalidState(format!("grid already carved: {} cells visited, {} walls cleared",
                                                  visited, passages)));
        }
        let stack = Vec::with_capacity(grid.size());

        Ok(MazeGenerator {
            grid,
            start,
            rng,
            state: GenerationState::NotStarted,
            stack,
            pending: None,
        })
    }

    #[inline]
    pub fn state(&self) -> GenerationState {
        self.state
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.state == GenerationState::Complete && self.pending.is_none()
    }

    #[inline]
    pub fn start(&self) -> GridCoordinate {
        self.start
    }

    /// The maze as carved so far.
    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// How many cells are waiting to be backtracked to.
    #[inline]
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Stop generating and take the grid. Whatever has been carved so far is kept: every visited
    /// cell is connected to the start and no unvisited cell has had a wall removed.
    pub fn into_grid(self) -> Grid {
        self.grid
    }

    /// Run every remaining step and return the finished maze.
    pub fn generate(mut self) -> Grid {
        while self.step().is_some() {}
        self.grid
    }

    /// Do one unit of generation work.
    /// Returns None once `GenerationComplete` has been reported.
    pub fn step(&mut self) -> Option<GenerationEvent> {
        if let Some(event) = self.pending.take() {
            trace!("{:?}", event);
            return Some(event);
        }

        let event = match self.state {
            GenerationState::NotStarted => {
                debug!("Generating a {}x{} maze from {}", self.grid.width().0, self.grid.depth().0, self.start);
                let first_visit = self.grid.visit(self.start);
                debug_assert!(first_visit, "start cell {} visited twice", self.start);
                self.stack.push(Frame::enter(self.start, &mut self.rng));
                self.state = GenerationState::InProgress;
                GenerationEvent::CellVisited(self.start)
            }
            GenerationState::InProgress => self.carve_or_backtrack(),
            GenerationState::Complete => return None,
        };
        trace!("{:?}", event);
        Some(event)
    }

    fn carve_or_backtrack(&mut self) -> GenerationEvent {
        let (current, next) = {
            let grid = &self.grid;
            let frame = match self.stack.last_mut() {
                Some(frame) => frame,
                None => {
                    self.state = GenerationState::Complete;
                    debug!("Maze complete: {} cells visited, {} walls cleared",
                           grid.visited_count(), grid.links_count());
                    return GenerationEvent::GenerationComplete;
                }
            };

            // Shuffled order, so the first unvisited neighbour found is a uniform choice among
            // the unvisited neighbours.
            let mut next = None;
            while let Some(dir) = frame.untried.pop() {
                if let Some(neighbour) = grid.neighbour_at_direction(frame.cell, dir) {
                    if !grid.is_visited(neighbour) {
                        next = Some((dir, neighbour));
                        break;
                    }
                }
            }
            (frame.cell, next)
        };

        match next {
            Some((dir, neighbour)) => {
                let first_visit = self.grid.visit(neighbour);
                debug_assert!(first_visit, "cell {} visited twice", neighbour);
                let cleared = self.grid.clear_wall(current, dir);
                debug_assert_eq!(cleared, Some(neighbour));
                self.stack.push(Frame::enter(neighbour, &mut self.rng));
                self.pending = Some(GenerationEvent::WallCleared(current, neighbour));
                GenerationEvent::CellVisited(neighbour)
            }
            None => {
                let _ = self.stack.pop();
                GenerationEvent::Backtracked(current)
            }
        }
    }
}

impl<R: Rng> Iterator for MazeGenerator<R> {
    type Item = GenerationEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.step()
    }
}

/// A steppable maze generation over a new `width x depth` grid using the thread local random
/// number generator.
pub fn generate_maze(width: Width, depth: Depth, start: GridCoordinate) -> Result<MazeGenerator<ThreadRng>> {
    MazeGenerator::new(width, depth, start, rand::thread_rng())
}

/// Apply the recursive backtracker maze generation algorithm to a new grid, starting in the
/// `(0, 0)` corner, and return the finished maze.
pub fn recursive_backtracker(width: Width, depth: Depth) -> Result<Grid> {
    Ok(generate_maze(width, depth, GridCoordinate::new(0, 0))?.generate())
}


#[cfg(test)]
mod tests {

    use std::collections::VecDeque;

    use petgraph::unionfind::UnionFind;
    use quickcheck::quickcheck;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::utils::{self, FnvHashMap};

    fn gc(x: u32, z: u32) -> GridCoordinate {
        GridCoordinate::new(x, z)
    }

    fn seeded(w: usize, d: usize, seed: u64) -> MazeGenerator<StdRng> {
        MazeGenerator::new(Width(w), Depth(d), gc(0, 0), StdRng::seed_from_u64(seed))
            .expect("valid maze parameters")
    }

    /// Cells reachable from `start` through cleared walls.
    fn reachable_cells(grid: &Grid, start: GridCoordinate) -> usize {
        let mut seen = utils::fnv_hashset(grid.size());
        let mut queue = VecDeque::new();
        seen.insert(start);
        queue.push_back(start);
        while let Some(coord) = queue.pop_front() {
            for link in grid.links(coord).unwrap().iter() {
                if seen.insert(*link) {
                    queue.push_back(*link);
                }
            }
        }
        seen.len()
    }

    fn has_no_cycles(grid: &Grid) -> bool {
        let mut components = UnionFind::<usize>::new(grid.size());
        grid.iter_links().all(|(a, b)| {
            components.union(grid.grid_coordinate_to_index(a).unwrap(),
                             grid.grid_coordinate_to_index(b).unwrap())
        })
    }

    fn simple_paths_between(grid: &Grid, from: GridCoordinate, to: GridCoordinate) -> usize {
        fn walk(grid: &Grid, at: GridCoordinate, to: GridCoordinate, on_path: &mut Vec<GridCoordinate>) -> usize {
            if at == to {
                return 1;
            }
            let mut count = 0;
            for link in grid.links(at).unwrap().iter() {
                if !on_path.contains(link) {
                    on_path.push(*link);
                    count += walk(grid, *link, to, on_path);
                    let _ = on_path.pop();
                }
            }
            count
        }
        walk(grid, from, to, &mut vec![from])
    }

    fn assert_perfect(grid: &Grid) {
        let size = grid.size();
        assert_eq!(grid.visited_count(), size);
        assert_eq!(grid.links_count(), size - 1);
        assert_eq!(reachable_cells(grid, gc(0, 0)), size);
        assert!(has_no_cycles(grid));
        assert!(grid.is_perfect_maze());
    }

    #[test]
    fn generated_mazes_are_perfect() {
        for &(w, d) in &[(1, 1), (1, 7), (7, 1), (2, 2), (5, 5), (13, 4), (30, 30)] {
            for seed in 0..3 {
                assert_perfect(&seeded(w, d, seed).generate());
            }
        }
    }

    #[test]
    fn thread_rng_mazes_are_perfect() {
        let g = recursive_backtracker(Width(16), Depth(9)).unwrap();
        assert_perfect(&g);
    }

    #[test]
    fn exactly_one_simple_path_between_every_pair() {
        let g = seeded(3, 3, 11).generate();
        let cells = g.iter().collect::<Vec<_>>();
        for a in &cells {
            for b in &cells {
                assert_eq!(simple_paths_between(&g, *a, *b), 1, "{} -> {}", a, b);
            }
        }
    }

    #[test]
    fn large_mazes_do_not_recurse() {
        let g = seeded(300, 300, 5).generate();
        assert_eq!(g.visited_count(), 90_000);
        assert_eq!(g.links_count(), 89_999);
    }

    #[test]
    fn event_stream_accounts_for_every_cell() {
        let (w, d) = (6, 4);
        let events = seeded(w, d, 3).collect::<Vec<_>>();
        let count = |pred: fn(&GenerationEvent) -> bool| events.iter().filter(|e| pred(e)).count();

        assert_eq!(count(|e| matches!(e, GenerationEvent::CellVisited(_))), w * d);
        assert_eq!(count(|e| matches!(e, GenerationEvent::WallCleared(_, _))), w * d - 1);
        assert_eq!(count(|e| matches!(e, GenerationEvent::Backtracked(_))), w * d);
        assert_eq!(count(|e| matches!(e, GenerationEvent::GenerationComplete)), 1);
        assert_eq!(events.first(), Some(&GenerationEvent::CellVisited(gc(0, 0))));
        assert_eq!(events.last(), Some(&GenerationEvent::GenerationComplete));
    }

    #[test]
    fn walls_are_cleared_between_the_cell_carved_from_and_the_new_cell() {
        let events = seeded(5, 5, 8).collect::<Vec<_>>();
        for pair in events.windows(2) {
            if let GenerationEvent::CellVisited(visited) = pair[0] {
                if let GenerationEvent::WallCleared(from, to) = pair[1] {
                    assert_eq!(to, visited);
                    assert_eq!(from.manhattan_distance(to), 1);
                }
            }
        }
    }

    #[test]
    fn stepping_through_states() {
        let mut generator = seeded(2, 1, 0);
        assert_eq!(generator.state(), GenerationState::NotStarted);

        assert_eq!(generator.step(), Some(GenerationEvent::CellVisited(gc(0, 0))));
        assert_eq!(generator.state(), GenerationState::InProgress);
        assert_eq!(generator.step(), Some(GenerationEvent::CellVisited(gc(1, 0))));
        assert_eq!(generator.step(), Some(GenerationEvent::WallCleared(gc(0, 0), gc(1, 0))));
        assert_eq!(generator.stack_depth(), 2);
        assert_eq!(generator.step(), Some(GenerationEvent::Backtracked(gc(1, 0))));
        assert_eq!(generator.step(), Some(GenerationEvent::Backtracked(gc(0, 0))));
        assert!(!generator.is_complete());
        assert_eq!(generator.step(), Some(GenerationEvent::GenerationComplete));
        assert!(generator.is_complete());
        assert_eq!(generator.step(), None);
        assert_eq!(generator.step(), None);
    }

    #[test]
    fn abandoned_generation_leaves_a_consistent_grid() {
        for steps in &[0, 1, 5, 17, 40] {
            let mut generator = seeded(8, 8, 21);
            for _ in 0..*steps {
                let _ = generator.step();
            }
            let g = generator.into_grid();
            let visited = g.visited_count();
            // The carved part is a tree spanning exactly the visited cells
            assert_eq!(g.links_count(), visited.saturating_sub(1));
            assert!(has_no_cycles(&g));
            if visited > 0 {
                assert_eq!(reachable_cells(&g, gc(0, 0)), visited);
            }
        }
    }

    #[test]
    fn same_seed_same_maze() {
        let a = seeded(10, 10, 1234).collect::<Vec<_>>();
        let b = seeded(10, 10, 1234).collect::<Vec<_>>();
        assert_eq!(a, b);
    }

    /// How often each cell is the first one carved into after `start`.
    fn first_carve_counts(w: usize, d: usize, start: GridCoordinate, trials: u64) -> FnvHashMap<GridCoordinate, u32> {
        let mut counts = utils::fnv_hashmap(4);
        for seed in 0..trials {
            let mut generator = MazeGenerator::new(Width(w), Depth(d), start, StdRng::seed_from_u64(seed)).unwrap();
            let _ = generator.step();
            if let Some(GenerationEvent::CellVisited(first)) = generator.step() {
                *counts.entry(first).or_insert(0) += 1;
            }
        }
        counts
    }

    #[test]
    fn unvisited_neighbours_are_chosen_uniformly() {
        // From the middle of a 3x1 corridor the first carve goes left or right.
        let mut lefts = 0;
        let trials = 2000;
        for seed in 0..trials {
            let mut generator = MazeGenerator::new(Width(3), Depth(1), gc(1, 0), StdRng::seed_from_u64(seed)).unwrap();
            let _ = generator.step();
            if generator.step() == Some(GenerationEvent::CellVisited(gc(0, 0))) {
                lefts += 1;
            }
        }
        assert!(lefts > 850 && lefts < 1150, "{} of {} went left", lefts, trials);
    }

    #[test]
    fn four_way_first_choice_is_uniform() {
        let counts = first_carve_counts(3, 3, gc(1, 1), 4000);
        assert_eq!(counts.len(), 4);
        for neighbour in &[gc(0, 1), gc(2, 1), gc(1, 0), gc(1, 2)] {
            let n = counts[neighbour];
            assert!(n > 850 && n < 1150, "{} chosen {} times out of 4000", neighbour, n);
        }
    }

    #[test]
    fn three_way_first_choice_is_uniform() {
        let counts = first_carve_counts(3, 2, gc(1, 0), 3000);
        assert_eq!(counts.len(), 3);
        for neighbour in &[gc(0, 0), gc(2, 0), gc(1, 1)] {
            let n = counts[neighbour];
            assert!(n > 850 && n < 1150, "{} chosen {} times out of 3000", neighbour, n);
        }
    }

    #[test]
    fn starting_from_any_cell() {
        let g = MazeGenerator::new(Width(7), Depth(5), gc(4, 3), StdRng::seed_from_u64(2)).unwrap().generate();
        assert_perfect(&g);
    }

    #[test]
    fn zero_size_is_an_invalid_dimension() {
        match MazeGenerator::new(Width(0), Depth(3), gc(0, 0), StdRng::seed_from_u64(0)) {
            Err(Error(ErrorKind::InvalidDimension(0, 3), _)) => {}
            other => panic!("expected InvalidDimension, got {:?}", other),
        }
    }

    #[test]
    fn start_must_be_on_the_grid() {
        match generate_maze(Width(3), Depth(3), gc(3, 0)) {
            Err(Error(ErrorKind::InvalidState(_), _)) => {}
            other => panic!("expected InvalidState, got {:?}", other),
        }
    }

    #[test]
    fn regenerating_a_visited_grid_is_invalid() {
        let g = seeded(4, 4, 9).generate();
        match MazeGenerator::on_grid(g, gc(0, 0), StdRng::seed_from_u64(9)) {
            Err(Error(ErrorKind::InvalidState(_), _)) => {}
            other => panic!("expected InvalidState, got {:?}", other),
        }
    }

    #[test]
    fn partly_carved_grid_is_invalid() {
        // The start cell itself is still unvisited
        let mut generator = MazeGenerator::new(Width(4), Depth(1), gc(3, 0), StdRng::seed_from_u64(1)).unwrap();
        for _ in 0..3 {
            let _ = generator.step();
        }
        let g = generator.into_grid();
        assert_eq!(g.visited_count(), 2);
        assert!(!g.is_visited(gc(0, 0)));
        match MazeGenerator::on_grid(g, gc(0, 0), StdRng::seed_from_u64(1)) {
            Err(Error(ErrorKind::InvalidState(_), _)) => {}
            other => panic!("expected InvalidState, got {:?}", other),
        }
    }

    #[test]
    fn grid_with_cleared_walls_is_invalid() {
        let mut g = Grid::allocate(Width(2), Depth(2)).unwrap();
        g.clear_wall_between(gc(0, 0), gc(1, 0)).unwrap();
        g.clear_wall_between(gc(0, 1), gc(1, 1)).unwrap();
        assert_eq!(g.visited_count(), 0);
        match MazeGenerator::on_grid(g, gc(0, 0), StdRng::seed_from_u64(1)) {
            Err(Error(ErrorKind::InvalidState(_), _)) => {}
            other => panic!("expected InvalidState, got {:?}", other),
        }
    }

    #[test]
    fn untouched_grid_is_accepted() {
        let g = Grid::allocate(Width(3), Depth(3)).unwrap();
        let maze = MazeGenerator::on_grid(g, gc(2, 2), StdRng::seed_from_u64(3)).unwrap().generate();
        assert_perfect(&maze);
    }

    #[test]
    fn quickcheck_mazes_are_perfect() {
        fn p(w: u8, d: u8, seed: u64) -> bool {
            let (w, d) = (1 + (w % 20) as usize, 1 + (d % 20) as usize);
            let g = seeded(w, d, seed).generate();
            g.visited_count() == w * d && g.links_count() == w * d - 1 && has_no_cycles(&g) &&
            reachable_cells(&g, gc(0, 0)) == w * d
        }
        quickcheck(p as fn(u8, u8, u64) -> bool)
    }
}
