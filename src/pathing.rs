use std::cmp::Ordering;
use std::collections::hash_map::Entry::{Occupied, Vacant};
use std::collections::BinaryHeap;
use std::fmt::{Debug, Display, LowerHex};
use std::ops::Add;

use error_chain::bail;
use log::{debug, info, warn};
use num::traits::{Bounded, One, Unsigned, Zero};
use smallvec::SmallVec;

use crate::cells::{CoordinateSmallVec, Direction, GridCoordinate};
use crate::errors::*;
use crate::grid::Grid;
use crate::utils::{self, FnvHashMap, FnvHashSet};


/// An ordered walk through the maze from a start cell to a goal cell, both inclusive.
/// Consecutive waypoints are orthogonal neighbours with no wall between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    waypoints: Vec<GridCoordinate>,
}

impl Route {
    pub fn new(waypoints: Vec<GridCoordinate>) -> Route {
        Route { waypoints }
    }

    #[inline]
    pub fn waypoints(&self) -> &[GridCoordinate] {
        &self.waypoints
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// The number of moves between cells needed to walk the route.
    #[inline]
    pub fn hops(&self) -> usize {
        self.waypoints.len().saturating_sub(1)
    }

    pub fn start(&self) -> Option<GridCoordinate> {
        self.waypoints.first().cloned()
    }

    pub fn goal(&self) -> Option<GridCoordinate> {
        self.waypoints.last().cloned()
    }

    /// Can the route actually be walked on this grid: every step is to an adjacent cell through
    /// a cleared wall.
    pub fn is_walkable_on(&self, grid: &Grid) -> bool {
        self.waypoints.iter().all(|coord| grid.is_valid_coordinate(*coord)) &&
        self.waypoints.windows(2).all(|step| grid.is_linked(step[0], step[1]))
    }

    pub fn into_waypoints(self) -> Vec<GridCoordinate> {
        self.waypoints
    }
}

impl AsRef<[GridCoordinate]> for Route {
    fn as_ref(&self) -> &[GridCoordinate] {
        &self.waypoints
    }
}

impl<'a> IntoIterator for &'a Route {
    type Item = &'a GridCoordinate;
    type IntoIter = std::slice::Iter<'a, GridCoordinate>;

    fn into_iter(self) -> Self::IntoIter {
        self.waypoints.iter()
    }
}

/// Manhattan distance, admissible and consistent on a 4-connected grid with unit step costs.
#[inline]
pub fn heuristic(from: GridCoordinate, goal: GridCoordinate) -> u32 {
    from.manhattan_distance(goal)
}

/// Neighbours reachable from `coord` in one step, probed Right, Left, Front then Back.
pub fn walkable_neighbours(grid: &Grid, coord: GridCoordinate) -> CoordinateSmallVec {
    Direction::all()
        .iter()
        .filter(|dir| !grid.has_wall(coord, **dir))
        .filter_map(|dir| grid.neighbour_at_direction(coord, *dir))
        .collect()
}

#[derive(Debug, Clone)]
struct AStarNode {
    coordinate: GridCoordinate,
    g_cost: u32,
    h_cost: u32,
    parent: Option<usize>,
}

impl AStarNode {
    #[inline]
    fn f_cost(&self) -> u32 {
        self.g_cost + self.h_cost
    }
}

/// Heap entry for a node in the open set.
/// `order` is the node's arena index, i.e. when it first joined the open set, which keeps the
/// expansion order deterministic among equal (f, h) costs.
/// An entry is stale once its node has been closed or its g cost lowered.
#[derive(Debug, Eq, PartialEq)]
struct OpenEntry {
    f_cost: u32,
    h_cost: u32,
    order: usize,
    g_cost: u32,
}

impl OpenEntry {
    fn for_node(index: usize, node: &AStarNode) -> OpenEntry {
        OpenEntry {
            f_cost: node.f_cost(),
            h_cost: node.h_cost,
            order: index,
            g_cost: node.g_cost,
        }
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max heap, reverse everything so the cheapest entry is on top.
        (other.f_cost, other.h_cost, other.order, other.g_cost)
            .cmp(&(self.f_cost, self.h_cost, self.order, self.g_cost))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn reconstruct_route(nodes: &[AStarNode], goal_index: usize) -> Route {
    let mut waypoints: Vec<GridCoordinate> = itertools::unfold(Some(goal_index), |index| {
        index.map(|i| {
            let node = &nodes[i];
            *index = node.parent;
            node.coordinate
        })
    })
    .collect();
    waypoints.reverse();
    Route::new(waypoints)
}

/// A* search for the shortest walkable route from `start` to `goal`, measured in hops.
///
/// The open node with the lowest f cost is expanded first, ties broken by the lowest h cost and
/// then by the order nodes were discovered, so the same maze always gives the same route.
///
/// Fails with `InvalidState` if either end is off the grid and with `NoPathFound` when the goal is
/// unreachable. On a maze built by the generator the goal is always reachable.
pub fn find_path(grid: &Grid, start: GridCoordinate, goal: GridCoordinate) -> Result<Route> {
    if !grid.is_valid_coordinate(start) || !grid.is_valid_coordinate(goal) {
        bail!(ErrorKind::InvalidState(format!("route end points {} and {} must both be on the grid", start, goal)));
    }

    let mut nodes: Vec<AStarNode> = Vec::new();
    let mut open_nodes: FnvHashMap<GridCoordinate, usize> = utils::fnv_hashmap(grid.size());
    let mut closed: FnvHashSet<GridCoordinate> = utils::fnv_hashset(grid.size());
    let mut open = BinaryHeap::new();

    nodes.push(AStarNode {
        coordinate: start,
        g_cost: 0,
        h_cost: heuristic(start, goal),
        parent: None,
    });
    open_nodes.insert(start, 0);
    open.push(OpenEntry::for_node(0, &nodes[0]));

    while let Some(entry) = open.pop() {
        let current_index = entry.order;
        let (current, current_g) = {
            let node = &nodes[current_index];
            (node.coordinate, node.g_cost)
        };
        if closed.contains(&current) || entry.g_cost != current_g {
            continue;
        }

        if current == goal {
            let route = reconstruct_route(&nodes, current_index);
            info!("Route found from {} to {} with {} steps, {} cells expanded",
                  start, goal, route.len(), closed.len());
            return Ok(route);
        }

        let _ = open_nodes.remove(&current);
        closed.insert(current);

        for neighbour in walkable_neighbours(grid, current).iter().cloned() {
            if closed.contains(&neighbour) {
                continue;
            }
            let tentative_g = current_g + 1;

            match open_nodes.entry(neighbour) {
                Vacant(e) => {
                    let index = nodes.len();
                    nodes.push(AStarNode {
                        coordinate: neighbour,
                        g_cost: tentative_g,
                        h_cost: heuristic(neighbour, goal),
                        parent: Some(current_index),
                    });
                    e.insert(index);
                    open.push(OpenEntry::for_node(index, &nodes[index]));
                }
                Occupied(e) => {
                    let index = *e.get();
                    if tentative_g < nodes[index].g_cost {
                        nodes[index].g_cost = tentative_g;
                        nodes[index].parent = Some(current_index);
                        open.push(OpenEntry::for_node(index, &nodes[index]));
                    }
                }
            }
        }
    }

    warn!("No route from {} to {} after expanding {} cells, is the maze fully connected?",
          start, goal, closed.len());
    Err(ErrorKind::NoPathFound(start, goal).into())
}


/// Unsigned integer types that can count passage steps. Blanket implemented, it only names the
/// bounds `Distances` needs.
pub trait MaxDistance
    : Zero + One + Bounded + Unsigned + Add + Debug + Clone + Copy + Display + LowerHex + Ord
    {
}
impl<T: Zero + One + Bounded + Unsigned + Add + Debug + Clone + Copy + Display + LowerHex + Ord> MaxDistance for T {}

/// Breadth first flood fill of passage distances from one start cell to every reachable cell.
#[derive(Debug, Clone)]
pub struct Distances<MaxDistanceT = u32> {
    start_coordinate: GridCoordinate,
    distances: FnvHashMap<GridCoordinate, MaxDistanceT>,
    max_distance: MaxDistanceT,
}

impl<MaxDistanceT> Distances<MaxDistanceT>
    where MaxDistanceT: MaxDistance
{
    /// None if the start coordinate is not on the grid.
    pub fn for_grid(grid: &Grid, start_coordinate: GridCoordinate) -> Option<Distances<MaxDistanceT>> {

        if !grid.is_valid_coordinate(start_coordinate) {
            return None;
        }

        let mut max = Zero::zero();
        let mut distances = utils::fnv_hashmap(grid.size());
        distances.insert(start_coordinate, Zero::zero());

        // Every step is one more than the previous cell, so the first time a cell is reached is
        // by a shortest route and the map doubles as the visited set.
        let mut frontier = vec![start_coordinate];
        while !frontier.is_empty() {

            let mut new_frontier = vec![];
            for cell_coord in &frontier {

                let distance_to_cell: MaxDistanceT = distances[cell_coord];
                if distance_to_cell > max {
                    max = distance_to_cell;
                }

                let links = grid.links(*cell_coord).unwrap_or_default();
                for link_coordinate in links.iter() {
                    if !distances.contains_key(link_coordinate) {
                        distances.insert(*link_coordinate, distance_to_cell + One::one());
                        new_frontier.push(*link_coordinate);
                    }
                }
            }
            frontier = new_frontier;
        }
        debug!("Distances from {} reach {} cells, furthest {}", start_coordinate, distances.len(), max);

        Some(Distances {
            start_coordinate,
            distances,
            max_distance: max,
        })
    }

    #[inline(always)]
    pub fn start(&self) -> GridCoordinate {
        self.start_coordinate
    }

    #[inline(always)]
    pub fn max(&self) -> MaxDistanceT {
        self.max_distance
    }

    /// None for cells that cannot be reached from the start or are not on the grid.
    #[inline(always)]
    pub fn distance_from_start_to(&self, coord: GridCoordinate) -> Option<MaxDistanceT> {
        self.distances.get(&coord).cloned()
    }

    pub fn reachable_count(&self) -> usize {
        self.distances.len()
    }

    pub fn furthest_points_on_grid(&self) -> SmallVec<[GridCoordinate; 8]> {
        let furthest_distance = self.max();
        let mut furthest = self.distances
            .iter()
            .filter(|&(_, distance)| *distance == furthest_distance)
            .map(|(coord, _)| *coord)
            .collect::<SmallVec<[GridCoordinate; 8]>>();
        furthest.sort();
        furthest
    }
}

/// Walk back down the distance gradient from `end_point` to the start of `distances_from_start`.
/// None if the end point is not reachable.
pub fn shortest_path<MaxDistanceT>(grid: &Grid,
                                   distances_from_start: &Distances<MaxDistanceT>,
                                   end_point: GridCoordinate)
                                   -> Option<Route>
    where MaxDistanceT: MaxDistance
{
    distances_from_start.distance_from_start_to(end_point)?;

    let mut path = vec![end_point];
    let start = distances_from_start.start();
    let mut current_coord = end_point;

    while current_coord != start {

        let current_distance_to_start = distances_from_start.distance_from_start_to(current_coord)?;

        let closest_to_start = grid.links(current_coord)?
            .iter()
            .filter_map(|coord| {
                distances_from_start.distance_from_start_to(*coord).map(|d| (*coord, d))
            })
            .min_by_key(|&(_, distance)| distance);

        match closest_to_start {
            Some((closer_coord, closer_distance)) if closer_distance < current_distance_to_start => {
                current_coord = closer_coord;
                path.push(current_coord);
            }
            // No linked neighbour is any closer, the distances do not belong to this grid.
            _ => return None,
        }
    }

    path.reverse();
    Some(Route::new(path))
}
