//! Continuous movement of an agent along a maze route.
//!
//! Waypoints are the centres of route cells, a cell `(x, z)` sits at the point `(x, z)` so
//! neighbouring waypoints are one unit apart.
use std::fmt;
use std::rc::Rc;

use error_chain::bail;
use log::{debug, trace};

use crate::cells::GridCoordinate;
use crate::errors::*;
use crate::pathing::Route;
use crate::units::Speed;

/// Default walking speed, in cells per second.
pub const DEFAULT_AGENT_SPEED: Speed = Speed(2.0);
/// How close the agent must be to a waypoint before it snaps onto it.
pub const WAYPOINT_EPSILON: f64 = 0.01;
/// Simulation tick used by the driver when none is given.
pub const DEFAULT_TICK_SECONDS: f64 = 1.0 / 60.0;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, z: f64) -> Point {
        Point { x, z }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.z - self.z)
    }

    /// Move in a straight line towards `target` by at most `max_delta`, never overshooting.
    pub fn move_towards(&self, target: Point, max_delta: f64) -> Point {
        let distance = self.distance_to(target);
        if distance <= max_delta || distance == 0.0 {
            target
        } else {
            let fraction = max_delta / distance;
            Point {
                x: self.x + (target.x - self.x) * fraction,
                z: self.z + (target.z - self.z) * fraction,
            }
        }
    }
}

impl From<GridCoordinate> for Point {
    fn from(coord: GridCoordinate) -> Point {
        Point::new(f64::from(coord.x), f64::from(coord.z))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.z)
    }
}

/// Snapshot of an agent walking a route.
///
/// `clock` is the elapsed time the snapshot was taken at, advancing a state to the same time
/// again leaves it unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentState {
    position: Point,
    route: Rc<Route>,
    next_waypoint: usize,
    clock: f64,
}

impl AgentState {
    #[inline]
    pub fn position(&self) -> Point {
        self.position
    }

    #[inline]
    pub fn route(&self) -> &Route {
        &self.route
    }

    #[inline]
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Index into the route of the waypoint being walked towards.
    /// Equal to the route length once the goal is reached.
    #[inline]
    pub fn next_waypoint_index(&self) -> usize {
        self.next_waypoint
    }

    pub fn next_waypoint(&self) -> Option<GridCoordinate> {
        self.route.waypoints().get(self.next_waypoint).cloned()
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.next_waypoint >= self.route.len()
    }
}

/// Moves agents along routes at a constant speed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AgentMover {
    speed: Speed,
}

impl Default for AgentMover {
    fn default() -> AgentMover {
        AgentMover { speed: DEFAULT_AGENT_SPEED }
    }
}

impl AgentMover {
    pub fn new(speed: Speed) -> Result<AgentMover> {
        let Speed(s) = speed;
        if !s.is_finite() || s <= 0.0 {
            bail!(ErrorKind::InvalidSpeed(s));
        }
        Ok(AgentMover { speed })
    }

    #[inline]
    pub fn speed(&self) -> Speed {
        self.speed
    }

    /// Place an agent on the first waypoint of the route at time zero.
    pub fn start(&self, route: Route) -> Result<AgentState> {
        let position = match route.start() {
            Some(first) => Point::from(first),
            None => bail!(ErrorKind::InvalidState(String::from("cannot walk an empty route"))),
        };

        Ok(AgentState {
            position,
            route: Rc::new(route),
            next_waypoint: 1,
            clock: 0.0,
        })
    }

    /// Seconds needed to walk the whole route.
    pub fn time_to_traverse(&self, route: &Route) -> f64 {
        let length = route.waypoints()
                          .windows(2)
                          .map(|pair| Point::from(pair[0]).distance_to(Point::from(pair[1])))
                          .sum::<f64>();
        length / self.speed.0
    }

    /// The agent's state at `elapsed` seconds since the start of the walk.
    ///
    /// The distance covered since the state's clock is spent on as many waypoints as it
    /// reaches, so the result does not depend on how finely the walk is sliced.
    pub fn advance(&self, state: &AgentState, elapsed: f64) -> AgentState {
        if !(elapsed > state.clock) {
            return state.clone();
        }

        let waypoints = state.route.waypoints();
        let mut budget = self.speed.0 * (elapsed - state.clock);
        let mut position = state.position;
        let mut next_waypoint = state.next_waypoint;

        while next_waypoint < waypoints.len() {
            let target = Point::from(waypoints[next_waypoint]);
            let remaining = position.distance_to(target);
            if remaining - budget <= WAYPOINT_EPSILON {
                budget = (budget - remaining).max(0.0);
                position = target;
                next_waypoint += 1;
            } else {
                position = position.move_towards(target, budget);
                break;
            }
        }

        AgentState {
            position,
            route: Rc::clone(&state.route),
            next_waypoint,
            clock: elapsed,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MovementEvent {
    PositionUpdated(Point),
    /// The final waypoint was reached, reported once.
    GoalReached(Point),
}

/// Walks one route a tick at a time.
#[derive(Debug, Clone)]
pub struct PathFollower {
    mover: AgentMover,
    state: AgentState,
    elapsed: f64,
    goal_reported: bool,
}

impl PathFollower {
    pub fn new(mover: AgentMover, route: Route) -> Result<PathFollower> {
        let state = mover.start(route)?;
        Ok(PathFollower {
            mover,
            state,
            elapsed: 0.0,
            goal_reported: false,
        })
    }

    #[inline]
    pub fn state(&self) -> &AgentState {
        &self.state
    }

    #[inline]
    pub fn position(&self) -> Point {
        self.state.position
    }

    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.goal_reported
    }

    /// Advance the walk by `dt` seconds.
    /// Returns None after `GoalReached` has been emitted. A non positive `dt` reports the
    /// current position without moving.
    pub fn step(&mut self, dt: f64) -> Option<MovementEvent> {
        if self.goal_reported {
            return None;
        }

        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
            self.state = self.mover.advance(&self.state, self.elapsed);
        }

        let position = self.state.position;
        if self.state.is_finished() {
            self.goal_reported = true;
            debug!("Goal reached at {} after {:.2}s", position, self.elapsed);
            Some(MovementEvent::GoalReached(position))
        } else {
            trace!("Agent at {} heading for {:?}", position, self.state.next_waypoint());
            Some(MovementEvent::PositionUpdated(position))
        }
    }
}

impl Iterator for PathFollower {
    type Item = MovementEvent;

    /// Steps with the default tick.
    fn next(&mut self) -> Option<Self::Item> {
        self.step(DEFAULT_TICK_SECONDS)
    }
}

/// A tick driven walk along `route` at `speed`.
pub fn follow_path(route: Route, speed: Speed) -> Result<PathFollower> {
    PathFollower::new(AgentMover::new(speed)?, route)
}


#[cfg(test)]
mod tests {

    use quickcheck::{quickcheck, TestResult};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::generators::MazeGenerator;
    use crate::pathing::find_path;
    use crate::units::{Depth, Width};

    fn gc(x: u32, z: u32) -> GridCoordinate {
        GridCoordinate::new(x, z)
    }

    fn route(coords: &[(u32, u32)]) -> Route {
        Route::new(coords.iter().map(|&c| GridCoordinate::from(c)).collect())
    }

    fn approx_eq(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.z - b.z).abs() < 1e-9
    }

    fn on_route(point: Point, route: &Route) -> bool {
        const SLACK: f64 = 1e-9;
        route.waypoints().windows(2).any(|pair| {
            let (a, b) = (Point::from(pair[0]), Point::from(pair[1]));
            point.x >= a.x.min(b.x) - SLACK && point.x <= a.x.max(b.x) + SLACK &&
            point.z >= a.z.min(b.z) - SLACK && point.z <= a.z.max(b.z) + SLACK
        })
    }

    fn maze_route(w: usize, d: usize, seed: u64) -> Route {
        let g = MazeGenerator::new(Width(w), Depth(d), gc(0, 0), StdRng::seed_from_u64(seed))
            .expect("valid maze parameters")
            .generate();
        find_path(&g, gc(0, 0), gc(w as u32 - 1, d as u32 - 1)).expect("perfect mazes are connected")
    }

    #[test]
    fn speed_must_be_positive_and_finite() {
        for &s in &[0.0, -1.0, ::std::f64::NAN, ::std::f64::INFINITY] {
            match AgentMover::new(Speed(s)) {
                Err(Error(ErrorKind::InvalidSpeed(_), _)) => {}
                other => panic!("expected InvalidSpeed for {}, got {:?}", s, other),
            }
        }
        assert_eq!(AgentMover::new(Speed(0.5)).unwrap().speed(), Speed(0.5));
        assert_eq!(AgentMover::default().speed(), DEFAULT_AGENT_SPEED);
    }

    #[test]
    fn empty_route_cannot_be_walked() {
        match AgentMover::default().start(Route::new(vec![])) {
            Err(Error(ErrorKind::InvalidState(_), _)) => {}
            other => panic!("expected InvalidState, got {:?}", other),
        }
    }

    #[test]
    fn agent_starts_on_the_first_waypoint() {
        let state = AgentMover::default().start(route(&[(2, 3), (3, 3)])).unwrap();
        assert_eq!(state.position(), Point::new(2.0, 3.0));
        assert_eq!(state.next_waypoint(), Some(gc(3, 3)));
        assert_eq!(state.clock(), 0.0);
        assert!(!state.is_finished());
    }

    #[test]
    fn moves_at_constant_speed() {
        let mover = AgentMover::default();
        let state = mover.start(route(&[(0, 0), (1, 0)])).unwrap();
        let state = mover.advance(&state, 0.25);
        assert!(approx_eq(state.position(), Point::new(0.5, 0.0)));
        assert!(!state.is_finished());
    }

    #[test]
    fn leftover_distance_carries_round_corners() {
        let mover = AgentMover::default();
        let state = mover.start(route(&[(0, 0), (1, 0), (1, 1)])).unwrap();
        let state = mover.advance(&state, 0.75);
        assert!(approx_eq(state.position(), Point::new(1.0, 0.5)));
        assert_eq!(state.next_waypoint_index(), 2);
    }

    #[test]
    fn snaps_onto_waypoints_within_epsilon() {
        let mover = AgentMover::new(Speed(1.0)).unwrap();
        let state = mover.start(route(&[(0, 0), (1, 0), (2, 0)])).unwrap();
        let state = mover.advance(&state, 0.995);
        assert_eq!(state.position(), Point::new(1.0, 0.0));
        assert_eq!(state.next_waypoint(), Some(gc(2, 0)));
    }

    #[test]
    fn ends_exactly_on_the_goal() {
        let mover = AgentMover::new(Speed(3.0)).unwrap();
        let state = mover.start(route(&[(0, 0), (0, 1), (1, 1), (1, 2)])).unwrap();
        let state = mover.advance(&state, 100.0);
        assert_eq!(state.position(), Point::new(1.0, 2.0));
        assert!(state.is_finished());
        assert_eq!(state.next_waypoint(), None);
    }

    #[test]
    fn advancing_to_the_same_time_is_idempotent() {
        let mover = AgentMover::default();
        let start = mover.start(route(&[(0, 0), (1, 0), (1, 1)])).unwrap();
        let once = mover.advance(&start, 0.6);
        let twice = mover.advance(&once, 0.6);
        assert_eq!(once, twice);
        let earlier = mover.advance(&once, 0.1);
        assert_eq!(once, earlier);
    }

    #[test]
    fn trajectory_does_not_depend_on_call_granularity() {
        let mover = AgentMover::default();
        let r = route(&[(0, 0), (1, 0), (1, 1), (2, 1), (2, 2)]);
        let start = mover.start(r).unwrap();

        let single = mover.advance(&start, 1.3);
        let mut sliced = start.clone();
        for i in 1..=13 {
            sliced = mover.advance(&sliced, f64::from(i) * 0.1);
        }
        assert!((single.position().x - sliced.position().x).abs() < 1e-6);
        assert!((single.position().z - sliced.position().z).abs() < 1e-6);
        assert_eq!(single.next_waypoint_index(), sliced.next_waypoint_index());
    }

    #[test]
    fn time_to_traverse_is_route_length_over_speed() {
        let mover = AgentMover::new(Speed(4.0)).unwrap();
        assert_eq!(mover.time_to_traverse(&route(&[(0, 0), (1, 0), (1, 1)])), 0.5);
        assert_eq!(mover.time_to_traverse(&route(&[(3, 3)])), 0.0);
    }

    #[test]
    fn single_waypoint_route_reaches_the_goal_immediately() {
        let mut follower = follow_path(route(&[(4, 4)]), DEFAULT_AGENT_SPEED).unwrap();
        assert_eq!(follower.step(DEFAULT_TICK_SECONDS), Some(MovementEvent::GoalReached(Point::new(4.0, 4.0))));
        assert_eq!(follower.step(DEFAULT_TICK_SECONDS), None);
    }

    #[test]
    fn non_positive_ticks_do_not_move() {
        let mut follower = follow_path(route(&[(0, 0), (1, 0)]), DEFAULT_AGENT_SPEED).unwrap();
        assert_eq!(follower.step(0.0), Some(MovementEvent::PositionUpdated(Point::new(0.0, 0.0))));
        assert_eq!(follower.step(-1.0), Some(MovementEvent::PositionUpdated(Point::new(0.0, 0.0))));
        assert_eq!(follower.elapsed(), 0.0);
    }

    #[test]
    fn following_a_maze_route() {
        let r = maze_route(5, 5, 42);
        let expected_time = AgentMover::default().time_to_traverse(&r);
        let goal = Point::from(r.goal().unwrap());
        let mut follower = follow_path(r.clone(), DEFAULT_AGENT_SPEED).unwrap();

        let mut goal_events = 0;
        let mut ticks = 0;
        while let Some(event) = follower.step(DEFAULT_TICK_SECONDS) {
            ticks += 1;
            match event {
                MovementEvent::PositionUpdated(p) => {
                    assert_eq!(goal_events, 0);
                    assert!(on_route(p, &r), "{} is off the route", p);
                }
                MovementEvent::GoalReached(p) => {
                    goal_events += 1;
                    assert_eq!(p, goal);
                }
            }
        }

        assert_eq!(goal_events, 1);
        assert!(follower.is_complete());
        assert_eq!(follower.position(), goal);
        let expected_ticks = (expected_time / DEFAULT_TICK_SECONDS).ceil() as i64;
        assert!((ticks as i64 - expected_ticks).abs() <= 2, "{} ticks, expected about {}", ticks, expected_ticks);
    }

    #[test]
    fn iterating_uses_the_default_tick() {
        let mut follower = follow_path(route(&[(0, 0), (1, 0)]), Speed(1.0)).unwrap();
        let _ = follower.next();
        assert!((follower.elapsed() - DEFAULT_TICK_SECONDS).abs() < 1e-12);
        assert_eq!(follower.last(), Some(MovementEvent::GoalReached(Point::new(1.0, 0.0))));
    }

    #[test]
    fn quickcheck_positions_stay_on_the_route() {
        fn p(seed: u64, t: u16) -> TestResult {
            let r = maze_route(6, 4, seed);
            let mover = AgentMover::default();
            let state = mover.start(r.clone()).unwrap();
            let elapsed = f64::from(t) / 100.0;
            let state = mover.advance(&state, elapsed);
            if elapsed >= mover.time_to_traverse(&r) {
                TestResult::from_bool(state.is_finished() &&
                                      state.position() == Point::from(r.goal().unwrap()))
            } else {
                TestResult::from_bool(on_route(state.position(), &r))
            }
        }
        quickcheck(p as fn(u64, u16) -> TestResult)
    }
}
