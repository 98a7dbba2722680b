use docopt::Docopt;
use error_chain::bail;
use log::{debug, info};
use mazes::{
    cells::GridCoordinate,
    generators::{GenerationEvent, MazeGenerator},
    grid::Grid,
    grid_displays::{GridDisplay, RouteDisplay},
    movement::{self, AgentMover, MovementEvent, PathFollower},
    pathing,
    units::{Depth, Speed, Width},
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_derive::Deserialize;
use std::{
    fs::File,
    io,
    io::prelude::*,
    rc::Rc,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const USAGE: &str = "Mazes

Generates a perfect maze, finds the route from the (0, 0) corner to the opposite corner and
walks an agent along it.

Usage:
    mazes_driver -h | --help
    mazes_driver [(--grid-size=<n>|[--width=<w> --depth=<d>])] [--seed=<s>] [--speed=<v>] [--tick=<t>] [--text-out=<path>] [--show-distances] [--quiet-walk]

Options:
    -h --help              Show this screen.
    --grid-size=<n>        The grid size is n * n.
    --width=<w>            The grid width in a w*d grid [default: 10].
    --depth=<d>            The grid depth in a w*d grid [default: 10].
    --seed=<s>             Seed for the maze generator, random when not given.
    --speed=<v>            Agent speed in cells per second [default: 2.0].
    --tick=<t>             Simulation tick in seconds, defaults to 1/60.
    --text-out=<path>      Output file path for a textual rendering of the maze instead of stdout.
    --show-distances       Show the distance from the start to every cell instead of the route.
    --quiet-walk           Only report the end of the walk, not every waypoint reached.

The log level is taken from RUST_LOG, info when unset.
";
#[derive(Debug, Deserialize)]
struct MazeArgs {
    flag_grid_size: Option<usize>,
    flag_width: usize,
    flag_depth: usize,
    flag_seed: Option<u64>,
    flag_speed: f64,
    flag_tick: Option<f64>,
    flag_text_out: String,
    flag_show_distances: bool,
    flag_quiet_walk: bool,
}

mod errors {
    // Create the Error, ErrorKind, ResultExt, and Result types
    use error_chain::*;
    error_chain! {

        links {
            Maze(::mazes::errors::Error, ::mazes::errors::ErrorKind);
        }

        foreign_links {
            DocOptFailure(::docopt::Error);
            Io(::std::io::Error);
        }
    }
}
use crate::errors::*;

fn main() -> Result<()> {

    let args: MazeArgs = Docopt::new(USAGE).and_then(|d| d.deserialize())?;

    init_logging();

    let (width, depth) = if let Some(square_grid_size) = args.flag_grid_size {
        (square_grid_size, square_grid_size)
    } else {
        (args.flag_width, args.flag_depth)
    };
    let seed = args.flag_seed.unwrap_or_else(|| rand::thread_rng().gen());
    info!("Maze {}x{} with seed {}", width, depth, seed);

    let mut maze_grid = generate(width, depth, seed)?;

    let start = GridCoordinate::new(0, 0);
    let goal = GridCoordinate::new(width as u32 - 1, depth as u32 - 1);
    let route = pathing::find_path(&maze_grid, start, goal)
        .chain_err(|| format!("Failed to find a route through the {}x{} maze", width, depth))?;

    set_maze_griddisplay(&mut maze_grid, &args, start, &route)?;
    if args.flag_text_out.is_empty() {
        println!("{}", maze_grid);
    } else {
        write_text_to_file(&format!("{}", maze_grid), &args.flag_text_out)
            .chain_err(|| format!("Failed to write maze to text file {}", args.flag_text_out))?;
    }

    let mover = AgentMover::new(Speed(args.flag_speed))
        .chain_err(|| "Failed to create the agent")?;
    let tick = args.flag_tick.unwrap_or(movement::DEFAULT_TICK_SECONDS);
    if !(tick > 0.0) {
        bail!("The simulation tick must be positive, got {}", tick);
    }
    walk(PathFollower::new(mover, route)?, tick, args.flag_quiet_walk);

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}

fn generate(width: usize, depth: usize, seed: u64) -> Result<Grid> {
    let mut generator = MazeGenerator::new(Width(width),
                                           Depth(depth),
                                           GridCoordinate::new(0, 0),
                                           StdRng::seed_from_u64(seed))
        .chain_err(|| "Failed to start maze generation")?;

    let mut backtracks = 0;
    while let Some(event) = generator.step() {
        if let GenerationEvent::Backtracked(_) = event {
            backtracks += 1;
        }
    }
    let grid = generator.into_grid();
    debug!("{} backtracks, perfect maze: {}", backtracks, grid.is_perfect_maze());

    Ok(grid)
}

/// Either the distances from the start to every cell or the route with its end points marked.
fn set_maze_griddisplay(maze_grid: &mut Grid,
                        maze_args: &MazeArgs,
                        start: GridCoordinate,
                        route: &pathing::Route)
                        -> Result<()> {

    let display: Rc<dyn GridDisplay> = if maze_args.flag_show_distances {
        let distances = pathing::Distances::<u32>::for_grid(maze_grid, start)
            .ok_or("Provided invalid start coordinate from which to show path distances.")?;
        Rc::new(distances)
    } else {
        Rc::new(RouteDisplay::new(route.waypoints()))
    };
    maze_grid.set_grid_display(Some(display));

    Ok(())
}

fn walk(mut follower: PathFollower, tick: f64, quiet: bool) {
    let mut reached = follower.state().next_waypoint_index();
    while let Some(event) = follower.step(tick) {
        match event {
            MovementEvent::PositionUpdated(position) => {
                let next = follower.state().next_waypoint_index();
                if !quiet && next != reached {
                    info!("Waypoint {} reached, agent at {}", next - 1, position);
                }
                reached = next;
            }
            MovementEvent::GoalReached(position) => {
                info!("Goal reached at {} after {:.2}s", position, follower.elapsed());
            }
        }
    }
}

fn write_text_to_file(data: &str, file_name: &str) -> io::Result<()> {
    let mut f = File::create(file_name)?;
    f.write_all(data.as_bytes())?;
    Ok(())
}
