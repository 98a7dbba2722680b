//! Error types for maze generation, route finding and path following.
//!
//! `error_chain!` creates the `Error`, `ErrorKind`, `ResultExt` and `Result` types.
//! Every kind is recoverable: a failed operation never leaves a grid with a half cleared wall pair.
#![allow(deprecated)]

use crate::cells::GridCoordinate;
use error_chain::*;

error_chain! {
    errors {
        InvalidDimension(width: usize, depth: usize) {
            description("invalid grid dimension")
            display("invalid grid dimensions {}x{}, both must be at least 1", width, depth)
        }
        InvalidState(reason: String) {
            description("operation invoked on inconsistent state")
            display("invalid state: {}", reason)
        }
        NoPathFound(start: GridCoordinate, goal: GridCoordinate) {
            description("no path found")
            display("no path from {} to {}", start, goal)
        }
        InvalidSpeed(speed: f64) {
            description("invalid agent speed")
            display("invalid agent speed {}, must be finite and positive", speed)
        }
    }
}
