use std::fmt;

use crate::cells::{CoordinateSmallVec, Direction, GridCoordinate};
use crate::grid::Grid;
use crate::pathing::{Distances, MaxDistance};
use crate::units::{Depth, Width};
use crate::utils::{self, FnvHashSet};

pub trait GridDisplay {
    /// Render the contents of a grid cell as text.
    /// The String should be 3 glyphs long, padded if required.
    fn render_cell_body(&self, _: GridCoordinate) -> String {
        String::from("   ")
    }
}

impl<MaxDistanceT> GridDisplay for Distances<MaxDistanceT>
    where MaxDistanceT: MaxDistance
{
    fn render_cell_body(&self, coord: GridCoordinate) -> String {
        if let Some(d) = self.distance_from_start_to(coord) {
            // centre align, padding 3, lowercase hexadecimal
            format!("{:^3x}", d)
        } else {
            String::from("   ")
        }
    }
}


#[derive(Debug)]
pub struct PathDisplay {
    on_path_coordinates: FnvHashSet<GridCoordinate>,
}
impl PathDisplay {
    pub fn new(path: &[GridCoordinate]) -> Self {
        let mut on_path_coordinates = utils::fnv_hashset(path.len());
        on_path_coordinates.extend(path.iter().cloned());
        PathDisplay { on_path_coordinates }
    }
}
impl GridDisplay for PathDisplay {
    fn render_cell_body(&self, coord: GridCoordinate) -> String {
        if self.on_path_coordinates.contains(&coord) {
            String::from(" . ")
        } else {
            String::from("   ")
        }
    }
}


#[derive(Debug)]
pub struct StartEndPointsDisplay {
    start_coordinates: CoordinateSmallVec,
    end_coordinates: CoordinateSmallVec,
}
impl StartEndPointsDisplay {
    pub fn new(starts: CoordinateSmallVec, ends: CoordinateSmallVec) -> StartEndPointsDisplay {
        StartEndPointsDisplay {
            start_coordinates: starts,
            end_coordinates: ends,
        }
    }
}
impl GridDisplay for StartEndPointsDisplay {
    fn render_cell_body(&self, coord: GridCoordinate) -> String {

        let contains_coordinate =
            |coordinates: &CoordinateSmallVec| coordinates.iter().any(|&c| c == coord);

        if contains_coordinate(&self.start_coordinates) {
            String::from(" S ")
        } else if contains_coordinate(&self.end_coordinates) {
            String::from(" E ")
        } else {
            String::from("   ")
        }
    }
}

/// Route cells with the start and end marked, the usual overlay for a solved maze.
#[derive(Debug)]
pub struct RouteDisplay {
    path: PathDisplay,
    end_points: StartEndPointsDisplay,
}
impl RouteDisplay {
    pub fn new(route: &[GridCoordinate]) -> RouteDisplay {
        let starts = route.first().cloned().into_iter().collect();
        let ends = route.last().cloned().into_iter().collect();
        RouteDisplay {
            path: PathDisplay::new(route),
            end_points: StartEndPointsDisplay::new(starts, ends),
        }
    }
}
impl GridDisplay for RouteDisplay {
    fn render_cell_body(&self, coord: GridCoordinate) -> String {
        let marker = self.end_points.render_cell_body(coord);
        if marker.trim().is_empty() {
            self.path.render_cell_body(coord)
        } else {
            marker
        }
    }
}


// Row z = 0 is drawn at the top, so Back is up the screen and Front is down.
impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        const WALL_L: &str = "╴";
        const WALL_R: &str = "╶";
        const WALL_U: &str = "╵";
        const WALL_D: &str = "╷";
        const WALL_LR_3: &str = "───";
        const WALL_LR: &str = "─";
        const WALL_UD: &str = "│";
        const WALL_LD: &str = "┐";
        const WALL_RU: &str = "└";
        const WALL_LU: &str = "┘";
        const WALL_RD: &str = "┌";
        const WALL_LRU: &str = "┴";
        const WALL_LRD: &str = "┬";
        const WALL_LRUD: &str = "┼";
        const WALL_RUD: &str = "├";
        const WALL_LUD: &str = "┤";
        let default_cell_body = String::from("   ");

        let Width(columns_count) = self.width();
        let Depth(rows_count) = self.depth();

        // Start by special case rendering the text for the back most boundary
        let mut output = String::from(WALL_RD);
        if let Some(first_grid_row) = self.iter_row().next() {
            for (index, coord) in first_grid_row.iter().enumerate() {
                output.push_str(WALL_LR_3);
                let is_right_open = self.is_neighbour_linked(*coord, Direction::Right);
                if is_right_open {
                    output.push_str(WALL_LR);
                } else if index == (columns_count - 1) {
                    output.push_str(WALL_LD);
                } else {
                    output.push_str(WALL_LRD);
                }
            }
        }
        output.push_str("\n");

        for (index_row, row) in self.iter_row().enumerate() {

            let is_last_row = index_row == (rows_count - 1);

            // The back section of a cell is the front section of the previous row.
            let mut row_middle_section_render = String::from(WALL_UD);
            let mut row_bottom_section_render = String::from("");

            for (index_column, cell_coord) in row.into_iter().enumerate() {

                let render_cell_side = |direction, passage_clear_text, blocking_wall_text| {
                    if self.is_neighbour_linked(cell_coord, direction) {
                        passage_clear_text
                    } else {
                        blocking_wall_text
                    }
                };
                let is_first_column = index_column == 0;
                let is_last_column = index_column == (columns_count - 1);
                let right_open = self.is_neighbour_linked(cell_coord, Direction::Right);
                let front_open = self.is_neighbour_linked(cell_coord, Direction::Front);

                let right_boundary = render_cell_side(Direction::Right, " ", WALL_UD);

                // Cell Body
                if let Some(ref displayer) = *self.grid_display() {
                    row_middle_section_render.push_str(displayer.render_cell_body(cell_coord).as_str());
                } else {
                    row_middle_section_render.push_str(default_cell_body.as_str());
                }

                row_middle_section_render.push_str(right_boundary);

                if is_first_column {
                    row_bottom_section_render = if is_last_row {
                        String::from(WALL_RU)
                    } else if front_open {
                        String::from(WALL_UD)
                    } else {
                        String::from(WALL_RUD)
                    };
                }
                let front_boundary = render_cell_side(Direction::Front, "   ", WALL_LR_3);
                row_bottom_section_render.push_str(front_boundary);

                let corner = match (is_last_row, is_last_column) {
                    (true, true) => WALL_LU,
                    (true, false) => if right_open { WALL_LR } else { WALL_LRU },
                    (false, true) => if front_open { WALL_UD } else { WALL_LUD },
                    (false, false) => {
                        let access_corner_from_right =
                            self.neighbour_at_direction(cell_coord, Direction::Right)
                                .map_or(false, |c| self.is_neighbour_linked(c, Direction::Front));
                        let access_corner_from_front =
                            self.neighbour_at_direction(cell_coord, Direction::Front)
                                .map_or(false, |c| self.is_neighbour_linked(c, Direction::Right));
                        let show_right_section = !access_corner_from_right;
                        let show_down_section = !access_corner_from_front;
                        let show_up_section = !right_open;
                        let show_left_section = !front_open;

                        match (show_left_section,
                               show_right_section,
                               show_up_section,
                               show_down_section) {
                            (true, true, true, true) => WALL_LRUD,
                            (true, true, true, false) => WALL_LRU,
                            (true, true, false, true) => WALL_LRD,
                            (true, false, true, true) => WALL_LUD,
                            (false, true, true, true) => WALL_RUD,
                            (true, true, false, false) => WALL_LR,
                            (false, false, true, true) => WALL_UD,
                            (false, true, true, false) => WALL_RU,
                            (true, false, false, true) => WALL_LD,
                            (true, false, true, false) => WALL_LU,
                            (false, true, false, true) => WALL_RD,
                            (true, false, false, false) => WALL_L,
                            (false, true, false, false) => WALL_R,
                            (false, false, true, false) => WALL_U,
                            (false, false, false, true) => WALL_D,
                            _ => " ",
                        }
                    }
                };

                row_bottom_section_render.push_str(corner);
            }

            output.push_str(row_middle_section_render.as_ref());
            output.push_str("\n");
            output.push_str(row_bottom_section_render.as_ref());
            output.push_str("\n");
        }

        write!(f, "{}", output)
    }
}
