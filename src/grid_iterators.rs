use crate::cells::GridCoordinate;
use crate::units::{ColumnIndex, Depth, RowIndex, Width};

#[derive(Debug, Copy, Clone)]
pub struct CellIter {
    current_cell_number: usize,
    width: Width,
    cells_count: usize,
}

impl CellIter {
    pub(crate) fn new(width: Width, depth: Depth) -> CellIter {
        CellIter {
            current_cell_number: 0,
            width,
            cells_count: width.0 * depth.0,
        }
    }
}

impl ExactSizeIterator for CellIter {} // default impl using size_hint()
impl Iterator for CellIter {
    type Item = GridCoordinate;
    fn next(&mut self) -> Option<Self::Item> {
        if self.current_cell_number < self.cells_count {
            let coord = GridCoordinate::from_row_major_index(self.current_cell_number, self.width);
            self.current_cell_number += 1;
            Some(coord)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let lower_bound = self.cells_count - self.current_cell_number;
        let upper_bound = lower_bound;
        (lower_bound, Some(upper_bound))
    }
}

#[derive(Debug, Copy, Clone)]
pub(crate) enum BatchIterType {
    Row,
    Column,
}

/// Yields whole rows (cells sharing a `z`) or whole columns (cells sharing an `x`).
#[derive(Debug, Copy, Clone)]
pub struct BatchIter {
    iter_type: BatchIterType,
    current_index: usize,
    width: Width,
    depth: Depth,
}

impl BatchIter {
    pub(crate) fn new(iter_type: BatchIterType, width: Width, depth: Depth) -> BatchIter {
        BatchIter {
            iter_type,
            current_index: 0,
            width,
            depth,
        }
    }

    fn batches_count(&self) -> usize {
        match self.iter_type {
            BatchIterType::Row => self.depth.0,
            BatchIterType::Column => self.width.0,
        }
    }
}

impl ExactSizeIterator for BatchIter {}
impl Iterator for BatchIter {
    type Item = Vec<GridCoordinate>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.current_index >= self.batches_count() {
            return None;
        }

        let index = self.current_index;
        let coords = match self.iter_type {
            BatchIterType::Row => (0..self.width.0)
                .map(|i| GridCoordinate::from_row_column_indices(ColumnIndex(i), RowIndex(index)))
                .collect(),
            BatchIterType::Column => (0..self.depth.0)
                .map(|i| GridCoordinate::from_row_column_indices(ColumnIndex(index), RowIndex(i)))
                .collect(),
        };
        self.current_index += 1;
        Some(coords)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let lower_bound = self.batches_count() - self.current_index;
        let upper_bound = lower_bound;
        (lower_bound, Some(upper_bound))
    }
}
