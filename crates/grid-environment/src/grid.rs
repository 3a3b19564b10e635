//! Dense row-major 2D grids.

use std::ops::Range;

use crate::error::{GridError, Result};

/// A dense 2D grid stored in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy> Grid<T> {
    /// Create a grid from row-major data.
    pub fn new(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(GridError::data(format!(
                "grid data has {} values, expected {}x{}",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Create a grid with every cell set to `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Create a grid by evaluating `f(row, col)` for every cell.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                data.push(f(row, col));
            }
        }
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the value at a cell, if it exists.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col).copied()
    }

    /// Value at a cell. Panics when out of bounds.
    pub fn at(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Copy of one column.
    pub fn column(&self, col: usize) -> Vec<T> {
        (0..self.rows).map(|row| self.at(row, col)).collect()
    }

    pub fn map<U: Copy>(&self, f: impl FnMut(T) -> U) -> Grid<U> {
        Grid {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().copied().map(f).collect(),
        }
    }

    /// Reverse the row order (north-up rasters become south-first).
    pub fn flip_rows(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for row in (0..self.rows).rev() {
            data.extend_from_slice(self.row(row));
        }
        Self {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }

    /// Append a copy of the first column at the end of every row.
    pub fn with_first_column_repeated(&self) -> Self {
        let cols = self.cols + 1;
        let mut data = Vec::with_capacity(self.rows * cols);
        for row in 0..self.rows {
            let values = self.row(row);
            data.extend_from_slice(values);
            if let Some(first) = values.first() {
                data.push(*first);
            }
        }
        Self {
            rows: self.rows,
            cols,
            data,
        }
    }

    /// Copy of a rectangular window.
    pub fn window(&self, rows: Range<usize>, cols: Range<usize>) -> Self {
        let rows = rows.start.min(self.rows)..rows.end.min(self.rows);
        let cols = cols.start.min(self.cols)..cols.end.min(self.cols);
        let n_rows = rows.len();
        let n_cols = cols.len();
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            data.extend_from_slice(&self.row(row)[cols.clone()]);
        }
        Self {
            rows: n_rows,
            cols: n_cols,
            data,
        }
    }

    /// Copy of the cells at the given row and column indices.
    pub fn select(&self, rows: &[usize], cols: &[usize]) -> Self {
        let mut data = Vec::with_capacity(rows.len() * cols.len());
        for &row in rows {
            for &col in cols {
                data.push(self.at(row, col));
            }
        }
        Self {
            rows: rows.len(),
            cols: cols.len(),
            data,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.data.iter().copied()
    }
}

impl Grid<bool> {
    pub fn any(&self) -> bool {
        self.data.iter().any(|v| *v)
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|v| **v).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Grid<f64> {
        Grid::from_fn(3, 4, |r, c| (r * 10 + c) as f64)
    }

    #[test]
    fn test_new_rejects_bad_length() {
        assert!(Grid::new(2, 2, vec![1.0; 3]).is_err());
        assert!(Grid::new(2, 2, vec![1.0; 4]).is_ok());
    }

    #[test]
    fn test_get_and_column() {
        let g = sample();
        assert_eq!(g.get(1, 2), Some(12.0));
        assert_eq!(g.get(3, 0), None);
        assert_eq!(g.column(3), vec![3.0, 13.0, 23.0]);
    }

    #[test]
    fn test_flip_rows() {
        let g = sample().flip_rows();
        assert_eq!(g.row(0), &[20.0, 21.0, 22.0, 23.0]);
        assert_eq!(g.row(2), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_first_column_repeated() {
        let g = sample().with_first_column_repeated();
        assert_eq!(g.shape(), (3, 5));
        for row in 0..3 {
            assert_eq!(g.at(row, 4), g.at(row, 0));
        }
    }

    #[test]
    fn test_window_and_select() {
        let g = sample();
        let w = g.window(1..3, 1..3);
        assert_eq!(w.shape(), (2, 2));
        assert_eq!(w.data(), &[11.0, 12.0, 21.0, 22.0]);

        let s = g.select(&[0, 2], &[1, 3]);
        assert_eq!(s.data(), &[1.0, 3.0, 21.0, 23.0]);
    }

    #[test]
    fn test_bool_helpers() {
        let mask = Grid::from_fn(2, 2, |r, c| r == c);
        assert!(mask.any());
        assert_eq!(mask.count(), 2);
        assert!(!Grid::filled(2, 2, false).any());
    }
}
