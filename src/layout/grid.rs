//! Near-square grid used for both window thumbnails and workspace tiles.

use glam::DVec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
    /// Cell center as a fraction of the output size.
    pub center: DVec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub cols: usize,
    pub rows: usize,
    pub cells: Vec<GridCell>,
}

impl Grid {
    /// Lays out `count` items in `ceil(sqrt(count))` columns, centering an incomplete last row.
    pub fn new(count: usize) -> Self {
        if count == 0 {
            return Self {
                cols: 0,
                rows: 0,
                cells: Vec::new(),
            };
        }

        let cols = (count as f64).sqrt().ceil() as usize;
        let rows = count.div_ceil(cols);
        let (cols_f, rows_f) = (cols as f64, rows as f64);
        let last_row_shift = ((rows * cols - count) as f64 / 2.) / cols_f;

        let cells = (0..count)
            .map(|idx| {
                let (row, col) = (idx / cols, idx % cols);
                let mut x = 0.5 / cols_f + col as f64 / cols_f;
                if row == rows - 1 {
                    x += last_row_shift;
                }
                let y = 0.5 / rows_f + row as f64 / rows_f;
                GridCell {
                    row,
                    col,
                    center: DVec2::new(x, y),
                }
            })
            .collect();

        Self { cols, rows, cells }
    }

    /// Largest per-axis scale of an item, as a fraction of the output size.
    pub fn cell_fraction(&self, slot_fraction: f64) -> DVec2 {
        if self.cells.is_empty() {
            return DVec2::splat(slot_fraction);
        }
        DVec2::new(
            slot_fraction / self.cols as f64,
            slot_fraction / self.rows as f64,
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn single_item_is_centered() {
        let grid = Grid::new(1);
        assert_eq!((grid.cols, grid.rows), (1, 1));
        assert_eq!(grid.cells[0].center, DVec2::new(0.5, 0.5));
        assert_eq!(grid.cell_fraction(0.825), DVec2::splat(0.825));
    }

    #[test]
    fn incomplete_last_row_is_centered() {
        let grid = Grid::new(3);
        assert_eq!((grid.cols, grid.rows), (2, 2));
        assert_eq!(grid.cells[0].center, DVec2::new(0.25, 0.25));
        assert_eq!(grid.cells[1].center, DVec2::new(0.75, 0.25));
        assert_eq!(grid.cells[2].center, DVec2::new(0.5, 0.75));
        assert_eq!((grid.cells[2].row, grid.cells[2].col), (1, 0));
    }

    #[test]
    fn five_items() {
        let grid = Grid::new(5);
        assert_eq!((grid.cols, grid.rows), (3, 2));
        assert_abs_diff_eq!(grid.cells[3].center.x, 1. / 3.);
        assert_abs_diff_eq!(grid.cells[4].center.x, 2. / 3.);
        let fraction = grid.cell_fraction(0.9);
        assert_abs_diff_eq!(fraction.x, 0.3);
        assert_abs_diff_eq!(fraction.y, 0.45);
    }

    #[test]
    fn empty() {
        let grid = Grid::new(0);
        assert!(grid.cells.is_empty());
    }

    proptest! {
        #[test]
        fn cells_stay_on_screen_and_apart(count in 1usize..60) {
            let grid = Grid::new(count);
            prop_assert_eq!(grid.cells.len(), count);
            prop_assert!(grid.cols * grid.rows >= count);
            prop_assert!(grid.cols >= grid.rows);
            for (idx, cell) in grid.cells.iter().enumerate() {
                prop_assert!(cell.center.x > 0. && cell.center.x < 1.);
                prop_assert!(cell.center.y > 0. && cell.center.y < 1.);
                for other in &grid.cells[idx + 1..] {
                    prop_assert!(cell.center.distance(other.center) > 1e-9);
                }
            }
        }
    }
}
