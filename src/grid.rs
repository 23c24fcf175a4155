//! Grid geometry shared by cells, electrons and the text sampler.

/// A `(row, column)` position on the grid. May lie off-screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    pub row: i32,
    pub col: i32,
}

impl GridCoord {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

impl From<(i32, i32)> for GridCoord {
    fn from((row, col): (i32, i32)) -> Self {
        Self { row, col }
    }
}

/// Square cells of `cell_size` separated by `border_width` lines.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid {
    pub cell_size: f64,
    pub border_width: f64,
}

impl Grid {
    pub fn new(cell_size: f64, border_width: f64) -> Self {
        Self {
            cell_size,
            border_width,
        }
    }

    /// Distance between the origins of two neighbouring cells.
    pub fn stride(&self) -> f64 {
        self.cell_size + self.border_width
    }

    /// Top-left pixel of a cell, as `[x, y]`.
    pub fn origin(&self, coord: GridCoord) -> [f64; 2] {
        let d = self.stride();
        [coord.col as f64 * d, coord.row as f64 * d]
    }

    /// Cell under a pixel position.
    pub fn coord_at(&self, x: f64, y: f64) -> GridCoord {
        let d = self.stride();
        GridCoord::new((y / d).floor() as i32, (x / d).floor() as i32)
    }

    /// Whole `(columns, rows)` that fit a `width × height` area.
    pub fn dimensions(&self, width: f64, height: f64) -> (i32, i32) {
        let d = self.stride();
        ((width / d).floor() as i32, (height / d).floor() as i32)
    }

    /// One-stride steps an electron may take: down, up, right, left.
    pub fn move_trails(&self) -> [[f64; 2]; 4] {
        let d = self.stride();
        [[0.0, d], [0.0, -d], [d, 0.0], [-d, 0.0]]
    }

    /// Spawn points relative to a cell origin, centred on the border lines
    /// at each corner: left-top, left-bottom, right-top, right-bottom.
    pub fn corner_offsets(&self) -> [[f64; 2]; 4] {
        let d = self.stride();
        let half = self.border_width / 2.0;
        [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]].map(|[x, y]| [x * d - half, y * d - half])
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(crate::config::CELL_SIZE, crate::config::BORDER_WIDTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_and_coord_agree() {
        let grid = Grid::default();
        let c = GridCoord::new(3, 7);
        let [x, y] = grid.origin(c);
        assert_eq!((x, y), (84.0, 36.0));
        assert_eq!(grid.coord_at(x + 5.0, y + 11.9), c);
    }

    #[test]
    fn negative_pixels_map_to_negative_cells() {
        assert_eq!(Grid::default().coord_at(-1.0, -1.0), GridCoord::new(-1, -1));
    }

    #[test]
    fn corners_sit_on_border_centres() {
        let offsets = Grid::default().corner_offsets();
        assert_eq!(offsets[0], [-1.0, -1.0]);
        assert_eq!(offsets[3], [11.0, 11.0]);
    }

    #[test]
    fn dimensions_floor() {
        assert_eq!(Grid::default().dimensions(1205.0, 600.0), (100, 50));
    }
}
