use thiserror::Error;

/// Maps a grid cell to the pixel at its center.
///
/// Centers are rounded half away from zero (`f64::round`) rather than
/// truncated. Cells outside the grid are not clamped and map to pixels
/// outside the image. For cells inside the grid the result is kept on the
/// last pixel row/column when the rounded center would land exactly on the
/// far edge (e.g. a 12 px wide image split into 12 columns).
pub fn grid_to_pixel(
    col: i64,
    row: i64,
    image_width: u32,
    image_height: u32,
    grid_cols: u32,
    grid_rows: u32,
) -> (i64, i64) {
    (
        cell_center(col, image_width, grid_cols),
        cell_center(row, image_height, grid_rows),
    )
}

fn cell_center(index: i64, extent: u32, cells: u32) -> i64 {
    let cells = cells.max(1);
    let cell_size = extent as f64 / cells as f64;
    let center = ((index as f64 + 0.5) * cell_size).round() as i64;
    if extent > 0 && (0..cells as i64).contains(&index) {
        center.min(extent as i64 - 1)
    } else {
        center
    }
}

pub fn cell_in_grid(col: i64, row: i64, grid_cols: u32, grid_rows: u32) -> bool {
    (0..grid_cols as i64).contains(&col) && (0..grid_rows as i64).contains(&row)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("position must be col,row e.g. 4,7 (got `{0}`)")]
    Arity(String),
    #[error("position part `{part}` in `{input}` is not an integer")]
    NotInteger { input: String, part: String },
}

/// Parses a `col,row` override such as `"4, 7"`.
pub fn parse_position(input: &str) -> Result<(i64, i64), PositionError> {
    let parts: Vec<&str> = input.trim().split(',').collect();
    let [col, row] = parts.as_slice() else {
        return Err(PositionError::Arity(input.to_string()));
    };
    let parse = |part: &str| {
        part.trim()
            .parse::<i64>()
            .map_err(|_| PositionError::NotInteger {
                input: input.to_string(),
                part: part.trim().to_string(),
            })
    };
    Ok((parse(*col)?, parse(*row)?))
}
