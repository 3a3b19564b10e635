//! Test data generators for creating synthetic raster bands.
//!
//! Every generator returns row-major, north-up data (row 0 is the
//! northernmost row), the layout raster datasets hand to the engine.

/// GDAL-ordered geo-transform for a north-up raster.
///
/// `min_lon` and `max_lat` are cell centres; the transform origin is the
/// outer corner half a step away.
///
/// # Example
///
/// ```
/// use test_utils::gdal_transform;
///
/// let t = gdal_transform(3.0, 55.0, 1.0);
/// assert_eq!(t, [2.5, 1.0, 0.0, 55.5, 0.0, -1.0]);
/// ```
pub fn gdal_transform(min_lon: f64, max_lat: f64, step: f64) -> [f64; 6] {
    [
        min_lon - 0.5 * step,
        step,
        0.0,
        max_lat + 0.5 * step,
        0.0,
        -step,
    ]
}

/// A band with every cell set to `value`.
pub fn uniform_band(width: usize, height: usize, value: f64) -> Vec<f64> {
    vec![value; width * height]
}

/// A band with cell `(row, col)` set to `f(row, col)`.
pub fn band_from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> f64) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(f(row, col));
        }
    }
    data
}

/// Creates a band where each cell is `col * 10 + row`.
///
/// This makes it easy to verify orientation: a north-up row `r` ends up as
/// mesh row `height - 1 - r`.
pub fn create_index_band(width: usize, height: usize) -> Vec<f64> {
    band_from_fn(width, height, |row, col| (col * 10 + row) as f64)
}

/// Overwrite every odd (or even) row of a band with `missing`.
///
/// With `odd = true` rows 1, 3, 5, ... are blanked, leaving the even rows
/// as the kept sub-grid.
pub fn interlace_rows(data: &mut [f64], width: usize, odd: bool, missing: f64) {
    for (row, chunk) in data.chunks_mut(width).enumerate() {
        if (row % 2 == 1) == odd {
            chunk.iter_mut().for_each(|v| *v = missing);
        }
    }
}

/// Overwrite every odd (or even) column of a band with `missing`.
pub fn interlace_cols(data: &mut [f64], width: usize, odd: bool, missing: f64) {
    for (i, v) in data.iter_mut().enumerate() {
        if ((i % width) % 2 == 1) == odd {
            *v = missing;
        }
    }
}

/// Overwrite the given `(row, col)` cells with `missing`.
pub fn scatter_missing(data: &mut [f64], width: usize, cells: &[(usize, usize)], missing: f64) {
    for (row, col) in cells {
        data[row * width + col] = missing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_band() {
        let band = create_index_band(3, 2);
        assert_eq!(band, vec![0.0, 10.0, 20.0, 1.0, 11.0, 21.0]);
    }

    #[test]
    fn test_interlace_rows() {
        let mut band = uniform_band(2, 4, 1.0);
        interlace_rows(&mut band, 2, true, -9.0);
        assert_eq!(band, vec![1.0, 1.0, -9.0, -9.0, 1.0, 1.0, -9.0, -9.0]);

        let mut band = uniform_band(2, 3, 1.0);
        interlace_rows(&mut band, 2, false, -9.0);
        assert_eq!(band, vec![-9.0, -9.0, 1.0, 1.0, -9.0, -9.0]);
    }

    #[test]
    fn test_interlace_cols() {
        let mut band = uniform_band(3, 2, 1.0);
        interlace_cols(&mut band, 3, true, 0.0);
        assert_eq!(band, vec![1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_scatter_missing() {
        let mut band = uniform_band(3, 3, 0.0);
        scatter_missing(&mut band, 3, &[(1, 1), (2, 0)], 5.0);
        assert_eq!(band[4], 5.0);
        assert_eq!(band[6], 5.0);
        assert_eq!(band.iter().filter(|v| **v == 5.0).count(), 2);
    }
}
