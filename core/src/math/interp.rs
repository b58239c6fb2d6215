/// Linear map from one closed interval onto another.
#[derive(Debug, Clone, Copy)]
pub struct RangeMap {
    in_low: f64,
    in_high: f64,
    out_low: f64,
    out_high: f64,
}

impl RangeMap {
    pub fn new(input: (f64, f64), output: (f64, f64)) -> Self {
        Self {
            in_low: input.0,
            in_high: input.1,
            out_low: output.0,
            out_high: output.1,
        }
    }

    /// Map `value`. A zero-width input range maps everything to the lower output bound.
    pub fn apply(&self, value: f64) -> f64 {
        let width = self.in_high - self.in_low;
        if width == 0.0 {
            return self.out_low;
        }
        self.out_low + (value - self.in_low) * (self.out_high - self.out_low) / width
    }

    /// Map `value`, pinning anything above the input range to the upper output bound.
    pub fn apply_saturating(&self, value: f64) -> f64 {
        if value > self.in_high {
            self.out_high
        } else {
            self.apply(value)
        }
    }
}

/// Tabulated cumulative distribution over a finite support, inverted by
/// linear interpolation inside each grid cell.
#[derive(Debug, Clone)]
pub struct InverseCdf {
    grid: Vec<f64>,
    cdf: Vec<f64>,
}

impl InverseCdf {
    /// Build from a density sampled at `intervals + 1` evenly spaced points
    /// on `[low, high]` using the trapezoid rule. The table is rescaled so its
    /// last entry is exactly 1, so the density need not be normalized.
    pub fn from_density<F>(density: F, low: f64, high: f64, intervals: usize) -> Option<Self>
    where
        F: Fn(f64) -> f64,
    {
        if intervals == 0 || !(high > low) {
            return None;
        }
        let step = (high - low) / intervals as f64;
        let grid: Vec<f64> = (0..=intervals).map(|i| low + step * i as f64).collect();
        let mut cdf = Vec::with_capacity(grid.len());
        cdf.push(0.0);
        let mut previous = density(low).max(0.0);
        let mut running = 0.0;
        for &x in &grid[1..] {
            let current = density(x).max(0.0);
            running += 0.5 * (previous + current) * step;
            cdf.push(running);
            previous = current;
        }
        if !(running.is_finite() && running > 0.0) {
            return None;
        }
        cdf.iter_mut().for_each(|c| *c /= running);
        Some(Self { grid, cdf })
    }

    /// Value at cumulative probability `u` in `[0, 1]`.
    pub fn invert(&self, u: f64) -> f64 {
        let u = u.clamp(0.0, 1.0);
        let idx = self.cdf.partition_point(|&c| c < u);
        if idx == 0 {
            return self.grid[0];
        }
        if idx >= self.cdf.len() {
            return self.grid[self.grid.len() - 1];
        }
        let (c0, c1) = (self.cdf[idx - 1], self.cdf[idx]);
        let (x0, x1) = (self.grid[idx - 1], self.grid[idx]);
        if c1 <= c0 {
            return x0;
        }
        x0 + (u - c0) / (c1 - c0) * (x1 - x0)
    }

    pub fn support(&self) -> (f64, f64) {
        (self.grid[0], self.grid[self.grid.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_map_hits_endpoints() {
        let map = RangeMap::new((0.0, 4500.0), (500.0, 4091.0));
        assert_eq!(map.apply(0.0), 500.0);
        assert!((map.apply(4500.0) - 4091.0).abs() < 1e-9);
        assert_eq!(map.apply_saturating(9000.0), 4091.0);
    }

    #[test]
    fn degenerate_range_maps_to_low() {
        let map = RangeMap::new((3.0, 3.0), (0.0, 1.0));
        assert_eq!(map.apply(3.0), 0.0);
    }

    #[test]
    fn uniform_density_inverts_linearly() {
        let table = InverseCdf::from_density(|_| 1.0, 2.0, 4.0, 10).unwrap();
        assert!((table.invert(0.5) - 3.0).abs() < 1e-12);
        assert_eq!(table.invert(0.0), 2.0);
        assert_eq!(table.invert(1.0), 4.0);
        assert_eq!(table.support(), (2.0, 4.0));
    }

    #[test]
    fn zero_density_has_no_table() {
        assert!(InverseCdf::from_density(|_| 0.0, 0.0, 1.0, 8).is_none());
    }
}
