#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn new(min: f64, max: f64) -> Self {
        Interval { min, max }
    }

    // a degenerate interval holding a single value
    pub fn point(val: f64) -> Self {
        Interval { min: val, max: val }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn midpoint(&self) -> f64 {
        0.5 * (self.min + self.max)
    }

    pub fn clamp_to(&self, bounds: &Interval) -> Option<Interval> {
        let min = self.min.max(bounds.min);
        let max = self.max.min(bounds.max);
        if min > max {
            None
        } else {
            Some(Interval { min, max })
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HyperRectangle<const NUM_DIMS: usize> {
    pub dims: [Interval; NUM_DIMS],
}

impl<const NUM_DIMS: usize> Default for HyperRectangle<NUM_DIMS> {
    fn default() -> Self {
        HyperRectangle {
            dims: [Interval::default(); NUM_DIMS],
        }
    }
}

impl<const NUM_DIMS: usize> HyperRectangle<NUM_DIMS> {
    pub fn num_dims(&self) -> usize {
        NUM_DIMS
    }

    // a zero-width box around a single state
    pub fn from_point(point: [f64; NUM_DIMS]) -> Self {
        HyperRectangle {
            dims: std::array::from_fn(|d| Interval::point(point[d])),
        }
    }

    pub fn grow_to_convex_hull(&mut self, contained: &HyperRectangle<NUM_DIMS>) {
        for d in 0..NUM_DIMS {
            let grower_dim = &mut self.dims[d];
            let contained_dim = &contained.dims[d];

            if contained_dim.min < grower_dim.min {
                grower_dim.min = contained_dim.min;
            }
            if contained_dim.max > grower_dim.max {
                grower_dim.max = contained_dim.max;
            }
        }
    }

    /// Splits the rectangle into `parts` equal slices along dimension `dim`.
    pub fn split(&self, dim: usize, parts: usize) -> Vec<HyperRectangle<NUM_DIMS>> {
        let parts = parts.max(1);
        let step = self.dims[dim].width() / parts as f64;
        (0..parts)
            .map(|i| {
                let mut piece = *self;
                piece.dims[dim].min = self.dims[dim].min + step * i as f64;
                piece.dims[dim].max = if i + 1 == parts {
                    self.dims[dim].max
                } else {
                    self.dims[dim].min + step * (i + 1) as f64
                };
                piece
            })
            .collect()
    }
}
