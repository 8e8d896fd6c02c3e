use nalgebra::Vector3;

/// polynomial order of the orbit interpolant, a 9 sample window keeps 15 min sp3 spacing
/// at the mm level
pub const INTERP_ORDER: usize = 8;

/// scalar Lagrange interpolant over a sorted sample table.
/// Evaluation uses the `order + 1` samples nearest to the query time; past the table
/// bounds the edge window is extrapolated instead of failing.
#[derive(Debug, Clone)]
pub struct Lagrange {
    t: Vec<f64>,
    y: Vec<f64>,
    order: usize,
}

impl Lagrange {
    /// build an interpolant; samples are sorted by time, returns None on an empty table
    pub fn new(t: &[f64], y: &[f64], order: usize) -> Option<Self> {
        if t.is_empty() || t.len() != y.len() {
            return None;
        }
        let mut samples: Vec<(f64, f64)> = t.iter().copied().zip(y.iter().copied()).collect();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        samples.dedup_by(|a, b| a.0 == b.0);
        let (t, y) = samples.into_iter().unzip();
        Some(Lagrange { t, y, order })
    }

    /// first index and size of the evaluation window
    fn window(&self, x: f64) -> (usize, usize) {
        let n = (self.order + 1).min(self.t.len());
        let idx = self.t.partition_point(|&ti| ti < x);
        let start = idx.saturating_sub(n / 2).min(self.t.len() - n);
        (start, n)
    }

    pub fn eval(&self, x: f64) -> f64 {
        let (offset, n) = self.window(x);
        let mut val = 0.0;
        for i in 0..n {
            let mut li = 1.0;
            for j in 0..n {
                if j != i {
                    li *= (x - self.t[offset + j]) / (self.t[offset + i] - self.t[offset + j]);
                }
            }
            val += self.y[offset + i] * li;
        }
        val
    }
}

/// per-axis position interpolant of one satellite
#[derive(Debug, Clone)]
pub struct OrbitInterp {
    x: Lagrange,
    y: Lagrange,
    z: Lagrange,
}

impl OrbitInterp {
    /// `t` in continuous GPS seconds, positions in meters
    pub fn new(t: &[f64], pos: &[[f64; 3]], order: usize) -> Option<Self> {
        let axis = |k: usize| pos.iter().map(|p| p[k]).collect::<Vec<f64>>();
        Some(OrbitInterp {
            x: Lagrange::new(t, &axis(0), order)?,
            y: Lagrange::new(t, &axis(1), order)?,
            z: Lagrange::new(t, &axis(2), order)?,
        })
    }

    pub fn pos(&self, t: f64) -> Vector3<f64> {
        Vector3::new(self.x.eval(t), self.y.eval(t), self.z.eval(t))
    }
}
