use serde::{Deserialize, Serialize};

/// layout of an SNR text line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// 9 fields: sat el az sod 0 0 s1 s2 s5
    Broadcast,
    /// 11 fields: sat el az sod 0 s6 s1 s2 s5 s7 s8
    Precise,
}

/// one satellite-epoch of the SNR product
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SnrRecord {
    /// satellite code (prn + constellation offset)
    pub sat: usize,
    /// elevation angle (deg)
    pub el: f64,
    /// azimuth angle (deg)
    pub az: f64,
    /// seconds since the start of the day
    pub sod: f64,
    pub edot: f64,
    pub s1: f64,
    pub s2: f64,
    pub s5: f64,
    pub s6: f64,
    pub s7: f64,
    pub s8: f64,
}

/// absent or invalid readings are written as zero
pub fn zero_nan(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

impl SnrRecord {
    /// signal bands in S1, S2, S5, S6, S7, S8 order
    pub fn bands(&self) -> [f64; 6] {
        [self.s1, self.s2, self.s5, self.s6, self.s7, self.s8]
    }

    pub fn set_bands(&mut self, bands: [f64; 6]) {
        let [s1, s2, s5, s6, s7, s8] = bands.map(zero_nan);
        self.s1 = s1;
        self.s2 = s2;
        self.s5 = s5;
        self.s6 = s6;
        self.s7 = s7;
        self.s8 = s8;
    }

    /// true if no band carries a signal
    pub fn is_empty(&self) -> bool {
        self.bands().iter().all(|v| !v.is_finite() || *v == 0.0)
    }

    pub fn line(&self, layout: Layout) -> String {
        match layout {
            Layout::Broadcast => format!(
                "{:3.0} {:10.4} {:10.4} {:10.0} {:7.2} {:7.2} {:7.2} {:7.2} {:7.2} \n",
                self.sat as f64,
                self.el,
                self.az,
                self.sod,
                0.0,
                0.0,
                zero_nan(self.s1),
                zero_nan(self.s2),
                zero_nan(self.s5),
            ),
            Layout::Precise => format!(
                "{:3.0} {:10.4} {:10.4} {:10.0} {:7.2} {:7.2} {:7.2} {:7.2} {:7.2} {:7.2} {:7.2} \n",
                self.sat as f64,
                self.el,
                self.az,
                self.sod,
                0.0,
                zero_nan(self.s6),
                zero_nan(self.s1),
                zero_nan(self.s2),
                zero_nan(self.s5),
                zero_nan(self.s7),
                zero_nan(self.s8),
            ),
        }
    }

    /// parse a 9 or 11 field SNR line
    pub fn parse(line: &str) -> Option<Self> {
        let v: Vec<f64> = line
            .split_whitespace()
            .map(|s| s.parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        let mut rec = SnrRecord {
            sat: v.first().copied().filter(|s| *s >= 0.0)? as usize,
            el: v.get(1).copied()?,
            az: v.get(2).copied()?,
            sod: v.get(3).copied()?,
            ..Default::default()
        };
        match v.len() {
            9 => {
                rec.edot = v[5];
                rec.set_bands([v[6], v[7], v[8], 0.0, 0.0, 0.0]);
            }
            11 => rec.set_bands([v[6], v[7], v[8], v[5], v[9], v[10]]),
            _ => return None,
        }
        Some(rec)
    }
}
