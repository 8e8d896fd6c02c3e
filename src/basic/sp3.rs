use crate::basic::func::{field, openfile};
use crate::basic::interp::OrbitInterp;
use crate::basic::sat::{satcode, satid2no};
use crate::basic::time::{str2time, time2gpst};
use crate::basic::var::*;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Sp3Error {
    #[error("failed to read sp3 file: {0}")]
    Io(#[from] io::Error),
    #[error("malformed epoch line \"{0}\"")]
    Epoch(String),
    #[error("malformed position line \"{0}\"")]
    Position(String),
    #[error("no satellite positions in sp3 file")]
    Empty,
}

/// one precise orbit sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sp3Row {
    /// satellite code (prn + constellation offset)
    pub code: usize,
    pub week: i32,
    pub sow: f64,
    /// ecef position (m)
    pub pos: [f64; 3],
}

impl Sp3Row {
    /// continuous GPS seconds
    pub fn gpssec(&self) -> f64 {
        self.week as f64 * WEEKSEC + self.sow
    }
}

/// constellation-wide precise orbit table of one day
#[derive(Debug, Clone, Default)]
pub struct Sp3Table {
    pub rows: Vec<Sp3Row>,
}

fn new_epoch(line: &str) -> bool {
    line.starts_with("* ")
}

fn position_entry(line: &str) -> bool {
    line.starts_with('P')
}

fn end_of_file(line: &str) -> bool {
    line.trim() == "EOF"
}

impl Sp3Table {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Sp3Error> {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("/|\\- ")
            .template("{spinner:.green} {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message("Reading sp3...");

        let lines = openfile(path)?;
        let mut table = Sp3Table::default();
        let mut epoch: Option<(i32, f64)> = None;

        for line in lines {
            let line = line?;
            if end_of_file(&line) {
                break;
            }
            if new_epoch(&line) {
                let t = str2time(line.get(3..).unwrap_or(""))
                    .map_err(|_| Sp3Error::Epoch(line.clone()))?;
                let mut week = 0;
                let sow = time2gpst(t, Some(&mut week));
                epoch = Some((week, sow));
                pb.tick();
                continue;
            }
            if !position_entry(&line) {
                continue;
            }
            let Some((week, sow)) = epoch else {
                return Err(Sp3Error::Position(line));
            };
            // tolerate truncated records and constellations outside G/R/E/C
            if line.len() < 46 {
                continue;
            }
            let Some(code) = line
                .get(1..4)
                .and_then(|id| satid2no(id, 'G'))
                .and_then(|(sys, prn)| satcode(sys, prn))
            else {
                continue;
            };
            let mut pos = [0.0; 3];
            for (k, p) in pos.iter_mut().enumerate() {
                *p = field(&line, 4 + k * 14, 14)
                    .parse::<f64>()
                    .map_err(|_| Sp3Error::Position(line.clone()))?
                    * 1000.0;
            }
            if pos.iter().any(|p| *p == 0.0) {
                continue;
            }
            table.rows.push(Sp3Row { code, week, sow, pos });
        }
        pb.finish_with_message("Finish reading sp3");

        if table.rows.is_empty() {
            return Err(Sp3Error::Empty);
        }
        debug!("{} sp3 samples", table.rows.len());
        Ok(table)
    }

    /// samples of one satellite
    pub fn sat(&self, code: usize) -> impl Iterator<Item = &Sp3Row> {
        self.rows.iter().filter(move |r| r.code == code)
    }

    /// per-axis interpolant of one satellite, None when it is not in the table
    pub fn interp(&self, code: usize, order: usize) -> Option<OrbitInterp> {
        let (t, pos): (Vec<f64>, Vec<[f64; 3]>) =
            self.sat(code).map(|r| (r.gpssec(), r.pos)).unzip();
        OrbitInterp::new(&t, &pos, order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::interp::INTERP_ORDER;
    use std::fs;

    const SP3: &str = "\
#dP2020  1  1  0  0  0.00000000      97 ORBIT IGS14 HLM  IGS
## 2086 259200.00000000   900.00000000 58849 0.0000000000000
+    4   G01G02R05C06  0  0  0  0  0  0  0  0  0  0  0  0  0
*  2020  1  1  0  0  0.00000000
PG01  -6919.234256  15209.584370  20485.201203    -33.149203
PG02  13425.325452 -11993.412546  19452.124567    123.456789
PR05  10000.000000  10000.000000  10000.000000     11.111111
PC06      0.000000      0.000000      0.000000 999999.999999
PJ01  30000.000000  30000.000000  30000.000000      1.000000
*  2020  1  1  0 15  0.00000000
PG01  -7919.234256  14209.584370  20985.201203    -33.149203
PC06  20000.000000  30000.000000   1000.000000      2.000000
EOF
";

    #[test]
    fn test_read_sp3() {
        let dir = std::env::temp_dir().join("rinex2snr_sp3_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("gbm20864.sp3");
        fs::write(&path, SP3).unwrap();

        let table = Sp3Table::from_file(&path).unwrap();
        // zero position of C06 at the first epoch and the QZSS record are dropped
        assert_eq!(table.rows.len(), 5);
        assert_eq!(table.rows[0].code, 1);
        assert_eq!(table.rows[0].week, 2086);
        assert_eq!(table.rows[0].sow, 259200.0);
        assert!((table.rows[0].pos[0] + 6919234.256).abs() < 1E-6);
        assert_eq!(table.rows[2].code, 105);
        assert_eq!(table.sat(306).count(), 1);
        assert_eq!(table.sat(5).count(), 0);
        assert_eq!(table.sat(1).count(), 2);
        assert_eq!(table.sat(1).nth(1).map(|r| r.sow), Some(260100.0));
        assert!(table.interp(306, INTERP_ORDER).is_some());
        assert!(table.interp(7, INTERP_ORDER).is_none());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_sp3() {
        let dir = std::env::temp_dir().join("rinex2snr_sp3_empty");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("empty.sp3");
        fs::write(&path, "#dP2020  1  1\nEOF\n").unwrap();
        assert!(matches!(Sp3Table::from_file(&path), Err(Sp3Error::Empty)));
        fs::remove_dir_all(&dir).ok();
    }
}
