use crate::basic::func::openfile;
use crate::snr::record::{zero_nan, Layout, SnrRecord};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// one cell of the columnar SNR store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TdbRow {
    /// POSIX microseconds
    pub time: i64,
    /// 0 GPS, 1 satellite code above 100, 2 above 200
    pub sys: u8,
    /// satellite code
    pub sat: u16,
    /// observable name (s1, s2, ...)
    pub obs: String,
    pub cn0: f32,
    pub elevation: f32,
    pub azimuth: f32,
    pub edot: f32,
}

impl TdbRow {
    fn key(&self) -> (i64, u8, u16, String) {
        (self.time, self.sys, self.sat, self.obs.clone())
    }
}

/// storage contract of the columnar sink
pub trait TimeSeriesStore {
    /// create the store unless it already exists
    fn create_if_absent(&mut self) -> io::Result<()>;
    fn write(&mut self, rows: &[TdbRow]) -> io::Result<()>;
    /// merge written fragments
    fn consolidate(&mut self) -> io::Result<()>;
    /// drop fragments made obsolete by consolidation
    fn vacuum(&mut self) -> io::Result<()>;
}

/// write one batch followed by the maintenance steps
pub fn write_batch<S: TimeSeriesStore + ?Sized>(store: &mut S, rows: &[TdbRow]) -> io::Result<()> {
    store.create_if_absent()?;
    store.write(rows)?;
    store.consolidate()?;
    store.vacuum()
}

fn sysid(sat: usize) -> u8 {
    if sat > 200 {
        2
    } else if sat > 100 {
        1
    } else {
        0
    }
}

/// rows of one day of SNR records; records without any signal are dropped
pub fn snr2tdb(records: &[SnrRecord], layout: Layout, year: i32, doy: u32) -> Option<Vec<TdbRow>> {
    let start = NaiveDate::from_yo_opt(year, doy)?
        .and_hms_opt(0, 0, 0)?
        .and_utc()
        .timestamp_micros();
    let obs: &[&str] = match layout {
        Layout::Broadcast => &["s1", "s2", "s5"],
        Layout::Precise => &["s1", "s2", "s5", "s6", "s7", "s8"],
    };

    let mut recs: Vec<&SnrRecord> = records.iter().filter(|r| !r.is_empty()).collect();
    recs.sort_by(|a, b| {
        a.sod
            .total_cmp(&b.sod)
            .then(sysid(a.sat).cmp(&sysid(b.sat)))
            .then(a.sat.cmp(&b.sat))
    });

    let mut rows = Vec::with_capacity(recs.len() * obs.len());
    for rec in recs {
        let bands = rec.bands();
        for (b, name) in obs.iter().enumerate() {
            rows.push(TdbRow {
                time: (rec.sod * 1E6) as i64 + start,
                sys: sysid(rec.sat),
                sat: rec.sat as u16,
                obs: name.to_string(),
                cn0: zero_nan(bands[b]) as f32,
                elevation: rec.el as f32,
                azimuth: rec.az as f32,
                edot: zero_nan(rec.edot) as f32,
            });
        }
    }
    Some(rows)
}

/// read the records of an SNR file, plain or gzip
pub fn read_snrfile<P: AsRef<Path>>(path: P) -> io::Result<Vec<SnrRecord>> {
    let mut recs = Vec::new();
    for line in openfile(path)? {
        if let Some(rec) = SnrRecord::parse(&line?) {
            recs.push(rec);
        }
    }
    Ok(recs)
}

const SCHEMA: &str = "__schema.json";
const VACUUM: &str = "__vacuum";
const FRAGMENT: &str = "frag_";

/// store kept as a directory of JSON-lines fragments
#[derive(Debug, Clone)]
pub struct FileStore {
    pub root: PathBuf,
}

impl FileStore {
    /// `<refl_code>/<station>.tdb`
    pub fn new(refl_code: &Path, station: &str) -> Self {
        FileStore { root: refl_code.join(format!("{}.tdb", station)) }
    }

    /// fragment files ordered by sequence number
    fn fragments(&self) -> io::Result<Vec<(u64, PathBuf)>> {
        let mut frags = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let seq = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(FRAGMENT))
                .and_then(|n| n.strip_suffix(".jsonl"))
                .and_then(|n| n.parse::<u64>().ok());
            if let Some(seq) = seq {
                frags.push((seq, path));
            }
        }
        frags.sort();
        Ok(frags)
    }

    fn fragment_path(&self, seq: u64) -> PathBuf {
        self.root.join(format!("{}{:06}.jsonl", FRAGMENT, seq))
    }

    fn next_seq(&self) -> io::Result<u64> {
        Ok(self.fragments()?.last().map(|(s, _)| s + 1).unwrap_or(0))
    }

    fn write_fragment(&self, seq: u64, rows: &[TdbRow]) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(self.fragment_path(seq))?);
        for row in rows {
            serde_json::to_writer(&mut out, row)?;
            out.write_all(b"\n")?;
        }
        out.flush()
    }

    fn read_fragment(path: &Path) -> io::Result<Vec<TdbRow>> {
        let mut rows = Vec::new();
        for line in BufReader::new(File::open(path)?).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                rows.push(serde_json::from_str(&line)?);
            }
        }
        Ok(rows)
    }

    /// all cells, later writes replacing earlier ones, ordered by key
    pub fn read_all(&self) -> io::Result<Vec<TdbRow>> {
        let mut cells = BTreeMap::new();
        for (_, path) in self.fragments()? {
            for row in Self::read_fragment(&path)? {
                cells.insert(row.key(), row);
            }
        }
        Ok(cells.into_values().collect())
    }
}

impl TimeSeriesStore for FileStore {
    fn create_if_absent(&mut self) -> io::Result<()> {
        if self.root.join(SCHEMA).is_file() {
            return Ok(());
        }
        fs::create_dir_all(&self.root)?;
        let schema = json!({
            "dims": ["time", "sys", "sat", "obs"],
            "attrs": ["cn0", "elevation", "azimuth", "edot"],
            "sparse": true,
        });
        fs::write(self.root.join(SCHEMA), serde_json::to_vec_pretty(&schema)?)
    }

    fn write(&mut self, rows: &[TdbRow]) -> io::Result<()> {
        let seq = self.next_seq()?;
        debug!("{} rows to fragment {}", rows.len(), seq);
        self.write_fragment(seq, rows)
    }

    fn consolidate(&mut self) -> io::Result<()> {
        let frags = self.fragments()?;
        if frags.len() < 2 {
            return Ok(());
        }
        let merged = self.read_all()?;
        let seq = frags.last().map(|(s, _)| s + 1).unwrap_or(0);
        self.write_fragment(seq, &merged)?;
        let stale: Vec<String> = frags.iter().map(|(_, p)| p.to_string_lossy().into_owned()).collect();
        fs::write(self.root.join(VACUUM), stale.join("\n"))
    }

    fn vacuum(&mut self) -> io::Result<()> {
        let list = self.root.join(VACUUM);
        if !list.is_file() {
            return Ok(());
        }
        for path in fs::read_to_string(&list)?.lines().filter(|l| !l.is_empty()) {
            match fs::remove_file(path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        fs::remove_file(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(sat: usize, sod: f64, s1: f64, s2: f64) -> SnrRecord {
        SnrRecord { sat, el: 10.0, az: 90.0, sod, s1, s2, ..Default::default() }
    }

    #[test]
    fn test_snr2tdb() {
        let records = [
            rec(205, 30.0, 40.0, 0.0),
            rec(3, 30.0, 41.0, 35.0),
            rec(4, 0.0, 0.0, 0.0),
            rec(106, 0.0, 38.0, f64::NAN),
        ];
        let rows = snr2tdb(&records, Layout::Broadcast, 2020, 1).unwrap();
        // the all-zero record is dropped, three observables per record
        assert_eq!(rows.len(), 9);
        // 2020-01-01T00:00:00Z
        let day0 = 1_577_836_800_000_000;
        assert_eq!(rows[0].time, day0);
        assert_eq!((rows[0].sys, rows[0].sat), (1, 106));
        assert_eq!((rows[3].sys, rows[3].sat), (0, 3));
        assert_eq!(rows[3].time, day0 + 30_000_000);
        assert_eq!((rows[6].sys, rows[6].sat), (2, 205));
        assert_eq!(rows[1].obs, "s2");
        assert_eq!(rows[1].cn0, 0.0);
        assert!(snr2tdb(&records, Layout::Broadcast, 2021, 366).is_none());
        assert_eq!(snr2tdb(&records, Layout::Precise, 2020, 1).unwrap().len(), 18);
    }

    #[test]
    fn test_file_store() {
        let refl = std::env::temp_dir().join("rinex2snr_store_test");
        fs::remove_dir_all(&refl).ok();
        let mut store = FileStore::new(&refl, "p041");

        let day1 = snr2tdb(&[rec(1, 0.0, 40.0, 30.0)], Layout::Broadcast, 2020, 1).unwrap();
        write_batch(&mut store, &day1).unwrap();
        assert!(store.root.join(SCHEMA).is_file());
        assert_eq!(store.read_all().unwrap().len(), 3);

        // rewriting the same day replaces its cells
        let again = snr2tdb(&[rec(1, 0.0, 42.0, 30.0)], Layout::Broadcast, 2020, 1).unwrap();
        write_batch(&mut store, &again).unwrap();
        let day2 = snr2tdb(&[rec(2, 0.0, 39.0, 0.0)], Layout::Broadcast, 2020, 2).unwrap();
        write_batch(&mut store, &day2).unwrap();

        let rows = store.read_all().unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].cn0, 42.0);
        assert_eq!(store.fragments().unwrap().len(), 1);
        assert!(!store.root.join(VACUUM).exists());
        fs::remove_dir_all(&refl).ok();
    }

    #[test]
    fn test_read_snrfile() {
        let dir = std::env::temp_dir().join("rinex2snr_store_read");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("p0410010.20.snr66");
        let text = [rec(1, 0.0, 40.0, 30.0), rec(2, 30.0, 41.0, 0.0)]
            .iter()
            .map(|r| r.line(Layout::Broadcast))
            .collect::<String>();
        fs::write(&path, text).unwrap();
        let recs = read_snrfile(&path).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[1].sod, 30.0);
        fs::remove_dir_all(&dir).ok();
    }
}
