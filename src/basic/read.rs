use crate::basic::eph::decode_eph;
use crate::basic::func::{field, navval, openfile};
use crate::basic::sat::*;
use crate::basic::time::*;
use crate::basic::var::*;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use nalgebra::DMatrix;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to read rinex file: {0}")]
    Io(#[from] io::Error),
    #[error("malformed header record \"{0}\"")]
    Header(String),
    #[error("rinex obs invalid epoch: epoch={0}")]
    Epoch(String),
    #[error("malformed navigation record \"{0}\"")]
    Navigation(String),
    #[error("unsupported rinex version {0:.2}")]
    Version(f64),
    #[error("not a rinex {0} file (type '{1}')")]
    FileType(&'static str, char),
    #[error("unexpected end of file")]
    Truncated,
}

/// observations of one constellation: satellites, slot map and per-band tables
#[derive(Debug, Clone, Default)]
pub struct SysObs {
    /// observation codes as listed in the header
    pub obstypes: Vec<String>,
    /// observed satellites (prn), ascending
    pub sats: Vec<usize>,
    /// prn -> column of the band tables
    pub slot: BTreeMap<usize, usize>,
    /// band (S1..S8) -> [epoch, slot] values, NaN when absent
    pub data: BTreeMap<String, DMatrix<f64>>,
}

impl SysObs {
    pub fn band(&self, band: &str) -> Option<&DMatrix<f64>> {
        self.data.get(band)
    }

    /// one reading, NaN if the band, satellite or epoch is unknown
    pub fn value(&self, band: &str, epoch: usize, prn: usize) -> f64 {
        match (self.data.get(band), self.slot.get(&prn)) {
            (Some(m), Some(&j)) if epoch < m.nrows() => m[(epoch, j)],
            _ => f64::NAN,
        }
    }
}

/// contents of a RINEX observation file
#[derive(Debug, Clone, Default)]
pub struct ObsData {
    pub header: HeaderMap,
    pub sta: Sta,
    pub ver: f64,
    /// epoch times (GPST), in file order
    pub times: Vec<GTime>,
    pub systems: BTreeMap<char, SysObs>,
}

impl ObsData {
    pub fn sys(&self, sys: char) -> Option<&SysObs> {
        self.systems.get(&sys)
    }

    /// true if any constellation carries the band
    pub fn has_band(&self, band: &str) -> bool {
        self.systems.values().any(|s| s.data.contains_key(band))
    }
}

#[derive(Debug, Default)]
struct ObsHeader {
    ver: f64,
    defsys: char,
    tsys: i32,
    types2: Vec<String>,
    types3: BTreeMap<char, Vec<String>>,
    map: HeaderMap,
    sta: Sta,
}

impl ObsHeader {
    fn obstypes(&self, sys: char) -> &[String] {
        if self.ver <= 2.99 {
            &self.types2
        } else {
            self.types3.get(&sys).map(|v| v.as_slice()).unwrap_or(&[])
        }
    }
}

fn next_line<I>(lines: &mut I) -> Result<String, ReadError>
where
    I: Iterator<Item = io::Result<String>>,
{
    Ok(lines.next().ok_or(ReadError::Truncated)??)
}

fn new_spinner(msg: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("/|\\- ")
        .template("{spinner:.green} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(msg);
    pb
}

fn sysindex(sys: char) -> Option<usize> {
    match sys {
        'G' => Some(0),
        'R' => Some(1),
        'E' => Some(2),
        'C' => Some(3),
        _ => None,
    }
}

/// columns holding each SNR band, best tracking code first
fn band_columns(sys: char, types: &[String], ver: f64) -> [Vec<usize>; 6] {
    let mut cols: [Vec<usize>; 6] = Default::default();
    for (b, band) in SNR_BANDS.iter().enumerate() {
        if ver <= 2.99 {
            cols[b] = types.iter().position(|t| t == band).into_iter().collect();
            continue;
        }
        let pri = sysindex(sys).map(|i| CODEPRIS[i][b]).unwrap_or("");
        let mut cand: Vec<(usize, usize)> = types
            .iter()
            .enumerate()
            .filter(|(_, t)| t.starts_with(band))
            .map(|(i, t)| {
                let attr = t.chars().nth(2).unwrap_or(' ');
                (pri.find(attr).unwrap_or(pri.len()), i)
            })
            .collect();
        cand.sort();
        cols[b] = cand.into_iter().map(|(_, i)| i).collect();
    }
    cols
}

/// decode RINEX observation data file header
fn decode_obsh<I>(lines: &mut I, hdr: &mut ObsHeader) -> Result<(), ReadError>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut typed = false;
    loop {
        let mut buff = next_line(lines)?;
        if buff.len() <= 60 {
            continue;
        }
        let label = buff.get(60..).unwrap_or("").trim().to_string();
        hdr.map
            .entry(label.clone())
            .or_insert_with(|| buff.get(..60).unwrap_or("").trim_end().to_string());

        if label.contains("RINEX VERSION / TYPE") {
            hdr.ver = field(&buff, 0, 9)
                .parse()
                .map_err(|_| ReadError::Header(buff.clone()))?;
            let type_ = buff.chars().nth(20).unwrap_or(' ');
            if type_ != 'O' {
                return Err(ReadError::FileType("observation", type_));
            }
            if !(2.0..4.0).contains(&hdr.ver) {
                return Err(ReadError::Version(hdr.ver));
            }
            hdr.defsys = match buff.chars().nth(40).unwrap_or(' ') {
                ' ' | 'M' => 'G',
                'R' => {
                    hdr.tsys = TSYS_UTC;
                    'R'
                }
                c => c,
            };
            typed = true;
        } else if label.contains("MARKER NAME") {
            hdr.sta.name = field(&buff, 0, 60).to_string();
        } else if label.contains("MARKER NUMBER") {
            hdr.sta.marker = field(&buff, 0, 20).to_string();
        } else if label.contains("REC # / TYPE / VERS") {
            hdr.sta.rectype = field(&buff, 20, 20).to_string();
        } else if label.contains("ANT # / TYPE") {
            hdr.sta.antdes = field(&buff, 20, 20).to_string();
        } else if label.contains("APPROX POSITION XYZ") {
            let xyz: Result<Vec<f64>, _> =
                (0..3).map(|i| field(&buff, i * 14, 14).parse::<f64>()).collect();
            match xyz {
                Ok(xyz) => hdr.sta.pos = Some([xyz[0], xyz[1], xyz[2]]),
                Err(_) => warn!("unreadable approximate position \"{}\"", field(&buff, 0, 42)),
            }
        } else if label.contains("ANTENNA: DELTA H/E/N") {
            let mut del = [0.0; 3];
            for (i, d) in del.iter_mut().enumerate() {
                *d = field(&buff, i * 14, 14).parse().unwrap_or(0.0);
            }
            hdr.sta.del = [del[1], del[2], del[0]];
        } else if label.contains("SYS / # / OBS TYPES") {
            let sys = buff.chars().next().unwrap_or(' ');
            let n: usize = field(&buff, 3, 3)
                .parse()
                .map_err(|_| ReadError::Header(buff.clone()))?;
            let mut types = Vec::with_capacity(n);
            let mut k = 7;
            for _ in 0..n {
                if k > 58 {
                    buff = next_line(lines)?;
                    k = 7;
                }
                types.push(field(&buff, k, 3).to_string());
                k += 4;
            }
            hdr.types3.insert(sys, types);
        } else if label.contains("# / TYPES OF OBSERV") {
            let n: usize = field(&buff, 0, 6)
                .parse()
                .map_err(|_| ReadError::Header(buff.clone()))?;
            let mut j = 10;
            for _ in 0..n {
                if j > 58 {
                    buff = next_line(lines)?;
                    j = 10;
                }
                hdr.types2.push(field(&buff, j, 2).to_string());
                j += 6;
            }
        } else if label.contains("TIME OF FIRST OBS") {
            hdr.tsys = match field(&buff, 48, 3) {
                "GLO" => TSYS_UTC,
                "" => hdr.tsys,
                _ => TSYS_GPS,
            };
        } else if label.contains("END OF HEADER") {
            if !typed {
                return Err(ReadError::Header(buff));
            }
            return Ok(());
        }
    }
}

/// observation epoch record
struct ObsEpoch {
    time: Option<GTime>,
    flag: u8,
    n: usize,
    sats: Vec<Option<(char, usize)>>,
}

/// decode observation epoch
fn decode_obsepoch<I>(
    lines: &mut I,
    buff: &str,
    ver: f64,
    defsys: char,
) -> Result<ObsEpoch, ReadError>
where
    I: Iterator<Item = io::Result<String>>,
{
    let (flag_col, n_col, time_col, time_len) =
        if ver <= 2.99 { (28, 29, 0, 26) } else { (31, 32, 1, 28) };

    if ver > 2.99 && !buff.starts_with('>') {
        return Err(ReadError::Epoch(buff.to_string()));
    }
    let n: usize = field(buff, n_col, 3)
        .parse()
        .map_err(|_| ReadError::Epoch(buff.to_string()))?;
    // epoch flag: 2:moving antenna, 3:new site, 4:header info, 5:external event
    let flag: u8 = field(buff, flag_col, 1).parse().unwrap_or(0);
    if (2..=5).contains(&flag) {
        return Ok(ObsEpoch { time: None, flag, n, sats: Vec::new() });
    }

    let epoch = field(buff, time_col, time_len);
    let time = str2time(epoch).map_err(|_| ReadError::Epoch(epoch.to_string()))?;

    let mut sats = Vec::with_capacity(n);
    if ver <= 2.99 {
        let mut line = buff.to_string();
        let mut j = 32;
        for _ in 0..n {
            if j >= 68 {
                line = next_line(lines)?;
                j = 32;
            }
            sats.push(line.get(j..j + 3).and_then(|id| satid2no(id, defsys)));
            j += 3;
        }
    }
    Ok(ObsEpoch { time: Some(time), flag, n, sats })
}

/// one observation value of a 16-column field, NaN when blank
fn obsval(buff: &str, j: usize) -> f64 {
    field(buff, j, 14).parse().unwrap_or(f64::NAN)
}

/// decode observation data of one satellite (RINEX 2: continuation every 5 values)
fn decode_obsdata<I>(
    lines: &mut I,
    buff: &str,
    ver: f64,
    ntypes: usize,
) -> Result<Vec<f64>, ReadError>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut val = Vec::with_capacity(ntypes);
    if ver > 2.99 {
        for i in 0..ntypes {
            val.push(obsval(buff, 3 + i * 16));
        }
        return Ok(val);
    }
    let mut line = buff.to_string();
    for i in 0..ntypes {
        if i > 0 && i % 5 == 0 {
            line = next_line(lines)?;
        }
        val.push(obsval(&line, (i % 5) * 16));
    }
    Ok(val)
}

/// pick each band from its best populated column
fn select_bands(val: &[f64], cols: &[Vec<usize>; 6]) -> [f64; 6] {
    let mut bands = [f64::NAN; 6];
    for (b, c) in cols.iter().enumerate() {
        if let Some(v) = c.iter().map(|&i| val.get(i).copied().unwrap_or(f64::NAN)).find(|v| !v.is_nan()) {
            bands[b] = v;
        }
    }
    bands
}

type Readings = BTreeMap<char, BTreeMap<usize, Vec<(usize, [f64; 6])>>>;

/// read RINEX 2/3 observation file
pub fn readrnxobs<P: AsRef<Path>>(path: P) -> Result<ObsData, ReadError> {
    let mut lines = openfile(path)?;
    let mut hdr = ObsHeader::default();
    decode_obsh(&mut lines, &mut hdr)?;

    let cols: BTreeMap<char, [Vec<usize>; 6]> = CONSTELLATIONS
        .iter()
        .map(|&sys| (sys, band_columns(sys, hdr.obstypes(sys), hdr.ver)))
        .collect();

    let pb = new_spinner("Reading obs...");
    let mut times: Vec<GTime> = Vec::new();
    let mut readings: Readings = BTreeMap::new();

    while let Some(line) = lines.next() {
        let buff = line?;
        if buff.trim().is_empty() {
            continue;
        }
        let epoch = decode_obsepoch(&mut lines, &buff, hdr.ver, hdr.defsys)?;
        let Some(mut time) = epoch.time else {
            // special records
            for _ in 0..epoch.n {
                next_line(&mut lines)?;
            }
            continue;
        };
        if hdr.tsys == TSYS_UTC {
            time = utc2gpst(time);
        }
        let iepoch = times.len();

        for i in 0..epoch.n {
            let buff = next_line(&mut lines)?;
            let sat = if hdr.ver <= 2.99 {
                epoch.sats.get(i).copied().flatten()
            } else {
                buff.get(0..3).and_then(|id| satid2no(id, hdr.defsys))
            };
            let ntypes = match sat {
                Some((sys, _)) => hdr.obstypes(sys).len(),
                None => hdr.obstypes(hdr.defsys).len(),
            };
            let val = decode_obsdata(&mut lines, &buff, hdr.ver, ntypes)?;

            let Some((sys, prn)) = sat else { continue };
            if epoch.flag > 1 || satcode(sys, prn).is_none() {
                continue;
            }
            let Some(c) = cols.get(&sys) else { continue };
            readings
                .entry(sys)
                .or_default()
                .entry(prn)
                .or_default()
                .push((iepoch, select_bands(&val, c)));
        }
        if epoch.flag <= 1 {
            times.push(time);
        }
        pb.tick();
    }
    pb.finish_with_message("Finish reading obs");

    let nepoch = times.len();
    let mut systems = BTreeMap::new();
    for (sys, sats) in readings {
        let Some(c) = cols.get(&sys) else { continue };
        let mut obs = SysObs {
            obstypes: hdr.obstypes(sys).to_vec(),
            sats: sats.keys().copied().collect(),
            slot: sats.keys().enumerate().map(|(j, &prn)| (prn, j)).collect(),
            data: BTreeMap::new(),
        };
        for (b, band) in SNR_BANDS.iter().enumerate() {
            if c[b].is_empty() {
                continue;
            }
            let mut m = DMatrix::from_element(nepoch, sats.len(), f64::NAN);
            for (j, recs) in sats.values().enumerate() {
                for (k, v) in recs {
                    m[(*k, j)] = v[b];
                }
            }
            obs.data.insert(band.to_string(), m);
        }
        debug!("{}: {} satellites, bands {:?}", sysname(sys), obs.sats.len(), obs.data.keys());
        systems.insert(sys, obs);
    }

    Ok(ObsData {
        header: hdr.map,
        sta: hdr.sta,
        ver: hdr.ver,
        times,
        systems,
    })
}

/// decode RINEX navigation data file header
fn decode_navh<I>(lines: &mut I) -> Result<f64, ReadError>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut ver = 0.0;
    loop {
        let buff = next_line(lines)?;
        let label = buff.get(60..).unwrap_or("");

        if label.contains("RINEX VERSION / TYPE") {
            ver = field(&buff, 0, 9)
                .parse()
                .map_err(|_| ReadError::Header(buff.clone()))?;
            let type_ = buff.chars().nth(20).unwrap_or(' ');
            if type_ != 'N' {
                return Err(ReadError::FileType("navigation", type_));
            }
            if !(2.0..4.0).contains(&ver) {
                return Err(ReadError::Version(ver));
            }
        } else if label.contains("END OF HEADER") {
            return Ok(ver);
        }
    }
}

/// read RINEX navigation data body, one GPS record; None at end of file
fn readrnxnavb<I>(lines: &mut I, ver: f64) -> Result<Option<Eph>, ReadError>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut data = [0.0; 31];

    loop {
        let Some(line) = lines.next() else {
            return Ok(None);
        };
        let buff = line?;
        if buff.trim().is_empty() {
            continue;
        }

        let (prn, sp) = if ver >= 3.0 {
            let sys = buff.chars().next().unwrap_or(' ');
            let skip = match sys {
                'G' => 0,
                'R' | 'S' => 3,
                _ => 7,
            };
            if skip > 0 {
                for _ in 0..skip {
                    next_line(lines)?;
                }
                continue;
            }
            let prn = field(&buff, 1, 2).parse::<usize>();
            (prn, 4)
        } else {
            (field(&buff, 0, 2).parse::<usize>(), 3)
        };
        let prn = prn.map_err(|_| ReadError::Navigation(buff.clone()))?;
        let toc = str2time(field(&buff, sp, 19)).map_err(|_| ReadError::Navigation(buff.clone()))?;

        for j in 0..3 {
            data[j] = navval(field(&buff, sp + (j + 1) * 19, 19))
                .map_err(|_| ReadError::Navigation(buff.clone()))?;
        }
        let mut i = 3;
        while i < data.len() {
            let buff = next_line(lines)?;
            for j in 0..4 {
                if i >= data.len() {
                    break;
                }
                data[i] = navval(field(&buff, sp + j * 19, 19))
                    .map_err(|_| ReadError::Navigation(buff.clone()))?;
                i += 1;
            }
        }
        return Ok(Some(decode_eph(prn, toc, &data)));
    }
}

/// read RINEX 2/3 GPS navigation file
pub fn readrnxnav<P: AsRef<Path>>(path: P) -> Result<Nav, ReadError> {
    let mut lines = openfile(path)?;
    let ver = decode_navh(&mut lines)?;
    let mut nav = Nav::new();

    let pb = new_spinner("Reading nav...");
    while let Some(eph) = readrnxnavb(&mut lines, ver)? {
        pb.tick();
        if satcode('G', eph.prn).is_none() {
            warn!("invalid GPS prn {} in navigation file", eph.prn);
            continue;
        }
        nav.add_eph(eph);
    }
    pb.finish_with_message("Finish reading nav");
    debug!("{} GPS ephemerides", nav.eph.len());
    Ok(nav)
}
