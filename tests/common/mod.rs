#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const RE: f64 = 6378137.0;

/// fresh per-test directory under the system temp dir
pub fn tmpdir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    fs::remove_dir_all(&dir).ok();
    fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write(path: &Path, text: &str) {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).unwrap();
    }
    fs::write(path, text).unwrap();
}

fn hline(content: &str, label: &str) -> String {
    format!("{:<60}{}\n", content, label)
}

fn obsfield(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{:14.3}  ", v),
        None => " ".repeat(16),
    }
}

/// one satellite of an observation epoch: id and its readings per type
pub struct SatObs {
    pub id: &'static str,
    pub vals: Vec<Option<f64>>,
}

/// RINEX 2.11 mixed observation file; epochs are (seconds after 2020-01-01 00:00, satellites)
pub fn rinex2_obs(pos: [f64; 3], types: &[&str], epochs: &[(u32, Vec<SatObs>)]) -> String {
    let mut s = String::new();
    s += &hline("     2.11           OBSERVATION DATA    M (MIXED)", "RINEX VERSION / TYPE");
    s += &hline("TEST", "MARKER NAME");
    s += &hline(&format!("{:14.4}{:14.4}{:14.4}", pos[0], pos[1], pos[2]), "APPROX POSITION XYZ");
    let mut t = format!("{:6}", types.len());
    for ty in types {
        t += &format!("    {:>2}", ty);
    }
    s += &hline(&t, "# / TYPES OF OBSERV");
    s += &hline("  2020     1     1     0     0    0.0000000     GPS", "TIME OF FIRST OBS");
    s += &hline("", "END OF HEADER");
    for (sec, sats) in epochs {
        let ids: String = sats.iter().map(|o| o.id).collect();
        s += &format!(
            " {:2} {:2} {:2} {:2} {:2}{:11.7}  0{:3}{}\n",
            20,
            1,
            1,
            sec / 3600,
            sec % 3600 / 60,
            (sec % 60) as f64,
            sats.len(),
            ids
        );
        for o in sats {
            s += &o.vals.iter().map(|v| obsfield(*v)).collect::<String>();
            s += "\n";
        }
    }
    s
}

/// sp3 file of 2020-01-01 with fixed satellite positions (m) at 0, 15 and 30 minutes
pub fn sp3_static(sats: &[(&str, [f64; 3])]) -> String {
    let mut s = String::new();
    s += "#dP2020  1  1  0  0  0.00000000       3 ORBIT IGS14 HLM  TEST\n";
    s += "## 2086 259200.00000000   900.00000000 58849 0.0000000000000\n";
    for min in [0, 15, 30] {
        s += &format!("*  2020  1  1  0 {:2}  0.00000000\n", min);
        for (id, p) in sats {
            s += &format!(
                "P{}{:14.6}{:14.6}{:14.6}{:14.6}\n",
                id,
                p[0] / 1000.0,
                p[1] / 1000.0,
                p[2] / 1000.0,
                10.0
            );
        }
    }
    s += "EOF\n";
    s
}

/// satellite seen from a receiver on the equator at longitude 0 towards the east,
/// at the given elevation (deg) and 20000 km distance; 1 km north so no coordinate is zero
pub fn sat_at_elevation(el: f64) -> [f64; 3] {
    let d = 20_000_000.0;
    let el = el.to_radians();
    [RE + d * el.sin(), d * el.cos(), 1000.0]
}

pub fn equator_receiver() -> [f64; 3] {
    [RE, 0.0, 0.0]
}

/// RINEX 2 GPS navigation file with one ephemeris for G01
pub fn rinex2_nav() -> String {
    let mut s = String::new();
    s += &hline("     2.10           N: GPS NAV DATA", "RINEX VERSION / TYPE");
    s += &hline("    18", "LEAP SECONDS");
    s += &hline("", "END OF HEADER");
    let v = |x: f64| format!("{:19.12E}", x);
    s += &format!(" 1 20  1  1  0  0  0.0{}{}{}\n", v(1.0e-5), v(1.0e-12), v(0.0));
    let rows: [[f64; 4]; 7] = [
        [12.0, -20.5, 4.5e-9, 1.1],
        [-1.1e-6, 0.0123, 8.2e-6, 5153.65],
        [259200.0, 5.0e-8, -1.234, -3.0e-8],
        [0.9599, 230.0, 0.789, -8.1e-9],
        [1.2e-10, 1.0, 2086.0, 0.0],
        [2.0, 0.0, -1.0e-8, 12.0],
        [0.0, 4.0, 0.0, 0.0],
    ];
    for r in rows {
        s += &format!("   {}{}{}{}\n", v(r[0]), v(r[1]), v(r[2]), v(r[3]));
    }
    s
}

/// fields of the SNR lines of a file
pub fn snr_fields(path: &Path) -> Vec<Vec<f64>> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| l.split_whitespace().map(|v| v.parse().unwrap()).collect())
        .collect()
}

/// RINEX 3.04 observation file; `types` are (system letter, observation codes)
pub fn rinex3_obs(
    pos: [f64; 3],
    types: &[(char, &[&str])],
    epochs: &[(u32, Vec<SatObs>)],
) -> String {
    let mut s = String::new();
    s += &hline("     3.04           OBSERVATION DATA    M", "RINEX VERSION / TYPE");
    s += &hline("MCHL00AUS", "MARKER NAME");
    s += &hline(&format!("{:14.4}{:14.4}{:14.4}", pos[0], pos[1], pos[2]), "APPROX POSITION XYZ");
    for (sys, codes) in types {
        let mut t = format!("{}{:5}", sys, codes.len());
        for c in codes.iter() {
            t += &format!(" {}", c);
        }
        s += &hline(&t, "SYS / # / OBS TYPES");
    }
    s += &hline("", "END OF HEADER");
    for (sec, sats) in epochs {
        s += &format!(
            "> 2020 01 01 {:02} {:02}{:11.7}  0{:3}\n",
            sec / 3600,
            sec % 3600 / 60,
            (sec % 60) as f64,
            sats.len()
        );
        for o in sats {
            s += o.id;
            s += &o.vals.iter().map(|v| obsfield(*v)).collect::<String>();
            s += "\n";
        }
    }
    s
}

pub fn gzip(path: &Path, text: &str) {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).unwrap();
    }
    let mut enc = GzEncoder::new(fs::File::create(path).unwrap(), Compression::default());
    enc.write_all(text.as_bytes()).unwrap();
    enc.finish().unwrap();
}
