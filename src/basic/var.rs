use std::collections::BTreeMap;

pub const PI: f64 = std::f64::consts::PI;
pub const D2R: f64 = PI / 180.0;
pub const R2D: f64 = 180.0 / PI;

/// earth angular velocity (rad/s)
pub const OMGE: f64 = 7.2921151467e-5;
/// speed of light (m/s)
pub const CLIGHT: f64 = 299792458.0;
/// gravitational constant used by the broadcast orbit (m^3/s^2)
pub const MU_GPS: f64 = 3.986005e14;
/// earth semimajor axis (WGS84) (m)
pub const RE_WGS84: f64 = 6378137.0;
/// earth flattening (WGS84)
pub const FE_WGS84: f64 = 1.0 / 298.257223563;

/// seconds in a GPS week
pub const WEEKSEC: f64 = 604800.0;
/// half a GPS week, validity window of a broadcast ephemeris
pub const HALFWEEK: f64 = 302400.0;
/// seconds in a day
pub const DAYSEC: f64 = 86400.0;
/// tolerance of time difference (s)
pub const DTTOL: f64 = 0.025;

/// initial guess of the signal travel time (s)
pub const TAU0: f64 = 0.07;

pub const TSYS_GPS: i32 = 0;
pub const TSYS_UTC: i32 = 1;

pub const MAXPRNGPS: usize = 32;
pub const MAXPRNGLO: usize = 27;
pub const MAXPRNGAL: usize = 36;
pub const MAXPRNCMP: usize = 63;

/// signal bands carried into the SNR product
pub const SNR_BANDS: [&str; 6] = ["S1", "S2", "S5", "S6", "S7", "S8"];

/// tracking-code priority for each band when a RINEX 3 file lists several S observables
/// (G, R, E, C)
pub const CODEPRIS: [[&str; 6]; 4] = [
    /* GPS */ ["CPYWMNSL", "PYWCMNDLSX", "IQX", "", "", ""],
    /* GLO */ ["CPABX", "PCABX", "", "", "", ""],
    /* GAL */ ["CABXZ", "", "IQX", "ABCXZ", "IQX", "IQX"],
    /* BDS */ ["IQXDPAN", "IQXDPZ", "DPX", "IQXA", "IQXDPZ", "DPX"],
];

/// GPS - UTC (s) from the given date on, newest first
pub const LEAPS: [(i32, u32, u32, f64); 18] = [
    (2017, 1, 1, 18.0),
    (2015, 7, 1, 17.0),
    (2012, 7, 1, 16.0),
    (2009, 1, 1, 15.0),
    (2006, 1, 1, 14.0),
    (1999, 1, 1, 13.0),
    (1997, 7, 1, 12.0),
    (1996, 1, 1, 11.0),
    (1994, 7, 1, 10.0),
    (1993, 7, 1, 9.0),
    (1992, 7, 1, 8.0),
    (1991, 1, 1, 7.0),
    (1990, 1, 1, 6.0),
    (1988, 1, 1, 5.0),
    (1985, 7, 1, 4.0),
    (1983, 7, 1, 3.0),
    (1982, 7, 1, 2.0),
    (1981, 7, 1, 1.0),
];

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GTime {
    pub time: i64,
    pub sec: f64,
}

/// GPS broadcast ephemeris block
#[derive(Debug, Clone, Copy, Default)]
pub struct Eph {
    pub prn: usize,
    pub iode: i32,
    pub iodc: i32,
    pub svh: i32,
    pub week: i32,
    pub toe: GTime,  // Toe
    pub toc: GTime,  // Toc
    pub toes: f64,   // Toe (s) in week
    // SV orbit parameters
    pub sqrta: f64,
    pub e: f64,
    pub i0: f64,
    pub omg0: f64,
    pub omg: f64,
    pub m0: f64,
    pub deln: f64,
    pub omgd: f64,
    pub idot: f64,
    pub crc: f64,
    pub crs: f64,
    pub cuc: f64,
    pub cus: f64,
    pub cic: f64,
    pub cis: f64,
    pub f0: f64,
    pub f1: f64,
    pub f2: f64,     // SV clock parameters (af0, af1, af2)
    pub tgd: f64,
    pub fit: f64,    // fit interval (h)
}

#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub eph: Vec<Eph>,
}

impl Nav {
    pub fn new() -> Self {
        Nav::default()
    }

    pub fn add_eph(&mut self, eph: Eph) {
        self.eph.push(eph);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sta {
    pub name: String,          // marker name
    pub marker: String,        // marker number
    pub antdes: String,        // antenna descriptor
    pub rectype: String,       // receiver type descriptor
    pub pos: Option<[f64; 3]>, // approximate station position (ecef) (m)
    pub del: [f64; 3],         // antenna position delta (e/n/u) (m)
}

/// header labels with their raw content (first occurrence of each label)
pub type HeaderMap = BTreeMap<String, String>;
