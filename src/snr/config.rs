use crate::snr::error::{Error, Result};
use crate::snr::station::Station;
use log::warn;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// archives serving RINEX 3 files
pub const ARCHIVES_RINEX3: [&str; 7] = ["unavco", "cddis", "bev", "bkg", "ga", "epn", "all"];
/// archives serving high-rate RINEX 2 files
pub const ARCHIVES_HIGHRATE: [&str; 3] = ["unavco", "nrcan", "cddis"];
/// archives serving RINEX 2 files
pub const ARCHIVES_RINEX2: [&str; 14] = [
    "sopac", "unavco", "sonel", "cddis", "nz", "ga", "bkg", "jeff", "ngs", "nrcan", "special",
    "bev", "jp", "all",
];

/// directories and executables of a conversion run
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// root of the SNR products
    pub refl_code: PathBuf,
    /// root of the orbit files
    pub orbits: PathBuf,
    /// directory of the external translators
    pub exe: PathBuf,
    pub log_dir: PathBuf,
    /// where RINEX files are staged and SNR files are produced
    pub work_dir: PathBuf,
    /// seconds allowed to an external tool, 0 for no limit
    pub tool_timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            refl_code: PathBuf::from("."),
            orbits: PathBuf::from("."),
            exe: PathBuf::from("."),
            log_dir: PathBuf::from("logs"),
            work_dir: PathBuf::from("."),
            tool_timeout: 0,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// check the directories once before a run, creating the output ones
    pub fn validate(&self) -> Result<()> {
        for dir in [&self.refl_code, &self.orbits, &self.log_dir, &self.work_dir] {
            if dir.as_os_str().is_empty() {
                return Err(Error::Config("empty directory name".to_string()));
            }
            fs::create_dir_all(dir)?;
        }
        if !self.exe.is_dir() {
            warn!("executable directory {} does not exist", self.exe.display());
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.tool_timeout > 0).then(|| Duration::from_secs(self.tool_timeout))
    }

    /// external translator for the orbit source
    pub fn snrexe(&self, source: OrbitSource) -> PathBuf {
        match source {
            OrbitSource::BroadcastNav => self.exe.join("gpsSNR.e"),
            OrbitSource::PreciseSp3 => self.exe.join("gnssSNR.e"),
        }
    }

    pub fn crx2rnx(&self) -> PathBuf {
        self.exe.join("CRX2RNX")
    }

    pub fn gfzrnx(&self) -> PathBuf {
        self.exe.join("gfzrnx")
    }
}

/// SNR format id, selects the elevation window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnrFormat(pub u32);

impl Default for SnrFormat {
    fn default() -> Self {
        SnrFormat(66)
    }
}

impl SnrFormat {
    /// min and max elevation angles (deg)
    pub fn elev_limits(&self) -> (f64, f64) {
        match self.0 {
            99 => (5.0, 30.0),
            50 => (0.0, 10.0),
            66 => (0.0, 30.0),
            88 => (5.0, 90.0),
            _ => (5.0, 30.0),
        }
    }
}

impl fmt::Display for SnrFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitSource {
    BroadcastNav,
    PreciseSp3,
}

/// orbit product of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitType {
    Nav,
    Igs,
    Igr,
    Jax,
    Gbm,
    Grg,
    Wum,
    Gfr,
    Esa,
    Ultra,
}

impl OrbitType {
    pub fn source(&self) -> OrbitSource {
        match self {
            OrbitType::Nav => OrbitSource::BroadcastNav,
            _ => OrbitSource::PreciseSp3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrbitType::Nav => "nav",
            OrbitType::Igs => "igs",
            OrbitType::Igr => "igr",
            OrbitType::Jax => "jax",
            OrbitType::Gbm => "gbm",
            OrbitType::Grg => "grg",
            OrbitType::Wum => "wum",
            OrbitType::Gfr => "gfr",
            OrbitType::Esa => "esa",
            OrbitType::Ultra => "ultra",
        }
    }

    /// long IGS product prefix of a precise orbit
    pub fn long_name(&self) -> Option<&'static str> {
        match self {
            OrbitType::Gbm => Some("GFZ0MGXRAP"),
            OrbitType::Gfr => Some("GFZ0OPSRAP"),
            OrbitType::Esa => Some("ESA0MGNFIN"),
            OrbitType::Wum => Some("WUM0MGXFIN"),
            OrbitType::Grg => Some("GRG0MGXFIN"),
            OrbitType::Jax => Some("JAX0MGXFIN"),
            OrbitType::Igs => Some("IGS0OPSFIN"),
            OrbitType::Igr => Some("IGS0OPSRAP"),
            OrbitType::Ultra => Some("WUM0MGXULT"),
            OrbitType::Nav => None,
        }
    }
}

impl FromStr for OrbitType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nav" | "gps" => Ok(OrbitType::Nav),
            "igs" => Ok(OrbitType::Igs),
            "igr" => Ok(OrbitType::Igr),
            "jax" | "gps+glo" => Ok(OrbitType::Jax),
            "gbm" | "gnss" | "gnss2" => Ok(OrbitType::Gbm),
            "grg" => Ok(OrbitType::Grg),
            "wum" => Ok(OrbitType::Wum),
            "gfr" | "rapid" => Ok(OrbitType::Gfr),
            "esa" => Ok(OrbitType::Esa),
            "ultra" => Ok(OrbitType::Ultra),
            _ => Err(Error::OrbitType(s.to_string())),
        }
    }
}

impl fmt::Display for OrbitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// requested translator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Translator {
    Fortran,
    Hybrid,
    Python,
}

impl FromStr for Translator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fortran" => Ok(Translator::Fortran),
            "hybrid" => Ok(Translator::Hybrid),
            "python" => Ok(Translator::Python),
            _ => Err(Error::Translator(s.to_string())),
        }
    }
}

/// SNR production backend, resolved once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// external gpsSNR.e / gnssSNR.e executable
    Fortran,
    /// in-process pipeline
    Native,
    /// in-process pipeline, the default translator; runs like `Native`
    Hybrid,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Backend::Fortran => "fortran",
            Backend::Native => "native",
            Backend::Hybrid => "hybrid",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rate {
    #[default]
    Low,
    High,
}

impl FromStr for Rate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Rate::Low),
            "high" => Ok(Rate::High),
            _ => Err(Error::Rate(s.to_string())),
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if *self == Rate::High { "high" } else { "low" })
    }
}

/// RINEX 3 data stream, receiver (R) or stream (S)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stream {
    #[default]
    R,
    S,
}

impl Stream {
    /// anything other than S reads as R
    pub fn parse_lossy(s: &str) -> Self {
        if s == "S" {
            Stream::S
        } else {
            Stream::R
        }
    }

    pub fn swap(&self) -> Self {
        match self {
            Stream::R => Stream::S,
            Stream::S => Stream::R,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Stream::R => 'R',
            Stream::S => 'S',
        }
    }
}

/// per-run choices
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub station: String,
    pub year: i32,
    pub doy: u32,
    pub doy_end: Option<u32>,
    pub year_end: Option<i32>,
    pub snr: SnrFormat,
    pub orb: OrbitType,
    pub rate: Rate,
    /// decimation interval (s), 0 keeps every epoch
    pub dec: i32,
    pub nolook: bool,
    pub archive: String,
    pub overwrite: bool,
    pub translator: Option<Translator>,
    pub fortran: bool,
    /// RINEX 3 sample rate (s)
    pub samplerate: u32,
    pub stream: Stream,
    pub mk: bool,
    pub weekly: bool,
    pub tdb: bool,
    pub strict: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            station: String::new(),
            year: 0,
            doy: 1,
            doy_end: None,
            year_end: None,
            snr: SnrFormat::default(),
            orb: OrbitType::Nav,
            rate: Rate::Low,
            dec: 0,
            nolook: false,
            archive: "all".to_string(),
            overwrite: false,
            translator: None,
            fortran: false,
            samplerate: 30,
            stream: Stream::R,
            mk: false,
            weekly: false,
            tdb: false,
            strict: false,
        }
    }
}

impl RunOptions {
    /// pre-flight checks, any failure rejects the whole run
    pub fn validate(&self) -> Result<Station> {
        let station = Station::new(&self.station, &self.archive, self.mk)?;
        for year in [Some(self.year), self.year_end].into_iter().flatten() {
            if !(1000..=9999).contains(&year) {
                return Err(Error::Year(year));
            }
        }
        for doy in [Some(self.doy), self.doy_end].into_iter().flatten() {
            if !(1..=366).contains(&doy) {
                return Err(Error::Doy(doy));
            }
        }
        let allowed: &[&str] = if station.is_rinex3() {
            &ARCHIVES_RINEX3
        } else if self.rate == Rate::High {
            &ARCHIVES_HIGHRATE
        } else {
            &ARCHIVES_RINEX2
        };
        if !allowed.contains(&self.archive.as_str()) {
            return Err(Error::Archive(self.archive.clone()));
        }
        Ok(station)
    }

    /// day step of the range
    pub fn skipit(&self) -> u32 {
        if self.weekly {
            7
        } else {
            1
        }
    }

    /// backend of the run; a missing Fortran executable falls back to the in-process pipeline
    pub fn backend(&self, cfg: &Config) -> Backend {
        let translator = match self.translator {
            Some(t) => t,
            None if self.fortran => Translator::Fortran,
            None => Translator::Hybrid,
        };
        match translator {
            Translator::Hybrid => Backend::Hybrid,
            Translator::Python => Backend::Native,
            Translator::Fortran => {
                let source = self.orb.source();
                let exe = cfg.snrexe(source);
                if exe.is_file() {
                    return Backend::Fortran;
                }
                match source {
                    OrbitSource::BroadcastNav => {
                        warn!("fortran translator {} is not installed, using hybrid", exe.display());
                        Backend::Hybrid
                    }
                    OrbitSource::PreciseSp3 => {
                        warn!("fortran translator {} is not installed, using native", exe.display());
                        Backend::Native
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(station: &str) -> RunOptions {
        RunOptions { station: station.to_string(), year: 2020, doy: 1, ..Default::default() }
    }

    #[test]
    fn test_elev_limits() {
        assert_eq!(SnrFormat(99).elev_limits(), (5.0, 30.0));
        assert_eq!(SnrFormat(50).elev_limits(), (0.0, 10.0));
        assert_eq!(SnrFormat(66).elev_limits(), (0.0, 30.0));
        assert_eq!(SnrFormat(88).elev_limits(), (5.0, 90.0));
        assert_eq!(SnrFormat(77).elev_limits(), (5.0, 30.0));
    }

    #[test]
    fn test_orbit_types() {
        assert_eq!("gps".parse::<OrbitType>().unwrap(), OrbitType::Nav);
        assert_eq!("rapid".parse::<OrbitType>().unwrap(), OrbitType::Gfr);
        assert_eq!("gnss".parse::<OrbitType>().unwrap(), OrbitType::Gbm);
        assert_eq!("gnss2".parse::<OrbitType>().unwrap(), OrbitType::Gbm);
        assert_eq!("gps+glo".parse::<OrbitType>().unwrap(), OrbitType::Jax);
        assert_eq!(OrbitType::Nav.source(), OrbitSource::BroadcastNav);
        assert_eq!(OrbitType::Esa.source(), OrbitSource::PreciseSp3);
        assert!(matches!("sp3".parse::<OrbitType>(), Err(Error::OrbitType(_))));
    }

    #[test]
    fn test_rate_stream_translator() {
        assert_eq!("HIGH".parse::<Rate>().unwrap(), Rate::High);
        assert!("medium".parse::<Rate>().is_err());
        assert_eq!(Stream::parse_lossy("S"), Stream::S);
        assert_eq!(Stream::parse_lossy("X"), Stream::R);
        assert_eq!(Stream::R.swap(), Stream::S);
        assert_eq!("python".parse::<Translator>().unwrap(), Translator::Python);
        assert!("teqc".parse::<Translator>().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(opts("p041").validate().is_ok());
        assert!(matches!(opts("p04").validate(), Err(Error::Station(_))));
        let mut o = opts("p041");
        o.year = 20;
        assert!(matches!(o.validate(), Err(Error::Year(20))));
        let mut o = opts("p041");
        o.archive = "epn".to_string();
        assert!(matches!(o.validate(), Err(Error::Archive(_))));
        let mut o = opts("MCHL00AUS");
        o.archive = "epn".to_string();
        assert!(o.validate().is_ok());
        let mut o = opts("p041");
        o.rate = Rate::High;
        o.archive = "sopac".to_string();
        assert!(o.validate().is_err());
        let mut o = opts("p041");
        o.doy = 0;
        assert!(matches!(o.validate(), Err(Error::Doy(0))));
    }

    #[test]
    fn test_backend_resolution() {
        let cfg = Config {
            exe: std::env::temp_dir().join("rinex2snr_no_such_exe_dir"),
            ..Default::default()
        };
        let mut o = opts("p041");
        assert_eq!(o.backend(&cfg), Backend::Hybrid);
        o.translator = Some(Translator::Python);
        assert_eq!(o.backend(&cfg), Backend::Native);
        o.translator = None;
        o.fortran = true;
        assert_eq!(o.backend(&cfg), Backend::Hybrid);
        o.orb = OrbitType::Gbm;
        assert_eq!(o.backend(&cfg), Backend::Native);
    }

    #[test]
    fn test_config_json() {
        let dir = std::env::temp_dir().join("rinex2snr_config_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(&path, r#"{"refl_code": "/data/refl", "tool_timeout": 60}"#).unwrap();
        let cfg = Config::from_file(&path).unwrap();
        assert_eq!(cfg.refl_code, PathBuf::from("/data/refl"));
        assert_eq!(cfg.log_dir, PathBuf::from("logs"));
        assert_eq!(cfg.timeout(), Some(Duration::from_secs(60)));
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(Config::from_file(&path), Err(Error::Json(_))));
        fs::remove_dir_all(&dir).ok();
    }
}
