use crate::basic::func::gunzip;
use crate::basic::time::{doy2time, time2gpst};
use crate::basic::var::DAYSEC;
use crate::snr::config::{OrbitSource, OrbitType, Rate, RunOptions};
use crate::snr::station::{cdoy, yy, RinexVersion, Station};
use log::{debug, info};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("external tool {0} is not available")]
    ToolMissing(String),
    #[error("{0} failed: {1}")]
    ToolFailed(String, String),
    #[error("{0} killed after {1} s")]
    Timeout(String, u64),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// compressed file suffixes tried after every plain name
const COMPRESSED: [&str; 4] = ["", ".gz", ".Z", ".xz"];

/// poll interval of a running external tool
const POLL: Duration = Duration::from_millis(100);

/// run an external tool to completion, killing it once the timeout has elapsed
pub fn run_tool(cmd: &mut Command, timeout: Option<Duration>) -> Result<(), CapabilityError> {
    let name = Path::new(cmd.get_program())
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    debug!("running {:?}", cmd);

    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            CapabilityError::ToolMissing(name.clone())
        }
        _ => CapabilityError::Io(e),
    })?;
    let start = Instant::now();

    loop {
        match child.try_wait()? {
            Some(status) if status.success() => return Ok(()),
            Some(status) => {
                return Err(CapabilityError::ToolFailed(name, status.to_string()));
            }
            None => {
                if let Some(limit) = timeout {
                    if start.elapsed() >= limit {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(CapabilityError::Timeout(name, limit.as_secs()));
                    }
                }
                thread::sleep(POLL);
            }
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

fn strip_suffix(path: &Path, suffix: &str) -> Option<PathBuf> {
    let s = path.to_str()?;
    s.strip_suffix(suffix).map(PathBuf::from)
}

/// RINEX 2 Hatanaka names end in `.yyd`, RINEX 3 ones in `.crx`
fn hatanaka(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    if let Some(stem) = name.strip_suffix(".crx") {
        return Some(path.with_file_name(format!("{}.rnx", stem)));
    }
    let (stem, ext) = name.rsplit_once('.')?;
    let bytes = ext.as_bytes();
    if bytes.len() == 3 && bytes[..2].iter().all(u8::is_ascii_digit) && bytes[2] == b'd' {
        return Some(path.with_file_name(format!("{}.{}o", stem, &ext[..2])));
    }
    None
}

/// turns a located file into a plain file
pub trait Decompressor {
    /// decompress in place and return the path of the plain file
    fn decompress(&self, src: &Path) -> Result<PathBuf, CapabilityError>;
}

/// gzip in process; `.Z`, `.xz` and Hatanaka through external tools
#[derive(Debug, Clone)]
pub struct ToolDecompressor {
    pub crx2rnx: PathBuf,
    pub timeout: Option<Duration>,
}

impl ToolDecompressor {
    pub fn new(crx2rnx: PathBuf, timeout: Option<Duration>) -> Self {
        ToolDecompressor { crx2rnx, timeout }
    }

    fn external(&self, tool: &str, src: &Path, dst: PathBuf) -> Result<PathBuf, CapabilityError> {
        run_tool(Command::new(tool).arg("-f").arg(src), self.timeout)?;
        if dst.is_file() {
            Ok(dst)
        } else {
            Err(CapabilityError::NotFound(dst.display().to_string()))
        }
    }
}

impl Decompressor for ToolDecompressor {
    fn decompress(&self, src: &Path) -> Result<PathBuf, CapabilityError> {
        if !src.is_file() {
            return Err(CapabilityError::NotFound(src.display().to_string()));
        }
        let plain = if let Some(dst) = strip_suffix(src, ".gz") {
            gunzip(src, &dst)?;
            fs::remove_file(src)?;
            dst
        } else if let Some(dst) = strip_suffix(src, ".Z") {
            self.external("uncompress", src, dst)?
        } else if let Some(dst) = strip_suffix(src, ".xz") {
            self.external("unxz", src, dst)?
        } else {
            src.to_path_buf()
        };

        let Some(rnx) = hatanaka(&plain) else {
            return Ok(plain);
        };
        if !self.crx2rnx.is_file() {
            return Err(CapabilityError::ToolMissing(self.crx2rnx.display().to_string()));
        }
        run_tool(Command::new(&self.crx2rnx).arg("-f").arg(&plain), self.timeout)?;
        fs::remove_file(&plain)?;
        if rnx.is_file() {
            Ok(rnx)
        } else {
            Err(CapabilityError::NotFound(rnx.display().to_string()))
        }
    }
}

/// brings a RINEX 3 file to the shape the extraction reads
pub trait FormatTranslator {
    /// translate `rnx3` into `dst`, returning the file to extract from
    fn translate(&self, rnx3: &Path, dst: &Path) -> Result<PathBuf, CapabilityError>;
}

/// the native reader takes RINEX 3 as it is
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl FormatTranslator for PassThrough {
    fn translate(&self, rnx3: &Path, _dst: &Path) -> Result<PathBuf, CapabilityError> {
        Ok(rnx3.to_path_buf())
    }
}

/// RINEX 3 to 2 with gfzrnx; the RINEX 3 file is removed afterwards
#[derive(Debug, Clone)]
pub struct Gfzrnx {
    pub exe: PathBuf,
    pub timeout: Option<Duration>,
}

impl FormatTranslator for Gfzrnx {
    fn translate(&self, rnx3: &Path, dst: &Path) -> Result<PathBuf, CapabilityError> {
        if !self.exe.is_file() {
            return Err(CapabilityError::ToolMissing(self.exe.display().to_string()));
        }
        let mut cmd = Command::new(&self.exe);
        cmd.arg("-finp").arg(rnx3).arg("-fout").arg(dst).args(["-vo", "2", "-f", "-q"]);
        run_tool(&mut cmd, self.timeout)?;
        fs::remove_file(rnx3)?;
        if dst.is_file() {
            Ok(dst.to_path_buf())
        } else {
            Err(CapabilityError::NotFound(dst.display().to_string()))
        }
    }
}

/// finds the orbit file of a day
pub trait OrbitLocator {
    fn locate(&self, orb: OrbitType, year: i32, doy: u32) -> Result<PathBuf, CapabilityError>;
}

/// searches `<orbits>/<yyyy>/nav` and `<orbits>/<yyyy>/sp3`
#[derive(Debug, Clone)]
pub struct LocalOrbits {
    pub root: PathBuf,
}

impl LocalOrbits {
    pub fn new(root: PathBuf) -> Self {
        LocalOrbits { root }
    }

    /// orbit file names of a day, most common first
    pub fn candidates(&self, orb: OrbitType, year: i32, doy: u32) -> Vec<PathBuf> {
        let ydir = self.root.join(year.to_string());
        let names: Vec<PathBuf> = match orb.source() {
            OrbitSource::BroadcastNav => ["auto", "brdc"]
                .iter()
                .map(|p| ydir.join("nav").join(format!("{}{}0.{}n", p, cdoy(doy), yy(year))))
                .collect(),
            OrbitSource::PreciseSp3 => {
                let mut v = Vec::new();
                if let Some(t) = doy2time(year, doy) {
                    let mut week = 0;
                    let sow = time2gpst(t, Some(&mut week));
                    let dow = (sow / DAYSEC).floor() as i32;
                    v.push(ydir.join("sp3").join(format!("{}{}{}.sp3", orb.name(), week, dow)));
                }
                if let Some(long) = orb.long_name() {
                    for span in ["05M", "15M"] {
                        v.push(ydir.join("sp3").join(format!(
                            "{}_{:04}{}0000_01D_{}_ORB.SP3",
                            long,
                            year,
                            cdoy(doy),
                            span
                        )));
                    }
                }
                v
            }
        };
        names
            .iter()
            .flat_map(|p| COMPRESSED.iter().map(move |s| with_suffix(p, s)))
            .collect()
    }
}

impl OrbitLocator for LocalOrbits {
    fn locate(&self, orb: OrbitType, year: i32, doy: u32) -> Result<PathBuf, CapabilityError> {
        self.candidates(orb, year, doy)
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| CapabilityError::NotFound(format!("{} orbit for {} {}", orb, year, cdoy(doy))))
    }
}

/// stages the observation file of a day in the working directory
pub trait RinexLocator {
    fn locate(
        &self,
        station: &Station,
        opts: &RunOptions,
        year: i32,
        doy: u32,
    ) -> Result<PathBuf, CapabilityError>;
}

/// searches the working directory, then `<refl_code>/rinex/<station>/<yyyy>/`
#[derive(Debug, Clone)]
pub struct LocalRinex {
    pub work_dir: PathBuf,
    pub refl_code: PathBuf,
}

impl LocalRinex {
    pub fn new(work_dir: PathBuf, refl_code: PathBuf) -> Self {
        LocalRinex { work_dir, refl_code }
    }

    /// candidate file names, in search order
    pub fn names(&self, station: &Station, opts: &RunOptions, year: i32, doy: u32) -> Vec<String> {
        match station.version {
            RinexVersion::V2 => {
                let mut v = Vec::new();
                for crx in [false, true] {
                    let base = station.rinex2_name(year, doy, crx);
                    for ext in ["", ".gz", ".Z"] {
                        v.push(format!("{}{}", base, ext));
                    }
                }
                v
            }
            RinexVersion::V3 => {
                let rate = match opts.rate {
                    Rate::High => "01".to_string(),
                    Rate::Low => format!("{:02}", opts.samplerate),
                };
                [opts.stream, opts.stream.swap()]
                    .iter()
                    .filter_map(|s| station.rinex3_stem(year, doy, *s, &rate))
                    .flat_map(|stem| {
                        [".rnx", ".rnx.gz", ".crx", ".crx.gz"]
                            .iter()
                            .map(move |ext| format!("{}{}", stem, ext))
                    })
                    .collect()
            }
        }
    }
}

impl RinexLocator for LocalRinex {
    fn locate(
        &self,
        station: &Station,
        opts: &RunOptions,
        year: i32,
        doy: u32,
    ) -> Result<PathBuf, CapabilityError> {
        let archive = self
            .refl_code
            .join("rinex")
            .join(&station.name)
            .join(year.to_string());
        for name in self.names(station, opts, year, doy) {
            let local = self.work_dir.join(&name);
            if local.is_file() {
                return Ok(local);
            }
            let stored = archive.join(&name);
            if stored.is_file() {
                info!("found {} in the local archive", name);
                fs::copy(&stored, &local)?;
                return Ok(local);
            }
        }
        Err(CapabilityError::NotFound(format!(
            "rinex file for {} {} {}",
            station.station9.as_deref().unwrap_or(&station.name),
            year,
            cdoy(doy)
        )))
    }
}
