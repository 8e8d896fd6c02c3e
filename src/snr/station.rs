use crate::snr::config::{SnrFormat, Stream};
use crate::snr::error::{Error, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RinexVersion {
    V2,
    V3,
}

/// station identity of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    /// four character name used by RINEX 2 and SNR files
    pub name: String,
    /// nine character RINEX 3 id
    pub station9: Option<String>,
    pub version: RinexVersion,
}

/// two-digit year
pub fn yy(year: i32) -> String {
    format!("{:02}", year.rem_euclid(100))
}

/// three-digit day of year
pub fn cdoy(doy: u32) -> String {
    format!("{:03}", doy)
}

impl Station {
    /// apply the station naming rules: 4 characters (RINEX 2), 6 characters
    /// (archive jp only) or 9 characters (RINEX 3)
    pub fn new(id: &str, archive: &str, mk: bool) -> Result<Self> {
        let n = id.chars().count();
        if !id.is_ascii() {
            return Err(Error::Station(id.to_string()));
        }
        match n {
            4 => Ok(Station {
                name: if mk { id.to_string() } else { id.to_lowercase() },
                station9: None,
                version: RinexVersion::V2,
            }),
            6 if archive == "jp" => {
                let last4 = &id[2..];
                Ok(Station {
                    name: if mk { last4.to_string() } else { last4.to_uppercase() },
                    station9: None,
                    version: RinexVersion::V2,
                })
            }
            9 => {
                let first4 = &id[..4];
                Ok(Station {
                    name: if mk { first4.to_string() } else { first4.to_lowercase() },
                    station9: Some(id.to_uppercase()),
                    version: RinexVersion::V3,
                })
            }
            _ => Err(Error::Station(id.to_string())),
        }
    }

    pub fn is_rinex3(&self) -> bool {
        self.version == RinexVersion::V3
    }

    /// file name of the SNR artifact
    pub fn snr_name(&self, year: i32, doy: u32, fmt: SnrFormat) -> String {
        format!("{}{}0.{}.snr{}", self.name, cdoy(doy), yy(year), fmt)
    }

    /// directory holding the station's SNR files of a year
    pub fn snr_dir(&self, refl_code: &Path, year: i32) -> PathBuf {
        refl_code.join(year.to_string()).join("snr").join(&self.name)
    }

    /// path of the uncompressed SNR artifact
    pub fn quickname(&self, refl_code: &Path, year: i32, doy: u32, fmt: SnrFormat) -> PathBuf {
        self.snr_dir(refl_code, year).join(self.snr_name(year, doy, fmt))
    }

    /// plain, gzip and xz variants of the SNR artifact
    pub fn snr_variants(&self, refl_code: &Path, year: i32, doy: u32, fmt: SnrFormat) -> [PathBuf; 3] {
        let plain = self.quickname(refl_code, year, doy, fmt);
        let mut gz = plain.clone().into_os_string();
        gz.push(".gz");
        let mut xz = plain.clone().into_os_string();
        xz.push(".xz");
        [plain, PathBuf::from(gz), PathBuf::from(xz)]
    }

    /// the first existing variant of the SNR artifact
    pub fn snr_exist(&self, refl_code: &Path, year: i32, doy: u32, fmt: SnrFormat) -> Option<PathBuf> {
        self.snr_variants(refl_code, year, doy, fmt)
            .into_iter()
            .find(|p| p.is_file())
    }

    /// RINEX 2 observation file name, Hatanaka compressed when `crx` is set
    pub fn rinex2_name(&self, year: i32, doy: u32, crx: bool) -> String {
        format!("{}{}0.{}{}", self.name, cdoy(doy), yy(year), if crx { 'd' } else { 'o' })
    }

    /// RINEX 3 daily observation file stem (without extension)
    pub fn rinex3_stem(&self, year: i32, doy: u32, stream: Stream, rate: &str) -> Option<String> {
        let sta9 = self.station9.as_ref()?;
        Some(format!(
            "{}_{}_{:04}{}0000_01D_{}S_MO",
            sta9,
            stream.letter(),
            year,
            cdoy(doy),
            rate
        ))
    }
}
