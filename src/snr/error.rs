use crate::basic::read::ReadError;
use crate::basic::sp3::Sp3Error;
use crate::snr::capability::CapabilityError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// run and file level errors of the SNR product
#[derive(Debug, Error)]
pub enum Error {
    #[error("illegal station input \"{0}\": station must have 4, 6 (archive jp) or 9 characters")]
    Station(String),
    #[error("year must be four characters long: {0}")]
    Year(i32),
    #[error("illegal day of year {0}")]
    Doy(u32),
    #[error("unrecognized orbit type \"{0}\"")]
    OrbitType(String),
    #[error("translator option must be one of fortran, hybrid, python: \"{0}\"")]
    Translator(String),
    #[error("rate must be low or high: \"{0}\"")]
    Rate(String),
    #[error("archive \"{0}\" is not supported for this station and rate")]
    Archive(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("rinex file does not have station coordinates")]
    NoPosition,
    #[error("receiver coordinates are in the middle of the earth: {0:?}")]
    DegeneratePosition([f64; 3]),
    #[error("there are no S1 and no S2 data - this file is not useful for reflectometry")]
    Useless,
    #[error("empty ephemeris in {0}")]
    NoEphemeris(PathBuf),
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Sp3(#[from] Sp3Error),
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
