use std::path::PathBuf;
use std::process::ExitCode;
use clap::{Args, Parser, Subcommand};
use env_logger::{Builder, Env, Target};
use log::{error, info};
use rinex2snr::snr::config::{Config, OrbitType, Rate, RunOptions, SnrFormat, Stream, Translator};
use rinex2snr::snr::convert::{convert_file, Converter};
use rinex2snr::snr::error::Result;
use rinex2snr::snr::extract::ExtractOptions;

#[derive(Parser, Debug)]
#[command(
    name = "rinex2snr",
    about = "Convert GNSS RINEX observation files into SNR files for GNSS interferometric reflectometry.",
    after_help = "Directories default to the REFL_CODE, ORBITS and EXE environment variables."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// directories and external tools
#[derive(Args, Debug)]
struct Dirs {
    /// JSON configuration file, replaces the directory flags
    #[clap(long = "config")]
    config: Option<PathBuf>,

    /// Root of the SNR products
    #[clap(long = "refl-code", env = "REFL_CODE", default_value = ".")]
    refl_code: PathBuf,

    /// Root of the orbit files
    #[clap(long = "orbits", env = "ORBITS", default_value = ".")]
    orbits: PathBuf,

    /// Directory of the external translators
    #[clap(long = "exe", env = "EXE", default_value = ".")]
    exe: PathBuf,

    /// Directory of the station logs
    #[clap(long = "log-dir", default_value = "logs")]
    log_dir: PathBuf,

    /// Working directory for RINEX and SNR files
    #[clap(long = "work-dir", default_value = ".")]
    work_dir: PathBuf,

    /// Seconds allowed to an external tool, 0 for no limit
    #[clap(long = "timeout", default_value = "0")]
    timeout: u64,
}

impl Dirs {
    fn config(self) -> Result<Config> {
        if let Some(path) = self.config {
            return Config::from_file(path);
        }
        Ok(Config {
            refl_code: self.refl_code,
            orbits: self.orbits,
            exe: self.exe,
            log_dir: self.log_dir,
            work_dir: self.work_dir,
            tool_timeout: self.timeout,
        })
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a range of station days
    Run {
        /// Station name (4, 6 or 9 characters)
        station: String,

        /// Year
        year: i32,

        /// Day of year
        doy: u32,

        /// Last day of year
        #[clap(short = 'e', long = "doy-end")]
        doy_end: Option<u32>,

        /// Last year
        #[clap(short = 'y', long = "year-end")]
        year_end: Option<i32>,

        /// SNR format (99, 50, 66, 88)
        #[clap(short = 's', long = "snr", default_value = "66")]
        snr: u32,

        /// Orbit type (nav, gps, igs, igr, jax, gbm, grg, wum, gfr, esa, ultra, rapid, gnss, gnss2, gps+glo)
        #[clap(short = 'o', long = "orb", default_value = "nav")]
        orb: OrbitType,

        /// Receiver rate (low, high)
        #[clap(short = 'r', long = "rate", default_value = "low")]
        rate: Rate,

        /// Decimation interval (s)
        #[clap(short = 'd', long = "dec", default_value = "0")]
        dec: i32,

        /// Use only local RINEX files
        #[clap(long = "nolook")]
        nolook: bool,

        /// RINEX archive
        #[clap(short = 'a', long = "archive", default_value = "all")]
        archive: String,

        /// Remake existing SNR files
        #[clap(long = "overwrite")]
        overwrite: bool,

        /// Translator (fortran, hybrid, python)
        #[clap(short = 't', long = "translator")]
        translator: Option<Translator>,

        /// Use the fortran translator
        #[clap(long = "fortran")]
        fortran: bool,

        /// RINEX 3 sample rate (s)
        #[clap(long = "samplerate", default_value = "30")]
        samplerate: u32,

        /// RINEX 3 stream (R, S)
        #[clap(long = "stream", default_value = "R")]
        stream: String,

        /// Keep the station name case
        #[clap(long = "mk")]
        mk: bool,

        /// One day per week
        #[clap(long = "weekly")]
        weekly: bool,

        /// Also write the time-series store
        #[clap(long = "tdb")]
        tdb: bool,

        /// Converge the light-time iteration
        #[clap(long = "strict")]
        strict: bool,

        #[command(flatten)]
        dirs: Dirs,
    },
    /// Convert one RINEX file with one orbit file
    File {
        /// Input RINEX observation file
        #[clap(short = 'i', long = "inp")]
        rinex: PathBuf,

        /// Navigation or sp3 orbit file
        #[clap(short = 'n', long = "orbit")]
        orbit: PathBuf,

        /// Output SNR file
        #[clap(short = 'o', long = "out")]
        output: PathBuf,

        /// SNR format (99, 50, 66, 88)
        #[clap(short = 's', long = "snr", default_value = "66")]
        snr: u32,

        /// Decimation interval (s)
        #[clap(short = 'd', long = "dec", default_value = "0")]
        dec: i32,

        /// Converge the light-time iteration
        #[clap(long = "strict")]
        strict: bool,

        /// Directory of the station logs
        #[clap(long = "log-dir", default_value = "logs")]
        log_dir: PathBuf,
    },
}

fn main() -> ExitCode {
    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stdout)
        .format_timestamp_secs()
        .format_module_path(false)
        .init();

    let args = Cli::parse();
    let res = match args.command {
        Commands::Run {
            station,
            year,
            doy,
            doy_end,
            year_end,
            snr,
            orb,
            rate,
            dec,
            nolook,
            archive,
            overwrite,
            translator,
            fortran,
            samplerate,
            stream,
            mk,
            weekly,
            tdb,
            strict,
            dirs,
        } => {
            let opts = RunOptions {
                station,
                year,
                doy,
                doy_end,
                year_end,
                snr: SnrFormat(snr),
                orb,
                rate,
                dec,
                nolook,
                archive,
                overwrite,
                translator,
                fortran,
                samplerate,
                stream: Stream::parse_lossy(&stream),
                mk,
                weekly,
                tdb,
                strict,
            };
            dirs.config()
                .and_then(|cfg| Converter::new(cfg, opts))
                .map(|mut conv| {
                    conv.run_rinex2snr();
                })
        }

        Commands::File { rinex, orbit, output, snr, dec, strict, log_dir } => {
            let opt = ExtractOptions { fmt: SnrFormat(snr), dec, strict };
            convert_file(&rinex, &orbit, &output, opt, &log_dir).map(|n| {
                info!("{} records written to {}", n, output.display());
            })
        }
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
