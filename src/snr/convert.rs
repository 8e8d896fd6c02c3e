use crate::basic::time::dec31;
use crate::snr::backend::{make_backend, SnrBackend};
use crate::snr::capability::{
    Decompressor, FormatTranslator, Gfzrnx, LocalOrbits, LocalRinex, OrbitLocator, PassThrough,
    RinexLocator, ToolDecompressor,
};
use crate::snr::config::{Backend, Config, OrbitSource, RunOptions};
use crate::snr::daylog::DayLog;
use crate::snr::error::Result;
use crate::snr::extract::{orbit_source, rnx2snr, ExtractOptions};
use crate::snr::record::Layout;
use crate::snr::station::Station;
use crate::snr::store::{read_snrfile, snr2tdb, write_batch, FileStore, TimeSeriesStore};
use crate::timer::{get_average_time, start_timing, stop_timing};
use log::{debug, error, info, warn};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// stage at which a day was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    OrbitMissing,
    RinexMissing,
    Translation,
    Extraction,
    EmptyOutput,
    Store,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::OrbitMissing => "orbit file missing",
            Stage::RinexMissing => "rinex file missing",
            Stage::Translation => "rinex translation",
            Stage::Extraction => "snr extraction",
            Stage::EmptyOutput => "empty snr file",
            Stage::Store => "snr storage",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// the SNR file is already there and overwrite is off
    Exists,
    /// day of year past the end of the year
    IllegalDay,
}

/// result of one station-day
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayOutcome {
    Stored(PathBuf),
    Skipped(SkipReason),
    Failed(Stage),
}

/// outcome of every day of a run, in processing order
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub days: Vec<(i32, u32, DayOutcome)>,
}

impl RunSummary {
    pub fn stored(&self) -> usize {
        self.days.iter().filter(|d| matches!(d.2, DayOutcome::Stored(_))).count()
    }

    pub fn skipped(&self) -> usize {
        self.days.iter().filter(|d| matches!(d.2, DayOutcome::Skipped(_))).count()
    }

    pub fn failed(&self) -> usize {
        self.days.iter().filter(|d| matches!(d.2, DayOutcome::Failed(_))).count()
    }
}

/// station-day conversion driver with its injected capabilities
pub struct Converter {
    cfg: Config,
    opts: RunOptions,
    station: Station,
    backend: Box<dyn SnrBackend>,
    orbits: Box<dyn OrbitLocator>,
    rinex: Box<dyn RinexLocator>,
    decompressor: Box<dyn Decompressor>,
    translator: Box<dyn FormatTranslator>,
    store: Option<Box<dyn TimeSeriesStore>>,
}

impl Converter {
    /// validate the run and wire the default capabilities
    pub fn new(cfg: Config, opts: RunOptions) -> Result<Self> {
        cfg.validate()?;
        let station = opts.validate()?;
        let kind = opts.backend(&cfg);
        let backend = make_backend(kind, &cfg, opts.orb.source(), &station.name);
        // the fortran translators only read RINEX 2
        let translator: Box<dyn FormatTranslator> = match kind {
            Backend::Fortran => Box::new(Gfzrnx { exe: cfg.gfzrnx(), timeout: cfg.timeout() }),
            Backend::Native | Backend::Hybrid => Box::new(PassThrough),
        };
        let store: Option<Box<dyn TimeSeriesStore>> = if opts.tdb {
            Some(Box::new(FileStore::new(&cfg.refl_code, &station.name)))
        } else {
            None
        };
        info!("station {} with the {} backend", station.name, kind);

        Ok(Converter {
            orbits: Box::new(LocalOrbits::new(cfg.orbits.clone())),
            rinex: Box::new(LocalRinex::new(cfg.work_dir.clone(), cfg.refl_code.clone())),
            decompressor: Box::new(ToolDecompressor::new(cfg.crx2rnx(), cfg.timeout())),
            translator,
            backend,
            store,
            station,
            opts,
            cfg,
        })
    }

    pub fn with_orbit_locator(mut self, orbits: Box<dyn OrbitLocator>) -> Self {
        self.orbits = orbits;
        self
    }

    pub fn with_rinex_locator(mut self, rinex: Box<dyn RinexLocator>) -> Self {
        self.rinex = rinex;
        self
    }

    pub fn with_decompressor(mut self, decompressor: Box<dyn Decompressor>) -> Self {
        self.decompressor = decompressor;
        self
    }

    pub fn with_translator(mut self, translator: Box<dyn FormatTranslator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_store(mut self, store: Box<dyn TimeSeriesStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn station(&self) -> &Station {
        &self.station
    }

    pub fn backend(&self) -> Backend {
        self.backend.kind()
    }

    /// convert every day of the requested range; a failed day never stops the run
    pub fn run_rinex2snr(&mut self) -> RunSummary {
        let mut summary = RunSummary::default();
        let year_end = self.opts.year_end.unwrap_or(self.opts.year);
        let step = self.opts.skipit().max(1) as usize;

        for year in self.opts.year..=year_end {
            let d1 = if year == self.opts.year { self.opts.doy } else { 1 };
            let d2 = if year == year_end {
                self.opts.doy_end.unwrap_or(self.opts.doy)
            } else {
                dec31(year)
            };
            for doy in (d1..=d2).step_by(step) {
                let outcome = if doy > dec31(year) {
                    info!("{} {:03} is not a legal day of year", year, doy);
                    DayOutcome::Skipped(SkipReason::IllegalDay)
                } else {
                    self.conv2snr(year, doy)
                };
                match &outcome {
                    DayOutcome::Stored(path) => info!("{} {:03} stored {}", year, doy, path.display()),
                    DayOutcome::Skipped(reason) => debug!("{} {:03} skipped: {:?}", year, doy, reason),
                    DayOutcome::Failed(stage) => warn!("{} {:03} failed: {}", year, doy, stage),
                }
                summary.days.push((year, doy, outcome));
            }
        }
        if let Some(avg) = get_average_time() {
            info!("average conversion time {:.2} s", avg.as_secs_f64());
        }
        info!(
            "{} days stored, {} skipped, {} failed",
            summary.stored(),
            summary.skipped(),
            summary.failed()
        );
        summary
    }

    /// convert one station-day
    pub fn conv2snr(&mut self, year: i32, doy: u32) -> DayOutcome {
        let mut log = match DayLog::open(&self.cfg.log_dir, &self.station.name) {
            Ok(log) => log,
            Err(e) => {
                warn!("cannot open the station log: {}", e);
                DayLog::sink()
            }
        };
        let outcome = self.convert_day(year, doy, &mut log);
        if let DayOutcome::Failed(stage) = &outcome {
            log.line(&format!("{} {:03} failed at stage: {}", year, doy, stage));
        }
        outcome
    }

    fn convert_day(&mut self, year: i32, doy: u32, log: &mut DayLog) -> DayOutcome {
        let opts = &self.opts;
        log.line(&format!("Receiver rate: {:5}", opts.rate.to_string()));
        log.line(&format!("Decimation rate: {:3}", opts.dec));
        log.line(&format!("Archive: {:10} No look: {}", opts.archive, opts.nolook));
        log.line(&format!("Orbits : {:10}", opts.orb.to_string()));

        let refl = &self.cfg.refl_code;
        let snr_full = self.station.quickname(refl, year, doy, opts.snr);
        if opts.overwrite {
            for path in self.station.snr_variants(refl, year, doy, opts.snr) {
                if path.is_file() {
                    if let Err(e) = fs::remove_file(&path) {
                        warn!("cannot remove {}: {}", path.display(), e);
                    }
                }
            }
        }
        if let Some(existing) = self.station.snr_exist(refl, year, doy, opts.snr) {
            log.line(&format!("The snrfile already exists: {}", existing.display()));
            info!("The snrfile already exists: {}", existing.display());
            return DayOutcome::Skipped(SkipReason::Exists);
        }
        log.line(&format!("The snrfile does not exist: {}", snr_full.display()));

        let orbfile = match self
            .orbits
            .locate(opts.orb, year, doy)
            .and_then(|p| self.decompressor.decompress(&p))
        {
            Ok(p) => p,
            Err(e) => {
                log.line(&format!("The orbit file you requested does not exist: {}", e));
                return DayOutcome::Failed(Stage::OrbitMissing);
            }
        };
        log.line(&format!("Orbit file: {}", orbfile.display()));

        let located = match self.rinex.locate(&self.station, opts, year, doy) {
            Ok(p) => p,
            Err(e) => {
                log.line(&format!("Either the RINEX file or orbit file does not exist: {}", e));
                return DayOutcome::Failed(Stage::RinexMissing);
            }
        };
        let rinexfile = match self.stage_rinex(&located, year, doy) {
            Ok(p) => p,
            Err(e) => {
                log.line(&format!("Something about the RINEX translation did not work: {}", e));
                remove_quiet(&located);
                return DayOutcome::Failed(Stage::Translation);
            }
        };
        log.line(&format!("RINEX file: {}", rinexfile.display()));

        let snrname = self.cfg.work_dir.join(self.station.snr_name(year, doy, opts.snr));
        let opt = ExtractOptions { fmt: opts.snr, dec: opts.dec, strict: opts.strict };
        start_timing();
        let produced = self.backend.produce(&rinexfile, &orbfile, &snrname, opt, log);
        stop_timing();
        remove_quiet(&rinexfile);

        if let Err(e) = produced {
            error!("{} {:03}: {}", year, doy, e);
            log.line(&format!("Problem with making SNR file: {}", e));
            remove_quiet(&snrname);
            return DayOutcome::Failed(Stage::Extraction);
        }
        match fs::metadata(&snrname) {
            Ok(meta) if meta.len() > 0 => {}
            _ => {
                log.line("you created a zero file size which could mean a lot of things");
                log.line("bad exe, bad snr option, do not really have the orbit file");
                remove_quiet(&snrname);
                return DayOutcome::Failed(Stage::EmptyOutput);
            }
        }

        let stored = match store_snrfile(&snrname, &snr_full) {
            Ok(()) => snr_full,
            Err(e) => {
                log.line(&format!("Could not store the SNR file: {}", e));
                remove_quiet(&snrname);
                return DayOutcome::Failed(Stage::Store);
            }
        };
        log.line(&format!("A SNR file was created: {}", stored.display()));
        info!("SUCCESS: SNR file was created: {}", stored.display());

        if let Some(store) = self.store.as_mut() {
            let layout = match orbit_source(&orbfile) {
                OrbitSource::BroadcastNav => Layout::Broadcast,
                OrbitSource::PreciseSp3 => Layout::Precise,
            };
            let written = read_snrfile(&stored).and_then(|recs| {
                let rows = snr2tdb(&recs, layout, year, doy).unwrap_or_default();
                write_batch(store.as_mut(), &rows).map(|_| rows.len())
            });
            match written {
                Ok(n) => log.line(&format!("{} rows written to the time-series store", n)),
                Err(e) => {
                    warn!("time-series store write failed: {}", e);
                    log.line(&format!("time-series store write failed: {}", e));
                }
            }
        }
        DayOutcome::Stored(stored)
    }

    /// decompress the located file and bring RINEX 3 to its extraction shape
    fn stage_rinex(&self, located: &Path, year: i32, doy: u32) -> Result<PathBuf> {
        let plain = self.decompressor.decompress(located)?;
        if !self.station.is_rinex3() {
            return Ok(plain);
        }
        let r2 = self.cfg.work_dir.join(self.station.rinex2_name(year, doy, false));
        Ok(self.translator.translate(&plain, &r2)?)
    }
}

fn remove_quiet(path: &Path) {
    if path.is_file() {
        if let Err(e) = fs::remove_file(path) {
            debug!("cannot remove {}: {}", path.display(), e);
        }
    }
}

/// move a finished SNR file into its archive directory
fn store_snrfile(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(dir) = dst.parent() {
        fs::create_dir_all(dir)?;
    }
    if fs::rename(src, dst).is_err() {
        fs::copy(src, dst)?;
        fs::remove_file(src)?;
    }
    Ok(())
}

/// convert one explicit RINEX file with one orbit file
pub fn convert_file(
    rinex: &Path,
    orbfile: &Path,
    snrfile: &Path,
    opt: ExtractOptions,
    log_dir: &Path,
) -> Result<usize> {
    let station: String = rinex
        .file_name()
        .map(|n| n.to_string_lossy().chars().take(4).collect())
        .unwrap_or_default();
    let mut log = DayLog::open(log_dir, &station)?;
    let n = rnx2snr(rinex, orbfile, snrfile, opt, &mut log)?;
    if n == 0 {
        warn!("no SNR records inside the elevation window");
    }
    Ok(n)
}
