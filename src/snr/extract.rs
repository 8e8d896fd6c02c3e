use crate::basic::eph::{eph2pos, groupeph, seleph};
use crate::basic::interp::INTERP_ORDER;
use crate::basic::pos::{lighttime, LightTime, Topo};
use crate::basic::read::{readrnxnav, readrnxobs, ObsData};
use crate::basic::sat::{satcode, sysname, sysoffset, CONSTELLATIONS};
use crate::basic::sp3::Sp3Table;
use crate::basic::time::{daystart, screent, time2gpst, time2sod};
use crate::basic::var::*;
use crate::snr::config::{OrbitSource, SnrFormat};
use crate::snr::daylog::DayLog;
use crate::snr::error::{Error, Result};
use crate::snr::record::{zero_nan, Layout, SnrRecord};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// knobs of one extraction
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub fmt: SnrFormat,
    /// decimation interval (s), 0 keeps every epoch
    pub dec: i32,
    /// converge the light-time loop instead of the fixed two iterations
    pub strict: bool,
}

/// sp3 files end in sp3/SP3, anything else is a broadcast navigation file
pub fn orbit_source(orbfile: &Path) -> OrbitSource {
    let name = orbfile.to_string_lossy();
    if name.ends_with("sp3") || name.ends_with("SP3") {
        OrbitSource::PreciseSp3
    } else {
        OrbitSource::BroadcastNav
    }
}

fn new_bar(len: u64, msg: String) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(msg);
    pb
}

/// receiver geometry and emission rules shared by both variants
struct Emitter<W: Write> {
    topo: Topo,
    emin: f64,
    emax: f64,
    lt: LightTime,
    layout: Layout,
    out: W,
    count: usize,
}

impl<W: Write> Emitter<W> {
    /// write the record if its elevation is inside the window
    fn emit(&mut self, rec: &SnrRecord) -> Result<()> {
        if rec.el >= self.emin && rec.el <= self.emax {
            self.out.write_all(rec.line(self.layout).as_bytes())?;
            self.count += 1;
        }
        Ok(())
    }
}

/// convert one RINEX observation file into an SNR file with the given orbits,
/// returning the number of records written
pub fn rnx2snr(
    obsfile: &Path,
    orbfile: &Path,
    snrfile: &Path,
    opt: ExtractOptions,
    log: &mut DayLog,
) -> Result<usize> {
    let source = orbit_source(orbfile);
    let orbtype = if source == OrbitSource::PreciseSp3 { "sp3" } else { "nav" };
    log.line(&format!("Orbit type {:4}", orbtype));
    log.line(&format!("File name {}", orbfile.display()));
    let (emin, emax) = opt.fmt.elev_limits();

    let obs = readrnxobs(obsfile)?;
    let Some(rr) = obs.sta.pos else {
        log.line("RINEX file does not have station coordinates. Exiting");
        return Err(Error::NoPosition);
    };
    log.line(&format!("XYZ from header {:15.5} {:15.5} {:15.5}", rr[0], rr[1], rr[2]));
    if rr.iter().map(|x| x.abs()).sum::<f64>() < 5.0 {
        log.line("Receiver coordinates are in the middle of the Earth. Exiting");
        return Err(Error::DegeneratePosition(rr));
    }
    if !obs.has_band("S1") && !obs.has_band("S2") {
        log.line("There are no S1 and no S2 data - this file is not useful for reflectometry");
        return Err(Error::Useless);
    }

    let layout = match source {
        OrbitSource::BroadcastNav => Layout::Broadcast,
        OrbitSource::PreciseSp3 => Layout::Precise,
    };
    let mut em = Emitter {
        topo: Topo::new(&rr),
        emin,
        emax,
        lt: LightTime::new(opt.strict),
        layout,
        out: BufWriter::new(File::create(snrfile)?),
        count: 0,
    };
    match source {
        OrbitSource::BroadcastNav => navorbits(&obs, orbfile, opt.dec, &mut em, log)?,
        OrbitSource::PreciseSp3 => {
            log.line("Read the sp3 file");
            let sp3 = Sp3Table::from_file(orbfile)?;
            sp3orbits(&obs, &sp3, opt.dec, &mut em, log)?
        }
    }
    em.out.flush()?;
    info!("{} SNR records written to {}", em.count, snrfile.display());
    Ok(em.count)
}

/// GPS only extraction with broadcast ephemerides
fn navorbits<W: Write>(
    obs: &ObsData,
    navfile: &Path,
    dec: i32,
    em: &mut Emitter<W>,
    log: &mut DayLog,
) -> Result<()> {
    log.line("reading the ephemeris data");
    let nav = readrnxnav(navfile)?;
    if nav.eph.is_empty() {
        log.line("Empty ephemeris or the file does not exist");
        return Err(Error::NoEphemeris(navfile.to_path_buf()));
    }
    let ephs = groupeph(&nav);
    let Some(gps) = obs.sys('G') else {
        log.line("No data for constellation G");
        return Ok(());
    };

    let nepoch = obs.times.len();
    log.line(&format!("Number of epochs in the RINEX file {:6}", nepoch));
    log.line(&format!("Decimation rate {:3}", dec));

    let pb = new_bar(nepoch as u64, "Processing RINEX".to_string());
    for (i, t) in obs.times.iter().enumerate() {
        pb.inc(1);
        if i % 200 == 0 {
            log.line(&format!("Epoch {:6}", i));
        }
        let sod = time2sod(*t);
        if !screent(sod, dec as f64) {
            continue;
        }
        let mut week = 0;
        let sow = time2gpst(*t, Some(&mut week));

        for &prn in &gps.sats {
            let s1 = zero_nan(gps.value("S1", i, prn));
            if s1 <= 0.0 {
                continue;
            }
            let eph = match seleph(week, sow, prn, &ephs) {
                Ok(eph) => eph,
                Err(e) => {
                    debug!("{}", e);
                    continue;
                }
            };
            let rs = match lighttime(sow, &em.topo.rr, em.lt, |ts| eph2pos(week, ts, eph)) {
                Ok(rs) => rs,
                Err(e) => {
                    warn!("G{:02} at {:.0}: {}", prn, sod, e);
                    continue;
                }
            };
            let geom = em.topo.satazel(&rs);
            let mut rec = SnrRecord { sat: prn, el: geom.el, az: geom.az, sod, ..Default::default() };
            rec.set_bands([
                s1,
                gps.value("S2", i, prn),
                gps.value("S5", i, prn),
                0.0,
                0.0,
                0.0,
            ]);
            em.emit(&rec)?;
        }
    }
    pb.finish_with_message("Finish processing RINEX");
    Ok(())
}

/// multi-constellation extraction with precise orbits; the time field counts
/// from the start of the observation day
fn sp3orbits<W: Write>(
    obs: &ObsData,
    sp3: &Sp3Table,
    dec: i32,
    em: &mut Emitter<W>,
    log: &mut DayLog,
) -> Result<()> {
    let Some(&t0) = obs.times.first() else {
        log.line("No epochs in the RINEX file");
        return Ok(());
    };
    if dec > 0 {
        log.line("You are decimating");
    }
    let mut week0 = 0;
    let sow0 = time2gpst(daystart(t0), Some(&mut week0));
    let gpssec0 = week0 as f64 * WEEKSEC + sow0;

    // gps seconds and seconds of week of every epoch
    let epochs: Vec<(f64, f64)> = obs
        .times
        .iter()
        .map(|t| {
            let mut week = 0;
            let sow = time2gpst(*t, Some(&mut week));
            (week as f64 * WEEKSEC + sow, sow)
        })
        .collect();

    for con in CONSTELLATIONS {
        let Some(sys) = obs.sys(con) else {
            log.line(&format!("No data for constellation {}", con));
            continue;
        };
        log.line(&format!("Good news - found data for constellation {}", con));
        let addon = sysoffset(con).unwrap_or(0);
        let pb = new_bar(sys.sats.len() as u64, format!("Processing {}", sysname(con)));

        for &prn in &sys.sats {
            pb.inc(1);
            log.line(&format!("Constellation {} Satellite {:2} Addon {:3}", con, prn, addon));
            let Some(code) = satcode(con, prn) else { continue };
            let Some(orbit) = sp3.interp(code, INTERP_ORDER) else {
                log.line(&format!("This satellite is not in the orbit file. {:3}", prn));
                continue;
            };

            for (i, &(tp, sow)) in epochs.iter().enumerate() {
                // orbits are evaluated only where the primary band was observed
                let s1 = sys.value("S1", i, prn);
                if s1.is_nan() || !screent(sow, dec as f64) {
                    continue;
                }
                let rs = match lighttime(tp, &em.topo.rr, em.lt, |ts| Ok(orbit.pos(ts))) {
                    Ok(rs) => rs,
                    Err(e) => {
                        warn!("{}{:02} at {:.0}: {}", con, prn, tp - gpssec0, e);
                        continue;
                    }
                };
                let geom = em.topo.satazel(&rs);
                let mut rec = SnrRecord {
                    sat: code,
                    el: geom.el,
                    az: geom.az,
                    sod: tp - gpssec0,
                    ..Default::default()
                };
                rec.set_bands(SNR_BANDS.map(|b| sys.value(b, i, prn)));
                em.emit(&rec)?;
            }
        }
        pb.finish_and_clear();
    }
    log.line("write SNR data to file");
    Ok(())
}
