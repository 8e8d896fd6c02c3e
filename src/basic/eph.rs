use crate::basic::time::*;
use crate::basic::var::*;
use nalgebra::Vector3;
use std::collections::BTreeMap;
use thiserror::Error;

/// convergence tolerance of the Kepler iteration (rad)
const TOL_KEPLER: f64 = 1E-12;
/// min number of iteration of Kepler
const MIN_ITER_KEPLER: usize = 3;
/// max number of iteration of Kepler
const MAX_ITER_KEPLER: usize = 30;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrbitError {
    #[error("kepler equation did not converge after {0} iterations")]
    NoConvergence(usize),
    #[error("no ephemeris for G{0:02}")]
    NoEphemeris(usize),
    #[error("invalid ephemeris for G{0:02}: sqrt(a)={1}")]
    InvalidEph(usize, f64),
}

/// decode a GPS navigation record (RINEX field order) into an ephemeris block
pub fn decode_eph(prn: usize, toc: GTime, data: &[f64]) -> Eph {
    let week = data[21] as i32;
    Eph {
        prn,
        toc,
        f0: data[0],
        f1: data[1],
        f2: data[2],
        iode: data[3] as i32,
        crs: data[4],
        deln: data[5],
        m0: data[6],
        cuc: data[7],
        e: data[8],
        cus: data[9],
        sqrta: data[10],
        toes: data[11],
        cic: data[12],
        omg0: data[13],
        cis: data[14],
        i0: data[15],
        crc: data[16],
        omg: data[17],
        omgd: data[18],
        idot: data[19],
        week,
        svh: data[24] as i32,
        tgd: data[25],
        iodc: data[26] as i32,
        fit: data[28],
        toe: adjweek(gpst2time(week, data[11]), toc),
    }
}

/// ephemerides grouped by prn
pub fn groupeph(nav: &Nav) -> BTreeMap<usize, Vec<&Eph>> {
    let mut group: BTreeMap<usize, Vec<&Eph>> = BTreeMap::new();
    for eph in &nav.eph {
        group.entry(eph.prn).or_default().push(eph);
    }
    group
}

/// select the ephemeris of a satellite whose Toe is nearest to the query time
pub fn seleph<'a>(
    week: i32,
    sow: f64,
    prn: usize,
    group: &BTreeMap<usize, Vec<&'a Eph>>,
) -> Result<&'a Eph, OrbitError> {
    let time = gpst2time(week, sow);
    group
        .get(&prn)
        .and_then(|ephs| {
            ephs.iter().copied().min_by(|a, b| {
                timediff(a.toe, time)
                    .abs()
                    .total_cmp(&timediff(b.toe, time).abs())
            })
        })
        .ok_or(OrbitError::NoEphemeris(prn))
}

/// time from the ephemeris reference epoch wrapped into (-302400, 302400]
fn ephdt(t: f64, toes: f64) -> f64 {
    let tk = (t - toes - HALFWEEK).rem_euclid(WEEKSEC) - HALFWEEK;
    if tk <= -HALFWEEK {
        tk + WEEKSEC
    } else {
        tk
    }
}

/// solve Kepler's equation M = E - e*sin(E) by fixed-point iteration
pub fn kepler(m: f64, e: f64) -> Result<f64, OrbitError> {
    let mut ek = m;
    let mut e0 = m + e * m.sin();
    let mut iter = 0;

    while iter < MIN_ITER_KEPLER || !((ek - e0).abs() <= TOL_KEPLER) {
        if iter >= MAX_ITER_KEPLER {
            return Err(OrbitError::NoConvergence(iter));
        }
        ek = m + e * e0.sin();
        e0 = m + e * ek.sin();
        iter += 1;
    }
    Ok(ek)
}

/// satellite position (ecef, m) from a broadcast ephemeris at GPS week + seconds of week
pub fn eph2pos(week: i32, sow: f64, eph: &Eph) -> Result<Vector3<f64>, OrbitError> {
    if eph.sqrta <= 0.0 {
        return Err(OrbitError::InvalidEph(eph.prn, eph.sqrta));
    }
    let a = eph.sqrta * eph.sqrta;

    let tk = ephdt(week as f64 * WEEKSEC + sow, eph.toes);

    let n = (MU_GPS / (a * a * a)).sqrt() + eph.deln;
    let m = eph.m0 + n * tk;
    let ek = kepler(m, eph.e)?;

    let nu = ((1.0 - eph.e * eph.e).sqrt() * ek.sin()).atan2(ek.cos() - eph.e);
    let phi = nu + eph.omg;
    let sin2p = (2.0 * phi).sin();
    let cos2p = (2.0 * phi).cos();

    let u = phi + eph.cus * sin2p + eph.cuc * cos2p;
    let r = a * (1.0 - eph.e * ek.cos()) + eph.crs * sin2p + eph.crc * cos2p;
    let i = eph.i0 + eph.cis * sin2p + eph.cic * cos2p + eph.idot * tk;

    let x = r * u.cos();
    let y = r * u.sin();
    let o = eph.omg0 + (eph.omgd - OMGE) * tk - OMGE * eph.toes;
    let (sino, coso) = o.sin_cos();
    let cosi = i.cos();

    Ok(Vector3::new(
        x * coso - y * cosi * sino,
        x * sino + y * cosi * coso,
        y * i.sin(),
    ))
}
