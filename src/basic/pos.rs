use crate::basic::eph::OrbitError;
use crate::basic::var::*;
use nalgebra::{Matrix3, RealField, Vector2, Vector3};
use num_traits::Float;
use std::ops::Sub;
use thiserror::Error;

/// tolerance of the strict light-time iteration (s)
const TOL_LIGHTTIME: f64 = 1E-12;
/// max number of iteration of the strict light-time loop
const MAX_ITER_LIGHTTIME: usize = 10;
/// fixed number of light-time iterations (starting from 70 ms this is enough)
const NITER_LIGHTTIME: usize = 2;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("light time iteration did not converge after {0} iterations")]
    NoConvergence(usize),
    #[error(transparent)]
    Orbit(#[from] OrbitError),
}

/// light-time iteration policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightTime {
    /// fixed number of iterations, no convergence check
    Fixed(usize),
    /// iterate until the travel time changes less than `tol` seconds
    Strict { tol: f64, max_iter: usize },
}

impl LightTime {
    pub fn new(strict: bool) -> Self {
        if strict {
            LightTime::Strict { tol: TOL_LIGHTTIME, max_iter: MAX_ITER_LIGHTTIME }
        } else {
            LightTime::Fixed(NITER_LIGHTTIME)
        }
    }
}

impl Default for LightTime {
    fn default() -> Self {
        LightTime::new(false)
    }
}

/// compute ecef to local coordinate transfromation matrix
pub fn xyz2enu<T: RealField + Copy>(pos: &[T]) -> Matrix3<T> {
    let sinp = pos[0].sin();
    let cosp = pos[0].cos();
    let sinl = pos[1].sin();
    let cosl = pos[1].cos();

    Matrix3::new(
        -sinl,
        cosl,
        T::zero(),
        -sinp * cosl,
        -sinp * sinl,
        cosp,
        cosp * cosl,
        cosp * sinl,
        sinp,
    )
}

/// transform ecef position to geodetic position {lat,lon,h} (rad,m)
pub fn ecef2pos<T: RealField + Float + Sub<Output = T>>(r: &[T], pos: &mut [T]) {
    let e2 = T::from(FE_WGS84 * (2.0 - FE_WGS84)).unwrap_or_else(T::zero);
    let re = T::from(RE_WGS84).unwrap_or_else(T::one);
    let tol = T::from(1E-4).unwrap_or_else(T::zero);
    let eps = T::from(1E-12).unwrap_or_else(T::zero);
    let half_pi = T::from(PI / 2.0).unwrap_or_else(T::zero);
    let r2 = Vector2::new(r[0], r[1]).dot(&Vector2::new(r[0], r[1]));
    let mut z = r[2];
    let mut zk = T::zero();
    let mut v = re;
    let mut sinp: T;

    while Float::abs(z - zk) >= tol {
        zk = z;
        sinp = z / Float::sqrt(r2 + z * z);
        v = re / Float::sqrt(T::one() - e2 * sinp * sinp);
        z = r[2] + v * e2 * sinp;
    }
    pos[0] = if r2 > eps {
        Float::atan(z / Float::sqrt(r2))
    } else if r[2] > T::zero() {
        half_pi
    } else {
        -half_pi
    };
    pos[1] = if r2 > eps { Float::atan2(r[1], r[0]) } else { T::zero() };
    pos[2] = Float::sqrt(r2 + z * z) - v;
}

/// elevation, azimuth (deg) and geometric range (m) of a satellite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geom {
    pub el: f64,
    pub az: f64,
    pub range: f64,
}

/// local topocentric frame of a fixed receiver
#[derive(Debug, Clone)]
pub struct Topo {
    pub rr: Vector3<f64>,
    pub pos: [f64; 3],
    pub east: Vector3<f64>,
    pub north: Vector3<f64>,
    pub up: Vector3<f64>,
}

impl Topo {
    pub fn new(rr: &[f64; 3]) -> Self {
        let mut pos = [0.0; 3];
        ecef2pos(rr, &mut pos);
        let e = xyz2enu(&pos);
        Topo {
            rr: Vector3::new(rr[0], rr[1], rr[2]),
            pos,
            east: e.row(0).transpose(),
            north: e.row(1).transpose(),
            up: e.row(2).transpose(),
        }
    }

    /// elevation/azimuth of a satellite ecef position as seen from the receiver
    pub fn satazel(&self, rs: &Vector3<f64>) -> Geom {
        let r = rs - self.rr;
        let range = r.norm();
        let el = (self.up.dot(&r) / range).asin() * R2D;
        let mut az = self.east.dot(&r).atan2(self.north.dot(&r)) * R2D;
        if az < 0.0 {
            az += 360.0;
        }
        Geom { el, az, range }
    }
}

/// rotate a satellite position about the earth spin axis by the travel time
fn sagnac(rs: &Vector3<f64>, tau: f64) -> Vector3<f64> {
    let (sint, cost) = (-OMGE * tau).sin_cos();
    Vector3::new(rs[0] * cost - rs[1] * sint, rs[0] * sint + rs[1] * cost, rs[2])
}

/// satellite position at signal transmission, expressed in the earth-fixed frame at
/// reception time t (s); satpos gives the satellite ecef position at any time
pub fn lighttime<F>(
    t: f64,
    rr: &Vector3<f64>,
    mode: LightTime,
    mut satpos: F,
) -> Result<Vector3<f64>, GeometryError>
where
    F: FnMut(f64) -> Result<Vector3<f64>, OrbitError>,
{
    let mut rs = satpos(t - TAU0)?;
    let mut tau = (rs - rr).norm() / CLIGHT;

    match mode {
        LightTime::Fixed(n) => {
            for _ in 0..n {
                rs = sagnac(&satpos(t - tau)?, tau);
                tau = (rs - rr).norm() / CLIGHT;
            }
        }
        LightTime::Strict { tol, max_iter } => {
            let mut iter = 0;
            loop {
                if iter >= max_iter {
                    return Err(GeometryError::NoConvergence(iter));
                }
                rs = sagnac(&satpos(t - tau)?, tau);
                let tau_new = (rs - rr).norm() / CLIGHT;
                iter += 1;
                let dtau = (tau_new - tau).abs();
                tau = tau_new;
                if dtau < tol {
                    break;
                }
            }
        }
    }
    Ok(rs)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// circular orbit at GPS altitude, inclined 55 deg, earth-fixed
    fn orbit(t: f64) -> Result<Vector3<f64>, OrbitError> {
        let a = 26_560_000.0;
        let n = (MU_GPS / (a * a * a)).sqrt();
        let inc = 55.0 * D2R;
        let u = 0.3 + n * t;
        let o = 1.0 - OMGE * t;
        let (x, y) = (a * u.cos(), a * u.sin());
        Ok(Vector3::new(
            x * o.cos() - y * inc.cos() * o.sin(),
            x * o.sin() + y * inc.cos() * o.cos(),
            y * inc.sin(),
        ))
    }

    #[test]
    fn test_ecef2pos() {
        let mut pos = [0.0; 3];
        ecef2pos(&[RE_WGS84 + 100.0, 0.0, 0.0], &mut pos);
        assert!(pos[0].abs() < 1E-12 && pos[1].abs() < 1E-12);
        assert!((pos[2] - 100.0).abs() < 1E-6);

        // north pole
        let b = RE_WGS84 * (1.0 - FE_WGS84);
        ecef2pos(&[0.0, 0.0, b], &mut pos);
        assert!((pos[0] - PI / 2.0).abs() < 1E-12);
        assert!(pos[2].abs() < 1E-3);
    }

    #[test]
    fn test_overhead_and_horizon() {
        let topo = Topo::new(&[RE_WGS84, 0.0, 0.0]);
        let g = topo.satazel(&Vector3::new(RE_WGS84 + 20_000_000.0, 0.0, 0.0));
        assert!((g.el - 90.0).abs() < 1E-9);
        assert!((g.range - 20_000_000.0).abs() < 1E-6);

        let g = topo.satazel(&Vector3::new(RE_WGS84, 10_000_000.0, 0.0));
        assert!((g.az - 90.0).abs() < 1E-9);
        assert!(g.el.abs() < 1E-9);

        let g = topo.satazel(&Vector3::new(RE_WGS84, 0.0, -10_000_000.0));
        assert!((g.az - 180.0).abs() < 1E-9);
        let g = topo.satazel(&Vector3::new(RE_WGS84, -10_000_000.0, 1.0));
        assert!((g.az - 270.0).abs() < 1E-6);
    }

    #[test]
    fn test_satazel_ranges() {
        let topo = Topo::new(&[-2_430_697.0, -4_704_189.0, 3_544_329.0]);
        for k in 0..200 {
            let rs = orbit(k as f64 * 300.0).unwrap();
            let g = topo.satazel(&rs);
            assert!((-90.0..=90.0).contains(&g.el));
            assert!((0.0..360.0).contains(&g.az));
        }
    }

    #[test]
    fn test_lighttime_fixed_vs_converged() {
        let rr = Vector3::new(-2_430_697.0, -4_704_189.0, 3_544_329.0);
        for k in 0..48 {
            let t = k as f64 * 1800.0;
            let fixed = lighttime(t, &rr, LightTime::default(), orbit).unwrap();
            let strict = lighttime(
                t,
                &rr,
                LightTime::Strict { tol: 1E-14, max_iter: 20 },
                orbit,
            ).unwrap();
            assert!(((fixed - rr).norm() - (strict - rr).norm()).abs() < 1.0);
        }
    }

    #[test]
    fn test_lighttime_strict_failure() {
        let rr = Vector3::new(RE_WGS84, 0.0, 0.0);
        let res = lighttime(0.0, &rr, LightTime::Strict { tol: 0.0, max_iter: 3 }, orbit);
        assert_eq!(res, Err(GeometryError::NoConvergence(3)));

        let res = lighttime(0.0, &rr, LightTime::default(), |_| Err(OrbitError::NoEphemeris(3)));
        assert_eq!(res, Err(GeometryError::Orbit(OrbitError::NoEphemeris(3))));
    }
}
