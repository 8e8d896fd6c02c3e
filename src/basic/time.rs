use crate::basic::var::*;
use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// GPS time origin 1980-01-06 00:00:00 as POSIX seconds
const GPST0: i64 = 315_964_800;

pub fn timeadd(mut t: GTime, sec: f64) -> GTime {
    t.sec += sec;
    let whole = t.sec.floor();
    t.time += whole as i64;
    t.sec -= whole;
    t
}

pub fn timediff(t1: GTime, t2: GTime) -> f64 {
    (t1.time - t2.time) as f64 + (t1.sec - t2.sec)
}

/// shift t by a week towards t0 when they are more than half a week apart
pub fn adjweek(t: GTime, t0: GTime) -> GTime {
    match timediff(t, t0) {
        dt if dt < -HALFWEEK => timeadd(t, WEEKSEC),
        dt if dt > HALFWEEK => timeadd(t, -WEEKSEC),
        _ => t,
    }
}

pub fn gpst2time(week: i32, sow: f64) -> GTime {
    let sow = if sow.abs() <= 1E9 { sow } else { 0.0 };
    timeadd(GTime { time: GPST0 + week as i64 * WEEKSEC as i64, sec: 0.0 }, sow)
}

/// seconds of the GPS week, optionally returning the week number
pub fn time2gpst(t: GTime, week: Option<&mut i32>) -> f64 {
    let elapsed = t.time - GPST0;
    let w = elapsed.div_euclid(WEEKSEC as i64);
    if let Some(week) = week {
        *week = w as i32;
    }
    elapsed.rem_euclid(WEEKSEC as i64) as f64 + t.sec
}

fn midnight(year: i32, month: u32, day: u32) -> Option<i64> {
    NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
}

pub fn utc2gpst(t: GTime) -> GTime {
    LEAPS
        .iter()
        .find(|(y, m, d, _)| midnight(*y, *m, *d).is_some_and(|start| t.time >= start))
        .map_or(t, |leap| timeadd(t, leap.3))
}

/// parse a RINEX epoch string "yyyy mm dd hh mm ss.sssssss" (two digit years accepted)
pub fn str2time(s: &str) -> Result<GTime, chrono::ParseError> {
    let mut parts: Vec<String> = s.split_whitespace().map(|s| s.to_string()).collect();
    if let Some(year) = parts.first_mut() {
        if year.len() <= 2 {
            let yy: i32 = year.parse().unwrap_or(0);
            *year = format!("{}", if yy < 80 { 2000 + yy } else { 1900 + yy });
        }
    }
    let utc = NaiveDateTime::parse_from_str(&parts.join(" "), "%Y %m %d %H %M %S%.f")?.and_utc();
    Ok(GTime {
        time: utc.timestamp(),
        sec: utc.timestamp_subsec_nanos() as f64 * 1E-9,
    })
}

/// seconds of the day
pub fn time2sod(t: GTime) -> f64 {
    t.time.rem_euclid(86400) as f64 + t.sec
}

/// start of the day containing t
pub fn daystart(t: GTime) -> GTime {
    GTime { time: t.time - t.time.rem_euclid(86400), sec: 0.0 }
}

/// calendar date of a day of year
pub fn doy2ymd(year: i32, doy: u32) -> Option<NaiveDate> {
    NaiveDate::from_yo_opt(year, doy)
}

/// last day of year (365 or 366)
pub fn dec31(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 31).map(|d| d.ordinal()).unwrap_or(365)
}

/// time at 00:00:00 of a day of year
pub fn doy2time(year: i32, doy: u32) -> Option<GTime> {
    let date = doy2ymd(year, doy)?;
    midnight(date.year(), date.month(), date.day()).map(|time| GTime { time, sec: 0.0 })
}

/// decimation screen: keep a time tag when it falls on a multiple of the interval
pub fn screent(sec: f64, tint: f64) -> bool {
    tint <= 0.0 || (sec + DTTOL).rem_euclid(tint) <= DTTOL * 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpst_roundtrip() {
        let t = str2time("2020 01 01 12 00 30.0").unwrap();
        let mut week = 0;
        let sow = time2gpst(t, Some(&mut week));
        assert_eq!(week, 2086);
        assert_eq!(sow, 3.0 * 86400.0 + 12.0 * 3600.0 + 30.0);
        assert_eq!(timediff(gpst2time(week, sow), t), 0.0);
    }

    #[test]
    fn test_str2time() {
        let t2 = str2time(" 20  1  1  0  0 30.0000000").unwrap();
        let t3 = str2time("2020 01 01 00 00 30.0000000").unwrap();
        assert_eq!(t2, t3);
        assert_eq!(t3, GTime { time: 1_577_836_830, sec: 0.0 });
        let t = str2time("2021 03 04 05 06  7.5000000").unwrap();
        assert!((t.sec - 0.5).abs() < 1E-9);
        assert!(str2time("2021 13 04 05 06  7.5").is_err());
    }

    #[test]
    fn test_utc2gpst() {
        let t = str2time("2020 01 01 00 00 00.0").unwrap();
        assert_eq!(timediff(utc2gpst(t), t), 18.0);
        let t = str2time("2016 06 30 00 00 00.0").unwrap();
        assert_eq!(timediff(utc2gpst(t), t), 17.0);
        let t = str2time("1980 06 01 00 00 00.0").unwrap();
        assert_eq!(utc2gpst(t), t);
    }

    #[test]
    fn test_decimation() {
        let kept: Vec<f64> = (0..300).map(|s| s as f64).filter(|s| screent(*s, 30.0)).collect();
        assert_eq!(kept, vec![0.0, 30.0, 60.0, 90.0, 120.0, 150.0, 180.0, 210.0, 240.0, 270.0]);
        assert!((0..300).all(|s| screent(s as f64, 0.0)));
        assert!((0..300).all(|s| screent(s as f64, -5.0)));
    }

    #[test]
    fn test_day_of_year() {
        assert_eq!(dec31(2020), 366);
        assert_eq!(dec31(2021), 365);
        let t = doy2time(2020, 60).unwrap();
        assert_eq!(t, str2time("2020 02 29 00 00 00.0").unwrap());
        assert!(doy2time(2021, 366).is_none());
        let t = timeadd(t, 3723.25);
        assert_eq!(time2sod(t), 3723.25);
        assert_eq!(daystart(t).time, doy2time(2020, 60).unwrap().time);
    }
}
