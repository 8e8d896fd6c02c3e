use crate::basic::var::*;

/// constellations carried into the SNR product, in processing order
pub const CONSTELLATIONS: [char; 4] = ['G', 'E', 'R', 'C'];

/// satellite code offset of a constellation (GPS 0, GLONASS 100, Galileo 200, BeiDou 300)
pub fn sysoffset(sys: char) -> Option<usize> {
    match sys {
        'G' => Some(0),
        'R' => Some(100),
        'E' => Some(200),
        'C' => Some(300),
        _ => None,
    }
}

/// system name used in logs
pub fn sysname(sys: char) -> &'static str {
    match sys {
        'G' => "GPS",
        'R' => "GLONASS",
        'E' => "GALILEO",
        'C' => "BEIDOU",
        _ => "UNKNOWN",
    }
}

fn maxprn(sys: char) -> usize {
    match sys {
        'G' => MAXPRNGPS,
        'R' => MAXPRNGLO,
        'E' => MAXPRNGAL,
        'C' => MAXPRNCMP,
        _ => 0,
    }
}

/// satellite system + prn to satellite code (prn + constellation offset)
pub fn satcode(sys: char, prn: usize) -> Option<usize> {
    if prn == 0 || prn > maxprn(sys) {
        return None;
    }
    sysoffset(sys).map(|offset| offset + prn)
}

/// convert satellite id ("G05", "G 5", " 5", "R12") to system + prn;
/// a blank system letter defaults to `defsys`
pub fn satid2no(id: &str, defsys: char) -> Option<(char, usize)> {
    let mut chars = id.chars();
    let first = chars.next()?;
    let (sys, rest) = if first.is_ascii_alphabetic() {
        (first, chars.as_str())
    } else if first == ' ' {
        (defsys, chars.as_str())
    } else {
        (defsys, id)
    };
    let prn = rest.trim().parse::<usize>().ok()?;
    if prn == 0 {
        return None;
    }
    Some((sys, prn))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_satcode() {
        assert_eq!(satcode('G', 5), Some(5));
        assert_eq!(satcode('R', 5), Some(105));
        assert_eq!(satcode('E', 5), Some(205));
        assert_eq!(satcode('C', 6), Some(306));
        assert_eq!(satcode('J', 1), None);
        assert_eq!(satcode('G', 0), None);
        assert_eq!(satcode('C', MAXPRNCMP + 1), None);
    }

    #[test]
    fn test_satid() {
        assert_eq!(satid2no("G05", 'G'), Some(('G', 5)));
        assert_eq!(satid2no("G 5", 'G'), Some(('G', 5)));
        assert_eq!(satid2no(" 5", 'G'), Some(('G', 5)));
        assert_eq!(satid2no("12", 'R'), Some(('R', 12)));
        assert_eq!(satid2no("C19", 'G'), Some(('C', 19)));
        assert_eq!(satid2no("   ", 'G'), None);
    }
}
