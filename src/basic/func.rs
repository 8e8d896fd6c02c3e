use flate2::read::GzDecoder;
use std::fs::File;
use std::io;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// line iterator of a text file; bytes that are not UTF-8 are replaced, not an error
pub struct TextLines {
    reader: Box<dyn BufRead>,
    buff: Vec<u8>,
}

impl Iterator for TextLines {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buff.clear();
        match self.reader.read_until(b'\n', &mut self.buff) {
            Ok(0) => None,
            Ok(_) => {
                if self.buff.last() == Some(&b'\n') {
                    self.buff.pop();
                    if self.buff.last() == Some(&b'\r') {
                        self.buff.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buff).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// open a text file for line reading, gzip-compressed files are decoded on the fly
pub fn openfile<P: AsRef<Path>>(path: P) -> io::Result<TextLines> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader: Box<dyn BufRead> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(TextLines { reader, buff: Vec::new() })
}

/// decode a gzip file into `dst`
pub fn gunzip<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> io::Result<u64> {
    let mut decoder = GzDecoder::new(File::open(src)?);
    let mut out = File::create(dst)?;
    io::copy(&mut decoder, &mut out)
}

/// fixed-width field of a RINEX line, empty when the line is short
pub fn field(buff: &str, start: usize, width: usize) -> &str {
    if start >= buff.len() {
        return "";
    }
    let end = (start + width).min(buff.len());
    buff.get(start..end).unwrap_or("").trim()
}

/// parse a Fortran-style float ("1.234D+02"), blank fields read as 0
pub fn navval(s: &str) -> Result<f64, std::num::ParseFloatError> {
    if s.is_empty() {
        return Ok(0.0);
    }
    s.replace(['D', 'd'], "E").parse::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openfile_latin1_comment() {
        let dir = std::env::temp_dir().join("rinex2snr_func_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("latin1.20o");
        let mut text = b"     2.11           OBSERVATION DATA    M\r\n".to_vec();
        text.extend_from_slice(b"station at Bj\xf8rnsund");
        text.extend_from_slice(&[b' '; 42]);
        text.extend_from_slice(b"COMMENT\n");
        text.extend_from_slice(b"last line without newline");
        std::fs::write(&path, &text).unwrap();

        let lines: Vec<String> = openfile(&path).unwrap().map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "     2.11           OBSERVATION DATA    M");
        assert!(lines[1].starts_with("station at Bj\u{fffd}rnsund"));
        assert!(lines[1].ends_with("COMMENT"));
        assert_eq!(lines[2], "last line without newline");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_fields() {
        let line = "    -.123456789012D-03  .400000000000D+01";
        assert_eq!(field(line, 3, 19), "-.123456789012D-03");
        assert_eq!(navval(field(line, 3, 19)).unwrap(), -0.123456789012e-3);
        assert_eq!(navval(field(line, 22, 19)).unwrap(), 4.0);
        assert_eq!(navval(field(line, 60, 19)).unwrap(), 0.0);
        assert!(navval("x.1").is_err());
    }
}
