use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// persistent per-station log of a conversion day, flushed when dropped
pub struct DayLog {
    out: Box<dyn Write>,
}

impl DayLog {
    /// open `<log_dir>/<station>.txt` in append mode
    pub fn open(log_dir: &Path, station: &str) -> io::Result<Self> {
        fs::create_dir_all(log_dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join(format!("{}.txt", station)))?;
        Ok(DayLog { out: Box::new(BufWriter::new(file)) })
    }

    /// a log that discards everything
    pub fn sink() -> Self {
        DayLog { out: Box::new(io::sink()) }
    }

    /// write one line; failures to log never interrupt a conversion
    pub fn line(&mut self, msg: &str) {
        if let Err(e) = writeln!(self.out, "{}", msg) {
            log::debug!("day log write failed: {}", e);
        }
    }
}

impl Drop for DayLog {
    fn drop(&mut self) {
        let _ = self.out.flush();
    }
}
