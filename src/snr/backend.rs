use crate::snr::capability::run_tool;
use crate::snr::config::{Backend, Config, OrbitSource};
use crate::snr::daylog::DayLog;
use crate::snr::error::Result;
use crate::snr::extract::{rnx2snr, ExtractOptions};
use log::warn;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

/// produces the SNR file of one day
pub trait SnrBackend {
    fn kind(&self) -> Backend;

    fn produce(
        &self,
        rinex: &Path,
        orbfile: &Path,
        snrfile: &Path,
        opt: ExtractOptions,
        log: &mut DayLog,
    ) -> Result<()>;
}

/// standalone gpsSNR.e / gnssSNR.e translators, stdout kept in `<station>_fortran.txt`
#[derive(Debug, Clone)]
pub struct FortranBackend {
    pub exe: PathBuf,
    pub stdout_log: PathBuf,
    pub timeout: Option<Duration>,
}

impl SnrBackend for FortranBackend {
    fn kind(&self) -> Backend {
        Backend::Fortran
    }

    fn produce(
        &self,
        rinex: &Path,
        orbfile: &Path,
        snrfile: &Path,
        opt: ExtractOptions,
        log: &mut DayLog,
    ) -> Result<()> {
        log.line("Using standalone fortran for translation - separate log is used for stdout");
        if opt.dec > 0 {
            warn!("decimation is not applied by the fortran translator");
        }
        if let Some(dir) = self.stdout_log.parent() {
            fs::create_dir_all(dir)?;
        }
        let stdout = File::create(&self.stdout_log)?;
        let mut cmd = Command::new(&self.exe);
        cmd.arg(rinex)
            .arg(snrfile)
            .arg(orbfile)
            .arg(opt.fmt.to_string())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::null());
        if let Err(e) = run_tool(&mut cmd, self.timeout) {
            log.line(&format!(
                "Problem with making SNR file, check fortran specific log {}",
                self.stdout_log.display()
            ));
            return Err(e.into());
        }
        Ok(())
    }
}

/// in-process extraction pipeline
#[derive(Debug, Clone, Copy)]
pub struct NativeBackend {
    kind: Backend,
}

impl NativeBackend {
    pub fn native() -> Self {
        NativeBackend { kind: Backend::Native }
    }

    pub fn hybrid() -> Self {
        NativeBackend { kind: Backend::Hybrid }
    }
}

impl SnrBackend for NativeBackend {
    fn kind(&self) -> Backend {
        self.kind
    }

    fn produce(
        &self,
        rinex: &Path,
        orbfile: &Path,
        snrfile: &Path,
        opt: ExtractOptions,
        log: &mut DayLog,
    ) -> Result<()> {
        log.line(&format!("SNR file {} will use the {} translator", snrfile.display(), self.kind));
        if opt.dec > 0 {
            log.line("Decimating will be done here");
        }
        rnx2snr(rinex, orbfile, snrfile, opt, log)?;
        Ok(())
    }
}

/// backend implementation of a resolved backend choice
pub fn make_backend(
    kind: Backend,
    cfg: &Config,
    source: OrbitSource,
    station: &str,
) -> Box<dyn SnrBackend> {
    match kind {
        Backend::Fortran => Box::new(FortranBackend {
            exe: cfg.snrexe(source),
            stdout_log: cfg.log_dir.join(format!("{}_fortran.txt", station)),
            timeout: cfg.timeout(),
        }),
        Backend::Native => Box::new(NativeBackend::native()),
        Backend::Hybrid => Box::new(NativeBackend::hybrid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snr::error::Error;

    #[test]
    fn test_make_backend() {
        let cfg = Config { exe: PathBuf::from("/opt/exe"), ..Default::default() };
        let b = make_backend(Backend::Fortran, &cfg, OrbitSource::PreciseSp3, "p041");
        assert_eq!(b.kind(), Backend::Fortran);
        assert_eq!(make_backend(Backend::Hybrid, &cfg, OrbitSource::BroadcastNav, "p041").kind(), Backend::Hybrid);
        assert_eq!(make_backend(Backend::Native, &cfg, OrbitSource::BroadcastNav, "p041").kind(), Backend::Native);
    }

    #[test]
    fn test_fortran_missing_exe() {
        let dir = std::env::temp_dir().join("rinex2snr_backend_test");
        let backend = FortranBackend {
            exe: dir.join("gpsSNR.e"),
            stdout_log: dir.join("logs").join("p041_fortran.txt"),
            timeout: None,
        };
        let res = backend.produce(
            &dir.join("p0410010.20o"),
            &dir.join("auto0010.20n"),
            &dir.join("p0410010.20.snr66"),
            ExtractOptions::default(),
            &mut DayLog::sink(),
        );
        assert!(matches!(res, Err(Error::Capability(_))));
        fs::remove_dir_all(&dir).ok();
    }
}
