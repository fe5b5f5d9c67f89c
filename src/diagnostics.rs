//! Fault reporting for the outermost entry points.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe, Location};
use std::path::PathBuf;
use std::sync::Once;

use tracing::{error, warn};

/// A failure caught at an entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultReport {
    pub message: String,
    /// Source location the failure was raised at, or the entry point when it is unknown.
    pub location: String,
}

/// Source location attached to an error as context.
///
/// ```ignore
/// host.activate_workspace(id).context(Site::here())?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site(&'static Location<'static>);

impl Site {
    #[track_caller]
    pub fn here() -> Self {
        Self(Location::caller())
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

thread_local! {
    static PANIC_SITE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Chains a panic hook that remembers where the last panic on this thread happened.
fn install_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let default = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if let Some(location) = info.location() {
                let location = location.to_string();
                PANIC_SITE.with(|site| *site.borrow_mut() = Some(location));
            }
            default(info);
        }));
    });
}

fn take_panic_site() -> Option<String> {
    PANIC_SITE.with(|site| site.borrow_mut().take())
}

/// Diagnostic text file. Opened on first write; any I/O error disables it for good.
#[derive(Debug)]
pub struct LogFile {
    path: PathBuf,
    file: Option<File>,
    failed: bool,
}

impl LogFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: None,
            failed: false,
        }
    }

    /// Log file in the temporary directory, unique per process.
    pub fn in_temp_dir() -> Self {
        let name = format!("swipeview-{}.log", std::process::id());
        Self::new(std::env::temp_dir().join(name))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Appends a line. Returns whether it was written.
    pub fn write_line(&mut self, text: &str) -> bool {
        if self.failed {
            return false;
        }

        if let Err(err) = self.try_write_line(text) {
            warn!("disabling diagnostic log file {:?}: {err:?}", self.path);
            self.failed = true;
            self.file = None;
            return false;
        }

        true
    }

    fn try_write_line(&mut self, text: &str) -> anyhow::Result<()> {
        use anyhow::Context;

        let file = match &mut self.file {
            Some(file) => file,
            slot @ None => {
                let file = File::options()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .context("error opening log file")?;
                slot.insert(file)
            }
        };

        writeln!(file, "{text}").context("error writing to log file")?;
        Ok(())
    }
}

/// Logs faults, collapsing consecutive repeats of the same one.
#[derive(Debug)]
pub struct FaultReporter {
    last: Option<FaultReport>,
    log_file: Option<LogFile>,
    reported: usize,
}

impl Default for FaultReporter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl FaultReporter {
    pub fn new(log_file: Option<LogFile>) -> Self {
        install_panic_hook();
        Self {
            last: None,
            log_file,
            reported: 0,
        }
    }

    /// Number of faults that were actually logged.
    pub fn reported(&self) -> usize {
        self.reported
    }

    pub fn last(&self) -> Option<&FaultReport> {
        self.last.as_ref()
    }

    /// Reports a fault unless it repeats the previous one. Returns whether it was logged.
    pub fn report(&mut self, fault: FaultReport) -> bool {
        if self.last.as_ref() == Some(&fault) {
            return false;
        }

        error!("error in {}: {}", fault.location, fault.message);
        if let Some(log_file) = &mut self.log_file {
            log_file.write_line(&format!("{}: {}", fault.location, fault.message));
        }

        self.reported += 1;
        self.last = Some(fault);
        true
    }

    /// Runs `f`, turning errors and panics into reports.
    ///
    /// `entry` names the entry point and stands in for the location when the failure carries no
    /// [`Site`].
    pub fn protect<R>(
        &mut self,
        entry: &'static str,
        f: impl FnOnce() -> anyhow::Result<R>,
    ) -> Option<R> {
        take_panic_site();
        let (message, site) = match catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(rv)) => return Some(rv),
            Ok(Err(err)) => error_parts(&err),
            Err(payload) => (panic_message(payload.as_ref()), take_panic_site()),
        };

        let location = site.unwrap_or_else(|| entry.to_owned());
        self.report(FaultReport { message, location });
        None
    }
}

/// Splits an error into its message chain and the [`Site`] it was tagged with.
fn error_parts(err: &anyhow::Error) -> (String, Option<String>) {
    let site = err.downcast_ref::<Site>().map(Site::to_string);
    let message = err
        .chain()
        .map(|cause| cause.to_string())
        .filter(|cause| Some(cause) != site.as_ref())
        .collect::<Vec<_>>()
        .join(": ");
    (message, site)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panic: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panic: {msg}")
    } else {
        String::from("panic with a non-string payload")
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, bail, Context};

    use super::*;

    fn refuse_here() -> anyhow::Result<()> {
        Err(anyhow!("refused")).context(Site::here())
    }

    fn refuse_there() -> anyhow::Result<()> {
        Err(anyhow!("refused")).context(Site::here())
    }

    #[test]
    fn repeated_faults_are_reported_once() {
        let mut reporter = FaultReporter::default();
        for _ in 0..3 {
            let rv: Option<()> = reporter.protect("tick", || bail!("stuck"));
            assert!(rv.is_none());
        }
        assert_eq!(reporter.reported(), 1);

        reporter.protect("dispatch", || -> anyhow::Result<()> { bail!("stuck") });
        assert_eq!(reporter.reported(), 2);
        assert_eq!(reporter.last().unwrap().location, "dispatch");
    }

    #[test]
    fn same_message_from_two_sites_is_reported_twice() {
        let mut reporter = FaultReporter::default();
        reporter.protect("frame", refuse_here);
        reporter.protect("frame", refuse_here);
        assert_eq!(reporter.reported(), 1);
        let first = reporter.last().unwrap().clone();
        assert_eq!(first.message, "refused");
        assert!(first.location.contains("diagnostics.rs"));

        reporter.protect("frame", refuse_there);
        assert_eq!(reporter.reported(), 2);
        let second = reporter.last().unwrap();
        assert_eq!(second.message, "refused");
        assert_ne!(second.location, first.location);
    }

    #[test]
    fn panics_are_located() {
        let mut reporter = FaultReporter::default();
        let crash = || -> anyhow::Result<()> { panic!("boom") };
        reporter.protect("frame", crash);
        reporter.protect("frame", || -> anyhow::Result<()> { panic!("boom") });
        assert_eq!(reporter.reported(), 2);
        let fault = reporter.last().unwrap();
        assert_eq!(fault.message, "panic: boom");
        assert!(fault.location.contains("diagnostics.rs"));
    }

    #[test]
    fn panics_are_caught() {
        let mut reporter = FaultReporter::default();
        let rv: Option<()> = reporter.protect("tick", || panic!("boom"));
        assert!(rv.is_none());
        assert_eq!(reporter.last().unwrap().message, "panic: boom");

        let rv = reporter.protect("tick", || Ok(5));
        assert_eq!(rv, Some(5));
    }

    #[test]
    fn log_file_failure_is_not_fatal() {
        let mut log = LogFile::new(PathBuf::from("/nonexistent-dir/swipeview.log"));
        assert!(!log.write_line("hello"));
        assert!(log.is_failed());
        assert!(!log.write_line("again"));

        let mut reporter = FaultReporter::new(Some(log));
        assert!(reporter.report(FaultReport {
            message: String::from("still reported"),
            location: String::from("tick"),
        }));
    }

    #[test]
    fn log_file_appends() {
        let path = std::env::temp_dir().join(format!(
            "swipeview-test-{}-{}.log",
            std::process::id(),
            line!()
        ));
        let _ = std::fs::remove_file(&path);

        let mut log = LogFile::new(path.clone());
        assert!(log.write_line("one"));
        assert!(log.write_line("two"));
        drop(log);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "one\ntwo\n");
        let _ = std::fs::remove_file(&path);
    }
}
