//! Diagnostic reporting for import sessions
//!
//! The importer never prints; every diagnostic goes through a [`Reporter`].

use std::collections::HashSet;

use super::error::ImportError;

/// Kind of a reported diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Message,
    Warning,
    Error,
}

/// A single reported diagnostic
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub text: String,
}

/// Sink for import diagnostics
pub trait Reporter {
    /// Informational notice
    fn message(&mut self, msg: &str);

    fn warn(&mut self, msg: &str);

    fn error(&mut self, msg: &str);
}

/// Reporter keeping every diagnostic, also forwarded to `log`
#[derive(Debug, Default)]
pub struct CollectingReporter {
    diagnostics: Vec<Diagnostic>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.of_level(DiagnosticLevel::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.of_level(DiagnosticLevel::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    fn of_level(&self, level: DiagnosticLevel) -> impl Iterator<Item = &str> {
        self.diagnostics
            .iter()
            .filter(move |d| d.level == level)
            .map(|d| d.text.as_str())
    }

    fn push(&mut self, level: DiagnosticLevel, msg: &str) {
        self.diagnostics.push(Diagnostic {
            level,
            text: msg.to_string(),
        });
    }
}

impl Reporter for CollectingReporter {
    fn message(&mut self, msg: &str) {
        log::info!("{msg}");
        self.push(DiagnosticLevel::Message, msg);
    }

    fn warn(&mut self, msg: &str) {
        log::warn!("{msg}");
        self.push(DiagnosticLevel::Warning, msg);
    }

    fn error(&mut self, msg: &str) {
        log::error!("{msg}");
        self.push(DiagnosticLevel::Error, msg);
    }
}

/// Advisories that are only reported once per import session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    DuplicateEdgeOverwrite,
    SpeedConversion,
    DeprecatedNumLanes,
    DeprecatedFromTo,
    DeprecatedSpreadType,
    DeprecatedLaneId,
}

impl WarningKind {
    /// Advisory text for deprecated field usage
    pub fn advisory(&self) -> &'static str {
        match self {
            WarningKind::DuplicateEdgeOverwrite => "Duplicate edge ids occurred; assuming overwriting is wished.",
            WarningKind::SpeedConversion => "Speeds are given in km/h and converted to m/s.",
            WarningKind::DeprecatedNumLanes => "'nolanes' is deprecated, please use 'numLanes' instead.",
            WarningKind::DeprecatedFromTo => {
                "'fromnode'/'tonode' and 'xfrom'/'yfrom'/'xto'/'yto' are deprecated; please use 'from'/'to' and define nodes separately."
            }
            WarningKind::DeprecatedSpreadType => "'spreadFunc' is deprecated; please use 'spreadType'.",
            WarningKind::DeprecatedLaneId => "'id' is deprecated for lanes, please use 'index' instead.",
        }
    }
}

/// Set of warning kinds already reported in the current session
#[derive(Debug, Default)]
pub struct WarnOnce {
    seen: HashSet<WarningKind>,
}

impl WarnOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time `kind` is seen in this session
    pub fn first(&mut self, kind: WarningKind) -> bool {
        self.seen.insert(kind)
    }
}

/// Reporting sink of one import session.
///
/// Pairs the caller's [`Reporter`] with the session's [`WarnOnce`] set; the
/// set starts empty with the session and is dropped with it.
pub struct Diagnostics<'a> {
    reporter: &'a mut dyn Reporter,
    warned: WarnOnce,
}

impl<'a> Diagnostics<'a> {
    pub fn new(reporter: &'a mut dyn Reporter) -> Self {
        Self {
            reporter,
            warned: WarnOnce::new(),
        }
    }

    pub fn warn(&mut self, msg: &str) {
        self.reporter.warn(msg);
    }

    pub fn error(&mut self, msg: &str) {
        self.reporter.error(msg);
    }

    /// Report a recovered error
    pub fn report(&mut self, err: &ImportError) {
        self.reporter.error(&err.to_string());
    }

    /// Warn about `kind` unless it was already reported in this session
    pub fn warn_once(&mut self, kind: WarningKind, msg: &str) {
        if self.warned.first(kind) {
            self.reporter.warn(msg);
        }
    }

    /// Informational variant of [`Diagnostics::warn_once`]
    pub fn message_once(&mut self, kind: WarningKind, msg: &str) {
        if self.warned.first(kind) {
            self.reporter.message(msg);
        }
    }

    /// Emit the standard advisory for a deprecated field, once per kind
    pub fn deprecated(&mut self, kind: WarningKind) {
        self.warn_once(kind, kind.advisory());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_once_per_kind() {
        let mut warned = WarnOnce::new();
        assert!(warned.first(WarningKind::DeprecatedLaneId));
        assert!(!warned.first(WarningKind::DeprecatedLaneId));
        assert!(warned.first(WarningKind::DeprecatedNumLanes));
        assert!(warned.first(WarningKind::SpeedConversion));
    }

    #[test]
    fn test_collecting_reporter_levels() {
        let mut reporter = CollectingReporter::new();
        reporter.message("hello");
        reporter.warn("careful");
        reporter.error("broken");
        reporter.error("broken again");

        assert_eq!(reporter.diagnostics().len(), 4);
        assert_eq!(reporter.warning_count(), 1);
        assert_eq!(reporter.error_count(), 2);
        assert_eq!(reporter.errors().next(), Some("broken"));
    }

    #[test]
    fn test_diagnostics_deprecated_once() {
        let mut reporter = CollectingReporter::new();
        {
            let mut diag = Diagnostics::new(&mut reporter);
            diag.deprecated(WarningKind::DeprecatedNumLanes);
            diag.deprecated(WarningKind::DeprecatedNumLanes);
            diag.warn_once(WarningKind::SpeedConversion, "converted");
            diag.message_once(WarningKind::SpeedConversion, "converted again");
        }
        assert_eq!(reporter.warning_count(), 2);
        assert_eq!(reporter.diagnostics().len(), 2);
        assert!(reporter.warnings().next().unwrap().contains("numLanes"));
    }
}
