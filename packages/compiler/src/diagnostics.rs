//! Source files, spans, and the diagnostic sink.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A loaded source file: stable path, full text, and precomputed line starts
/// for span decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub text: Arc<str>,
    line_starts: Vec<u32>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let line_starts = compute_line_starts(&text);
        SourceFile {
            path: path.into(),
            text,
            line_starts,
        }
    }

    /// 1-based line, 0-based column for a byte offset, for human-facing output.
    pub fn line_and_column(&self, pos: u32) -> (u32, u32) {
        match self.line_starts.binary_search(&pos) {
            Ok(line) => (line as u32 + 1, 0),
            Err(0) => (1, pos),
            Err(line) => (line as u32, pos - self.line_starts[line - 1]),
        }
    }

    pub fn text_at(&self, span: Span) -> &str {
        &self.text[span.pos as usize..span.end as usize]
    }

    pub fn len(&self) -> u32 {
        self.text.len() as u32
    }
}

fn compute_line_starts(text: &str) -> Vec<u32> {
    let mut starts = vec![0u32];
    let bytes = text.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                let next = if i + 1 < bytes.len() && bytes[i + 1] == b'\n' { i + 2 } else { i + 1 };
                starts.push(next as u32);
                i = next;
            }
            b'\n' => {
                starts.push((i + 1) as u32);
                i += 1;
            }
            _ => i += 1,
        }
    }
    starts
}

/// A half-open `[pos, end)` byte-offset range into one `SourceFile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub pos: u32,
    pub end: u32,
}

impl Span {
    pub fn new(pos: u32, end: u32) -> Self {
        debug_assert!(pos <= end);
        Span { pos, end }
    }

    pub fn empty_at(pos: u32) -> Self {
        Span { pos, end: pos }
    }
}

/// Every diagnostic targets either a concrete file span, or nothing
/// (a load-level failure before any file was read).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiagnosticTarget {
    Span { file: String, pos: u32, end: u32 },
    NoTarget(NoTargetMarker),
}

/// `serde(untagged)` needs a distinguishable shape for the "no-target" case;
/// this mirrors the wire contract: `"no-target"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoTargetMarker(String);

impl DiagnosticTarget {
    pub fn no_target() -> Self {
        DiagnosticTarget::NoTarget(NoTargetMarker("no-target".to_string()))
    }

    pub fn span(file: &str, span: Span) -> Self {
        DiagnosticTarget::Span {
            file: file.to_string(),
            pos: span.pos,
            end: span.end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

/// Stable diagnostic codes, grouped by phase. The `Display` impl is
/// the wire-format string code; callers outside this crate only ever see
/// the string, but exhaustiveness is checked here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // Parse-level
    MissingToken,
    UnknownDirective,
    ReservedIdentifierUsed,
    UnterminatedLiteral,
    TrailingDelimiterDisallowed,
    InvalidDecoratorLocation,
    InvalidDirectiveLocation,
    // Load-level
    FileNotFound,
    LibraryNotFound,
    InvalidImport,
    CompilerVersionMismatch,
    DynamicImportInEval,
    // Bind-level
    DuplicateSymbol,
    // Check-level
    UnresolvedReference,
    AmbiguousReference,
    RecursiveBase,
    DefaultTypeMismatch,
    DefaultOnRequired,
    DuplicateProperty,
    InvalidDecoratorTarget,
    InvalidDecoratorArgumentType,
    CircularTemplateInstantiation,
    DecoratorThrew,
    // Meta
    SuppressError,
}

impl DiagnosticCode {
    pub fn default_severity(self) -> Severity {
        use DiagnosticCode::*;
        match self {
            TrailingDelimiterDisallowed | UnknownDirective => Severity::Warning,
            SuppressError => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use DiagnosticCode::*;
        let s = match self {
            MissingToken => "missing-token",
            UnknownDirective => "unknown-directive",
            ReservedIdentifierUsed => "reserved-identifier-used",
            UnterminatedLiteral => "unterminated-literal",
            TrailingDelimiterDisallowed => "trailing-delimiter-disallowed",
            InvalidDecoratorLocation => "invalid-decorator-location",
            InvalidDirectiveLocation => "invalid-directive-location",
            FileNotFound => "file-not-found",
            LibraryNotFound => "library-not-found",
            InvalidImport => "invalid-import",
            CompilerVersionMismatch => "compiler-version-mismatch",
            DynamicImportInEval => "dynamic-import-in-eval",
            DuplicateSymbol => "duplicate-symbol",
            UnresolvedReference => "unresolved-reference",
            AmbiguousReference => "ambiguous-reference",
            RecursiveBase => "recursive-base",
            DefaultTypeMismatch => "default-type-mismatch",
            DefaultOnRequired => "default-on-required",
            DuplicateProperty => "duplicate-property",
            InvalidDecoratorTarget => "invalid-decorator-target",
            InvalidDecoratorArgumentType => "invalid-decorator-argument-type",
            CircularTemplateInstantiation => "circular-template-instantiation",
            DecoratorThrew => "decorator-threw",
            SuppressError => "suppress-error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    pub target: DiagnosticTarget,
    pub format_args: HashMap<String, String>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>, target: DiagnosticTarget) -> Self {
        Diagnostic {
            severity: code.default_severity(),
            code,
            message: message.into(),
            target,
            format_args: HashMap::new(),
        }
    }

    pub fn with_arg(mut self, key: &str, value: impl Into<String>) -> Self {
        self.format_args.insert(key.to_string(), value.into());
        self
    }
}

/// Every diagnostic funnels here. One sink per program.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    has_error: bool,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a diagnostic, consulting `is_suppressed` first. Errors are never
    /// suppressible: an attempt to suppress one instead emits the
    /// "cannot suppress error" meta-diagnostic alongside the original error.
    pub fn push(&mut self, diag: Diagnostic, suppressed_by: Option<&str>) {
        if diag.severity == Severity::Error {
            if let Some(code) = suppressed_by {
                let meta = Diagnostic::new(
                    DiagnosticCode::SuppressError,
                    format!("Errors cannot be suppressed (attempted to suppress '{code}')."),
                    diag.target.clone(),
                );
                self.diagnostics.push(meta);
            }
            self.has_error = true;
            self.diagnostics.push(diag);
            return;
        }
        if suppressed_by.is_some() {
            return;
        }
        self.diagnostics.push(diag);
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_and_column_tracks_mixed_newlines() {
        let f = SourceFile::new("a.cadl", "a\r\nb\nc");
        assert_eq!(f.line_and_column(0), (1, 0));
        assert_eq!(f.line_and_column(3), (2, 0)); // 'b'
        assert_eq!(f.line_and_column(5), (3, 0)); // 'c'
    }

    #[test]
    fn suppression_never_drops_errors() {
        let mut sink = DiagnosticSink::new();
        let diag = Diagnostic::new(
            DiagnosticCode::UnresolvedReference,
            "unresolved",
            DiagnosticTarget::no_target(),
        );
        sink.push(diag, Some("unresolved-reference"));
        assert!(sink.has_error());
        assert_eq!(sink.all().len(), 2);
    }

    #[test]
    fn suppression_drops_warnings() {
        let mut sink = DiagnosticSink::new();
        let diag = Diagnostic::new(
            DiagnosticCode::UnknownDirective,
            "unknown",
            DiagnosticTarget::no_target(),
        );
        sink.push(diag, Some("unknown-directive"));
        assert!(!sink.has_error());
        assert!(sink.all().is_empty());
    }
}
