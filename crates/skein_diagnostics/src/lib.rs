//! skein_diagnostics: diagnostic messages and error reporting.
//!
//! Defines the diagnostic catalog of the skein compiler. Diagnostics
//! carry a stable numeric code, a category, and the source span they
//! originate from; the binder accumulates them in a
//! [`DiagnosticCollection`] and never aborts on the first error.

use skein_core::text::TextSpan;
use std::fmt;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    Warning,
    Error,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::Warning => write!(f, "warning"),
            DiagnosticCategory::Error => write!(f, "error"),
        }
    }
}

/// A diagnostic message template with a code and category.
#[derive(Debug, Clone)]
pub struct DiagnosticMessage {
    /// The diagnostic code (e.g., 2002, 2106).
    pub code: u32,
    /// The category of this diagnostic.
    pub category: DiagnosticCategory,
    /// The message template string. May contain `{0}`, `{1}`, etc.
    pub message: &'static str,
}

/// A realized diagnostic with location information and resolved text.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// The source file this diagnostic occurred in, if known.
    pub file: Option<String>,
    /// The source span this diagnostic points at, if known.
    pub span: Option<TextSpan>,
    /// The resolved message text.
    pub message_text: String,
    /// The diagnostic code.
    pub code: u32,
    /// The category.
    pub category: DiagnosticCategory,
}

impl Diagnostic {
    /// Create a new diagnostic without location info.
    pub fn new(message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self {
            file: None,
            span: None,
            message_text: format_message(message.message, args),
            code: message.code,
            category: message.category,
        }
    }

    /// Create a new diagnostic pointing at a source span.
    pub fn at(span: TextSpan, message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self {
            file: None,
            span: Some(span),
            message_text: format_message(message.message, args),
            code: message.code,
            category: message.category,
        }
    }

    /// Attach a file name.
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Whether this is an error diagnostic.
    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref file) = self.file {
            write!(f, "{}", file)?;
            if let Some(span) = self.span {
                write!(f, "({})", span.start)?;
            }
            write!(f, ": ")?;
        }
        write!(f, "{} SK{}: {}", self.category, self.code, self.message_text)
    }
}

/// Format a message template by replacing `{0}`, `{1}`, etc. with arguments.
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut result = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{}}}", i), arg);
    }
    result
}

/// A collection of diagnostics accumulated during compilation.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollection {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollection {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn extend(&mut self, other: DiagnosticCollection) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// Sort diagnostics by file and position.
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(|a, b| {
            let file_cmp = a.file.cmp(&b.file);
            if file_cmp != std::cmp::Ordering::Equal {
                return file_cmp;
            }
            let a_pos = a.span.map(|s| s.start).unwrap_or(0);
            let b_pos = b.span.map(|s| s.start).unwrap_or(0);
            a_pos.cmp(&b_pos)
        });
    }
}

// ============================================================================
// Diagnostic catalog
// ============================================================================

pub mod messages {
    use super::*;

    macro_rules! diag {
        ($code:expr, Error, $msg:expr) => {
            DiagnosticMessage { code: $code, category: DiagnosticCategory::Error, message: $msg }
        };
        ($code:expr, Warning, $msg:expr) => {
            DiagnosticMessage { code: $code, category: DiagnosticCategory::Warning, message: $msg }
        };
    }

    // ========================================================================
    // Name resolution (2000-2099)
    // ========================================================================
    pub const DUPLICATE_DECLARATION: DiagnosticMessage = diag!(2001, Error, "Duplicate declaration '{0}'.");
    pub const CANNOT_FIND_NAME: DiagnosticMessage = diag!(2002, Error, "Cannot find name '{0}'.");
    pub const NAME_IS_NOT_A_SCENE: DiagnosticMessage = diag!(2003, Error, "'{0}' is not a scene.");
    pub const NAME_IS_NOT_AN_OUTCOME: DiagnosticMessage = diag!(2004, Error, "'{0}' is not an outcome or spectrum.");
    pub const NAME_IS_NOT_A_RECORD: DiagnosticMessage = diag!(2005, Error, "'{0}' is not a record.");
    pub const NAME_IS_NOT_AN_INTERFACE: DiagnosticMessage = diag!(2006, Error, "'{0}' is not an interface.");
    pub const NAME_IS_NOT_A_REFERENCE: DiagnosticMessage = diag!(2007, Error, "'{0}' is not a reference.");
    pub const DUPLICATE_MEMBER: DiagnosticMessage = diag!(2008, Error, "'{0}' already declares a member named '{1}'.");
    pub const NAME_IS_NOT_AN_ENUM: DiagnosticMessage = diag!(2009, Error, "'{0}' is not an enum.");
    pub const SCENE_RUNS_ITSELF: DiagnosticMessage = diag!(2010, Error, "Scene '{0}' runs itself, directly or through the scenes it runs.");
    pub const NAME_IS_NOT_A_TYPE: DiagnosticMessage = diag!(2011, Error, "'{0}' cannot be used as a type; only records and enums can.");

    // ========================================================================
    // Outcome and branch consistency (2100-2199)
    // ========================================================================
    pub const DUPLICATE_OPTION: DiagnosticMessage = diag!(2101, Error, "Outcome '{0}' declares option '{1}' more than once.");
    pub const UNKNOWN_DEFAULT_OPTION: DiagnosticMessage = diag!(2102, Error, "Default option '{1}' is not declared by outcome '{0}'.");
    pub const ASSIGNED_OPTION_NOT_DECLARED: DiagnosticMessage = diag!(2103, Error, "Option '{1}' is not declared by outcome '{0}'.");
    pub const BRANCH_OPTION_NOT_DECLARED: DiagnosticMessage = diag!(2104, Error, "A branch names option '{1}', which outcome '{0}' does not declare.");
    pub const DUPLICATE_BRANCH_OPTION: DiagnosticMessage = diag!(2105, Error, "Option '{1}' of outcome '{0}' is handled by more than one branch.");
    pub const BRANCH_MISSING_OPTIONS: DiagnosticMessage = diag!(2106, Error, "A branch on outcome '{0}' does not cover {1} and has no 'other' branch.");
    pub const UNREACHABLE_OTHER_BRANCH: DiagnosticMessage = diag!(2107, Error, "The 'other' branch is unreachable: every option of outcome '{0}' is covered.");
    pub const DUPLICATE_OTHER_BRANCH: DiagnosticMessage = diag!(2108, Error, "A branch on an outcome can have at most one 'other' arm.");
    pub const OUTCOME_MAY_BE_UNASSIGNED: DiagnosticMessage = diag!(2109, Error, "Outcome '{0}' may be read before it is assigned and declares no default option.");
    pub const OUTCOME_HAS_NO_OPTIONS: DiagnosticMessage = diag!(2110, Error, "Outcome '{0}' declares no options.");

    // ========================================================================
    // Spectrum intervals (2200-2299)
    // ========================================================================
    pub const SPECTRUM_INTERVAL_EMPTY: DiagnosticMessage = diag!(2201, Error, "Interval '{1}' of spectrum '{0}' has zero width.");
    pub const SPECTRUM_MASS_BELOW_ONE: DiagnosticMessage = diag!(2202, Error, "The intervals of spectrum '{0}' cover {1} of the unit interval; they must cover exactly 1.");
    pub const SPECTRUM_MASS_ABOVE_ONE: DiagnosticMessage = diag!(2203, Error, "The intervals of spectrum '{0}' exceed the unit interval at option '{1}'.");
    pub const SPECTRUM_ZERO_DENOMINATOR: DiagnosticMessage = diag!(2204, Error, "Option '{1}' of spectrum '{0}' has a weight with denominator zero.");

    // ========================================================================
    // Record and interface typing (2300-2399)
    // ========================================================================
    pub const UNKNOWN_PROPERTY: DiagnosticMessage = diag!(2301, Error, "Record '{0}' has no property '{1}'.");
    pub const DUPLICATE_PROPERTY_ARGUMENT: DiagnosticMessage = diag!(2302, Error, "Property '{1}' of record '{0}' is given more than once.");
    pub const POSITIONAL_AFTER_NAMED: DiagnosticMessage = diag!(2303, Error, "A positional argument cannot follow a named argument.");
    pub const TOO_MANY_ARGUMENTS: DiagnosticMessage = diag!(2304, Error, "Record '{0}' has {1} properties, but {2} arguments were given.");
    pub const MISSING_ARGUMENT: DiagnosticMessage = diag!(2305, Error, "Argument for property '{1}' of record '{0}' is missing.");
    pub const ARGUMENT_TYPE_MISMATCH: DiagnosticMessage = diag!(2306, Error, "Property '{1}' of record '{0}' expects {2}, but {3} was given.");
    pub const UNKNOWN_METHOD: DiagnosticMessage = diag!(2307, Error, "Interface '{0}' has no method '{1}'.");
    pub const METHOD_ARGUMENT_COUNT: DiagnosticMessage = diag!(2308, Error, "Method '{1}' of interface '{0}' expects {2} argument(s), but got {3}.");
    pub const METHOD_ARGUMENT_TYPE: DiagnosticMessage = diag!(2309, Error, "Argument {2} of method '{1}' expects {3}, but {4} was given.");
    pub const CHOICE_METHOD_OUTSIDE_SWITCH: DiagnosticMessage = diag!(2310, Error, "Choice method '{0}' can only label a switch option.");
    pub const ACTION_METHOD_AS_LABEL: DiagnosticMessage = diag!(2311, Error, "Action method '{0}' cannot label a switch option.");
    pub const UNKNOWN_ENUM_MEMBER: DiagnosticMessage = diag!(2312, Error, "Enum '{0}' has no member '{1}'.");
    pub const INVOKE_AS_ARGUMENT: DiagnosticMessage = diag!(2313, Error, "A method invocation cannot be used as an argument value.");
}
