// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the people submitting documents.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives how the caller presents it.

use crate::error::DocVerifyError;

/// Severity of an error from the submitter's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Timeout or busy service; trying again may work.
    Transient,
    /// The submitter must do something (retake the photo, pick another file).
    ActionRequired,
    /// Needs an operator (models missing, bad configuration).
    Operator,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What to try next.
    pub suggestion: String,
    /// Whether an automatic retry makes sense.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `DocVerifyError` into a `HumanError`.
pub fn humanize_error(err: &DocVerifyError) -> HumanError {
    match err {
        DocVerifyError::Decode(_) => HumanError {
            message: "We couldn't open this image.".into(),
            suggestion: "The file may be damaged or in an unusual format. Try a JPEG or PNG photo of the document.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        DocVerifyError::EngineUnavailable(_) => HumanError {
            message: "Text recognition isn't set up on this machine.".into(),
            suggestion: "Ask the operator to install the OCR models, then try again.".into(),
            retriable: false,
            severity: Severity::Operator,
        },

        DocVerifyError::Recognition(_) => HumanError {
            message: "We couldn't read the text on this document.".into(),
            suggestion: "Retake the photo in good light, with the whole card flat and in focus.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        DocVerifyError::Preprocess(_) => HumanError {
            message: "We had trouble cleaning up this image.".into(),
            suggestion: "Try a sharper photo taken straight on, without glare.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        DocVerifyError::Fallback(detail) => {
            if detail.to_ascii_lowercase().contains("timed out") {
                HumanError {
                    message: "The assistant took too long to answer.".into(),
                    suggestion: "Results are based on pattern matching only. Try again later for a fuller check.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            } else {
                HumanError {
                    message: "The assistant couldn't help with this document.".into(),
                    suggestion: "Results are based on pattern matching only.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        DocVerifyError::Config(detail) => HumanError {
            message: "DocVerify is not configured correctly.".into(),
            suggestion: format!("Check the configuration file. ({detail})"),
            retriable: false,
            severity: Severity::Operator,
        },

        DocVerifyError::Lifecycle(_) => HumanError {
            message: "A recognition engine is shutting down.".into(),
            suggestion: "Try again in a moment.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        DocVerifyError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file couldn't be found.".into(),
                suggestion: "It may have been moved or deleted. Check the path and try again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "DocVerify doesn't have permission to read that file.".into(),
                suggestion: "Check the file permissions, or copy the file somewhere readable first.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        DocVerifyError::Serialization(_) => HumanError {
            message: "DocVerify had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_needs_user_action() {
        let human = humanize_error(&DocVerifyError::Decode("bad png".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn fallback_timeout_is_transient() {
        let err = DocVerifyError::Fallback("request timed out after 30s".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.message.contains("too long"));
    }

    #[test]
    fn missing_models_need_operator() {
        let err = DocVerifyError::EngineUnavailable("ocrs: model missing".into());
        assert_eq!(humanize_error(&err).severity, Severity::Operator);
    }

    #[test]
    fn missing_file_is_action_required() {
        let err = DocVerifyError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.message.contains("couldn't be found"));
    }
}
