use std::path::PathBuf;

use thiserror::Error;

use crate::options::ReleaseOptions;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// Two matrix rules expanded to the same key. Only reachable from a broken
    /// rule table, never from user input.
    #[error(
        "duplicate release matrix entry for {options}\n  hint: two matrix rules produce the same combination; fix the release table"
    )]
    DuplicateEntry { options: ReleaseOptions },

    #[error(
        "not a valid {} and {} combination for version {} with {} threads\n  hint: run 'mwi releases' to see the available combinations",
        .options.architecture,
        .options.exception_model,
        .options.version,
        .options.threading_model
    )]
    UnknownCombination { options: ReleaseOptions },

    #[error("invalid value '{value}' for {field}{}", allowed_hint(.allowed))]
    InvalidOption {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("invalid release matrix: {message}")]
    InvalidMatrix { message: String },

    #[error("network error: {message}\n  hint: check your internet connection or try another --mirror")]
    NetworkFailure { message: String },

    #[error("failed to extract '{}': {message}", .archive.display())]
    ExtractionFailed { archive: PathBuf, message: String },

    #[error("package error: {message}")]
    PackageFailure { message: String },

    #[error("toolchain '{key}' is not installed\n  hint: run 'mwi install' with the same options first")]
    NotInstalled { key: String },
}

fn allowed_hint(allowed: &[String]) -> String {
    if allowed.is_empty() {
        String::new()
    } else {
        format!(" (expected one of: {})", allowed.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Architecture, ExceptionModel, ThreadingModel};

    fn options() -> ReleaseOptions {
        ReleaseOptions::new(
            "6.3",
            Architecture::X86,
            ExceptionModel::Seh,
            ThreadingModel::Posix,
        )
    }

    #[test]
    fn unknown_combination_names_arch_and_exception() {
        let err = Error::UnknownCombination { options: options() };

        let msg = err.to_string();
        assert!(msg.contains("x86 and seh"));
        assert!(msg.contains("6.3"));
        assert!(msg.contains("posix"));
        assert!(msg.contains("hint:"));
    }

    #[test]
    fn duplicate_entry_display_includes_all_fields() {
        let err = Error::DuplicateEntry { options: options() };

        let msg = err.to_string();
        assert!(msg.contains("6.3"));
        assert!(msg.contains("x86"));
        assert!(msg.contains("seh"));
        assert!(msg.contains("posix"));
    }

    #[test]
    fn invalid_option_lists_allowed_values() {
        let err = Error::InvalidOption {
            field: "arch".to_string(),
            value: "arm".to_string(),
            allowed: vec!["x86".to_string(), "x86_64".to_string()],
        };

        let msg = err.to_string();
        assert!(msg.contains("'arm'"));
        assert!(msg.contains("x86, x86_64"));
    }

    #[test]
    fn invalid_option_without_choices_has_no_empty_list() {
        let err = Error::InvalidOption {
            field: "version".to_string(),
            value: String::new(),
            allowed: Vec::new(),
        };

        assert_eq!(err.to_string(), "invalid value '' for version");
    }

    #[test]
    fn extraction_failure_includes_archive_path() {
        let err = Error::ExtractionFailed {
            archive: PathBuf::from("/tmp/x86_64-6.3.0.7z"),
            message: "7z exited with status 2".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("x86_64-6.3.0.7z"));
        assert!(msg.contains("status 2"));
    }
}
