use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Target architecture of the toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "x86")]
    X86,
    #[serde(rename = "x86_64")]
    X86_64,
}

impl Architecture {
    pub const ALL: [Architecture; 2] = [Architecture::X86, Architecture::X86_64];

    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X86 => "x86",
            Architecture::X86_64 => "x86_64",
        }
    }
}

/// Stack-unwinding mechanism the toolchain was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionModel {
    Sjlj,
    Seh,
    Dwarf2,
}

impl ExceptionModel {
    pub const ALL: [ExceptionModel; 3] = [
        ExceptionModel::Sjlj,
        ExceptionModel::Seh,
        ExceptionModel::Dwarf2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionModel::Sjlj => "sjlj",
            ExceptionModel::Seh => "seh",
            ExceptionModel::Dwarf2 => "dwarf2",
        }
    }
}

/// Threading runtime the toolchain links against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadingModel {
    Posix,
    Win32,
}

impl ThreadingModel {
    pub const ALL: [ThreadingModel; 2] = [ThreadingModel::Posix, ThreadingModel::Win32];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadingModel::Posix => "posix",
            ThreadingModel::Win32 => "win32",
        }
    }
}

macro_rules! impl_option_str {
    ($ty:ty, $field:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty>::ALL
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| Error::InvalidOption {
                        field: $field.to_string(),
                        value: s.to_string(),
                        allowed: <$ty>::ALL.iter().map(|v| v.as_str().to_string()).collect(),
                    })
            }
        }
    };
}

impl_option_str!(Architecture, "arch");
impl_option_str!(ExceptionModel, "exception");
impl_option_str!(ThreadingModel, "threads");

/// A version is used verbatim in package directory names, so it may only hold
/// ASCII alphanumerics, `.`, `-` and `_`, and must not be `.` or `..`.
pub fn is_valid_version(version: &str) -> bool {
    !version.is_empty()
        && version != "."
        && version != ".."
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// The user-selectable part of a release: also the matrix lookup key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReleaseOptions {
    pub version: String,
    #[serde(rename = "arch")]
    pub architecture: Architecture,
    #[serde(rename = "exception")]
    pub exception_model: ExceptionModel,
    #[serde(rename = "threads")]
    pub threading_model: ThreadingModel,
}

impl ReleaseOptions {
    pub fn new(
        version: impl Into<String>,
        architecture: Architecture,
        exception_model: ExceptionModel,
        threading_model: ThreadingModel,
    ) -> Self {
        Self {
            version: version.into(),
            architecture,
            exception_model,
            threading_model,
        }
    }

    /// Parse options from their string form, as they arrive from the CLI or a
    /// settings file.
    pub fn parse(version: &str, arch: &str, exception: &str, threads: &str) -> Result<Self, Error> {
        if !is_valid_version(version.trim()) {
            return Err(Error::InvalidOption {
                field: "version".to_string(),
                value: version.to_string(),
                allowed: Vec::new(),
            });
        }

        Ok(Self::new(
            version.trim(),
            arch.parse()?,
            exception.parse()?,
            threads.parse()?,
        ))
    }

    /// Directory name used for an installed package of these options.
    pub fn package_key(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.version, self.architecture, self.exception_model, self.threading_model
        )
    }
}

impl Default for ReleaseOptions {
    fn default() -> Self {
        Self::new(
            "4.9",
            Architecture::X86_64,
            ExceptionModel::Sjlj,
            ThreadingModel::Posix,
        )
    }
}

impl fmt::Display for ReleaseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version={} arch={} exception={} threads={}",
            self.version, self.architecture, self.exception_model, self.threading_model
        )
    }
}
