//! Matrix queries: options, releases, resolve and url.
//!
//! None of these touch the network or the install root.

use console::style;
use serde::Serialize;

use mwi_core::{Error, OptionValues, ReleaseEntry, ReleaseMatrix, ReleaseOptions};

use crate::display::{format_options, format_release_line};

#[derive(Serialize)]
struct ResolvedRelease<'a> {
    #[serde(flatten)]
    release: &'a ReleaseEntry,
    key: String,
    url: String,
    archive: String,
}

impl<'a> ResolvedRelease<'a> {
    fn new(release: &'a ReleaseEntry) -> Self {
        Self {
            key: release.options.package_key(),
            url: release.download_url(),
            archive: release.archive_file_name(),
            release,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(value).map_err(|e| Error::PackageFailure {
        message: format!("failed to encode JSON: {e}"),
    })?;
    println!("{json}");
    Ok(())
}

fn join_values<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Plain-text lines for the option values, one option per line.
pub fn format_option_values(values: &OptionValues) -> Vec<String> {
    vec![
        format!("gcc-version: {}", join_values(&values.versions)),
        format!("arch:        {}", join_values(&values.architectures)),
        format!("exception:   {}", join_values(&values.exception_models)),
        format!("threads:     {}", join_values(&values.threading_models)),
    ]
}

/// Releases of `version`, or all of them, in matrix order.
pub fn filter_releases<'a>(
    matrix: &'a ReleaseMatrix,
    version: Option<&str>,
) -> Vec<&'a ReleaseEntry> {
    matrix
        .entries()
        .into_iter()
        .filter(|e| version.is_none_or(|v| e.options.version == v))
        .collect()
}

/// Run the options command.
pub fn run_options(matrix: &ReleaseMatrix, json: bool) -> Result<(), Error> {
    let values = matrix.available_option_values();
    if json {
        return print_json(values);
    }

    for line in format_option_values(values) {
        println!("{line}");
    }
    println!();
    println!(
        "{} not every combination exists; check one with 'mwi resolve'",
        style("Note:").yellow().bold()
    );
    Ok(())
}

/// Run the releases command.
pub fn run_releases(
    matrix: &ReleaseMatrix,
    version: Option<&str>,
    json: bool,
) -> Result<(), Error> {
    let releases = filter_releases(matrix, version);

    if json {
        let resolved: Vec<_> = releases.into_iter().map(ResolvedRelease::new).collect();
        return print_json(&resolved);
    }

    if releases.is_empty() {
        println!("No releases found.");
        return Ok(());
    }

    println!(
        "{}",
        style(format!(
            "{:<8} {:<7} {:<7} {:<6} {}",
            "version", "arch", "except", "thread", "build"
        ))
        .dim()
    );
    for release in releases {
        println!("{}", format_release_line(release));
    }
    Ok(())
}

/// Run the resolve command.
pub fn run_resolve(
    matrix: &ReleaseMatrix,
    options: &ReleaseOptions,
    json: bool,
) -> Result<(), Error> {
    let release = matrix.resolve(options)?;
    let resolved = ResolvedRelease::new(release);

    if json {
        return print_json(&resolved);
    }

    println!(
        "{} {}",
        style("==>").cyan().bold(),
        style(format_options(options)).bold()
    );
    println!("    release: {}", release.display_version());
    println!("    runtime: v{}", release.runtime_version);
    println!("    build:   rev{}", release.build_revision);
    println!("    package: {}", resolved.key);
    println!("    url:     {}", resolved.url);
    Ok(())
}

/// Run the url command.
pub fn run_url(matrix: &ReleaseMatrix, options: &ReleaseOptions) -> Result<(), Error> {
    println!("{}", matrix.download_url(options)?);
    Ok(())
}
