//! Commands over installed toolchains: list, uninstall, env and cleanup.

use console::style;
use serde::Serialize;
use std::path::Path;

use mwi_core::{Error, ReleaseOptions, ToolchainEnv};
use mwi_io::{CleanupResult, InstalledPackage, Installer};

use crate::display::{format_bytes, format_options, print_toolchain_env};

#[derive(Serialize)]
struct ListedPackage<'a> {
    key: &'a str,
    path: &'a Path,
    version: String,
    url: &'a str,
    env: ToolchainEnv,
}

impl<'a> From<&'a InstalledPackage> for ListedPackage<'a> {
    fn from(package: &'a InstalledPackage) -> Self {
        Self {
            key: &package.key,
            path: &package.path,
            version: package.receipt.release.display_version(),
            url: &package.receipt.url,
            env: ToolchainEnv::for_package(&package.path),
        }
    }
}

pub fn format_list_entry(package: &InstalledPackage) -> String {
    format!(
        "{} {}",
        package.key,
        package.receipt.release.display_version()
    )
}

pub fn format_cleanup_summary(result: &CleanupResult, dry_run: bool) -> String {
    if result.archives_removed.is_empty() && result.temp_files_removed == 0 {
        return "Nothing to clean up.".to_string();
    }

    let verb = if dry_run { "Would remove" } else { "Removed" };
    let mut msg = format!(
        "{verb} {} archive{}",
        result.archives_removed.len(),
        if result.archives_removed.len() == 1 { "" } else { "s" }
    );
    if result.temp_files_removed > 0 {
        msg.push_str(&format!(
            " and {} partial download{}",
            result.temp_files_removed,
            if result.temp_files_removed == 1 { "" } else { "s" }
        ));
    }
    msg.push_str(&format!(", freeing {}", format_bytes(result.bytes_freed)));
    msg
}

/// Run the list command.
pub fn run_list(installer: &Installer, json: bool) -> Result<(), Error> {
    let installed = installer.list_installed()?;

    if json {
        let listed: Vec<ListedPackage<'_>> = installed.iter().map(ListedPackage::from).collect();
        let json = serde_json::to_string_pretty(&listed).map_err(|e| Error::PackageFailure {
            message: format!("failed to encode JSON: {e}"),
        })?;
        println!("{json}");
        return Ok(());
    }

    if installed.is_empty() {
        println!("No toolchains installed.");
        return Ok(());
    }

    for package in &installed {
        println!("{}", format_list_entry(package));
    }
    Ok(())
}

/// Run the uninstall command.
pub fn run_uninstall(installer: &Installer, options: &ReleaseOptions) -> Result<(), Error> {
    println!(
        "{} Uninstalling {}...",
        style("==>").cyan().bold(),
        style(format_options(options)).bold()
    );
    installer.uninstall(options)?;
    println!(
        "{} Removed {}",
        style("==>").cyan().bold(),
        options.package_key()
    );
    Ok(())
}

/// Run the env command.
pub fn run_env(
    installer: &Installer,
    options: &ReleaseOptions,
    shell: Option<&str>,
) -> Result<(), Error> {
    let env = installer.env_for(options)?;
    print_toolchain_env(&env, shell);
    Ok(())
}

/// Run the cleanup command.
pub fn run_cleanup(installer: &Installer, dry_run: bool) -> Result<(), Error> {
    let result = installer.cleanup(dry_run)?;

    for name in &result.archives_removed {
        println!("    {}", style(name).dim());
    }
    println!(
        "{} {}",
        style("==>").cyan().bold(),
        format_cleanup_summary(&result, dry_run)
    );
    Ok(())
}
