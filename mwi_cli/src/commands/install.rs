//! Install command implementation.

use console::style;
use std::time::Instant;

use mwi_core::{Error, ReleaseOptions};
use mwi_io::{InstallResult, Installer};

use crate::display::{
    ProgressStyles, create_progress_callback, format_bytes, format_options, print_toolchain_env,
};

pub fn format_install_complete_message(result: &InstallResult, elapsed_secs: f64) -> String {
    if result.already_installed {
        format!(
            "{} is already installed",
            result.release.options.package_key()
        )
    } else if result.downloaded_bytes > 0 {
        format!(
            "Installed {} ({} downloaded) in {:.2}s",
            result.release.options.package_key(),
            format_bytes(result.downloaded_bytes),
            elapsed_secs
        )
    } else {
        format!(
            "Installed {} from cache in {:.2}s",
            result.release.options.package_key(),
            elapsed_secs
        )
    }
}

/// Run the install command.
pub async fn run(installer: &Installer, options: &ReleaseOptions) -> Result<(), Error> {
    let start = Instant::now();

    println!(
        "{} Installing {}...",
        style("==>").cyan().bold(),
        style(format_options(options)).bold()
    );

    let (callback, bar) = create_progress_callback(ProgressStyles::default());
    let result = installer.install(options, Some(&callback)).await;
    if !bar.is_finished() {
        bar.finish_and_clear();
    }

    let result = result?;
    println!(
        "{} {}",
        style("==>").cyan().bold(),
        format_install_complete_message(&result, start.elapsed().as_secs_f64())
    );
    println!("    {}", style(result.package_dir.display()).dim());
    println!();
    println!("    To use it in this shell:");
    print_toolchain_env(&result.env, None);

    Ok(())
}
