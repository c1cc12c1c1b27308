//! Display utilities for progress output and formatting helpers.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use mwi_core::{ReleaseEntry, ReleaseOptions, ToolchainEnv};
use mwi_io::{InstallProgress, ProgressCallback};

/// Progress styles used while installing a toolchain.
pub struct ProgressStyles {
    pub spinner: ProgressStyle,
    pub done: ProgressStyle,
}

impl Default for ProgressStyles {
    fn default() -> Self {
        Self {
            spinner: ProgressStyle::default_spinner()
                .template("    {prefix:<24} {spinner:.cyan} {msg}")
                .map(|s| s.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            done: ProgressStyle::default_spinner()
                .template("    {prefix:<24} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        }
    }
}

/// Create a progress callback driving a single spinner for one install.
pub fn create_progress_callback(styles: ProgressStyles) -> (ProgressCallback, ProgressBar) {
    let pb = ProgressBar::new_spinner();
    pb.set_style(styles.spinner.clone());

    let bar = pb.clone();
    let spinner_style = styles.spinner;
    let done_style = styles.done;

    let callback: ProgressCallback = Box::new(move |event| match event {
        InstallProgress::Resolved { name, .. } => {
            bar.set_prefix(name);
            bar.set_message("resolved");
        }
        InstallProgress::DownloadStarted { .. } => {
            bar.set_style(spinner_style.clone());
            bar.set_message("downloading...");
            bar.enable_steady_tick(Duration::from_millis(80));
        }
        InstallProgress::DownloadCompleted {
            total_bytes,
            cached,
            ..
        } => {
            let source = if cached { "cached" } else { "downloaded" };
            bar.set_message(format!("{source} {}", format_bytes(total_bytes)));
        }
        InstallProgress::UnpackStarted { .. } => {
            bar.set_message("unpacking...");
        }
        InstallProgress::UnpackCompleted { .. } => {
            bar.set_message("staging...");
        }
        InstallProgress::InstallCompleted { .. } => {
            bar.set_style(done_style.clone());
            bar.finish_with_message(format!("{} installed", style("✓").green()));
        }
    });

    (callback, pb)
}

/// Format bytes into a human-readable string (e.g., "1.5 GB").
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Short human label, e.g. "gcc 6.3 (x86_64, seh, posix)".
pub fn format_options(options: &ReleaseOptions) -> String {
    format!(
        "gcc {} ({}, {}, {})",
        options.version, options.architecture, options.exception_model, options.threading_model
    )
}

/// One row of the `releases` table.
pub fn format_release_line(entry: &ReleaseEntry) -> String {
    let options = &entry.options;
    format!(
        "{:<8} {:<7} {:<7} {:<6} rt_v{}-rev{}",
        entry.display_version(),
        options.architecture.as_str(),
        options.exception_model.as_str(),
        options.threading_model.as_str(),
        entry.runtime_version,
        entry.build_revision
    )
}

/// Detect the current shell from environment.
pub fn detect_shell() -> &'static str {
    if let Ok(shell) = std::env::var("SHELL") {
        if shell.contains("fish") {
            return "fish";
        } else if shell.contains("csh") || shell.contains("tcsh") {
            return "csh";
        } else if shell.contains("zsh") {
            return "zsh";
        }
    }
    "bash"
}

/// Shell commands putting a toolchain's bin directory on PATH and pointing
/// CC and CXX at its compilers.
pub fn generate_toolchain_env(env: &ToolchainEnv, shell: &str) -> String {
    let bin = env.bin_dir.display();
    let mut lines = Vec::with_capacity(3);

    match shell {
        "fish" => {
            lines.push(format!("set -gx PATH \"{bin}\" $PATH;"));
            for (name, value) in env.vars() {
                lines.push(format!("set -gx {name} \"{}\";", value.display()));
            }
        }
        "csh" | "tcsh" => {
            lines.push(format!("setenv PATH \"{bin}:${{PATH}}\";"));
            for (name, value) in env.vars() {
                lines.push(format!("setenv {name} \"{}\";", value.display()));
            }
        }
        _ => {
            lines.push(format!("export PATH=\"{bin}:$PATH\";"));
            for (name, value) in env.vars() {
                lines.push(format!("export {name}=\"{}\";", value.display()));
            }
        }
    }

    lines.join("\n")
}

/// Print toolchain environment commands for `shell`, or the detected shell.
pub fn print_toolchain_env(env: &ToolchainEnv, shell: Option<&str>) {
    let shell = shell.unwrap_or_else(|| detect_shell());
    println!("{}", generate_toolchain_env(env, shell));
}

#[cfg(test)]
mod tests {
    use super::*;
    use mwi_core::{Architecture, ExceptionModel, ThreadingModel};
    use std::path::Path;

    fn env() -> ToolchainEnv {
        ToolchainEnv::for_package(Path::new("/opt/mwi/packages/6.3-x86_64-seh-posix"))
    }

    #[test]
    fn test_toolchain_env_bash() {
        let output = generate_toolchain_env(&env(), "bash");

        assert_eq!(
            output,
            "export PATH=\"/opt/mwi/packages/6.3-x86_64-seh-posix/bin:$PATH\";\n\
             export CC=\"/opt/mwi/packages/6.3-x86_64-seh-posix/bin/gcc.exe\";\n\
             export CXX=\"/opt/mwi/packages/6.3-x86_64-seh-posix/bin/g++.exe\";"
        );
    }

    #[test]
    fn test_toolchain_env_zsh_uses_posix_syntax() {
        let output = generate_toolchain_env(&env(), "zsh");
        assert!(output.starts_with("export PATH="));
        assert!(output.contains("export CC="));
    }

    #[test]
    fn test_toolchain_env_fish() {
        let output = generate_toolchain_env(&env(), "fish");

        assert!(output.contains(
            "set -gx PATH \"/opt/mwi/packages/6.3-x86_64-seh-posix/bin\" $PATH;"
        ));
        assert!(output.contains(
            "set -gx CC \"/opt/mwi/packages/6.3-x86_64-seh-posix/bin/gcc.exe\";"
        ));
        assert!(output.contains(
            "set -gx CXX \"/opt/mwi/packages/6.3-x86_64-seh-posix/bin/g++.exe\";"
        ));
    }

    #[test]
    fn test_toolchain_env_csh_and_tcsh() {
        for shell in ["csh", "tcsh"] {
            let output = generate_toolchain_env(&env(), shell);
            assert!(output.contains(
                "setenv PATH \"/opt/mwi/packages/6.3-x86_64-seh-posix/bin:${PATH}\";"
            ));
            assert!(output.contains("setenv CXX "));
        }
    }

    #[test]
    fn test_toolchain_env_unknown_shell_defaults_to_posix() {
        let output = generate_toolchain_env(&env(), "unknown");
        assert!(output.starts_with("export PATH="));
    }

    #[test]
    fn test_print_toolchain_env_with_detected_shell() {
        assert!(["bash", "zsh", "fish", "csh"].contains(&detect_shell()));

        print_toolchain_env(&env(), None);
        let explicit = String::from("fish");
        print_toolchain_env(&env(), Some(explicit.as_str()));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 bytes");
        assert_eq!(format_bytes(1023), "1023 bytes");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(45 * 1024 * 1024), "45.0 MB");
        assert_eq!(format_bytes(2 * 1024 * 1024 * 1024), "2.0 GB");
    }

    #[test]
    fn test_format_options() {
        let options = ReleaseOptions::new(
            "6.3",
            Architecture::X86,
            ExceptionModel::Dwarf2,
            ThreadingModel::Win32,
        );
        assert_eq!(format_options(&options), "gcc 6.3 (x86, dwarf2, win32)");
    }

    #[test]
    fn test_format_release_line() {
        let entry = ReleaseEntry::new(ReleaseOptions::default(), "2", "3", "1");
        let line = format_release_line(&entry);

        assert!(line.starts_with("4.9.2"));
        assert!(line.contains("x86_64"));
        assert!(line.contains("sjlj"));
        assert!(line.ends_with("rt_v3-rev1"));
    }

    #[test]
    fn test_callback_finishes_bar() {
        let (callback, pb) = create_progress_callback(ProgressStyles::default());
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());

        callback(InstallProgress::Resolved {
            name: "6.3-x86_64-seh-posix".to_string(),
            url: "http://example.com/a.7z".to_string(),
        });
        assert_eq!(pb.prefix(), "6.3-x86_64-seh-posix");

        callback(InstallProgress::InstallCompleted {
            name: "6.3-x86_64-seh-posix".to_string(),
        });
        assert!(pb.is_finished());
    }
}
