//! Download locations of mingw-builds archives on SourceForge.
//!
//! The layout mirrors the upstream hosting tree, so every token here has to
//! match it exactly.

use crate::options::{Architecture, ExceptionModel};
use crate::release::ReleaseEntry;

pub const DOWNLOAD_SCHEME: &str = "http://";
pub const DOWNLOAD_HOST: &str = "downloads.sourceforge.net";
const PROJECT_PATH: &str = "project/mingw-w64";

fn arch_token(arch: Architecture) -> &'static str {
    match arch {
        Architecture::X86 => "i686",
        Architecture::X86_64 => "x86_64",
    }
}

fn path_arch_label(arch: Architecture) -> &'static str {
    match arch {
        Architecture::X86_64 => "Win64",
        Architecture::X86 => "Win32",
    }
}

fn exception_token(exception: ExceptionModel) -> &'static str {
    match exception {
        ExceptionModel::Dwarf2 => "dwarf",
        other => other.as_str(),
    }
}

/// Unencoded name of the archive file for `entry`.
pub fn archive_file_name(entry: &ReleaseEntry) -> String {
    let options = &entry.options;
    format!(
        "{}-{}-release-{}-{}-rt_v{}-rev{}.7z",
        arch_token(options.architecture),
        entry.display_version(),
        options.threading_model,
        exception_token(options.exception_model),
        entry.runtime_version,
        entry.build_revision
    )
}

fn archive_dir(entry: &ReleaseEntry) -> String {
    let options = &entry.options;
    format!(
        "Toolchains targetting {}/Personal Builds/mingw-builds/{}/threads-{}/{}",
        path_arch_label(options.architecture),
        entry.display_version(),
        options.threading_model,
        exception_token(options.exception_model)
    )
}

/// Percent-encode `path`, leaving `/` separators intact.
fn quote_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn build_download_url(entry: &ReleaseEntry) -> String {
    let path = format!(
        "{DOWNLOAD_HOST}/{PROJECT_PATH}/{}/{}",
        archive_dir(entry),
        archive_file_name(entry)
    );
    format!("{DOWNLOAD_SCHEME}{}", quote_path(&path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ReleaseOptions, ThreadingModel};

    fn entry(
        version: &str,
        arch: Architecture,
        exception: ExceptionModel,
        threads: ThreadingModel,
        sub_version: &str,
        rt: &str,
        rev: &str,
    ) -> ReleaseEntry {
        ReleaseEntry::new(
            ReleaseOptions::new(version, arch, exception, threads),
            sub_version,
            rt,
            rev,
        )
    }

    #[test]
    fn builds_x86_64_sjlj_url() {
        let e = entry(
            "6.3",
            Architecture::X86_64,
            ExceptionModel::Sjlj,
            ThreadingModel::Posix,
            "0",
            "5",
            "1",
        );

        assert_eq!(
            build_download_url(&e),
            "http://downloads.sourceforge.net/project/mingw-w64/Toolchains%20targetting%20Win64/Personal%20Builds/mingw-builds/6.3.0/threads-posix/sjlj/x86_64-6.3.0-release-posix-sjlj-rt_v5-rev1.7z"
        );
    }

    #[test]
    fn x86_uses_i686_token_and_win32_label() {
        let e = entry(
            "4.9",
            Architecture::X86,
            ExceptionModel::Sjlj,
            ThreadingModel::Win32,
            "2",
            "3",
            "1",
        );

        let url = build_download_url(&e);
        assert!(url.contains("/Toolchains%20targetting%20Win32/"));
        assert!(url.ends_with("/i686-4.9.2-release-win32-sjlj-rt_v3-rev1.7z"));
        assert!(!url.contains("x86-"));
    }

    #[test]
    fn dwarf2_is_written_as_dwarf() {
        let e = entry(
            "5.4",
            Architecture::X86,
            ExceptionModel::Dwarf2,
            ThreadingModel::Posix,
            "0",
            "5",
            "0",
        );

        let url = build_download_url(&e);
        assert!(url.contains("/threads-posix/dwarf/"));
        assert!(url.ends_with("-release-posix-dwarf-rt_v5-rev0.7z"));
        assert!(!url.contains("dwarf2"));
    }

    #[test]
    fn seh_token_is_verbatim() {
        let e = entry(
            "6.2",
            Architecture::X86_64,
            ExceptionModel::Seh,
            ThreadingModel::Win32,
            "0",
            "5",
            "1",
        );

        assert!(
            build_download_url(&e)
                .ends_with("/threads-win32/seh/x86_64-6.2.0-release-win32-seh-rt_v5-rev1.7z")
        );
    }

    #[test]
    fn empty_sub_version_has_no_trailing_dot() {
        let e = entry(
            "7.1",
            Architecture::X86_64,
            ExceptionModel::Seh,
            ThreadingModel::Posix,
            "",
            "5",
            "0",
        );

        let url = build_download_url(&e);
        assert!(url.contains("/mingw-builds/7.1/threads-posix/"));
        assert!(url.ends_with("/x86_64-7.1-release-posix-seh-rt_v5-rev0.7z"));
    }

    #[test]
    fn only_spaces_are_escaped() {
        let e = entry(
            "6.3",
            Architecture::X86,
            ExceptionModel::Dwarf2,
            ThreadingModel::Win32,
            "0",
            "5",
            "1",
        );

        let url = build_download_url(&e);
        let unescaped = url.replace("%20", " ");
        assert!(!unescaped.contains('%'));
        assert!(!url.contains(' '));
        assert!(url.starts_with("http://downloads.sourceforge.net/project/mingw-w64/"));
    }

    #[test]
    fn quote_path_keeps_slashes() {
        assert_eq!(quote_path("a b/c d/e"), "a%20b/c%20d/e");
        assert_eq!(quote_path("x86_64-6.3.0~1"), "x86_64-6.3.0~1");
    }

    #[test]
    fn archive_file_name_is_unencoded_file_segment() {
        let e = entry(
            "6.3",
            Architecture::X86_64,
            ExceptionModel::Sjlj,
            ThreadingModel::Posix,
            "0",
            "5",
            "1",
        );
        assert_eq!(
            archive_file_name(&e),
            "x86_64-6.3.0-release-posix-sjlj-rt_v5-rev1.7z"
        );
    }
}
