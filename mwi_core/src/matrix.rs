//! The release matrix: every known (version, arch, exception, threads)
//! combination and the archive metadata that goes with it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::Error;
use crate::options::{
    Architecture, ExceptionModel, ReleaseOptions, ThreadingModel, is_valid_version,
};
use crate::release::ReleaseEntry;

/// Upstream does not publish SEH builds for 32-bit or DWARF2 builds for 64-bit.
pub fn is_offered(arch: Architecture, exception: ExceptionModel) -> bool {
    !matches!(
        (arch, exception),
        (Architecture::X86, ExceptionModel::Seh) | (Architecture::X86_64, ExceptionModel::Dwarf2)
    )
}

/// One line of the release table. Expands to the cross product of its
/// architectures, exception models and threading models, minus the
/// combinations upstream does not offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixRule {
    pub version: String,
    pub architectures: Vec<Architecture>,
    pub exception_models: Vec<ExceptionModel>,
    pub threading_models: Vec<ThreadingModel>,
    #[serde(default)]
    pub sub_version: String,
    pub runtime_version: String,
    pub build_revision: String,
}

impl MatrixRule {
    /// A rule covering every architecture, exception model and threading model.
    pub fn all_variants(
        version: &str,
        sub_version: &str,
        runtime_version: &str,
        build_revision: &str,
    ) -> Self {
        Self {
            version: version.to_string(),
            architectures: Architecture::ALL.to_vec(),
            exception_models: ExceptionModel::ALL.to_vec(),
            threading_models: ThreadingModel::ALL.to_vec(),
            sub_version: sub_version.to_string(),
            runtime_version: runtime_version.to_string(),
            build_revision: build_revision.to_string(),
        }
    }

    pub fn expand(&self) -> impl Iterator<Item = ReleaseEntry> + '_ {
        self.architectures.iter().flat_map(move |&arch| {
            self.exception_models
                .iter()
                .filter(move |&&exception| is_offered(arch, exception))
                .flat_map(move |&exception| {
                    self.threading_models.iter().map(move |&threads| {
                        ReleaseEntry::new(
                            ReleaseOptions::new(self.version.clone(), arch, exception, threads),
                            self.sub_version.clone(),
                            self.runtime_version.clone(),
                            self.build_revision.clone(),
                        )
                    })
                })
        })
    }
}

/// The release table shipped with the crate.
pub fn builtin_rules() -> Vec<MatrixRule> {
    vec![
        MatrixRule::all_variants("4.8", "2", "3", "0"),
        MatrixRule::all_variants("4.9", "2", "3", "1"),
        MatrixRule::all_variants("5.4", "0", "5", "0"),
        MatrixRule::all_variants("6.2", "0", "5", "1"),
        MatrixRule::all_variants("6.3", "0", "5", "1"),
    ]
}

/// On-disk form of a release table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixFile {
    pub releases: Vec<MatrixRule>,
}

/// Every value seen for each option field.
///
/// Membership of each field does not make an arbitrary combination valid;
/// only [`ReleaseMatrix::resolve`] decides that.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptionValues {
    #[serde(rename = "version")]
    pub versions: BTreeSet<String>,
    #[serde(rename = "arch")]
    pub architectures: BTreeSet<Architecture>,
    #[serde(rename = "exception")]
    pub exception_models: BTreeSet<ExceptionModel>,
    #[serde(rename = "threads")]
    pub threading_models: BTreeSet<ThreadingModel>,
}

impl OptionValues {
    fn record(&mut self, options: &ReleaseOptions) {
        self.versions.insert(options.version.clone());
        self.architectures.insert(options.architecture);
        self.exception_models.insert(options.exception_model);
        self.threading_models.insert(options.threading_model);
    }
}

/// Built once, then only read. Share it behind an `Arc` instead of rebuilding.
#[derive(Debug, Clone, Default)]
pub struct ReleaseMatrix {
    entries: HashMap<ReleaseOptions, ReleaseEntry>,
    values: OptionValues,
}

impl ReleaseMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Result<Self, Error> {
        Self::from_rules(&builtin_rules())
    }

    pub fn from_rules(rules: &[MatrixRule]) -> Result<Self, Error> {
        let mut matrix = Self::new();
        for rule in rules {
            matrix.expand_rule(rule)?;
        }
        Ok(matrix)
    }

    /// Build a matrix from a JSON release table (see [`MatrixFile`]).
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let file: MatrixFile = serde_json::from_str(json).map_err(|e| Error::InvalidMatrix {
            message: e.to_string(),
        })?;

        let matrix = Self::from_rules(&file.releases)?;
        if matrix.is_empty() {
            return Err(Error::InvalidMatrix {
                message: "release table expands to no releases".to_string(),
            });
        }
        Ok(matrix)
    }

    pub fn expand_rule(&mut self, rule: &MatrixRule) -> Result<(), Error> {
        if !is_valid_version(&rule.version) {
            return Err(Error::InvalidMatrix {
                message: format!("invalid version '{}' in release table", rule.version),
            });
        }

        for entry in rule.expand() {
            self.insert(entry)?;
        }
        Ok(())
    }

    pub fn insert(&mut self, entry: ReleaseEntry) -> Result<(), Error> {
        if self.entries.contains_key(&entry.options) {
            return Err(Error::DuplicateEntry {
                options: entry.options,
            });
        }

        self.values.record(&entry.options);
        self.entries.insert(entry.options.clone(), entry);
        Ok(())
    }

    pub fn resolve(&self, options: &ReleaseOptions) -> Result<&ReleaseEntry, Error> {
        self.entries
            .get(options)
            .ok_or_else(|| Error::UnknownCombination {
                options: options.clone(),
            })
    }

    pub fn contains(&self, options: &ReleaseOptions) -> bool {
        self.entries.contains_key(options)
    }

    pub fn available_option_values(&self) -> &OptionValues {
        &self.values
    }

    /// Resolve `options` and build the archive URL in one step.
    pub fn download_url(&self, options: &ReleaseOptions) -> Result<String, Error> {
        self.resolve(options).map(ReleaseEntry::download_url)
    }

    /// All entries, ordered by their options.
    pub fn entries(&self) -> Vec<&ReleaseEntry> {
        let mut entries: Vec<&ReleaseEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.options.cmp(&b.options));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn builtin() -> ReleaseMatrix {
        ReleaseMatrix::builtin().unwrap()
    }

    #[test]
    fn builtin_matrix_has_eight_entries_per_version() {
        let matrix = builtin();
        assert_eq!(matrix.len(), 40);

        for version in ["4.8", "4.9", "5.4", "6.2", "6.3"] {
            let count = matrix
                .entries()
                .iter()
                .filter(|e| e.options.version == version)
                .count();
            assert_eq!(count, 8, "version {version}");
        }
    }

    #[test]
    fn builtin_matrix_never_offers_excluded_combinations() {
        for entry in builtin().entries() {
            let o = &entry.options;
            assert!(
                !(o.architecture == Architecture::X86 && o.exception_model == ExceptionModel::Seh),
                "unexpected {o}"
            );
            assert!(
                !(o.architecture == Architecture::X86_64
                    && o.exception_model == ExceptionModel::Dwarf2),
                "unexpected {o}"
            );
        }
    }

    #[test]
    fn resolve_rejects_32_bit_seh() {
        let matrix = builtin();
        let options = ReleaseOptions::new(
            "6.3",
            Architecture::X86,
            ExceptionModel::Seh,
            ThreadingModel::Posix,
        );

        let err = matrix.resolve(&options).unwrap_err();
        assert_eq!(err, Error::UnknownCombination { options });
    }

    #[test]
    fn resolve_rejects_64_bit_dwarf2() {
        let matrix = builtin();
        let options = ReleaseOptions::new(
            "4.9",
            Architecture::X86_64,
            ExceptionModel::Dwarf2,
            ThreadingModel::Win32,
        );

        assert!(matches!(
            matrix.resolve(&options),
            Err(Error::UnknownCombination { .. })
        ));
    }

    #[test]
    fn resolve_rejects_unknown_version() {
        let options = ReleaseOptions::new(
            "9.9",
            Architecture::X86_64,
            ExceptionModel::Seh,
            ThreadingModel::Posix,
        );
        assert!(builtin().resolve(&options).is_err());
    }

    #[test]
    fn resolve_returns_rule_metadata() {
        let matrix = builtin();
        let entry = matrix
            .resolve(&ReleaseOptions::parse("4.8", "x86", "dwarf2", "win32").unwrap())
            .unwrap();

        assert_eq!(entry.sub_version, "2");
        assert_eq!(entry.runtime_version, "3");
        assert_eq!(entry.build_revision, "0");
    }

    #[test]
    fn download_url_for_builtin_6_3() {
        let matrix = builtin();
        let options = ReleaseOptions::parse("6.3", "x86_64", "sjlj", "posix").unwrap();

        assert_eq!(
            matrix.download_url(&options).unwrap(),
            "http://downloads.sourceforge.net/project/mingw-w64/Toolchains%20targetting%20Win64/Personal%20Builds/mingw-builds/6.3.0/threads-posix/sjlj/x86_64-6.3.0-release-posix-sjlj-rt_v5-rev1.7z"
        );
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut matrix = ReleaseMatrix::new();
        let options = ReleaseOptions::default();
        matrix
            .insert(ReleaseEntry::new(options.clone(), "2", "3", "1"))
            .unwrap();

        // Metadata differs, key does not
        let err = matrix
            .insert(ReleaseEntry::new(options.clone(), "3", "4", "2"))
            .unwrap_err();
        assert_eq!(err, Error::DuplicateEntry { options });
        assert_eq!(matrix.len(), 1);
    }

    #[test]
    fn overlapping_rules_fail_construction() {
        let rules = vec![
            MatrixRule::all_variants("6.3", "0", "5", "1"),
            MatrixRule {
                version: "6.3".to_string(),
                architectures: vec![Architecture::X86],
                exception_models: vec![ExceptionModel::Sjlj],
                threading_models: vec![ThreadingModel::Win32],
                sub_version: "1".to_string(),
                runtime_version: "5".to_string(),
                build_revision: "2".to_string(),
            },
        ];

        assert!(matches!(
            ReleaseMatrix::from_rules(&rules),
            Err(Error::DuplicateEntry { .. })
        ));
    }

    #[test]
    fn available_values_cover_every_field() {
        let matrix = builtin();
        let values = matrix.available_option_values();

        assert_eq!(
            values.versions.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["4.8", "4.9", "5.4", "6.2", "6.3"]
        );
        assert_eq!(values.architectures.len(), 2);
        assert_eq!(values.exception_models.len(), 3);
        assert_eq!(values.threading_models.len(), 2);
    }

    #[test]
    fn available_values_only_reflect_inserted_entries() {
        let rule = MatrixRule {
            version: "7.1".to_string(),
            architectures: vec![Architecture::X86_64],
            exception_models: vec![ExceptionModel::Seh, ExceptionModel::Dwarf2],
            threading_models: vec![ThreadingModel::Posix],
            sub_version: String::new(),
            runtime_version: "5".to_string(),
            build_revision: "0".to_string(),
        };
        let matrix = ReleaseMatrix::from_rules(&[rule]).unwrap();
        let values = matrix.available_option_values();

        assert_eq!(matrix.len(), 1);
        // dwarf2 was filtered out for x86_64, so it is not a known value
        assert_eq!(
            values.exception_models,
            BTreeSet::from([ExceptionModel::Seh])
        );
    }

    #[test]
    fn per_field_values_do_not_imply_valid_combinations() {
        let matrix = builtin();
        let values = matrix.available_option_values();

        assert!(values.architectures.contains(&Architecture::X86));
        assert!(values.exception_models.contains(&ExceptionModel::Seh));
        assert!(!matrix.contains(&ReleaseOptions::new(
            "6.3",
            Architecture::X86,
            ExceptionModel::Seh,
            ThreadingModel::Posix
        )));
    }

    #[test]
    fn option_values_serialize_with_field_names() {
        let json = serde_json::to_value(builtin().available_option_values()).unwrap();
        assert_eq!(json["arch"], serde_json::json!(["x86", "x86_64"]));
        assert_eq!(json["exception"], serde_json::json!(["sjlj", "seh", "dwarf2"]));
        assert_eq!(json["threads"], serde_json::json!(["posix", "win32"]));
        assert_eq!(json["version"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn from_json_reads_release_table() {
        let json = r#"{
            "releases": [
                {
                    "version": "8.1",
                    "architectures": ["x86", "x86_64"],
                    "exception_models": ["seh", "dwarf2"],
                    "threading_models": ["posix"],
                    "sub_version": "0",
                    "runtime_version": "6",
                    "build_revision": "0"
                }
            ]
        }"#;

        let matrix = ReleaseMatrix::from_json(json).unwrap();
        // x86+dwarf2 and x86_64+seh survive the exclusion rule
        assert_eq!(matrix.len(), 2);
        let entry = matrix
            .resolve(&ReleaseOptions::parse("8.1", "x86", "dwarf2", "posix").unwrap())
            .unwrap();
        assert_eq!(entry.runtime_version, "6");
    }

    #[test]
    fn from_json_rejects_malformed_input() {
        assert!(matches!(
            ReleaseMatrix::from_json("{ not json"),
            Err(Error::InvalidMatrix { .. })
        ));
        assert!(matches!(
            ReleaseMatrix::from_json(r#"{ "releases": [] }"#),
            Err(Error::InvalidMatrix { .. })
        ));
    }

    fn rule_json(version: &str, architectures: &str) -> String {
        format!(
            r#"{{ "releases": [ {{
                "version": {version:?},
                "architectures": {architectures},
                "exception_models": ["sjlj"],
                "threading_models": ["posix"],
                "runtime_version": "6",
                "build_revision": "0"
            }} ] }}"#
        )
    }

    #[test]
    fn from_json_rejects_unusable_versions() {
        for version in ["", " 6.3", "../../victim", "6.3/x", "a\\b"] {
            assert!(
                matches!(
                    ReleaseMatrix::from_json(&rule_json(version, r#"["x86_64"]"#)),
                    Err(Error::InvalidMatrix { .. })
                ),
                "{version:?} was accepted"
            );
        }
        assert_eq!(
            ReleaseMatrix::from_json(&rule_json("8.1", r#"["x86_64"]"#))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn from_json_rejects_rules_that_expand_to_nothing() {
        assert!(matches!(
            ReleaseMatrix::from_json(&rule_json("8.1", "[]")),
            Err(Error::InvalidMatrix { .. })
        ));
    }

    #[test]
    fn from_json_rejects_unknown_option_values() {
        let json = r#"{
            "releases": [
                {
                    "version": "8.1",
                    "architectures": ["arm64"],
                    "exception_models": ["seh"],
                    "threading_models": ["posix"],
                    "runtime_version": "6",
                    "build_revision": "0"
                }
            ]
        }"#;
        assert!(matches!(
            ReleaseMatrix::from_json(json),
            Err(Error::InvalidMatrix { .. })
        ));
    }

    #[test]
    fn builtin_rules_serialize_as_matrix_file() {
        let file = MatrixFile {
            releases: builtin_rules(),
        };
        let json = serde_json::to_string(&file).unwrap();
        let matrix = ReleaseMatrix::from_json(&json).unwrap();
        assert_eq!(matrix.len(), builtin().len());
    }

    fn rule_strategy() -> impl Strategy<Value = Vec<MatrixRule>> {
        let arch = proptest::sample::subsequence(Architecture::ALL.to_vec(), 0..=2);
        let exception = proptest::sample::subsequence(ExceptionModel::ALL.to_vec(), 0..=3);
        let threads = proptest::sample::subsequence(ThreadingModel::ALL.to_vec(), 0..=2);
        let rule = (arch, exception, threads, "[0-9]?", "[0-9]", "[0-9]");

        proptest::collection::vec(rule, 0..6).prop_map(|rules| {
            rules
                .into_iter()
                .enumerate()
                .map(|(i, (architectures, exception_models, threading_models, sub, rt, rev))| {
                    MatrixRule {
                        version: format!("{}.{}", 4 + i, i),
                        architectures,
                        exception_models,
                        threading_models,
                        sub_version: sub,
                        runtime_version: rt,
                        build_revision: rev,
                    }
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn generated_matrices_hold_invariants(rules in rule_strategy()) {
            let matrix = ReleaseMatrix::from_rules(&rules).unwrap();

            let mut keys = HashSet::new();
            for entry in matrix.entries() {
                let o = &entry.options;
                prop_assert!(is_offered(o.architecture, o.exception_model));
                prop_assert!(keys.insert(o.clone()));
                prop_assert_eq!(matrix.resolve(o).unwrap(), entry);
            }

            let expected: usize = rules.iter().map(|r| r.expand().count()).sum();
            prop_assert_eq!(matrix.len(), expected);
        }

        #[test]
        fn every_expanded_entry_resolves_to_itself(rules in rule_strategy()) {
            let matrix = ReleaseMatrix::from_rules(&rules).unwrap();
            for rule in &rules {
                for entry in rule.expand() {
                    prop_assert_eq!(matrix.resolve(&entry.options).unwrap(), &entry);
                }
            }
        }
    }
}
