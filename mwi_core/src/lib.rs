pub mod env;
pub mod errors;
pub mod matrix;
pub mod options;
pub mod release;
pub mod url;

pub use env::ToolchainEnv;
pub use errors::Error;
pub use matrix::{MatrixFile, MatrixRule, OptionValues, ReleaseMatrix, builtin_rules, is_offered};
pub use options::{Architecture, ExceptionModel, ReleaseOptions, ThreadingModel, is_valid_version};
pub use release::ReleaseEntry;
pub use url::build_download_url;
