//! On-disk layout of a validation log.
//!
//! The header is written once, when the file is first created, and never
//! rewritten. Readers locate columns by header name so that logs written
//! with a different column order still load.

/// Directory under the data dir that holds the logs.
pub const VALIDATIONS_DIR: &str = "validations";

pub const FID: &str = "FID";
pub const VARIANT: &str = "Variant";
pub const SAMPLE: &str = "Sample";
pub const USER: &str = "User";
pub const INHERITANCE: &str = "Inheritance";
pub const VALIDATION: &str = "Validation";
pub const CURATED_START: &str = "CuratedStart";
pub const CURATED_END: &str = "CuratedEnd";
pub const COMMENT: &str = "Comment";
pub const IGNORE: &str = "Ignore";
pub const TIMESTAMP: &str = "Timestamp";

/// Column order for newly created files.
pub const COLUMNS: [&str; 11] = [
  FID,
  VARIANT,
  SAMPLE,
  USER,
  INHERITANCE,
  VALIDATION,
  CURATED_START,
  CURATED_END,
  COMMENT,
  IGNORE,
  TIMESTAMP,
];
