//! Output generation for finished runs.
//!
//! # Submodules
//!
//! - [`json`]: Writes accepted records, skip audits, and a run summary as JSON
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── cnn.json               # accepted records
//! ├── cnn_skipped.json       # skip audit
//! ├── foxnews.json
//! ├── foxnews_skipped.json
//! └── summary.json           # keyword, timings, per-source counts
//! ```

pub mod json;
