//! Output formatting module
//!
//! Provides the two output formats:
//! - Rich terminal output with colors and tables
//! - JSON export

pub mod json;
pub mod tables;
pub mod terminal;

pub use json::{print_json, write_json_file};
pub use terminal::{
    print_benchmark_report, print_certificate_summary, print_crl_report, print_error,
    print_header, print_info, print_rotation_outcome, print_success, print_warning,
};
