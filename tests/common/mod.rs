#![allow(dead_code)]

use std::path::Path;

pub use intemp_test_utils::init_tracing;

/// Sorted names of the entries directly inside `dir`.
pub fn entry_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Path of the compiled `intemp` binary.
pub fn intemp_bin() -> &'static str {
    env!("CARGO_BIN_EXE_intemp")
}
