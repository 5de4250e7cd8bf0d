use std::path::Path;

use anyhow::Context;
use dotsym::{metadata::checksum::validate, DebugDirectory};
use serde::Serialize;

use crate::{app::GlobalOptions, output::print_output};

#[derive(Debug, Serialize)]
pub struct Validation {
    pub valid: bool,
    pub checksums: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn run(pdb: &Path, image: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let debug = DebugDirectory::from_path(image)
        .with_context(|| format!("failed to read debug directory: {}", image.display()))?;
    let mut data =
        std::fs::read(pdb).with_context(|| format!("failed to read: {}", pdb.display()))?;

    let outcome = validate(&mut data, &debug.checksums);
    let validation = Validation {
        valid: matches!(outcome, Ok(true)),
        checksums: debug.checksums.len(),
        error: outcome.err().map(|error| error.to_string()),
    };

    print_output(&validation, opts, |validation| {
        if let Some(error) = &validation.error {
            println!("Invalid PDB: {error}");
        } else if validation.checksums == 0 {
            println!("Image records no checksums");
        } else if validation.valid {
            println!("PDB matches");
        } else {
            println!("PDB does not match any of {} checksums", validation.checksums);
        }
    })
}
