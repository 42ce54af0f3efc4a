use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Serialize;

use dpmeta_core::schema::Violation;
use dpmeta_core::MetadataDocument;

use crate::output;

#[derive(Debug, Serialize)]
pub struct ValidateOut {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

pub fn run(metadata: &Path) -> Result<()> {
    let doc = MetadataDocument::load(metadata)?;
    let violations = doc.validate();

    let summary = if violations.is_empty() {
        format!("{}: valid", metadata.display())
    } else {
        violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("\n")
    };
    let n = violations.len();
    output::print(
        &ValidateOut {
            valid: n == 0,
            violations,
        },
        &summary,
    )?;

    if n > 0 {
        return Err(anyhow!("{n} schema violation(s) in {}", metadata.display()));
    }
    Ok(())
}
