// schema.rs — `pic schema <file>`: structural validation only.

use std::path::Path;
use std::process::ExitCode;

use pic_proposal::parse_proposal;

use super::{read_file, EXIT_OK, EXIT_SCHEMA_INVALID};

pub fn execute(file: &Path) -> anyhow::Result<ExitCode> {
    let raw = read_file(file)?;
    match parse_proposal(&raw) {
        Ok(proposal) => {
            println!("Schema valid: {}", file.display());
            println!(
                "  impact: {}  tool: {}  provenance: {}  claims: {}  evidence: {}",
                proposal.impact,
                proposal.action.tool,
                proposal.provenance.len(),
                proposal.claims.len(),
                proposal.evidence.len()
            );
            Ok(ExitCode::from(EXIT_OK))
        }
        Err(e) => {
            println!("Schema invalid: {}", file.display());
            println!("  {}", e);
            Ok(ExitCode::from(EXIT_SCHEMA_INVALID))
        }
    }
}
