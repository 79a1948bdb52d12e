// evidence.rs — `pic evidence-verify <file>`: check every evidence entry of a
// proposal and report each result, without the causal checks.

use std::path::Path;
use std::process::ExitCode;

use pic_proposal::parse_proposal;

use super::{parent_dir, read_file, Bootstrap, EXIT_BLOCKED, EXIT_OK, EXIT_SCHEMA_INVALID};

pub fn execute(boot: &Bootstrap, file: &Path) -> anyhow::Result<ExitCode> {
    let raw = read_file(file)?;
    let proposal = match parse_proposal(&raw) {
        Ok(p) => p,
        Err(e) => {
            println!("Schema invalid: {}", e);
            return Ok(ExitCode::from(EXIT_SCHEMA_INVALID));
        }
    };

    if proposal.evidence.is_empty() {
        println!("No evidence entries in {}", file.display());
        return Ok(ExitCode::from(EXIT_OK));
    }

    let report = boot.pipeline(&parent_dir(file))?.verify_evidence(&proposal);
    for result in &report.results {
        let mark = if result.ok { "ok  " } else { "FAIL" };
        println!("{} {} [{}] {}", mark, result.id, result.kind, result.message);
        if let (true, Some(path)) = (boot.config.debug, &result.path) {
            println!("     path: {}", path.display());
        }
    }

    if report.all_ok() {
        println!("{} evidence entr(ies) verified.", report.results.len());
        Ok(ExitCode::from(EXIT_OK))
    } else {
        Ok(ExitCode::from(EXIT_BLOCKED))
    }
}
