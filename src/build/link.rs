use super::feedback::FeedbackAnalyzer;
use crate::error::BuildError;
use crate::process::ProcessRunner;
use colored::*;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct LinkRequest {
    pub linker: String,
    pub flags: Vec<String>,
    pub objects: Vec<PathBuf>,
    pub target: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// No objects, the linker was never started
    Skipped,
    Linked,
}

/// `<objects...> <flags...> -o <target>`
fn link_arguments(request: &LinkRequest) -> Vec<String> {
    let mut args = Vec::with_capacity(request.objects.len() + request.flags.len() + 2);
    args.extend(
        request
            .objects
            .iter()
            .map(|obj| obj.to_string_lossy().to_string()),
    );
    args.extend(request.flags.iter().cloned());
    args.push("-o".to_string());
    args.push(request.target.to_string_lossy().to_string());
    args
}

/// Link `request.objects` into `request.target` with one linker invocation.
///
/// A linker failure prints its diagnostics and comes back as
/// [`BuildError::Link`]; callers decide whether to carry on.
pub fn link(request: &LinkRequest, runner: &dyn ProcessRunner) -> Result<LinkOutcome, BuildError> {
    if request.objects.is_empty() {
        return Ok(LinkOutcome::Skipped);
    }

    if let Some(parent) = request.target.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| BuildError::io(format!("failed to create {}", parent.display()), e))?;
    }

    let output = runner.run(&request.linker, &link_arguments(request))?;
    if !output.success() {
        eprintln!("{}", output.stderr);
        if let Some(hint) = FeedbackAnalyzer::analyze(&output.stderr) {
            eprintln!("{} {}", "💡".yellow(), hint);
        }
        return Err(BuildError::Link {
            target: request.target.clone(),
            code: output.code,
        });
    }

    Ok(LinkOutcome::Linked)
}
