use colored::*;

/// Turns common compiler/linker diagnostics into a short hint.
pub struct FeedbackAnalyzer;

impl FeedbackAnalyzer {
    pub fn analyze(output: &str) -> Option<String> {
        // 1. Missing entry point
        if output.contains("undefined reference to `main'")
            || output.contains("undefined reference to `_start'")
            || output.contains("entry symbol _start")
        {
            return Some(format!(
                "The link has no entry point.\nMake sure one source defines {}, or link through the compiler ({}) so the C runtime is pulled in.",
                "main()".bold().yellow(),
                "ld: \"gcc\"".bold().green()
            ));
        }

        // 2. Unresolved symbols
        if output.contains("undefined reference to") || output.contains("LNK2019") {
            return Some(format!(
                "It looks like a {} error.\nA library may be missing from {} in {}.",
                "Linker".bold().red(),
                "ldflags".bold().yellow(),
                "build.rhai".bold().yellow()
            ));
        }

        // 3. Missing header
        if output.contains("fatal error: ") && output.contains("No such file or directory")
            || output.contains("cannot open include file")
        {
            return Some(format!(
                "It looks like a {} error.\nCheck the {} include paths passed to {} in build.rhai.",
                "Missing Header".bold().red(),
                "-I".bold().yellow(),
                "compile_files".bold().green()
            ));
        }

        None
    }
}
