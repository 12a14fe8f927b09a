use std::fmt;
use std::io;
use std::path::PathBuf;

/// A compiler invocation that exited unsuccessfully.
///
/// Kept separate from [`BuildError`] so it can travel through the script
/// engine as a plain cloneable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileFailure {
    /// Source file whose compilation failed
    pub source: PathBuf,
    /// Exit code, `None` when the compiler was killed by a signal
    pub code: Option<i32>,
}

impl fmt::Display for CompileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(
                f,
                "compilation of {} failed (exit code {})",
                self.source.display(),
                code
            ),
            None => write!(
                f,
                "compilation of {} was terminated by a signal",
                self.source.display()
            ),
        }
    }
}

/// Errors raised by the build engine
#[derive(Debug)]
pub enum BuildError {
    /// A recipe or dependency name is not registered
    UnknownRecipe(String),
    /// The external compiler returned nonzero (always fatal)
    Compile(CompileFailure),
    /// The external linker returned nonzero (reported, not fatal)
    Link { target: PathBuf, code: Option<i32> },
    /// A filesystem or process-spawn operation failed
    Io { context: String, source: io::Error },
    /// Malformed options passed in from the build script
    Config(String),
    /// The build script failed to parse or evaluate
    Script(String),
    /// Dependency resolution nested deeper than `MAX_GOAL_DEPTH`
    GoalDepth(String),
}

impl BuildError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        BuildError::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether this error must bring the whole process down.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, BuildError::Link { .. })
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::UnknownRecipe(name) => write!(f, "no recipe named '{}'", name),
            BuildError::Compile(failure) => write!(f, "{}", failure),
            BuildError::Link { target, code } => match code {
                Some(code) => write!(
                    f,
                    "linking {} failed (exit code {})",
                    target.display(),
                    code
                ),
                None => write!(f, "linking {} was terminated by a signal", target.display()),
            },
            BuildError::Io { context, source } => write!(f, "{}: {}", context, source),
            BuildError::Config(msg) => write!(f, "invalid build options: {}", msg),
            BuildError::Script(msg) => write!(f, "build script error: {}", msg),
            BuildError::GoalDepth(name) => write!(
                f,
                "recipe dependencies nest too deeply while resolving '{}'",
                name
            ),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for BuildError {
    fn from(e: io::Error) -> Self {
        BuildError::io("I/O error", e)
    }
}

impl From<CompileFailure> for BuildError {
    fn from(failure: CompileFailure) -> Self {
        BuildError::Compile(failure)
    }
}
