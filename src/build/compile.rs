use super::feedback::FeedbackAnalyzer;
use super::rebuild::{SourceObjectPair, needs_rebuild};
use crate::error::{BuildError, CompileFailure};
use crate::process::ProcessRunner;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Everything one `compile_files` call needs.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub compiler: String,
    pub flags: Vec<String>,
    pub sources: Vec<PathBuf>,
    pub output_dir: PathBuf,
    /// `None` compiles on the calling thread; `Some(0)` uses every CPU
    pub jobs: Option<usize>,
}

/// The slice of a request handed to exactly one worker.
struct CompileJob<'a> {
    compiler: &'a str,
    flags: &'a [String],
    assigned: Vec<SourceObjectPair>,
}

/// Hidden while the runner echoes command lines to the same terminal.
fn progress_bar(total: usize, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    let progress = ProgressBar::new(total as u64);
    progress.set_style(style);
    progress.set_message("Compiling...");
    progress
}

/// State shared by all workers of one dispatch.
struct ArtifactSink {
    artifacts: Mutex<Vec<PathBuf>>,
    first_error: Mutex<Option<BuildError>>,
    abort: AtomicBool,
    progress: ProgressBar,
}

impl ArtifactSink {
    fn new(total: usize, hidden: bool) -> Self {
        Self {
            artifacts: Mutex::new(Vec::with_capacity(total)),
            first_error: Mutex::new(None),
            abort: AtomicBool::new(false),
            progress: progress_bar(total, hidden),
        }
    }

    fn push(&self, object: &Path) {
        self.artifacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(object.to_path_buf());
    }

    fn aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// Keep the first error and tell every other worker to stop.
    fn fail(&self, err: BuildError) {
        let mut slot = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err);
        }
        self.abort.store(true, Ordering::SeqCst);
    }

    fn finish(self) -> Result<Vec<PathBuf>, BuildError> {
        self.progress.finish_and_clear();
        if let Some(err) = self
            .first_error
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
        {
            return Err(err);
        }
        Ok(self
            .artifacts
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner))
    }
}

impl CompileJob<'_> {
    fn run(&self, sink: &ArtifactSink, runner: &dyn ProcessRunner) {
        for pair in &self.assigned {
            if sink.aborted() {
                return;
            }
            match self.process(pair, sink, runner) {
                Ok(true) => {}
                // Up to date: the rest of this shard is assumed to be too
                Ok(false) => return,
                Err(err) => {
                    sink.fail(err);
                    return;
                }
            }
        }
    }

    /// Returns whether the worker should carry on with its next pair.
    fn process(
        &self,
        pair: &SourceObjectPair,
        sink: &ArtifactSink,
        runner: &dyn ProcessRunner,
    ) -> Result<bool, BuildError> {
        if let Some(parent) = pair.object.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                BuildError::io(format!("failed to create {}", parent.display()), e)
            })?;
        }

        // The link step depends on the object whether or not it is rebuilt
        sink.push(&pair.object);

        if !needs_rebuild(&pair.source, &pair.object)? {
            sink.progress.inc(1);
            return Ok(false);
        }

        sink.progress
            .set_message(format!("Compiling {}", pair.source.display()));
        let output = runner.run(self.compiler, &compile_arguments(self.flags, pair))?;

        if !output.success() {
            sink.progress.suspend(|| {
                eprintln!(
                    "{} Error compiling {}:\n{}",
                    "x".red(),
                    pair.source.display(),
                    output.stderr
                );
                if let Some(hint) = FeedbackAnalyzer::analyze(&output.stderr) {
                    eprintln!("{} {}", "💡".yellow(), hint);
                }
            });
            return Err(CompileFailure {
                source: pair.source.clone(),
                code: output.code,
            }
            .into());
        }

        if !output.stderr.trim().is_empty() {
            sink.progress.suspend(|| {
                eprintln!(
                    "{} Warning in {}:\n{}",
                    "!".yellow(),
                    pair.source.display(),
                    output.stderr
                );
            });
        }

        sink.progress.inc(1);
        Ok(true)
    }
}

/// `<flags...> <source> -c -o <object>`
fn compile_arguments(flags: &[String], pair: &SourceObjectPair) -> Vec<String> {
    let mut args = Vec::with_capacity(flags.len() + 4);
    args.extend(flags.iter().cloned());
    args.push(pair.source.to_string_lossy().to_string());
    args.push("-c".to_string());
    args.push("-o".to_string());
    args.push(pair.object.to_string_lossy().to_string());
    args
}

/// Round-robin: pair `i` goes to shard `i % workers`.
fn partition(pairs: Vec<SourceObjectPair>, workers: usize) -> Vec<Vec<SourceObjectPair>> {
    let mut shards: Vec<Vec<SourceObjectPair>> = (0..workers).map(|_| Vec::new()).collect();
    for (i, pair) in pairs.into_iter().enumerate() {
        shards[i % workers].push(pair);
    }
    shards
}

/// Never more workers than pairs, and at least one.
fn worker_count(jobs: usize, pairs: usize) -> usize {
    let wanted = if jobs > 0 {
        jobs
    } else {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    };
    wanted.min(pairs.max(1))
}

/// Compile `request.sources` into `request.output_dir`.
///
/// Returns the object path of every pair a worker reached, whether or not it
/// was recompiled. Artifact order across workers is unspecified. The first
/// failing compile aborts the remaining work and is returned as the error.
pub fn compile(
    request: &CompileRequest,
    runner: &dyn ProcessRunner,
) -> Result<Vec<PathBuf>, BuildError> {
    let pairs: Vec<SourceObjectPair> = request
        .sources
        .iter()
        .map(|source| SourceObjectPair::new(source, &request.output_dir))
        .collect();
    let sink = ArtifactSink::new(pairs.len(), runner.echoes_commands());

    match request.jobs {
        None => {
            // Every source is its own job, so an up-to-date file only ends itself
            for pair in pairs {
                if sink.aborted() {
                    break;
                }
                let job = CompileJob {
                    compiler: &request.compiler,
                    flags: &request.flags,
                    assigned: vec![pair],
                };
                job.run(&sink, runner);
            }
        }
        Some(jobs) => {
            let workers = worker_count(jobs, pairs.len());
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("kiln-compile-{}", i))
                .build()
                .map_err(|e| BuildError::Config(format!("cannot start {} workers: {}", workers, e)))?;

            let jobs: Vec<CompileJob> = partition(pairs, workers)
                .into_iter()
                .map(|assigned| CompileJob {
                    compiler: &request.compiler,
                    flags: &request.flags,
                    assigned,
                })
                .collect();

            let sink = &sink;
            pool.scope(|scope| {
                for job in jobs {
                    scope.spawn(move |_| job.run(sink, runner));
                }
            });
        }
    }

    sink.finish()
}
