//! # kiln - Scriptable Build Orchestrator
//!
//! kiln reads a `build.rhai` script, compiles C sources incrementally across a
//! bounded set of worker threads, links the objects, and runs named recipes.
//!
//! ## Quick Start
//!
//! ```text
//! // build.rhai
//! let cflags = ["-O2", "-Wall"];
//!
//! recipe("clean", || remove_dir("build"));
//! recipe("app", || {
//!     let objs = compile_files(#{ cflags: cflags, src: find_files("src", ".c"), jobs: 4 });
//!     link_executable(#{ ld: "gcc", objs: objs, target: "build/app" });
//! });
//! recipe("all", || (), ["clean", "app"]);
//! default_goal("all");
//! ```
//!
//! ```bash
//! kiln          # runs the default goal
//! kiln clean    # runs one recipe
//! ```
//!
//! ## Module Organization
//!
//! - [`build`] - Rebuild decisions, parallel compilation, linking, discovery
//! - [`recipe`] - Recipe registry and goal resolution
//! - [`script`] - Rhai bindings for `build.rhai`
//! - [`config`] - Option shapes and defaults for the script functions

/// Compilation, linking and source discovery.
pub mod build;

/// Script option parsing and defaults.
pub mod config;

/// Error taxonomy.
pub mod error;

/// External process invocation.
pub mod process;

/// Named recipes and goal resolution.
pub mod recipe;

/// The `build.rhai` engine.
pub mod script;

/// Terminal tables.
pub mod ui;

pub use error::{BuildError, CompileFailure};
