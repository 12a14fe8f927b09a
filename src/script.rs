//! The `build.rhai` scripting surface.
//!
//! A build script drives the engine through a handful of functions:
//!
//! ```text
//! let objs = compile_files(#{ cc: "gcc", cflags: ["-O2"], src: find_files("src", ".c"), jobs: 4 });
//!
//! recipe("clean", || remove_dir("build"));
//! recipe("all", || link_executable(#{ ld: "gcc", objs: objs, target: "app" }), ["clean"]);
//! default_goal("all");
//! ```
//!
//! Recipes are stored as Rhai function pointers in a [`BuildContext`] and are
//! only invoked after the whole script has been evaluated.

use crate::build::{self, LinkOutcome};
use crate::config::{CompileOptions, LinkOptions};
use crate::error::{BuildError, CompileFailure};
use crate::process::ProcessRunner;
use crate::recipe::{self, BuildContext, Recipe};
use colored::*;
use rhai::{AST, Array, Dynamic, Engine, EvalAltResult, FnPtr, INT, ImmutableString, Map, Position};
use std::cell::{Ref, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

/// Registry shared between the script functions and the goal runner.
pub type ScriptContext = Rc<RefCell<BuildContext<FnPtr>>>;

/// Carried inside `ErrorTerminated`, which `try`/`catch` cannot intercept, so
/// a failed compile always unwinds the whole script.
#[derive(Debug, Clone)]
struct FatalCompile(CompileFailure);

fn runtime_error(err: BuildError) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(err.to_string().into(), Position::NONE).into()
}

fn fatal_compile(failure: CompileFailure) -> Box<EvalAltResult> {
    EvalAltResult::ErrorTerminated(Dynamic::from(FatalCompile(failure)), Position::NONE).into()
}

fn find_fatal(err: &EvalAltResult) -> Option<CompileFailure> {
    match err {
        EvalAltResult::ErrorTerminated(token, _) => {
            token.clone().try_cast::<FatalCompile>().map(|fatal| fatal.0)
        }
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => find_fatal(inner),
        EvalAltResult::ErrorInModule(_, inner, _) => find_fatal(inner),
        _ => None,
    }
}

/// Map a Rhai error back onto the build taxonomy.
fn into_build_error(err: Box<EvalAltResult>) -> BuildError {
    match find_fatal(&err) {
        Some(failure) => BuildError::Compile(failure),
        None => BuildError::Script(err.to_string()),
    }
}

fn strings(values: Array, what: &str) -> RhaiResult<Vec<String>> {
    values
        .into_iter()
        .map(|value| {
            value.into_string().map_err(|found| {
                runtime_error(BuildError::Config(format!(
                    "{} must be strings, found {}",
                    what, found
                )))
            })
        })
        .collect()
}

fn path_array(paths: Vec<PathBuf>) -> Array {
    paths
        .into_iter()
        .map(|p| Dynamic::from(p.to_string_lossy().to_string()))
        .collect()
}

fn parse_options<T: serde::de::DeserializeOwned>(options: Map) -> RhaiResult<T> {
    rhai::serde::from_dynamic(&Dynamic::from_map(options))
        .map_err(|e| runtime_error(BuildError::Config(e.to_string())))
}

fn compile_files(options: CompileOptions, runner: &dyn ProcessRunner) -> RhaiResult<Array> {
    let request = options.into_request();
    match build::compile(&request, runner) {
        Ok(objects) => {
            println!(
                "   {} {} object(s) ready in {}",
                "✓".green(),
                objects.len(),
                request.output_dir.display()
            );
            Ok(path_array(objects))
        }
        Err(BuildError::Compile(failure)) => Err(fatal_compile(failure)),
        Err(e) => Err(runtime_error(e)),
    }
}

fn link_executable(options: LinkOptions, runner: &dyn ProcessRunner) -> RhaiResult<()> {
    let request = options.into_request();
    match build::link(&request, runner) {
        Ok(LinkOutcome::Linked) => {
            println!("   {} Linked {}", "🔗".cyan(), request.target.display());
            Ok(())
        }
        Ok(LinkOutcome::Skipped) => {
            println!(
                "   {} Nothing to link for {}",
                "!".yellow(),
                request.target.display()
            );
            Ok(())
        }
        // Reported, the script carries on
        Err(e) if !e.is_fatal() => {
            eprintln!("{} {}", "x".red(), e);
            Ok(())
        }
        Err(e) => Err(runtime_error(e)),
    }
}

fn run_command(program: &str, args: Vec<String>, runner: &dyn ProcessRunner) -> RhaiResult<INT> {
    let output = runner.run(program, &args).map_err(runtime_error)?;
    if !output.success() {
        eprintln!(
            "{} '{}' exited with {}:\n{}",
            "x".red(),
            program,
            output
                .code
                .map_or_else(|| "a signal".to_string(), |c| c.to_string()),
            output.stderr
        );
    }
    Ok(output.code.map_or(-1, INT::from))
}

fn register_build_api(engine: &mut Engine, runner: &Rc<dyn ProcessRunner>) {
    let r = runner.clone();
    engine.register_fn("compile_files", move |options: Map| -> RhaiResult<Array> {
        compile_files(parse_options(options)?, &*r)
    });

    let r = runner.clone();
    engine.register_fn("compile_files", move |sources: Array| -> RhaiResult<Array> {
        compile_files(CompileOptions::from_sources(strings(sources, "sources")?), &*r)
    });

    let r = runner.clone();
    engine.register_fn("link_executable", move |options: Map| -> RhaiResult<()> {
        link_executable(parse_options(options)?, &*r)
    });

    let r = runner.clone();
    engine.register_fn("link_executable", move |objects: Array| -> RhaiResult<()> {
        link_executable(LinkOptions::from_objects(strings(objects, "objects")?), &*r)
    });

    engine.register_fn("find_files", |dir: ImmutableString, ext: ImmutableString| -> Array {
        path_array(build::find_files_by_extension(Path::new(dir.as_str()), &ext))
    });

    engine.register_fn("remove_dir", |dir: ImmutableString| -> RhaiResult<bool> {
        build::remove_dir(Path::new(dir.as_str())).map_err(runtime_error)
    });

    let r = runner.clone();
    engine.register_fn(
        "run_command",
        move |program: ImmutableString, args: Array| -> RhaiResult<INT> {
            run_command(&program, strings(args, "arguments")?, &*r)
        },
    );
}

fn register_recipe_api(engine: &mut Engine, context: &ScriptContext) {
    let ctx = context.clone();
    engine.register_fn("recipe", move |name: ImmutableString, action: FnPtr| {
        ctx.borrow_mut()
            .define_recipe(name.to_string(), action, Vec::new());
    });

    let ctx = context.clone();
    engine.register_fn(
        "recipe",
        move |name: ImmutableString, action: FnPtr, deps: Array| -> RhaiResult<()> {
            let deps = strings(deps, "recipe dependencies")?;
            ctx.borrow_mut().define_recipe(name.to_string(), action, deps);
            Ok(())
        },
    );

    let ctx = context.clone();
    engine.register_fn("default_goal", move |name: ImmutableString| {
        ctx.borrow_mut().set_default_goal(name.to_string());
    });
}

/// An evaluated build script, ready to run goals.
pub struct BuildScript {
    engine: Engine,
    ast: AST,
    context: ScriptContext,
}

impl BuildScript {
    fn engine(context: &ScriptContext, runner: Rc<dyn ProcessRunner>) -> Engine {
        let mut engine = Engine::new();
        register_build_api(&mut engine, &runner);
        register_recipe_api(&mut engine, context);
        engine
    }

    /// Compile and evaluate the script at `path`.
    pub fn load(path: &Path, runner: Rc<dyn ProcessRunner>) -> Result<Self, BuildError> {
        let context = ScriptContext::default();
        let engine = Self::engine(&context, runner);
        let ast = engine
            .compile_file(path.to_path_buf())
            .map_err(into_build_error)?;
        Self::evaluate(engine, ast, context)
    }

    /// Same as [`BuildScript::load`] for in-memory script text.
    pub fn from_source(source: &str, runner: Rc<dyn ProcessRunner>) -> Result<Self, BuildError> {
        let context = ScriptContext::default();
        let engine = Self::engine(&context, runner);
        let ast = engine.compile(source).map_err(|e| BuildError::Script(e.to_string()))?;
        Self::evaluate(engine, ast, context)
    }

    fn evaluate(engine: Engine, ast: AST, context: ScriptContext) -> Result<Self, BuildError> {
        engine.run_ast(&ast).map_err(into_build_error)?;
        Ok(Self {
            engine,
            ast,
            context,
        })
    }

    pub fn context(&self) -> Ref<'_, BuildContext<FnPtr>> {
        self.context.borrow()
    }

    /// Run recipe `name` with its dependencies.
    pub fn run_goal(&self, name: &str) -> Result<(), BuildError> {
        recipe::run_goal(&*self.context, name, &mut |recipe: &Recipe<FnPtr>| {
            println!("{} Running recipe '{}'", "▶".green(), recipe.name.bold());
            recipe
                .action
                .call::<Dynamic>(&self.engine, &self.ast, ())
                .map(|_| ())
                .map_err(into_build_error)
        })
    }

    /// Entry-point policy: run `requested` if given, else the default goal if
    /// one was set. Returns the goal that ran.
    pub fn run_entry(&self, requested: Option<&str>) -> Result<Option<String>, BuildError> {
        let goal = {
            let ctx = self.context.borrow();
            recipe::select_goal(requested, ctx.default_goal()).map(str::to_string)
        };

        if let Some(goal) = &goal {
            self.run_goal(goal)?;
        }
        Ok(goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::mock::RecordingRunner;

    fn lit(path: &Path) -> String {
        format!("{:?}", path.to_string_lossy())
    }

    fn programs(runner: &RecordingRunner) -> Vec<String> {
        runner.calls().into_iter().map(|c| c.program).collect()
    }

    const RECIPES: &str = r#"
        recipe("clean", || run_command("clean-step", []));
        recipe("all", || run_command("build-step", ["--all"]), ["clean"]);
        recipe("test", || run_command("test-step", []));
        default_goal("all");
    "#;

    #[test]
    fn test_default_goal_runs_dependencies_first() {
        let runner = Rc::new(RecordingRunner::new());
        let script = BuildScript::from_source(RECIPES, runner.clone()).unwrap();

        // Nothing runs while the script is evaluated
        assert!(runner.calls().is_empty());

        let ran = script.run_entry(None).unwrap();
        assert_eq!(ran.as_deref(), Some("all"));
        assert_eq!(programs(&runner), vec!["clean-step", "build-step"]);
        assert_eq!(runner.calls()[1].args, vec!["--all"]);
    }

    #[test]
    fn test_explicit_goal_ignores_default() {
        let runner = Rc::new(RecordingRunner::new());
        let script = BuildScript::from_source(RECIPES, runner.clone()).unwrap();

        script.run_entry(Some("test")).unwrap();
        assert_eq!(programs(&runner), vec!["test-step"]);
    }

    #[test]
    fn test_no_goal_is_a_no_op() {
        let runner = Rc::new(RecordingRunner::new());
        let script =
            BuildScript::from_source(r#"recipe("x", || run_command("x", []));"#, runner.clone())
                .unwrap();

        assert_eq!(script.run_entry(None).unwrap(), None);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_unknown_goal_is_name_error() {
        let runner = Rc::new(RecordingRunner::new());
        let script = BuildScript::from_source(RECIPES, runner).unwrap();

        let err = script.run_entry(Some("nonexistent")).unwrap_err();
        assert!(matches!(err, BuildError::UnknownRecipe(name) if name == "nonexistent"));
    }

    #[test]
    fn test_closures_capture_script_values() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("build");
        let source = format!(
            r#"
            let flags = ["-O2"];
            recipe("objs", || compile_files(#{{ cc: "mycc", cflags: flags, src: ["a.c"], bindir: {out} }}));
            "#,
            out = lit(&out)
        );
        let runner = Rc::new(RecordingRunner::new());
        let script = BuildScript::from_source(&source, runner.clone()).unwrap();

        script.run_goal("objs").unwrap();
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "mycc");
        assert_eq!(calls[0].args[0], "-O2");
    }

    #[test]
    fn test_compile_then_link_from_script() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("build");
        let target = dir.path().join("app");
        let source = format!(
            r#"
            let objs = compile_files(#{{ cc: "mycc", src: ["a.c", "b.c"], bindir: {out}, jobs: 2 }});
            link_executable(#{{ ld: "myld", ldflags: ["-lm"], objs: objs, target: {target} }});
            "#,
            out = lit(&out),
            target = lit(&target)
        );
        let runner = Rc::new(RecordingRunner::new());
        BuildScript::from_source(&source, runner.clone()).unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        let link = &calls[2];
        assert_eq!(link.program, "myld");
        let mut objects = link.args[..2].to_vec();
        objects.sort();
        assert_eq!(
            objects,
            vec![
                out.join("a.c.o").to_string_lossy().to_string(),
                out.join("b.c.o").to_string_lossy().to_string(),
            ]
        );
        assert_eq!(
            link.args[2..].to_vec(),
            vec![
                "-lm".to_string(),
                "-o".to_string(),
                target.to_string_lossy().to_string()
            ]
        );
    }

    #[test]
    fn test_find_files_feeds_compile() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/sub")).unwrap();
        std::fs::write(dir.path().join("src/main.c"), "").unwrap();
        std::fs::write(dir.path().join("src/sub/util.c"), "").unwrap();
        std::fs::write(dir.path().join("src/util.h"), "").unwrap();
        let source = format!(
            r#"
            let files = find_files({src}, ".c");
            if files.len() != 2 {{ throw "expected two sources"; }}
            compile_files(#{{ cc: "mycc", src: files, bindir: {out} }});
            "#,
            src = lit(&dir.path().join("src")),
            out = lit(&dir.path().join("build"))
        );
        let runner = Rc::new(RecordingRunner::new());
        BuildScript::from_source(&source, runner.clone()).unwrap();

        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn test_compile_failure_cannot_be_caught() {
        let dir = tempfile::tempdir().unwrap();
        let source = format!(
            r#"
            try {{
                compile_files(#{{ cc: "mycc", src: ["bad.c"], bindir: {out} }});
            }} catch (err) {{
                default_goal("swallowed");
            }}
            "#,
            out = lit(&dir.path().join("build"))
        );
        let runner = Rc::new(RecordingRunner::failing_on("bad.c"));

        match BuildScript::from_source(&source, runner) {
            Err(BuildError::Compile(failure)) => {
                assert_eq!(failure.source, PathBuf::from("bad.c"));
                assert_eq!(failure.code, Some(2));
            }
            Err(other) => panic!("expected compile failure, got {:?}", other),
            Ok(_) => panic!("expected compile failure"),
        }
    }

    #[test]
    fn test_compile_failure_inside_recipe() {
        let dir = tempfile::tempdir().unwrap();
        let source = format!(
            r#"recipe("all", || compile_files(#{{ cc: "mycc", src: ["bad.c"], bindir: {out} }}));"#,
            out = lit(&dir.path().join("build"))
        );
        let runner = Rc::new(RecordingRunner::failing_on("bad.c"));
        let script = BuildScript::from_source(&source, runner).unwrap();

        let err = script.run_goal("all").unwrap_err();
        assert!(matches!(err, BuildError::Compile(_)));
    }

    #[test]
    fn test_link_failure_does_not_stop_script() {
        let runner = Rc::new(RecordingRunner::failing_on("broken.o"));
        let script = BuildScript::from_source(
            r#"
            link_executable(#{ ld: "myld", objs: ["broken.o"], target: "app" });
            default_goal("after-link");
            "#,
            runner,
        )
        .unwrap();

        assert_eq!(script.context().default_goal(), Some("after-link"));
    }

    #[test]
    fn test_link_without_objects_runs_nothing() {
        let runner = Rc::new(RecordingRunner::new());
        BuildScript::from_source(r#"link_executable([]);"#, runner.clone()).unwrap();
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_unknown_option_is_script_error() {
        let runner = Rc::new(RecordingRunner::new());
        let err = BuildScript::from_source(r#"compile_files(#{ src: [], bogus: 1 });"#, runner)
            .err()
            .unwrap();
        assert!(matches!(err, BuildError::Script(msg) if msg.contains("bogus")));
    }

    #[test]
    fn test_dependency_names_must_be_strings() {
        let runner = Rc::new(RecordingRunner::new());
        let err = BuildScript::from_source(r#"recipe("all", || 1, [42]);"#, runner)
            .err()
            .unwrap();
        assert!(matches!(err, BuildError::Script(_)));
    }

    #[test]
    fn test_syntax_error_is_script_error() {
        let runner = Rc::new(RecordingRunner::new());
        let err = BuildScript::from_source("recipe(", runner).err().unwrap();
        assert!(matches!(err, BuildError::Script(_)));
    }

    #[test]
    fn test_recipes_are_listed() {
        let runner = Rc::new(RecordingRunner::new());
        let script = BuildScript::from_source(RECIPES, runner).unwrap();
        let ctx = script.context();
        let names: Vec<&str> = ctx.recipes().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["all", "clean", "test"]);
        assert_eq!(ctx.get("all").unwrap().dependencies, vec!["clean"]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.rhai");
        std::fs::write(&path, RECIPES).unwrap();
        let runner = Rc::new(RecordingRunner::new());

        let script = BuildScript::load(&path, runner.clone()).unwrap();
        script.run_goal("clean").unwrap();
        assert_eq!(programs(&runner), vec!["clean-step"]);
    }
}
