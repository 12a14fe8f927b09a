use crate::build::{CompileRequest, LinkRequest};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Build script loaded from the working directory.
pub const CONFIG_FILE: &str = "build.rhai";

pub const DEFAULT_OUTPUT_DIR: &str = "build";
pub const DEFAULT_TARGET: &str = "a.out";

/// Options accepted by `compile_files`.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct CompileOptions {
    #[serde(default = "default_compiler", alias = "compiler")]
    pub cc: String,
    #[serde(default, alias = "flags")]
    pub cflags: Vec<String>,
    #[serde(alias = "sources")]
    pub src: Vec<String>,
    #[serde(default = "default_output_dir", alias = "output_dir")]
    pub bindir: String,
    #[serde(default)]
    pub jobs: Option<usize>,
}

/// Options accepted by `link_executable`.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct LinkOptions {
    #[serde(default = "default_linker", alias = "linker")]
    pub ld: String,
    #[serde(default, alias = "flags")]
    pub ldflags: Vec<String>,
    #[serde(alias = "objects")]
    pub objs: Vec<String>,
    #[serde(default = "default_target")]
    pub target: String,
}

impl CompileOptions {
    /// Defaults for everything except the source list.
    pub fn from_sources(src: Vec<String>) -> Self {
        Self {
            cc: default_compiler(),
            cflags: Vec::new(),
            src,
            bindir: default_output_dir(),
            jobs: None,
        }
    }

    pub fn into_request(self) -> CompileRequest {
        CompileRequest {
            compiler: self.cc,
            flags: self.cflags,
            sources: self.src.into_iter().map(PathBuf::from).collect(),
            output_dir: PathBuf::from(self.bindir),
            jobs: self.jobs,
        }
    }
}

impl LinkOptions {
    pub fn from_objects(objs: Vec<String>) -> Self {
        Self {
            ld: default_linker(),
            ldflags: Vec::new(),
            objs,
            target: default_target(),
        }
    }

    pub fn into_request(self) -> LinkRequest {
        LinkRequest {
            linker: self.ld,
            flags: self.ldflags,
            objects: self.objs.into_iter().map(PathBuf::from).collect(),
            target: PathBuf::from(self.target),
        }
    }
}

fn env_or(var: &str, fallback: &str) -> String {
    env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// `$CC`, else `gcc`.
pub fn default_compiler() -> String {
    env_or("CC", "gcc")
}

/// `$LD`, else `ld`.
pub fn default_linker() -> String {
    env_or("LD", "ld")
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}

fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::{Dynamic, Engine};

    fn options<T: serde::de::DeserializeOwned>(expr: &str) -> Result<T, String> {
        let value: Dynamic = Engine::new().eval(expr).unwrap();
        rhai::serde::from_dynamic(&value).map_err(|e| e.to_string())
    }

    #[test]
    fn test_compile_defaults() {
        let opts: CompileOptions = options(r#"#{ src: ["a.c", "b.c"] }"#).unwrap();
        assert_eq!(opts.cc, default_compiler());
        assert!(opts.cflags.is_empty());
        assert_eq!(opts.bindir, "build");
        assert_eq!(opts.jobs, None);

        let req = opts.into_request();
        assert_eq!(req.sources, vec![PathBuf::from("a.c"), PathBuf::from("b.c")]);
        assert_eq!(req.output_dir, PathBuf::from("build"));
    }

    #[test]
    fn test_compile_full_options() {
        let opts: CompileOptions = options(
            r#"#{ cc: "clang", cflags: ["-O2", "-Iinclude"], src: ["m.c"], bindir: "out", jobs: 4 }"#,
        )
        .unwrap();
        assert_eq!(opts.cc, "clang");
        assert_eq!(opts.cflags, vec!["-O2", "-Iinclude"]);
        assert_eq!(opts.bindir, "out");
        assert_eq!(opts.jobs, Some(4));
    }

    #[test]
    fn test_long_spellings() {
        let opts: CompileOptions =
            options(r#"#{ compiler: "tcc", flags: ["-g"], sources: ["m.c"], output_dir: "obj" }"#)
                .unwrap();
        assert_eq!(opts.cc, "tcc");
        assert_eq!(opts.cflags, vec!["-g"]);
        assert_eq!(opts.bindir, "obj");

        let link: LinkOptions =
            options(r#"#{ linker: "gcc", flags: ["-lm"], objects: ["a.o"], target: "app" }"#)
                .unwrap();
        assert_eq!(link.ld, "gcc");
        assert_eq!(link.ldflags, vec!["-lm"]);
        assert_eq!(link.objs, vec!["a.o"]);
    }

    #[test]
    fn test_link_defaults() {
        let opts: LinkOptions = options(r#"#{ objs: [] }"#).unwrap();
        assert_eq!(opts.ld, default_linker());
        assert_eq!(opts.target, "a.out");
        assert!(opts.into_request().objects.is_empty());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = options::<CompileOptions>(r#"#{ src: [], bogus: 1 }"#).unwrap_err();
        assert!(err.contains("bogus"), "{}", err);
    }

    #[test]
    fn test_missing_sources_rejected() {
        let err = options::<CompileOptions>(r#"#{ cc: "gcc" }"#).unwrap_err();
        assert!(err.contains("src"), "{}", err);
    }

    #[test]
    fn test_negative_jobs_rejected() {
        assert!(options::<CompileOptions>(r#"#{ src: [], jobs: -1 }"#).is_err());
    }
}
