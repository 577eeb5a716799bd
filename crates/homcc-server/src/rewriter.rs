//! Argument rewriter (§4.10): reparents absolute paths under a job's
//! `root_dir` so a sandboxed compiler sees the same include graph the
//! client's preprocessor saw.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// An argv this rewriter cannot safely run remotely.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UnsupportedArgv {
    /// The compiler was asked to read from stdin (`-`).
    #[error("stdin input is not supported for remote compilation")]
    StdinInput,
    /// No `-c` flag: this is a link invocation, not a compile.
    #[error("linking is not supported for remote compilation, pass -c")]
    LinkRequested,
}

/// The result of rewriting one compiler invocation for remote execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    /// Absolute input paths, as seen by the client (pre-rewrite).
    pub inputs: Vec<String>,
    /// Absolute output paths, as seen by the client (pre-rewrite), in the
    /// same order the rewritten argv writes them.
    pub outputs: Vec<String>,
    /// The argv to actually execute, with every path reparented under
    /// `root_dir`.
    pub remote_argv: Vec<String>,
}

/// Rewrite `argv` (the compiler name plus its flags) for execution with
/// working tree `root_dir`.
///
/// # Errors
///
/// [`UnsupportedArgv`] if `argv` reads from stdin or omits `-c`.
pub fn rewrite(argv: &[String], root_dir: &Path) -> Result<Rewritten, UnsupportedArgv> {
    if argv.iter().any(|a| a == "-") {
        return Err(UnsupportedArgv::StdinInput);
    }
    if !argv.iter().any(|a| a == "-c") {
        return Err(UnsupportedArgv::LinkRequested);
    }

    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    let mut remote_argv = Vec::with_capacity(argv.len());

    let mut iter = argv.iter().cloned().peekable();
    while let Some(arg) = iter.next() {
        if arg.starts_with("-M") {
            continue;
        }

        if arg == "-o" {
            let Some(path) = iter.next() else {
                remote_argv.push(arg);
                continue;
            };
            outputs.push(path.clone());
            remote_argv.push("-o".to_string());
            remote_argv.push(reparent(&path, root_dir));
            continue;
        }

        if arg == "-I" || arg == "-isystem" {
            let Some(path) = iter.next() else {
                remote_argv.push(arg);
                continue;
            };
            remote_argv.push(arg);
            remote_argv.push(reparent(&path, root_dir));
            continue;
        }

        if let Some(path) = arg.strip_prefix("-I") {
            if !path.is_empty() {
                remote_argv.push(format!("-I{}", reparent(path, root_dir)));
                continue;
            }
        }

        if is_source_file(&arg) {
            inputs.push(arg.clone());
            remote_argv.push(reparent(&arg, root_dir));
            continue;
        }

        remote_argv.push(arg);
    }

    Ok(Rewritten { inputs, outputs, remote_argv })
}

/// Reparent an absolute path under `root_dir`, preserving its layout
/// (`/usr/include/x.h` → `root_dir + /usr/include/x.h`). Relative paths are
/// left untouched: they resolve identically against the rewritten CWD on
/// both sides.
fn reparent(path: &str, root_dir: &Path) -> String {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        let relative = candidate.strip_prefix("/").unwrap_or(candidate);
        root_dir.join(relative).display().to_string()
    } else {
        path.to_string()
    }
}

fn is_source_file(arg: &str) -> bool {
    !arg.starts_with('-')
        && matches!(Path::new(arg).extension().and_then(|e| e.to_str()), Some("c" | "cc" | "cpp" | "cxx" | "c++"))
}

/// Reparent a rewritten CWD the same way as any other absolute path.
#[must_use]
pub fn rewrite_cwd(cwd: &str, root_dir: &Path) -> PathBuf {
    PathBuf::from(reparent(cwd, root_dir))
}

/// Reparent one dependency path under `root_dir`, for the job runner's
/// cache-blob linking step (§4.8 step 5). Shares the same absolute-path
/// rule as argv rewriting but isn't tied to any particular compiler flag.
#[must_use]
pub fn reparent_path(path: &str, root_dir: &Path) -> PathBuf {
    PathBuf::from(reparent(path, root_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn rewrites_output_and_input_paths() {
        let root = Path::new("/tmp/job-root");
        let rewritten = rewrite(&argv(&["gcc", "-c", "/home/user/main.c", "-o", "/home/user/main.o"]), root)
            .expect("should rewrite");

        assert_eq!(rewritten.inputs, vec!["/home/user/main.c".to_string()]);
        assert_eq!(rewritten.outputs, vec!["/home/user/main.o".to_string()]);
        assert_eq!(
            rewritten.remote_argv,
            vec![
                "gcc".to_string(),
                "-c".to_string(),
                "/tmp/job-root/home/user/main.c".to_string(),
                "-o".to_string(),
                "/tmp/job-root/home/user/main.o".to_string(),
            ]
        );
    }

    #[test]
    fn strips_dependency_generation_flags_but_keeps_c() {
        let root = Path::new("/tmp/job-root");
        let rewritten = rewrite(&argv(&["gcc", "-MD", "-MF", "dep.d", "-c", "main.c"]), root).expect("should rewrite");
        assert!(!rewritten.remote_argv.iter().any(|a| a.starts_with("-M")));
        assert!(rewritten.remote_argv.contains(&"-c".to_string()));
    }

    #[test]
    fn rewrites_include_paths() {
        let root = Path::new("/tmp/job-root");
        let rewritten =
            rewrite(&argv(&["gcc", "-c", "main.c", "-I", "/usr/include/foo", "-isystem", "/usr/include/bar"]), root)
                .expect("should rewrite");
        assert!(rewritten.remote_argv.contains(&"/tmp/job-root/usr/include/foo".to_string()));
        assert!(rewritten.remote_argv.contains(&"/tmp/job-root/usr/include/bar".to_string()));
    }

    #[test]
    fn rewrites_attached_include_flag() {
        let root = Path::new("/tmp/job-root");
        let rewritten = rewrite(&argv(&["gcc", "-c", "main.c", "-I/usr/include/foo"]), root).expect("should rewrite");
        assert!(rewritten.remote_argv.contains(&"-I/tmp/job-root/usr/include/foo".to_string()));
    }

    #[test]
    fn rejects_stdin_input() {
        let root = Path::new("/tmp/job-root");
        let err = rewrite(&argv(&["gcc", "-c", "-", "-o", "a.o"]), root).unwrap_err();
        assert_eq!(err, UnsupportedArgv::StdinInput);
    }

    #[test]
    fn rejects_link_requests() {
        let root = Path::new("/tmp/job-root");
        let err = rewrite(&argv(&["gcc", "main.o", "-o", "a.out"]), root).unwrap_err();
        assert_eq!(err, UnsupportedArgv::LinkRequested);
    }

    #[test]
    fn leaves_relative_paths_untouched() {
        let root = Path::new("/tmp/job-root");
        let rewritten = rewrite(&argv(&["gcc", "-c", "main.c", "-o", "main.o"]), root).expect("should rewrite");
        assert!(rewritten.remote_argv.contains(&"main.c".to_string()));
        assert!(rewritten.remote_argv.contains(&"main.o".to_string()));
    }
}
