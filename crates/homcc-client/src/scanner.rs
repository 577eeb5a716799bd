//! Dependency scanner: runs the compiler in `-M` mode to discover every
//! file the translation unit reads, then hashes each one.

use std::{collections::BTreeMap, path::Path};

use homcc_core::error::Result;
use homcc_proto::Digest;
use tokio::process::Command;

/// `path → digest` for every absolute dependency the preprocessor touched,
/// keyed by the path as the server will see it (verbatim from `-M` output;
/// rewriting into `root_dir` happens server-side, §4.8/§4.10).
pub type DependencyMap = BTreeMap<String, Digest>;

/// Invoke `compiler` in dependency-listing mode over `argv` (run from
/// `cwd`) and hash every absolute path it reports.
///
/// Relative paths are skipped: they resolve against `cwd`, which the
/// server recreates identically via the rewritten CWD, so they need no
/// separate transfer — only the absolute system/library headers the
/// client's own toolchain is configured to see do.
pub async fn scan(compiler: &str, argv: &[String], cwd: &Path) -> Result<DependencyMap> {
    let output = Command::new(compiler)
        .args(dependency_listing_argv(argv))
        .current_dir(cwd)
        .output()
        .await?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut dependencies = DependencyMap::new();

    for path in parse_make_rule(&stdout) {
        if !Path::new(&path).is_absolute() {
            continue;
        }
        let contents = tokio::fs::read(&path).await?;
        dependencies.insert(path, Digest::of(&contents));
    }

    Ok(dependencies)
}

/// Build the argv for a dependency-listing invocation: the original argv
/// with any existing `-M*`/`-o` flags stripped, plus `-M -MM` equivalents
/// that write the rule to stdout instead of a `.d` file.
fn dependency_listing_argv(argv: &[String]) -> Vec<String> {
    let mut out = vec!["-M".to_string()];
    let mut skip_next = false;
    for arg in argv {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "-o" {
            skip_next = true;
            continue;
        }
        if arg.starts_with("-M") {
            continue;
        }
        out.push(arg.clone());
    }
    out
}

/// Parse a Makefile-style dependency rule (`target: dep1 dep2 \\\n  dep3`)
/// into the flat list of dependency paths, dropping the target itself.
fn parse_make_rule(rule: &str) -> Vec<String> {
    let joined = rule.replace("\\\n", " ");
    let Some((_target, deps)) = joined.split_once(':') else {
        return Vec::new();
    };
    deps.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_line_rule() {
        let deps = parse_make_rule("main.o: main.c /usr/include/stdio.h\n");
        assert_eq!(deps, vec!["main.c".to_string(), "/usr/include/stdio.h".to_string()]);
    }

    #[test]
    fn parses_a_continued_rule() {
        let rule = "main.o: main.c \\\n  /usr/include/stdio.h \\\n  /usr/include/stdlib.h\n";
        let deps = parse_make_rule(rule);
        assert_eq!(
            deps,
            vec![
                "main.c".to_string(),
                "/usr/include/stdio.h".to_string(),
                "/usr/include/stdlib.h".to_string(),
            ]
        );
    }

    #[test]
    fn strips_existing_dependency_flags_and_output_path() {
        let argv = vec![
            "-c".to_string(),
            "main.c".to_string(),
            "-o".to_string(),
            "main.o".to_string(),
            "-MMD".to_string(),
        ];
        let rewritten = dependency_listing_argv(&argv);
        assert_eq!(rewritten, vec!["-M".to_string(), "-c".to_string(), "main.c".to_string()]);
    }

    #[tokio::test]
    async fn scan_hashes_only_absolute_dependencies() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("main.c");
        tokio::fs::write(&source, b"int main(void) { return 0; }\n").await.expect("write source");

        // A fake "compiler" that just echoes a make rule naming the source
        // (relative) and itself (absolute), so the test has no toolchain
        // dependency.
        let fake_compiler = dir.path().join("fake-cc.sh");
        tokio::fs::write(
            &fake_compiler,
            format!("#!/bin/sh\necho \"main.o: main.c {}\"\n", source.display()),
        )
        .await
        .expect("write fake compiler");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = tokio::fs::metadata(&fake_compiler).await.expect("metadata").permissions();
            perms.set_mode(0o755);
            tokio::fs::set_permissions(&fake_compiler, perms).await.expect("chmod");
        }

        let deps = scan(&fake_compiler.display().to_string(), &["-c".to_string(), "main.c".to_string()], dir.path())
            .await
            .expect("scan should succeed");

        assert_eq!(deps.len(), 1);
        assert!(deps.contains_key(&source.display().to_string()));
    }
}
