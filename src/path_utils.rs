use anyhow::{Context, Result};
use log::debug;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Expand environment variables and `~` in a path string
pub fn expand_path_str(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| path.into())
        .into_owned()
}

/// Expand a PathBuf with environment variables
pub fn expand_path_buf(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(expand_path_str(&path_str))
}

/// Create a directory and all parent directories if they don't exist
pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {path:?}"))?;
        debug!("Created directory: {path:?}");
    }
    Ok(())
}

/// Expand a path and anchor it at `base_dir` when it is relative.
///
/// Unlike canonicalization this never touches the filesystem, so it works for
/// inputs and binaries that do not exist yet.
pub fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    let expanded = expand_path_buf(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

/// A single plain name such as `starkra`, looked up through `PATH` when run
pub fn is_bare_command(path: &Path) -> bool {
    let mut components = path.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Resolve several paths in place against the same base directory
pub fn process_paths(paths: &mut [&mut PathBuf], base_dir: &Path) {
    for path in paths.iter_mut() {
        let resolved = resolve_path(path, base_dir);
        **path = resolved;
    }
}

/// Substitute `{name}` placeholders in a path template
pub fn render_template(template: &str, vars: &HashMap<&str, String>) -> PathBuf {
    let mut rendered = template.to_string();
    for (var, value) in vars {
        let placeholder = format!("{{{var}}}");
        rendered = rendered.replace(&placeholder, value);
    }
    PathBuf::from(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::tempdir;

    #[test]
    #[serial]
    fn test_expand_path_str() {
        assert_eq!(expand_path_str("/tmp/test"), "/tmp/test");

        env::set_var("PROOFSWEEP_TEST_PATH", "/test/path");
        let result = expand_path_str("$PROOFSWEEP_TEST_PATH/file");
        assert_eq!(result, "/test/path/file");
        env::remove_var("PROOFSWEEP_TEST_PATH");

        if let Ok(home) = env::var("HOME") {
            let result = expand_path_str("~/file");
            assert!(result.contains(&format!("{home}/file")));
        }
    }

    #[test]
    fn test_ensure_directory() {
        let tempdir = tempdir().unwrap();
        let nested_dir = tempdir.path().join("logs").join("aha-mont64").join("run_1");

        ensure_directory(&nested_dir).unwrap();
        assert!(nested_dir.is_dir());

        // Idempotent on an existing directory
        ensure_directory(&nested_dir).unwrap();
        assert!(nested_dir.is_dir());
    }

    #[test]
    #[serial]
    fn test_resolve_path() {
        let base = Path::new("/opt/sweep");

        assert_eq!(
            resolve_path(Path::new("/usr/bin/prover"), base),
            PathBuf::from("/usr/bin/prover")
        );
        assert_eq!(
            resolve_path(Path::new("logs"), base),
            PathBuf::from("/opt/sweep/logs")
        );

        env::set_var("PROOFSWEEP_TEST_ROOT", "/data");
        assert_eq!(
            resolve_path(Path::new("$PROOFSWEEP_TEST_ROOT/logs"), base),
            PathBuf::from("/data/logs")
        );
        env::remove_var("PROOFSWEEP_TEST_ROOT");
    }

    #[test]
    fn test_is_bare_command() {
        assert!(is_bare_command(Path::new("starkra")));
        assert!(!is_bare_command(Path::new("./starkra")));
        assert!(!is_bare_command(Path::new("bin/starkra")));
        assert!(!is_bare_command(Path::new("/usr/bin/starkra")));
        assert!(!is_bare_command(Path::new("")));
    }

    #[test]
    fn test_process_paths() {
        let base = Path::new("/opt/sweep");
        let mut logs = PathBuf::from("logs");
        let mut prover = PathBuf::from("/bin/prover");

        process_paths(&mut [&mut logs, &mut prover], base);

        assert_eq!(logs, PathBuf::from("/opt/sweep/logs"));
        assert_eq!(prover, PathBuf::from("/bin/prover"));
    }

    #[test]
    fn test_render_template() {
        let mut vars = HashMap::new();
        vars.insert("bench", "crc32".to_string());
        vars.insert("addr", "32".to_string());
        vars.insert("size", "64".to_string());

        let rendered = render_template("inputs/{bench}/addr_{addr}_size_{size}/numified_path", &vars);
        assert_eq!(
            rendered,
            PathBuf::from("inputs/crc32/addr_32_size_64/numified_path")
        );

        // Unknown placeholders are left untouched
        let rendered = render_template("inputs/{bench}/{other}", &vars);
        assert_eq!(rendered, PathBuf::from("inputs/crc32/{other}"));
    }
}
