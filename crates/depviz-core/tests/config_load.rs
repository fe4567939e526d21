use depviz_core::config::{ConfigError, Settings};
use std::path::PathBuf;

#[test]
fn test_load_missing_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nope.ini");
    let err = Settings::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(ref p) if *p == path));
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_load_ini_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config1.ini");
    std::fs::write(
        &path,
        "[package]\nname = A\nversion = 1.0\noutput_file = graph1.dot\n\n\
         [repository]\nurl = graph1.txt\ntest_mode = true\n",
    )
    .unwrap();

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.config_path, path);
    assert_eq!(settings.package.name, "A");
    assert_eq!(settings.package.output_file, PathBuf::from("graph1.dot"));
    assert!(settings.repository.test_mode);
}

#[test]
fn test_load_toml_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[package]
name = "lodash"
version = "latest"
output_file = "lodash.mmd"

[repository]
url = "https://registry.npmjs.org"
test_mode = false
"#,
    )
    .unwrap();

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.package.version, "latest");
    assert!(!settings.repository.test_mode);
}

#[test]
fn test_load_reports_syntax_line() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("broken.ini");
    std::fs::write(&path, "[package]\nname = A\n[repository\n").unwrap();

    let err = Settings::load(&path).unwrap_err();
    match err {
        ConfigError::Syntax(inner) => assert_eq!(inner.line, 3),
        other => panic!("expected syntax error, got {other:?}"),
    }
}

#[test]
fn test_load_invalid_toml() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("bad.toml");
    std::fs::write(&path, "package = 3\n").unwrap();
    assert!(matches!(
        Settings::load(&path).unwrap_err(),
        ConfigError::Toml(_)
    ));
}

// Environment overrides are process-wide, so they are checked in a child
// process: the test binary re-runs a single test with the variables set.
const CHILD_CONFIG: &str = "DEPVIZ_TEST_CHILD_CONFIG";

fn run_in_child(test_name: &str, config: &std::path::Path, vars: &[(&str, &str)]) {
    let output = std::process::Command::new(std::env::current_exe().unwrap())
        .args([test_name, "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_CONFIG, config)
        .env_remove("DEPVIZ_MAX_DEPTH")
        .env_remove("DEPVIZ_MAX_CYCLES")
        .env_remove("DEPVIZ_FILTER")
        .envs(vars.iter().copied())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "child test {} failed:\n{}",
        test_name,
        String::from_utf8_lossy(&output.stdout)
    );
    // libtest exits 0 when the filter matches nothing, so make sure it ran.
    assert!(String::from_utf8_lossy(&output.stdout).contains("1 passed"));
}

fn write_analysis_config(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("config.ini");
    std::fs::write(
        &path,
        "[package]\nname = A\nversion = 1.0\noutput_file = g.dot\n\n\
         [repository]\nurl = graph.txt\ntest_mode = true\n\n\
         [analysis]\nmax_depth = 2\nmax_cycles = 5\nfilter = test\n",
    )
    .unwrap();
    path
}

#[test]
fn test_env_overrides_replace_file_values() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_analysis_config(tmp.path());
    run_in_child(
        "env_child_valid_overrides",
        &path,
        &[
            ("DEPVIZ_MAX_DEPTH", "7"),
            ("DEPVIZ_MAX_CYCLES", " 12 "),
            ("DEPVIZ_FILTER", "internal"),
        ],
    );
}

#[test]
fn env_child_valid_overrides() {
    let Ok(config) = std::env::var(CHILD_CONFIG) else {
        return;
    };
    let settings = Settings::load(std::path::Path::new(&config)).unwrap();
    assert_eq!(settings.analysis.max_depth, 7);
    assert_eq!(settings.analysis.max_cycles, 12);
    assert_eq!(settings.analysis.filter.as_deref(), Some("internal"));
}

#[test]
fn test_env_overrides_ignore_garbage() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_analysis_config(tmp.path());
    run_in_child(
        "env_child_garbage_ignored",
        &path,
        &[("DEPVIZ_MAX_DEPTH", "deep"), ("DEPVIZ_MAX_CYCLES", "-1")],
    );
}

#[test]
fn env_child_garbage_ignored() {
    let Ok(config) = std::env::var(CHILD_CONFIG) else {
        return;
    };
    let settings = Settings::load(std::path::Path::new(&config)).unwrap();
    assert_eq!(settings.analysis.max_depth, 2);
    assert_eq!(settings.analysis.max_cycles, 5);
    assert_eq!(settings.analysis.filter.as_deref(), Some("test"));
}

#[test]
fn test_env_filter_empty_clears_file_filter() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_analysis_config(tmp.path());
    run_in_child("env_child_empty_filter", &path, &[("DEPVIZ_FILTER", "")]);
}

#[test]
fn env_child_empty_filter() {
    let Ok(config) = std::env::var(CHILD_CONFIG) else {
        return;
    };
    let settings = Settings::load(std::path::Path::new(&config)).unwrap();
    assert_eq!(settings.analysis.filter, None);
}
