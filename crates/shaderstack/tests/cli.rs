use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn shaderstack(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_shaderstack"))
        .env_remove("SHADERSTACK_CONFIG")
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run shaderstack")
}

fn parse_stdout(output: &Output) -> toml::Table {
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    stdout.parse().unwrap_or_else(|err| panic!("{err}\n{stdout}"))
}

fn names(table: &toml::Table, array: &str, key: &str) -> Vec<String> {
    table
        .get(array)
        .and_then(toml::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(key)?.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn print_config_emits_builtin_stack() {
    let home = TempDir::new().unwrap();
    let output = shaderstack(home.path(), &["--print-config", "--size", "640x480"]);
    assert!(output.status.success(), "{output:?}");

    let printed = parse_stdout(&output);
    let size = printed["window"]["size"].as_array().unwrap();
    assert_eq!(size, &[toml::Value::Integer(640), toml::Value::Integer(480)]);
    assert_eq!(names(&printed, "scenes", "name"), ["color-cycle", "red-rectangles", "blue-waves"]);
    assert_eq!(names(&printed, "effects", "kind"), ["brightness", "godrays"]);
}

#[test]
fn print_config_reads_config_from_env() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("stack.toml");
    fs::write(
        &config_path,
        "[window]\ntitle = \"from-env\"\n\n[[scenes]]\nname = \"solid\"\nsource = \"void main() { gl_FragColor = vec4(1.0); }\"\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_shaderstack"))
        .env("SHADERSTACK_CONFIG", &config_path)
        .env("HOME", home.path())
        .env("RUST_LOG", "warn")
        .arg("--print-config")
        .output()
        .expect("failed to run shaderstack");
    assert!(output.status.success(), "{output:?}");
    let printed = parse_stdout(&output);
    assert_eq!(printed["window"]["title"].as_str(), Some("from-env"));
    assert_eq!(names(&printed, "scenes", "name"), ["solid"]);
    assert!(names(&printed, "effects", "kind").is_empty());
}

#[test]
fn check_validates_builtin_shaders() {
    let home = TempDir::new().unwrap();
    let output = shaderstack(home.path(), &["--check"]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("6 shader programs validated"), "{stdout}");
}

#[test]
fn check_reports_broken_scene() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("broken.toml");
    fs::write(&config_path, "[[scenes]]\nname = \"broken\"\npath = \"broken.frag\"\n").unwrap();
    fs::write(home.path().join("broken.frag"), "void main() { gl_FragColor = }\n").unwrap();

    let output = shaderstack(
        home.path(),
        &["--check", "--config", config_path.to_str().unwrap()],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("broken"), "{stderr}");
}

#[test]
fn invalid_config_fails_before_rendering() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("bad.toml");
    fs::write(
        &config_path,
        "[[scenes]]\nname = \"only\"\nsource = \"void main() {}\"\n\n[[effects]]\nkind = \"brightness\"\namount = { channel = 1, component = \"b\" }\n",
    )
    .unwrap();

    let output = shaderstack(
        home.path(),
        &["--print-config", "--config", config_path.to_str().unwrap()],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("channel 1"), "{stderr}");
}

#[test]
fn missing_config_file_is_an_error() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("nope.toml");
    let output = shaderstack(
        home.path(),
        &["--print-config", "--config", missing.to_str().unwrap()],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("nope.toml"), "{stderr}");
}
