use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;
use trackgate_core::store::FIRST_RUN_KEY;
use trackgate_core::{Database, HitKind, SettingsStore};

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    /// Same environment with a tracking key configured
    fn configured() -> Self {
        let env = Self::new();
        env.write_config(
            r#"
[tracker]
tracking_key = "UA-TEST-1"

[dispatch]
workers = 1
"#,
        );
        env
    }

    fn write_config(&self, contents: &str) {
        let dir = self.xdg_config.join("trackgate");
        fs::create_dir_all(&dir).expect("failed to create config dir");
        fs::write(dir.join("config.toml"), contents).expect("failed to write config");
    }

    fn db_path(&self) -> PathBuf {
        self.xdg_data.join("trackgate/hits.db")
    }

    fn open_db(&self) -> Database {
        let db = Database::open(&self.db_path()).expect("failed to open db");
        db.migrate().expect("failed to migrate db");
        db
    }
}

fn run_bin(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("trackgate"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute trackgate: {e}"))
}

fn render_args(args: &[&str]) -> String {
    args.iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "trackgate {} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        render_args(args),
        output.status,
        stdout,
        stderr
    );
}

fn run_ok(env: &CliTestEnv, args: &[&str]) -> String {
    let output = run_bin(env, args);
    assert_success(args, &output);
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn event_is_recorded_in_hit_store() {
    let env = CliTestEnv::configured();

    let stdout = run_ok(
        &env,
        &["event", "ui", "click", "--label", "button_x", "--value", "1"],
    );
    assert!(
        stdout.contains("Recorded 1 hit(s) under UA-TEST-1"),
        "unexpected stdout:\n{stdout}"
    );

    let db = env.open_db();
    let hits = db.list_recent_hits(10).expect("failed to list hits");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].kind, HitKind::Event);
    assert_eq!(hits[0].category.as_deref(), Some("ui"));
    assert_eq!(hits[0].action.as_deref(), Some("click"));
    assert_eq!(hits[0].label.as_deref(), Some("button_x"));
    assert_eq!(hits[0].value, Some(1));
    assert_eq!(hits[0].tracking_key, "UA-TEST-1");
}

#[test]
fn first_run_is_reported_only_by_the_first_invocation() {
    let env = CliTestEnv::configured();

    run_ok(&env, &["page", "/home"]);
    run_ok(&env, &["page", "/settings"]);

    let db = env.open_db();
    assert!(!db.get_bool(FIRST_RUN_KEY, true).unwrap());
    assert_eq!(db.list_custom_variables().unwrap().len(), 2);
    assert_eq!(db.count_hits().unwrap(), 2);

    let stdout = run_ok(&env, &["status"]);
    assert!(stdout.contains("First run:       reported"));
    assert!(stdout.contains("Hits recorded:   2"));
}

#[test]
fn disable_flag_records_nothing() {
    let env = CliTestEnv::configured();

    let stdout = run_ok(&env, &["page", "/home", "--disable"]);
    assert!(stdout.contains("Analytics disabled"), "unexpected stdout:\n{stdout}");

    assert_eq!(env.open_db().count_hits().unwrap(), 0);
}

#[test]
fn disabled_in_config_records_nothing() {
    let env = CliTestEnv::new();
    env.write_config(
        r#"
[tracker]
tracking_key = "UA-TEST-1"

[dispatch]
enabled = false
"#,
    );

    run_ok(&env, &["event", "ui", "click"]);
    assert_eq!(env.open_db().count_hits().unwrap(), 0);
}

#[test]
fn missing_tracking_key_fails() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, &["page", "/home"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("tracking_key"),
        "expected tracking key error, got:\n{stderr}"
    );
}

#[test]
fn hits_lists_newest_first_as_json() {
    let env = CliTestEnv::configured();
    run_ok(&env, &["page", "/first"]);
    run_ok(&env, &["event", "ui", "scroll", "--value", "-3"]);

    let stdout = run_ok(&env, &["hits", "--json"]);
    let hits: serde_json::Value = serde_json::from_str(&stdout).expect("hits output is JSON");
    let hits = hits.as_array().expect("hits output is an array");

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0]["kind"], "event");
    assert_eq!(hits[0]["value"], -3);
    assert_eq!(hits[1]["path"], "/first");
    assert_eq!(hits[1]["custom_variables"][0]["name"], "apiLevel");

    let table = run_ok(&env, &["hits", "-n", "1"]);
    assert!(table.contains("ui / scroll /  / -3"), "unexpected table:\n{table}");
    assert!(!table.contains("/first"));
}

#[test]
fn status_without_config_shows_defaults() {
    let env = CliTestEnv::new();

    let stdout = run_ok(&env, &["status"]);
    assert!(stdout.contains("Tracking key:    <not set>"));
    assert!(stdout.contains("Timeout:         300s"));
    assert!(stdout.contains("First run:       pending"));
    assert!(stdout.contains("Last start:      never"));
}
