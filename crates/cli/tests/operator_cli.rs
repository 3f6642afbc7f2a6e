use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

struct Env {
    _tmp: tempfile::TempDir,
    config: PathBuf,
    home: PathBuf,
}

/// Config pointing at a closed local port so every sync attempt fails fast.
fn make_env() -> Env {
    let tmp = tempfile::tempdir().expect("tempdir");
    let home = tmp.path().join("home");
    let data = tmp.path().join("data");
    fs::create_dir_all(&home).expect("create home");
    let config = tmp.path().join("campcook.toml");
    let body = format!(
        "[server]\nhost = \"127.0.0.1\"\nport = 9\n\n[sync]\nmax_retries = 0\nconnect_timeout_secs = 2\nrequest_timeout_secs = 2\n\n[storage]\ndata_dir = {:?}\n",
        data.to_string_lossy()
    );
    fs::write(&config, body).expect("write config");
    Env {
        _tmp: tmp,
        config,
        home,
    }
}

fn run(env: &Env, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_campcook"))
        .args(args)
        .env("CAMPCOOK_CONFIG", &env.config)
        .env("HOME", &env.home)
        .env("RUST_LOG", "error")
        .env_remove("CAMPCOOK_SERVER_HOST")
        .env_remove("CAMPCOOK_SERVER_PORT")
        .env_remove("CAMPCOOK_DATA_DIR")
        .output()
        .expect("run campcook")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn set_team(env: &Env) {
    let output = run(
        env,
        &[
            "team", "set", "--school", "Hill", "--grade", "5", "--class", "2", "--stove", "7",
            "--members", "Ana,Bo,Cy",
        ],
    );
    assert!(output.status.success(), "team set failed: {}", stderr(&output));
}

fn write_media(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"jpeg").expect("write media");
    path
}

#[test]
fn help_lists_operator_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_campcook"))
        .arg("--help")
        .output()
        .expect("run help");
    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["team", "stage", "media", "sync", "pending", "reset", "config"] {
        assert!(text.contains(command), "missing {command} in help:\n{text}");
    }
}

#[test]
fn edits_are_kept_while_collector_is_unreachable() {
    let env = make_env();
    set_team(&env);

    let output = run(&env, &["rate", "4"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("sync: pending"), "{}", stdout(&output));

    let output = run(&env, &["note", "packed the kit"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let status = stdout(&run(&env, &["status"]));
    assert!(status.contains("Hill_5_2_7"), "{status}");
    assert!(status.contains("Very good"), "{status}");
    assert!(status.contains("packed the kit"), "{status}");

    let pending = stdout(&run(&env, &["pending"]));
    assert!(pending.contains("Hill_5_2_7"), "{pending}");

    let output = run(&env, &["sync"]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("still pending"), "{}", stdout(&output));
}

#[test]
fn skipping_stages_needs_confirmation() {
    let env = make_env();
    set_team(&env);

    let output = run(&env, &["--no-wait", "stage", "start", "showcase"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("--yes"), "{}", stderr(&output));
    assert!(stdout(&run(&env, &["status"])).contains("stage:   Preparation"));

    let output = run(&env, &["--no-wait", "stage", "next"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("Now on Fire making"), "{}", stdout(&output));

    let output = run(&env, &["--no-wait", "stage", "start", "5", "--yes"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&run(&env, &["status"])).contains("stage:   Showcase"));
}

#[test]
fn completed_stage_is_frozen_until_reopened() {
    let env = make_env();
    set_team(&env);
    assert!(run(&env, &["--no-wait", "stage", "next"]).status.success());

    let output = run(&env, &["--no-wait", "rate", "3", "--stage", "preparation"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("already completed"), "{}", stderr(&output));

    let output = run(&env, &["--no-wait", "stage", "reopen", "1", "--yes"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let output = run(&env, &["--no-wait", "rate", "3", "--stage", "preparation"]);
    assert!(output.status.success(), "{}", stderr(&output));
}

#[test]
fn invalid_input_is_rejected() {
    let env = make_env();
    set_team(&env);

    let output = run(&env, &["--no-wait", "rate", "9"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("outside"), "{}", stderr(&output));

    let output = run(&env, &["--no-wait", "media", "rm", "0"]);
    assert!(!output.status.success());

    let output = run(&env, &["config", "set", "--port", "70000"]);
    assert!(!output.status.success());
    let config = fs::read_to_string(&env.config).expect("read config");
    assert!(config.contains("port = 9"), "{config}");
}

#[test]
fn dry_run_prints_the_submission() {
    let env = make_env();
    set_team(&env);
    let media = write_media(&env.home, "kit.jpg");
    let output = run(
        &env,
        &["--no-wait", "media", "add", media.to_str().expect("utf8 path")],
    );
    assert!(output.status.success(), "{}", stderr(&output));

    let output = run(&env, &["sync", "--dry-run"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    let json_start = text.find('{').expect("json body");
    let body: serde_json::Value = serde_json::from_str(&text[json_start..]).expect("json");
    assert_eq!(body["teamInfo"]["stoveNumber"], "7");
    assert_eq!(body["processRecord"]["currentStage"], "PREPARATION");
    let items = body["processRecord"]["stages"]["PREPARATION"]["mediaItems"]
        .as_array()
        .expect("media items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["type"], "PHOTO");
}

#[test]
fn reset_discards_team_and_media() {
    let env = make_env();
    set_team(&env);
    let media = write_media(&env.home, "a.jpg");
    assert!(
        run(&env, &["--no-wait", "media", "add", media.to_str().expect("utf8 path")])
            .status
            .success()
    );

    let output = run(&env, &["reset"]);
    assert!(!output.status.success(), "reset without --yes must refuse");
    assert!(media.exists());

    let output = run(&env, &["reset", "--yes"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(!media.exists());
    assert!(stdout(&run(&env, &["status"])).contains("No active team"));
    assert!(stdout(&run(&env, &["pending"])).contains("Nothing pending"));
}
