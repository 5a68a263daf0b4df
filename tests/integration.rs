use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn logsync_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("logsync");
    path
}

struct Env {
    tmp: TempDir,
    config_path: PathBuf,
}

impl Env {
    fn root(&self) -> &Path {
        self.tmp.path()
    }

    fn source(&self) -> PathBuf {
        self.root().join("logs.json")
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.root().join(name))
            .unwrap_or_else(|e| panic!("failed to read {}: {}", name, e))
    }
}

fn setup_test_env() -> Env {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    let config_content = format!(
        r#"[store]
database = "logs_db"
collection = "logs"
connect_timeout_secs = 5

[paths]
source = "{root}/logs.json"
export_csv = "{root}/logs.csv"
aggregate_csv = "{root}/stats_actions.csv"
report_csv = "{root}/sync_report.csv"

[sync]
id_field = "_id"
group_by = "action"
clear_policy = "on_full_success"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("logsync.toml");
    fs::write(&config_path, config_content).unwrap();

    Env { tmp, config_path }
}

fn db_url(env: &Env) -> String {
    format!("sqlite:{}", env.root().join("data").join("logs.db").display())
}

struct Run {
    stdout: String,
    stderr: String,
    code: Option<i32>,
}

impl Run {
    fn success(&self) -> bool {
        self.code == Some(0)
    }
}

fn run_with_url(env: &Env, url: Option<&str>, args: &[&str]) -> Run {
    let binary = logsync_binary();
    let mut cmd = Command::new(&binary);
    cmd.current_dir(env.root())
        .env_remove("LOGSYNC_DATABASE_URL")
        .env_remove("LOGSYNC_DATABASE")
        .env_remove("LOGSYNC_COLLECTION")
        .env_remove("LOGSYNC_SOURCE")
        .env_remove("LOGSYNC_KEEP_SOURCE")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(env.config_path.to_str().unwrap())
        .args(args);
    if let Some(url) = url {
        cmd.env("LOGSYNC_DATABASE_URL", url);
    }
    let output = cmd
        .output()
        .unwrap_or_else(|e| panic!("Failed to run logsync binary at {:?}: {}", binary, e));

    Run {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        code: output.status.code(),
    }
}

fn run(env: &Env, args: &[&str]) -> Run {
    run_with_url(env, Some(&db_url(env)), args)
}

const SAMPLE_LOGS: &str = r#"[
  {"user": "amel", "action": "login", "details": {}, "timestamp": "2026-01-05T10:00:00+01:00"},
  {"user": "amel", "action": "post_ad", "details": {"title": "Vélo", "price": 120}, "timestamp": "2026-01-05T10:02:00+01:00"},
  {"action": "login", "user": "amel", "timestamp": "2026-01-05T10:00:00+01:00", "details": {}},
  {"user": "visiteur", "action": "login", "details": [], "timestamp": "2026-01-05T11:00:00+01:00"}
]"#;

#[test]
fn test_init_creates_database() {
    let env = setup_test_env();

    let r = run(&env, &["init"]);
    assert!(r.success(), "init failed: stdout={}, stderr={}", r.stdout, r.stderr);
    assert!(r.stdout.contains("initialized"));
    assert!(env.root().join("data").join("logs.db").exists());

    let again = run(&env, &["init"]);
    assert!(again.success(), "second init failed (not idempotent)");
}

#[test]
fn test_sync_inserts_clears_and_exports() {
    let env = setup_test_env();
    fs::write(env.source(), SAMPLE_LOGS).unwrap();

    let r = run(&env, &["sync", "--progress", "off"]);
    assert!(r.success(), "sync failed: stdout={}, stderr={}", r.stdout, r.stderr);
    assert!(r.stdout.contains("loaded: 4 records"), "{}", r.stdout);
    assert!(r.stdout.contains("inserted: 3"), "{}", r.stdout);
    assert!(r.stdout.contains("already present: 1"), "{}", r.stdout);
    assert!(r.stdout.contains("source cleared: yes"), "{}", r.stdout);
    assert!(r.stdout.contains("ok"));

    assert_eq!(fs::read_to_string(env.source()).unwrap(), "[]");

    let logs = env.read("logs.csv");
    let mut lines = logs.lines();
    assert_eq!(lines.next(), Some("_id,user,action,details,timestamp"));
    assert_eq!(logs.lines().count(), 4);
    assert!(logs.contains(r#""{""price"":120,""title"":""Vélo""}""#), "{}", logs);

    assert_eq!(env.read("stats_actions.csv"), "action,count\nlogin,2\npost_ad,1\n");

    let report = env.read("sync_report.csv");
    let row = report.lines().nth(1).unwrap();
    assert!(row.ends_with(",4,3,1,0,3"), "{}", report);
}

#[test]
fn test_sync_idempotent_no_duplicates() {
    let env = setup_test_env();

    fs::write(env.source(), SAMPLE_LOGS).unwrap();
    let first = run(&env, &["sync", "--progress", "off"]);
    assert!(first.stdout.contains("inserted: 3"), "{}", first.stdout);
    let exported = env.read("logs.csv");

    // Same entries again: nothing new.
    fs::write(env.source(), SAMPLE_LOGS).unwrap();
    let second = run(&env, &["sync", "--progress", "off"]);
    assert!(second.success(), "stderr={}", second.stderr);
    assert!(second.stdout.contains("inserted: 0"), "{}", second.stdout);
    assert!(second.stdout.contains("already present: 4"), "{}", second.stdout);
    assert!(second.stdout.contains("total documents: 3"), "{}", second.stdout);
    assert_eq!(env.read("logs.csv"), exported);
}

#[test]
fn test_single_object_source() {
    let env = setup_test_env();
    fs::write(env.source(), r#"{"action":"login"}"#).unwrap();

    let r = run(&env, &["sync", "--progress", "off"]);
    assert!(r.success(), "stderr={}", r.stderr);
    assert!(r.stdout.contains("inserted: 1"), "{}", r.stdout);
    assert_eq!(env.read("stats_actions.csv"), "action,count\nlogin,1\n");
}

#[test]
fn test_missing_source_is_empty_run() {
    let env = setup_test_env();

    let r = run(&env, &["sync", "--progress", "off"]);
    assert!(r.success(), "stderr={}", r.stderr);
    assert!(r.stdout.contains("loaded: 0 records"), "{}", r.stdout);
    assert!(!env.source().exists());
    assert_eq!(env.read("logs.csv"), "_id\n");
    assert_eq!(env.read("stats_actions.csv"), "action,count\n");
}

#[test]
fn test_missing_connection_string_exits_2() {
    let env = setup_test_env();
    fs::write(env.source(), SAMPLE_LOGS).unwrap();

    let r = run_with_url(&env, None, &["sync"]);
    assert_eq!(r.code, Some(2), "stderr={}", r.stderr);
    assert!(r.stderr.contains("connection string"), "{}", r.stderr);
    assert_eq!(fs::read_to_string(env.source()).unwrap(), SAMPLE_LOGS);
    assert!(!env.root().join("logs.csv").exists());
}

#[test]
fn test_malformed_input_is_rejected() {
    for content in ["not json", "[1, 2, 3]"] {
        let env = setup_test_env();
        fs::write(env.source(), content).unwrap();

        let r = run(&env, &["sync"]);
        assert_eq!(r.code, Some(1), "content={:?} stderr={}", content, r.stderr);
        assert!(r.stderr.contains("malformed input"), "{}", r.stderr);
        assert_eq!(fs::read_to_string(env.source()).unwrap(), content);
        assert!(!env.root().join("logs.csv").exists());

        let stats = run(&env, &["stats"]);
        assert!(stats.stdout.contains("Documents:   0"), "{}", stats.stdout);
    }
}

#[test]
fn test_unreachable_store_exits_1() {
    let env = setup_test_env();
    fs::write(env.source(), SAMPLE_LOGS).unwrap();
    let url = format!(
        "sqlite:{}",
        env.root().join("missing").join("logs.db").display()
    );

    let r = run_with_url(&env, Some(&url), &["sync"]);
    assert_eq!(r.code, Some(1), "stderr={}", r.stderr);
    assert!(r.stderr.contains("cannot connect"), "{}", r.stderr);
    assert_eq!(fs::read_to_string(env.source()).unwrap(), SAMPLE_LOGS);
}

#[test]
fn test_keep_source_flag() {
    let env = setup_test_env();
    fs::write(env.source(), SAMPLE_LOGS).unwrap();

    let r = run(&env, &["sync", "--keep-source", "--progress", "off"]);
    assert!(r.success(), "stderr={}", r.stderr);
    assert!(r.stdout.contains("source cleared: no"), "{}", r.stdout);
    assert_eq!(fs::read_to_string(env.source()).unwrap(), SAMPLE_LOGS);
}

#[test]
fn test_partial_failure_keeps_source() {
    let env = setup_test_env();
    let mut entries: Vec<String> = (0..9)
        .map(|i| format!(r#"{{"action":"click","n":{}}}"#, i))
        .collect();
    entries.insert(4, r#"{"_id":["bad"],"action":"click"}"#.to_string());
    let content = format!("[{}]", entries.join(","));
    fs::write(env.source(), &content).unwrap();

    let r = run(&env, &["sync", "--progress", "off"]);
    assert!(r.success(), "stderr={}", r.stderr);
    assert!(r.stdout.contains("inserted: 9"), "{}", r.stdout);
    assert!(r.stdout.contains("failed: 1"), "{}", r.stdout);
    assert!(r.stdout.contains("record 4:"), "{}", r.stdout);
    assert!(r.stdout.contains("partial"), "{}", r.stdout);
    assert_eq!(fs::read_to_string(env.source()).unwrap(), content);
    assert_eq!(env.read("stats_actions.csv"), "action,count\nclick,9\n");
}

#[test]
fn test_export_empty_store() {
    let env = setup_test_env();
    run(&env, &["init"]);

    let r = run(&env, &["export"]);
    assert!(r.success(), "stderr={}", r.stderr);
    assert!(r.stdout.contains("documents: 0"), "{}", r.stdout);
    assert_eq!(env.read("logs.csv"), "_id\n");
    assert_eq!(env.read("stats_actions.csv"), "action,count\n");
}

#[test]
fn test_stats_lists_groups() {
    let env = setup_test_env();
    fs::write(env.source(), SAMPLE_LOGS).unwrap();
    run(&env, &["sync", "--progress", "off"]);

    let r = run(&env, &["stats"]);
    assert!(r.success(), "stderr={}", r.stderr);
    assert!(r.stdout.contains("Documents:   3"), "{}", r.stdout);
    assert!(r.stdout.contains("logs_db.logs"), "{}", r.stdout);
    assert!(r.stdout.contains("login"), "{}", r.stdout);
}
