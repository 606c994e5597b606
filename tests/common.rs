#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use std::env;
use std::fs;
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::{Child, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// The binary, reading `config` instead of ~/.parkmon/parkmon.conf
pub fn pkm(config: &str) -> Command {
    let mut cmd = cargo_bin_cmd!("parkmon");
    cmd.args(["--config", config]);
    cmd
}

/// Write a per-test config file pointing at `db_path`; `extra` is appended as raw YAML
pub fn write_config(name: &str, db_path: &str, extra: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_parkmon.conf", name));
    let yaml = format!("database: '{}'\nbackend: simulated\n{}", db_path, extra);
    fs::write(&path, yaml).expect("write test config");
    path.to_string_lossy().to_string()
}

/// Create a unique test DB path inside the system temp dir and remove any existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_parkmon.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    for suffix in ["", "-wal", "-shm", "-journal"] {
        fs::remove_file(format!("{}{}", db_path, suffix)).ok();
    }
    db_path
}

/// Create a temporary output file path inside tempdir and ensure it's removed
pub fn temp_out(name: &str, ext: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_parkmon_out.{}", name, ext));
    let p = path.to_string_lossy().to_string();
    fs::remove_file(&p).ok();
    p
}

/// Initialize the DB through the CLI (schema + migrations)
pub fn init_db(config: &str, db_path: &str) {
    pkm(config)
        .args(["--db", db_path, "--test", "init"])
        .assert()
        .success();
}

/// A loopback address nobody is listening on right now.
pub fn free_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let addr = listener.local_addr().expect("probe addr");
    addr.to_string()
}

/// `parkmon serve --simulate` as a child process; killed on drop.
pub struct Daemon {
    child: Child,
    pub addr: String,
}

impl Daemon {
    pub fn start(config: &str, db_path: &str) -> Daemon {
        let addr = free_addr();
        let child = std::process::Command::new(env!("CARGO_BIN_EXE_parkmon"))
            .args(["--config", config, "--db", db_path, "--addr", &addr])
            .args(["serve", "--simulate"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn parkmon serve");

        let deadline = Instant::now() + Duration::from_secs(10);
        while TcpStream::connect(&addr).is_err() {
            assert!(Instant::now() < deadline, "daemon did not start listening");
            thread::sleep(Duration::from_millis(50));
        }

        Daemon { child, addr }
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        self.child.kill().ok();
        self.child.wait().ok();
    }
}
