//! SIGINT and SIGTERM end a `tc` session without orphaning its workers

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use serial_test::serial;
use tempfile::TempDir;
use tickproto::notify::is_alive;

const DEADLINE: Duration = Duration::from_secs(10);
const STARTED: &str = "OUT: started a (pid ";

struct Session {
    _temp: TempDir,
    runtime: PathBuf,
    child: Child,
    // held open so the prompt keeps waiting
    _stdin: Option<ChildStdin>,
    worker: u32,
}

/// Start `tc` with a `sleep` worker that never reports ready
fn session(ack_timeout_ms: u64, extra: &[&str], commands: Option<&str>, stdin: Option<&str>) -> Session {
    let temp = TempDir::new().unwrap();
    let runtime = temp.path().join("rt");
    let settings = temp.path().join("settings.yml");
    fs::write(&settings, format!("ack-timeout-ms: {ack_timeout_ms}\n")).unwrap();

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tc"));
    cmd.env("XDG_DATA_HOME", temp.path().join("data"))
        .env("XDG_CONFIG_HOME", temp.path().join("config"))
        .current_dir(temp.path())
        .arg("mesh.cfg")
        .arg("--settings")
        .arg(&settings)
        .arg("-r")
        .arg(&runtime)
        .args(extra)
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    if let Some(lines) = commands {
        let path = temp.path().join("boot.cmd");
        fs::write(&path, lines).unwrap();
        cmd.arg("-C").arg(path);
    }
    cmd.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() });

    let mut child = cmd.spawn().unwrap();
    let pipe = stdin.map(|lines| {
        let mut pipe = child.stdin.take().unwrap();
        pipe.write_all(lines.as_bytes()).unwrap();
        pipe
    });
    let worker = started_pid(child.stdout.take().unwrap());

    Session {
        _temp: temp,
        runtime,
        child,
        _stdin: pipe,
        worker,
    }
}

fn started_pid(stdout: ChildStdout) -> u32 {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            // the prompt may share the line when stdin is not a terminal
            if let Some(at) = line.find(STARTED) {
                let pid = line[at + STARTED.len()..].trim_end_matches(')');
                let _ = tx.send(pid.parse::<u32>().unwrap());
            }
        }
    });
    rx.recv_timeout(DEADLINE).expect("worker never started")
}

fn wait_until<F: FnMut() -> bool>(mut done: F) -> bool {
    let deadline = Instant::now() + DEADLINE;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

fn interrupt_and_check(mut s: Session, signal: Signal) {
    assert!(is_alive(s.worker));
    thread::sleep(Duration::from_millis(400));
    kill(Pid::from_raw(s.child.id() as i32), signal).unwrap();

    let mut status = None;
    let exited = wait_until(|| {
        status = s.child.try_wait().unwrap();
        status.is_some()
    });
    if !exited {
        let _ = s.child.kill();
        let _ = kill(Pid::from_raw(s.worker as i32), Signal::SIGKILL);
        panic!("tc ignored {:?}", signal);
    }

    assert!(status.unwrap().success(), "{:?}", status);
    assert!(wait_until(|| !is_alive(s.worker)), "worker {} orphaned", s.worker);
    assert!(!s.runtime.exists());
}

#[test]
#[serial]
fn test_sigint_during_batch_command_stops_workers() {
    // updateall blocks on a worker that never acknowledges
    let s = session(60_000, &["--child"], Some("addchild a sleep 377\nstart\nupdateall\n"), None);
    interrupt_and_check(s, Signal::SIGINT);
}

#[test]
#[serial]
fn test_sigint_during_run_stops_workers() {
    let s = session(100, &["--child"], Some("addchild a sleep 377\nstart\ntargetinterval 0.05\nrun\n"), None);
    interrupt_and_check(s, Signal::SIGINT);
}

#[test]
#[serial]
fn test_sigterm_at_prompt_stops_workers() {
    let s = session(100, &[], None, Some("addchild a sleep 377\nstart\n"));
    interrupt_and_check(s, Signal::SIGTERM);
}
