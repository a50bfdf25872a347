use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_failing_command_file_exits_one() {
    let temp = TempDir::new().unwrap();
    let commands = temp.path().join("init.cmd");
    fs::write(&commands, "print hello\nnope\n").unwrap();

    Command::cargo_bin("tw")
        .unwrap()
        .arg("--commands")
        .arg(&commands)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("OUT: hello"))
        .stderr(predicate::str::contains("Command \"nope\" at line 2 failed"));
}

#[test]
fn test_interactive_session_ends_on_quit() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("w.output");

    Command::cargo_bin("tw")
        .unwrap()
        .write_stdin(format!("setoutputfile {}\nupdate\nquit\nprint unreachable\n", out.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("unreachable").not());

    assert_eq!(fs::read_to_string(&out).unwrap(), "nx -0\nny -0\nnz -0\n");
}
