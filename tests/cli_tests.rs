// Command-line tests for the minjs binary

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

fn minjs() -> Command {
    let mut cmd = Command::cargo_bin("minjs").unwrap();
    cmd.env_remove("MINJS_LOG");
    cmd
}

fn script(dir: &TempDir, name: &str, source: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, source).unwrap();
    path
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_batch_expression_prints_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(&dir, "sum.js", "2+2;\n");
    let output = minjs().arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty());
}

#[test]
fn test_interactive_echoes_results() {
    let output = minjs().write_stdin("1+1\n").output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout_of(&output), "js> 2\njs> \n");
}

#[test]
fn test_interactive_multiline_unit_and_errors() {
    let output = minjs()
        .write_stdin("function f(x) {\nreturn x * 3;\n}\nf(2)\nthrow 1\n'after'\n")
        .output()
        .unwrap();
    assert_eq!(stdout_of(&output), "js> js> 6\njs> js> after\njs> \n");
    assert_eq!(stderr_of(&output), "typein:5: uncaught exception: 1\n");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_missing_file() {
    let output = minjs().arg("no-such-script.js").output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert_eq!(
        stderr_of(&output),
        "can't open no-such-script.js: No such file or directory\n"
    );
}

#[test]
fn test_usage_error() {
    let output = minjs().arg("-x").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = stderr_of(&output);
    assert!(stderr.starts_with("minjs "), "{}", stderr);
    assert!(stderr.contains("usage: minjs [-PswW] [-b branchlimit]"));
}

#[test]
fn test_missing_flag_parameter_is_usage_error() {
    let output = minjs().arg("-f").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_syntax_error_shows_caret() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(&dir, "bad.js", "var ok = 1;\nvar x = ;\n");
    let output = minjs().arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    let prefix = format!("{}:2: ", path.display());
    assert_eq!(
        stderr_of(&output),
        format!(
            "{p}syntax error:\n{p}var x = ;\n{p}........^\n",
            p = prefix
        )
    );
}

#[test]
fn test_branch_limit_aborts_loop() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(&dir, "loop.js", "print('start');\nwhile (true) {}\nprint('never');\n");
    let output = minjs().arg("-b").arg("100").arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(stdout_of(&output), "start\n");
    assert_eq!(
        stderr_of(&output),
        format!("{}:2: script branches too much\n", path.display())
    );
}

#[test]
fn test_stack_limit_reports_recursion() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(&dir, "deep.js", "function f(n) { return f(n + 1); }\nf(0);\n");
    let output = minjs().arg("-S").arg("65536").arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr_of(&output).contains("InternalError: too much recursion"));
}

#[test]
fn test_script_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(&dir, "args.js", "print(arguments.length, arguments.join('|'));\n");
    let output = minjs()
        .arg(&path)
        .args(["one", "-w", "three"])
        .output()
        .unwrap();
    assert_eq!(stdout_of(&output), "3 one|-w|three\n");
}

#[test]
fn test_run_files_in_order_then_script() {
    let dir = tempfile::tempdir().unwrap();
    let first = script(&dir, "first.js", "var trail = 'first';\n");
    let second = script(&dir, "second.js", "trail += ',second';\n");
    let main = script(&dir, "main.js", "print(trail + ',main');\n");
    let output = minjs()
        .arg("-f")
        .arg(&first)
        .arg("-f")
        .arg(&second)
        .arg(&main)
        .output()
        .unwrap();
    assert_eq!(stdout_of(&output), "first,second,main\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_run_file_disables_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(&dir, "only.js", "print('only');\n");
    let output = minjs().arg("-f").arg(&path).write_stdin("1+1\n").output().unwrap();
    assert_eq!(stdout_of(&output), "only\n");
}

#[test]
fn test_quit_sets_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(&dir, "quit.js", "print('bye');\nquit(5);\nprint('unreachable');\n");
    let output = minjs().arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(5));
    assert_eq!(stdout_of(&output), "bye\n");
}

#[test]
fn test_quit_ends_interactive_session() {
    let output = minjs().write_stdin("quit()\n1+1\n").output().unwrap();
    assert_eq!(stdout_of(&output), "js> \n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_shebang_line_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(&dir, "tool.js", "#!/usr/bin/env minjs\nprint('ran');\nundefined_name;\n");
    let output = minjs().arg(&path).output().unwrap();
    assert_eq!(stdout_of(&output), "ran\n");
    // Line numbers still count the shebang line.
    assert_eq!(
        stderr_of(&output),
        format!(
            "{}:3: ReferenceError: undefined_name is not defined\n",
            path.display()
        )
    );
}

#[test]
fn test_stdin_script_with_dash() {
    let output = minjs().arg("-").write_stdin("print(6 * 7);\n").output().unwrap();
    assert_eq!(stdout_of(&output), "42\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_strict_warnings_and_suppression() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(&dir, "strict.js", "x = 1;\n");

    let output = minjs().arg("-s").arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stderr_of(&output),
        format!(
            "{}:1: strict warning: assignment to undeclared variable x\n",
            path.display()
        )
    );

    let output = minjs().arg("-s").arg("-W").arg(&path).output().unwrap();
    assert!(output.stderr.is_empty());
}

#[test]
fn test_version_flag_controls_let() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(&dir, "let.js", "var let = 2;\nprint(let * 2);\n");
    let output = minjs().arg("-v").arg("150").arg(&path).output().unwrap();
    assert_eq!(stdout_of(&output), "4\n");

    let output = minjs().arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[cfg(target_os = "linux")]
#[test]
fn test_native_puts_through_dlsym() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(
        &dir,
        "puts.js",
        r#"
        var dlsym = get_dlsym();
        var puts = ffi_call(dlsym, 0, "puts");
        ffi_call(puts, "hello from puts");
        "#,
    );
    let output = minjs().arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout_of(&output).contains("hello from puts\n"));
}

#[test]
fn test_warning_flags_apply_in_order_between_files() {
    let dir = tempfile::tempdir().unwrap();
    let first = script(&dir, "first.js", "a1 = 1;\n");
    let second = script(&dir, "second.js", "b1 = 1;\n");
    let third = script(&dir, "third.js", "c1 = 1;\n");
    let output = minjs()
        .arg("-s")
        .arg("-f")
        .arg(&first)
        .arg("-W")
        .arg("-f")
        .arg(&second)
        .arg("-w")
        .arg("-f")
        .arg(&third)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stderr_of(&output),
        format!(
            "{}:1: strict warning: assignment to undeclared variable a1\n\
             {}:1: strict warning: assignment to undeclared variable c1\n",
            first.display(),
            third.display()
        )
    );
}

#[test]
fn test_huge_chunk_size_still_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(&dir, "chunk.js", "print('ok');\n");
    let output = minjs()
        .arg("-c")
        .arg("99999999999999")
        .arg(&path)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout_of(&output), "ok\n");
}

#[test]
fn test_unchecked_stack_allows_deep_recursion() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(
        &dir,
        "depth.js",
        "function f(n) { if (n == 0) return 0; return 1 + f(n - 1); }\nprint(f(300));\n",
    );
    let output = minjs().arg("-S").arg("0").arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout_of(&output), "300\n");
    assert!(output.stderr.is_empty());
}

#[test]
fn test_interactive_character_across_line_buffer() {
    let padding = "a".repeat(247);
    let output = minjs()
        .write_stdin(format!("print('{}é')\n", padding))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stderr.is_empty());
    assert_eq!(stdout_of(&output), format!("js> {}é\njs> \n", padding));
}
