// Integration tests for the script engine

use minjs::interpreter::{
    BranchAction, BranchSite, DiagnosticReport, Host, Runtime, RuntimeError, Severity,
};
use minjs::memory::value::Value;
use minjs::native::BRIDGE_FUNCTIONS;
use minjs::shell::builtins::SHELL_FUNCTIONS;
use std::io::Write;

#[derive(Default)]
struct TestHost {
    out: Vec<u8>,
    reports: Vec<DiagnosticReport>,
    branches: usize,
    branch_limit: Option<usize>,
    quit: Option<Option<i32>>,
}

impl Host for TestHost {
    fn report(&mut self, report: &DiagnosticReport) {
        self.reports.push(report.clone());
    }

    fn on_branch(&mut self, _site: &BranchSite<'_>) -> BranchAction {
        self.branches += 1;
        match self.branch_limit {
            Some(limit) if self.branches >= limit => BranchAction::Abort,
            _ => BranchAction::Continue,
        }
    }

    fn output(&mut self) -> &mut dyn Write {
        &mut self.out
    }

    fn request_quit(&mut self, exit_code: Option<i32>) {
        self.quit = Some(exit_code);
    }
}

impl TestHost {
    fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }

    fn messages(&self) -> Vec<&str> {
        self.reports.iter().map(|r| r.message.as_str()).collect()
    }
}

fn runtime() -> Runtime {
    let mut runtime = Runtime::new();
    runtime.define_functions(SHELL_FUNCTIONS);
    runtime.define_functions(BRIDGE_FUNCTIONS);
    runtime
}

fn run_in(runtime: &mut Runtime, host: &mut TestHost, source: &str) -> Result<Value, RuntimeError> {
    let script = runtime
        .compile(source, Some("test.js"), 1, host)
        .expect("compiles");
    runtime.execute(script, host)
}

fn run(source: &str) -> (Result<Value, RuntimeError>, TestHost) {
    let mut runtime = runtime();
    let mut host = TestHost::default();
    let result = run_in(&mut runtime, &mut host, source);
    (result, host)
}

/// Runs `f` on a thread with room for deep script recursion.
fn with_large_stack<F: FnOnce() + Send + 'static>(f: F) {
    std::thread::Builder::new()
        .stack_size(256 * 1024 * 1024)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap();
}

#[test]
fn test_completion_value_of_unit() {
    let (result, host) = run("var x = 2; x + 2;");
    assert_eq!(result.unwrap().to_number(), 4.0);
    assert!(host.output_text().is_empty());
}

#[test]
fn test_closures_and_recursion() {
    let (result, host) = run(
        r#"
        function counter() {
            var n = 0;
            return function () { n++; return n; };
        }
        var c = counter();
        c(); c();
        function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }
        print(c(), fib(10));
        "#,
    );
    assert!(result.is_ok());
    assert_eq!(host.output_text(), "3 55\n");
}

#[test]
fn test_functions_are_hoisted() {
    let (_, host) = run("print(twice(4)); function twice(x) { return x * 2; }");
    assert_eq!(host.output_text(), "8\n");
}

#[test]
fn test_try_catch_finally_order() {
    let (_, host) = run(
        r#"
        try {
            print("try");
            throw new_error();
        } catch (e) {
            print("catch", e.name);
        } finally {
            print("finally");
        }
        function new_error() { return TypeError("bad"); }
        "#,
    );
    assert_eq!(host.output_text(), "try\ncatch TypeError\nfinally\n");
}

#[test]
fn test_uncaught_error_object_report() {
    let (result, host) = run("var o;\no.field;");
    assert!(matches!(result, Err(RuntimeError::Thrown { .. })));
    assert_eq!(host.reports.len(), 1);
    let report = &host.reports[0];
    assert_eq!(report.message, "TypeError: o has no properties");
    assert_eq!(report.filename.as_deref(), Some("test.js"));
    assert_eq!(report.line, 2);
    assert_eq!(report.severity, Severity::Error);
}

#[test]
fn test_uncaught_primitive_report() {
    let mut runtime = runtime();
    let mut host = TestHost::default();
    let _ = run_in(&mut runtime, &mut host, "throw 42;");
    assert_eq!(host.messages(), vec!["uncaught exception: 42"]);
}

#[test]
fn test_undefined_variable_is_reference_error() {
    let (_, host) = run("missing + 1;");
    assert_eq!(host.messages(), vec!["ReferenceError: missing is not defined"]);
}

#[test]
fn test_calling_non_function() {
    let (_, host) = run("var n = 1; n();");
    assert_eq!(host.messages(), vec!["TypeError: n is not a function"]);
}

#[test]
fn test_const_assignment_throws() {
    let (_, host) = run(
        r#"
        const c = 1;
        try { c = 2; } catch (e) { print(e.message); }
        print(c);
        "#,
    );
    assert_eq!(host.output_text(), "invalid assignment to const c\n1\n");
}

#[test]
fn test_block_scoped_let() {
    let (_, host) = run(
        r#"
        var x = "outer";
        { let x = "inner"; print(x); }
        print(x);
        for (let i = 0; i < 2; i++) {}
        print(typeof i);
        "#,
    );
    assert_eq!(host.output_text(), "inner\nouter\nundefined\n");
}

#[test]
fn test_old_version_treats_let_as_identifier() {
    let mut runtime = runtime();
    runtime.set_version(150);
    let mut host = TestHost::default();
    let result = run_in(&mut runtime, &mut host, "var let = 5; let + 1;");
    assert_eq!(result.unwrap().to_number(), 6.0);
}

#[test]
fn test_compile_error_carries_source_line() {
    let mut runtime = runtime();
    let mut host = TestHost::default();
    let result = runtime.compile("var ok = 1;\nvar x = ;\n", Some("bad.js"), 1, &mut host);
    assert!(result.is_err());
    let report = &host.reports[0];
    assert_eq!(report.message, "syntax error");
    assert_eq!(report.line, 2);
    assert_eq!(report.line_buffer.as_deref(), Some("var x = ;\n"));
    assert_eq!(report.token_offset, 8);
}

#[test]
fn test_strict_warnings() {
    let mut runtime = runtime();
    runtime.set_strict(true);
    let mut host = TestHost::default();
    let _ = run_in(&mut runtime, &mut host, "undeclared = 1;\nvar o = {};\no.nothing;");
    assert_eq!(
        host.messages(),
        vec![
            "assignment to undeclared variable undeclared",
            "reference to undefined property nothing",
        ]
    );
    assert!(host
        .reports
        .iter()
        .all(|r| r.severity == Severity::StrictWarning));
}

#[test]
fn test_sealed_global_ignores_writes() {
    let mut runtime = runtime();
    runtime.set_strict(true);
    assert!(runtime.seal_global());
    let mut host = TestHost::default();
    let _ = run_in(&mut runtime, &mut host, "print = 5;\nprint('still here');\nfresh = 1;");
    assert_eq!(host.output_text(), "still here\n");
    assert_eq!(
        host.messages(),
        vec![
            "print is read-only",
            "assignment to undeclared variable fresh",
        ]
    );
    assert_eq!(runtime.global("fresh").map(|v| v.to_number()), Some(1.0));
}

#[test]
fn test_branch_abort_skips_catch_and_finally() {
    let mut runtime = runtime();
    runtime.set_branch_callback(true);
    let mut host = TestHost {
        branch_limit: Some(10),
        ..TestHost::default()
    };
    let result = run_in(
        &mut runtime,
        &mut host,
        "try { while (true) {} } catch (e) { print('caught'); } finally { print('finally'); }",
    );
    assert!(matches!(result, Err(RuntimeError::Aborted)));
    assert_eq!(host.branches, 10);
    assert!(host.output_text().is_empty());
    assert!(host.reports.is_empty());
}

#[test]
fn test_branch_callback_disabled_by_default() {
    let (result, host) = run("for (var i = 0; i < 100; i++) {} i;");
    assert_eq!(result.unwrap().to_number(), 100.0);
    assert_eq!(host.branches, 0);
}

#[test]
fn test_quit_aborts_and_records_code() {
    let (result, host) = run("print('a'); quit(5); print('b');");
    assert!(matches!(result, Err(RuntimeError::Aborted)));
    assert_eq!(host.output_text(), "a\n");
    assert_eq!(host.quit, Some(Some(5)));
}

#[test]
fn test_runaway_recursion_is_catchable() {
    with_large_stack(|| {
        let (_, host) = run(
            r#"
            function down(n) { return down(n + 1); }
            try { down(0); } catch (e) { print(e.name, e.message); }
            "#,
        );
        assert_eq!(host.output_text(), "InternalError too much recursion\n");
    });
}

#[test]
fn test_deep_recursion_without_stack_limit() {
    with_large_stack(|| {
        let (result, host) = run(
            "function f(n) { if (n == 0) return 0; return 1 + f(n - 1); }\nf(1000);",
        );
        assert_eq!(result.unwrap().to_number(), 1000.0);
        assert!(host.messages().is_empty());
    });
}

#[test]
fn test_stack_limit_stops_recursion() {
    with_large_stack(|| {
        let mut runtime = runtime();
        let marker = 0u8;
        let here = std::hint::black_box(&marker) as *const u8 as usize;
        runtime.set_stack_limit(Some(here - 16 * 1024));
        let mut host = TestHost::default();
        let _ = run_in(&mut runtime, &mut host, "function f() { return f(); }\nf();");
        assert_eq!(host.messages(), vec!["InternalError: too much recursion"]);
    });
}

#[test]
fn test_standard_library() {
    let (_, host) = run(
        r#"
        print("abc".toUpperCase(), "a,b".split(",").length, "hello".indexOf("l"));
        print((255).toString(16), (-1 >>> 0), parseInt("12px"), Math.max(3, 9, 4));
        var a = [3, 1];
        a.push(2);
        print(a.join("-"), a.length, a.concat([4], 5).slice(-2));
        print(String.fromCharCode(104, 105), typeof parseFloat, isNaN("x"));
        "#,
    );
    assert_eq!(
        host.output_text(),
        "ABC 2 2\nff 4294967295 12 9\n3-1-2 3 4,5\nhi function true\n"
    );
}

#[test]
fn test_objects_and_arrays() {
    let (_, host) = run(
        r#"
        var o = { name: "x", nested: { n: 1 } };
        o.nested.n += 41;
        o["dyn" + 1] = true;
        var arr = [];
        arr[3] = "z";
        print(o.nested.n, o.dyn1, arr.length, arr, typeof arguments);
        "#,
    );
    assert_eq!(host.output_text(), "42 true 4 ,,,z undefined\n");
}

#[test]
fn test_gc_prints_statistics() {
    let (_, host) = run("var junk = [1, 2, 3]; junk = null; gc();");
    let text = host.output_text();
    assert!(text.starts_with("before "), "{}", text);
    assert!(text.contains(", after "));
    assert!(text.contains(", break "));
}

#[test]
fn test_version_builtin() {
    let mut runtime = runtime();
    let mut host = TestHost::default();
    let result = run_in(&mut runtime, &mut host, "var old = version(150); old;");
    assert_eq!(result.unwrap().to_number(), 0.0);
    assert_eq!(runtime.version(), 150);
}

#[test]
fn test_load_and_read() {
    let dir = tempfile::tempdir().unwrap();
    let lib = dir.path().join("lib.js");
    std::fs::write(&lib, "function helper() { return 'from lib'; }").unwrap();
    let bad = dir.path().join("bad.js");
    std::fs::write(&bad, "var = ;").unwrap();
    let data = dir.path().join("data.bin");
    std::fs::write(&data, [0x41u8, 0xe9]).unwrap();

    let source = format!(
        r#"
        load({lib:?});
        print(helper());
        try {{ load({bad:?}); }} catch (e) {{ print(e.name); }}
        var s = read({data:?});
        print(s.length, s.charCodeAt(1));
        try {{ read("/nonexistent/minjs"); }} catch (e) {{ print(e.name); }}
        "#,
        lib = lib.display().to_string(),
        bad = bad.display().to_string(),
        data = data.display().to_string(),
    );
    let (_, host) = run(&source);
    assert_eq!(host.output_text(), "from lib\nSyntaxError\n2 233\nError\n");
}

#[test]
fn test_memory_bridge_round_trip() {
    let mut buffer = vec![0u8; 16];
    let address = buffer.as_mut_ptr() as usize;

    let mut runtime = runtime();
    runtime.define_global("buf", Value::Number(address as f64));
    let mut host = TestHost::default();
    let source = r#"
        poke8(buf, 0x1ab);
        poke32(buf + 5, -2);
        print(peek8(buf), peek32(buf + 5));
    "#;
    let _ = run_in(&mut runtime, &mut host, source);
    assert_eq!(host.output_text(), "171 -2\n");
    assert_eq!(buffer[0], 0xab);
    assert_eq!(&buffer[5..9], &(-2i32).to_ne_bytes());
}

#[test]
fn test_ffi_call_rejects_non_numeric_target() {
    let (_, host) = run("try { ffi_call('puts'); } catch (e) { print(e.name); }");
    assert_eq!(host.output_text(), "TypeError\n");
}

#[cfg(unix)]
#[test]
fn test_get_dlsym_is_an_address() {
    let (result, _) = run("get_dlsym() > 0;");
    assert!(result.unwrap().is_truthy());
}
