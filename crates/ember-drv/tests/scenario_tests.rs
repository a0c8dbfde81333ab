//! Whole-program scenarios run through the real binary, checking exact
//! stdout and the rendered diagnostic format.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn run_script(source: &str) -> assert_cmd::assert::Assert {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(source.as_bytes()).expect("write script");

    let mut cmd = Command::cargo_bin("ember").expect("binary exists");
    cmd.arg(file.path());
    cmd.assert()
}

#[test]
fn test_scenario_closures_capture_by_reference() {
    let source = r#"
fun makeCounter() {
  var i = 0;
  fun count() { i = i + 1; return i; }
  return count;
}
var c = makeCounter();
print(c()); print(c()); print(c());
"#;
    run_script(source).success().stdout("1\n2\n3\n");
}

#[test]
fn test_scenario_classes_inheritance_super() {
    let source = r#"
class A { hello() { return "A"; } }
class B < A { hello() { return "B/" + super.hello(); } }
print(B().hello());
"#;
    run_script(source).success().stdout("B/A\n");
}

#[test]
fn test_scenario_initializer_returns_instance() {
    let source = r#"
class Box { init(v) { this.v = v; return; } }
print(Box(7).v);
"#;
    run_script(source).success().stdout("7\n");
}

#[test]
fn test_scenario_for_loop_desugaring() {
    let source = "for (var i = 0; i < 3; i = i + 1) print(i);\n";
    run_script(source).success().stdout("0\n1\n2\n");
}

#[test]
fn test_scenario_compound_assignment() {
    let source = r#"
var a = 10; a += 5; a *= 2; print(a);
class K { init() { this.x = 1; } }
var k = K(); k.x += 41; print(k.x);
"#;
    run_script(source).success().stdout("30\n42\n");
}

#[test]
fn test_scenario_static_scoping_across_shadowing() {
    let source = r#"
var a = "global";
{
  fun show() { print(a); }
  show();
  var a = "local";
  show();
}
"#;
    run_script(source).success().stdout("global\nglobal\n");
}

#[test]
fn test_fibonacci_program() {
    let source = r#"
fun fib(n) {
  if (n <= 1) return n;
  return fib(n - 1) + fib(n - 2);
}
for (var i = 0; i < 8; i = i + 1) print(fib(i));
"#;
    run_script(source)
        .success()
        .stdout("0\n1\n1\n2\n3\n5\n8\n13\n");
}

#[test]
fn test_diagnostic_format_for_lex_error() {
    run_script("var x = @;")
        .failure()
        .code(65)
        .stderr(predicate::str::contains("Error: Unexpected character: @"))
        .stderr(predicate::str::contains("line 1, column 8"))
        .stderr(predicate::str::contains("^ HERE"));
}

#[test]
fn test_diagnostic_format_for_parse_error_at_token() {
    run_script("var var;")
        .failure()
        .code(65)
        .stderr(predicate::str::contains("Error at 'var': Expected variable name."));
}

#[test]
fn test_diagnostic_format_for_parse_error_at_end() {
    run_script("var x = 1")
        .failure()
        .code(65)
        .stderr(predicate::str::contains(
            "Error at end: Expected ';' after variable declaration.",
        ));
}

#[test]
fn test_diagnostic_format_for_runtime_error() {
    run_script("print(missing);")
        .failure()
        .code(70)
        .stderr(predicate::str::contains(
            "RuntimeError: Undefined variable 'missing'.",
        ))
        .stderr(predicate::str::contains("At file"));
}

#[test]
fn test_multiple_parse_errors_all_reported() {
    run_script("var 1; var 2; var ok = 3;")
        .failure()
        .code(65)
        .stderr(predicate::str::contains("Expected variable name.").count(2));
}
