// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! End-to-end fixtures for CloseableRequiresUse.
//!
//! A `/**/` marker sits right before each reported method selector. The
//! marker is stripped before checking, and its position is the expected
//! `(line, column)` of a finding.

use closelint_diagnostics::Severity;
use closelint_driver::{check_source, LintConfig};

/// Strip `/**/` markers, returning the source and the marked positions.
fn marked(src: &str) -> (String, Vec<(usize, usize)>) {
    let mut clean = String::with_capacity(src.len());
    let mut expected = Vec::new();
    let mut rest = src;
    while let Some(at) = rest.find("/**/") {
        clean.push_str(&rest[..at]);
        let line = clean.matches('\n').count() + 1;
        let column = clean.len() - clean.rfind('\n').map(|i| i + 1).unwrap_or(0) + 1;
        expected.push((line, column));
        rest = &rest[at + 4..];
    }
    clean.push_str(rest);
    (clean, expected)
}

fn assert_fixture(src: &str) {
    assert_fixture_with(src, &LintConfig::default());
}

fn assert_fixture_with(src: &str, config: &LintConfig) {
    let (clean, expected) = marked(src);
    let report = check_source(&clean, "Fixture.kt", config);
    assert!(!report.syntax_failed, "syntax errors: {:?}", report.diagnostics);
    assert!(report.skipped.is_empty(), "skipped: {:?}", report.skipped);
    let found: Vec<(usize, usize)> = report.findings.iter().map(|f| (f.line, f.column)).collect();
    assert_eq!(found, expected, "in:\n{}", clean);
}

const HELPERS: &str = "
fun iReturnCloseable() = StringReader(\"close me\")

fun debugCloseable(closeable: Closeable) {
    println(closeable)
}

fun tapCloseable(closeable: Closeable): Closeable {
    println(closeable)
    return closeable
}

fun Closeable.println() {
    println(this.toString())
}

fun Closeable.tap(): Closeable {
    println(this.toString())
    return this
}
";

#[test]
fn marker_helper_strips_and_locates() {
    let (clean, expected) = marked("ab\n  x./**/y()");
    assert_eq!(clean, "ab\n  x.y()");
    assert_eq!(expected, vec![(2, 5)]);
}

#[test]
fn constructor_chained_into_use() {
    assert_fixture(
        "fun foo() {
    StringReader(\"x\").use { it.readLines() }
}",
    );
}

#[test]
fn constructor_chained_into_other_method() {
    assert_fixture(
        "fun foo() {
    StringReader(\"x\")./**/forEachLine { println(it) }
}",
    );
}

#[test]
fn use_result_stored_in_local() {
    assert_fixture(
        "fun foo() {
    val lines = StringReader(\"x\").use { it.readLines() }
    println(lines)
}",
    );
}

#[test]
fn local_used_before_closing() {
    assert_fixture(
        "fun foo() {
    val reader = StringReader(\"x\")
    val lines = reader./**/readLines()
    println(lines)
}",
    );
}

#[test]
fn closeable_returned_from_function_is_tracked() {
    let src = format!(
        "{}
fun ok() {{
    iReturnCloseable().use {{ it.readLines() }}
}}

fun chained() {{
    iReturnCloseable()./**/forEachLine {{ println(it) }}
}}

fun stored() {{
    val reader = iReturnCloseable()
    reader./**/readLines()
}}",
        HELPERS
    );
    assert_fixture(&src);
}

#[test]
fn passing_to_functions_is_compliant() {
    let src = format!(
        "{}
fun debug() {{
    debugCloseable(StringReader(\"x\"))
}}

fun tapped() {{
    tapCloseable(StringReader(\"x\")).use {{ it.toString() }}
}}",
        HELPERS
    );
    assert_fixture(&src);
}

#[test]
fn helper_declarations_are_compliant() {
    assert_fixture(HELPERS);
}

#[test]
fn extension_calls_on_owned_values() {
    let src = format!(
        "{}
fun printed() {{
    StringReader(\"x\")./**/println()
}}

fun tapped() {{
    StringReader(\"x\").tap().use {{ it.toString() }}
}}",
        HELPERS
    );
    assert_fixture(&src);
}

#[test]
fn pass_through_then_misuse_is_reported() {
    assert_fixture(
        "fun Closeable.tap(): Closeable {
    return this
}

fun foo() {
    StringReader(\"x\").tap()./**/toString()
}",
    );
}

#[test]
fn returned_and_stored_values_are_transferred() {
    assert_fixture(
        "class Holder {
    var reader: Reader? = null
}

fun open(): Reader {
    return StringReader(\"x\")
}

fun keep(holder: Holder) {
    holder.reader = StringReader(\"x\")
}

fun hand(consumer: Consumer) {
    consumer.consume(StringReader(\"x\"))
}",
    );
}

#[test]
fn wrappers_take_over_their_receiver() {
    assert_fixture(
        "fun foo() {
    FileInputStream(\"f\").bufferedReader().use { it.readLines() }
    FileInputStream(\"f\").bufferedReader()./**/readLine()
}",
    );
}

#[test]
fn also_before_use_is_compliant() {
    assert_fixture(
        "fun foo() {
    StringReader(\"x\").also { println(it) }.use { it.read() }
}",
    );
}

#[test]
fn configured_closing_functions_and_types() {
    let config = LintConfig::from_toml_str(
        "[closeable-requires-use]
closing-functions = [\"use\", \"closing\"]
closeable-types = [\"Pool\"]
",
    )
    .unwrap();
    assert_fixture_with(
        "class Pool(val size: Int)

fun foo() {
    Pool(4).closing { it.size }
    Pool(4)./**/size
    StringReader(\"x\").closing { it.read() }
}",
        &config,
    );
}

#[test]
fn findings_carry_message_and_configured_severity() {
    let mut config = LintConfig::default();
    config.closeable_requires_use.severity = Severity::Error;
    let report = check_source("fun foo() {\n    StringReader(\"x\").read()\n}", "A.kt", &config);
    assert_eq!(report.findings.len(), 1);
    let finding = &report.findings[0];
    assert_eq!(finding.rule, "CloseableRequiresUse");
    assert_eq!(
        finding.message,
        "Owned Closeable instances must be invoked with .use { }; see documentation for definitions of 'owned'."
    );
    assert!(report.has_errors());
}

#[test]
fn report_serializes_to_json() {
    let report = check_source("fun foo() {\n    StringReader(\"x\").read()\n}", "A.kt", &LintConfig::default());
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["file"], "A.kt");
    assert_eq!(value["findings"][0]["line"], 2);
    assert_eq!(value["findings"][0]["column"], 23);
    assert_eq!(value["findings"][0]["severity"], "warning");
    assert_eq!(value["syntax_failed"], false);
}

#[test]
fn fluent_members_return_their_receiver() {
    assert_fixture(
        "class Conn : Closeable {
    fun timeout(t: Int): Conn {
        return this
    }

    override fun close() {}
}

fun borrowed(c: Conn) {
    c.timeout(5).toString()
}

fun owned() {
    Conn().timeout(5).use { it.toString() }
    Conn().timeout(5)./**/toString()
}",
    );
}

#[test]
fn library_methods_open_resources_only_in_their_resource_form() {
    assert_fixture(
        "fun text(text: String) {
    text.lines().forEach { println(it) }
}

fun consume(consumer: Consumer, value: Int) {
    consumer.accept(value)
}

fun serve(server: ServerSocket, path: Path) {
    server.accept()./**/toString()
    Files.lines(path)./**/count()
    Files.lines(path).use { it.count() }
}",
    );
}

#[test]
fn template_mentions_make_a_local_untracked() {
    assert_fixture(
        "fun foo() {
    val r = StringReader(\"x\")
    println(\"$r\")
    r.read()
}

fun bar() {
    val r = StringReader(\"x\")
    println(\"${r.ready()}\")
    r.read()
}",
    );
}
