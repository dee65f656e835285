// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Parser for the Kotlin-like sources closelint analyzes.
//!
//! Transforms a token stream into an abstract syntax tree. Method selectors
//! keep their own spans so findings can point at `reader.readLines()` exactly.

mod hints;
mod parser;

pub use parser::{ParseError, ParseResult, Parser};

#[cfg(test)]
mod tests {
    use super::*;
    use closelint_ast::decl::{DeclKind, FnBody};
    use closelint_ast::expr::ExprKind;
    use closelint_ast::stmt::StmtKind;

    fn parse(src: &str) -> ParseResult {
        let lex_result = closelint_lexer::Lexer::new(src).tokenize();
        assert!(lex_result.is_ok(), "Lex errors: {:?}", lex_result.errors);
        Parser::new(lex_result.tokens).parse()
    }

    fn body_of(result: &ParseResult, index: usize) -> &Vec<closelint_ast::stmt::Stmt> {
        match &result.decls[index].kind {
            DeclKind::Fn(f) => match &f.body {
                FnBody::Block(stmts) => stmts,
                other => panic!("Expected block body, got {:?}", other),
            },
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn parse_package_and_imports() {
        let result = parse("package a.b\n\nimport java.io.Closeable\nimport java.io.*\nimport x.Y as Z\n");
        assert!(result.is_ok(), "Parse errors: {:?}", result.errors);
        assert_eq!(result.decls.len(), 4);
        if let DeclKind::Import(ref imp) = result.decls[2].kind {
            assert_eq!(imp.path, vec!["java", "io"]);
            assert!(imp.wildcard);
        } else {
            panic!("Expected import declaration");
        }
        if let DeclKind::Import(ref imp) = result.decls[3].kind {
            assert_eq!(imp.alias, Some("Z".to_string()));
        } else {
            panic!("Expected import declaration");
        }
    }

    #[test]
    fn parse_use_chain_with_trailing_lambda() {
        let src = "fun f() {\n    StringReader(\"x\").use { it.readLines() }\n}";
        let result = parse(src);
        assert!(result.is_ok(), "Parse errors: {:?}", result.errors);
        let body = body_of(&result, 0);
        let StmtKind::Expr(expr) = &body[0].kind else { panic!("Expected expression statement") };
        let ExprKind::MethodCall { receiver, method, method_span, args, .. } = &expr.kind else {
            panic!("Expected method call, got {:?}", expr.kind)
        };
        assert_eq!(method, "use");
        assert_eq!(&src[method_span.start..method_span.end], "use");
        assert_eq!(args.len(), 1);
        assert!(args[0].is_function_value());
        assert!(matches!(receiver.kind, ExprKind::Call { .. }));
    }

    #[test]
    fn parse_extension_functions() {
        let result = parse("fun Closeable.tap(): Closeable {\n    println(this.toString())\n    return this\n}\nfun String?.orEmpty() = this ?: \"\"");
        assert!(result.is_ok(), "Parse errors: {:?}", result.errors);
        let DeclKind::Fn(ref tap) = result.decls[0].kind else { panic!("Expected function") };
        assert_eq!(tap.name, "tap");
        assert_eq!(tap.receiver.as_ref().and_then(|r| r.simple_name()), Some("Closeable"));
        let DeclKind::Fn(ref or_empty) = result.decls[1].kind else { panic!("Expected function") };
        assert!(or_empty.receiver.as_ref().map(|r| r.nullable).unwrap_or(false));
        assert!(matches!(or_empty.body, FnBody::Expr(_)));
    }

    #[test]
    fn parse_chain_across_newlines() {
        let src = "fun f() {\n    val lines = StringReader(\"x\")\n        .buffered()\n        ./**/readLines()\n}";
        let result = parse(src);
        assert!(result.is_ok(), "Parse errors: {:?}", result.errors);
        let body = body_of(&result, 0);
        assert_eq!(body.len(), 1);
        let StmtKind::Local { init: Some(init), .. } = &body[0].kind else { panic!("Expected local") };
        let ExprKind::MethodCall { method, .. } = &init.kind else { panic!("Expected method call") };
        assert_eq!(method, "readLines");
    }

    #[test]
    fn parse_lambda_parameters() {
        let result = parse("fun f() {\n    map.forEach { (k, v) -> println(k) }\n    list.fold(0) { acc, x: Int -> acc + x }\n}");
        assert!(result.is_ok(), "Parse errors: {:?}", result.errors);
        let body = body_of(&result, 0);
        let StmtKind::Expr(expr) = &body[1].kind else { panic!() };
        let ExprKind::MethodCall { args, .. } = &expr.kind else { panic!() };
        let ExprKind::Lambda { params, .. } = &args[1].kind else { panic!("Expected lambda") };
        assert_eq!(params.len(), 2);
        assert_eq!(params[1].name, "x");
    }

    #[test]
    fn parse_control_flow() {
        let src = r#"
fun f(x: Any?) {
    if (x == null) return
    else println(x)
    val y = when (x) {
        is String -> x.length
        in 1..5, 7 -> 0
        else -> { -1 }
    }
    try {
        risky()
    } catch (e: IOException) {
        throw IllegalStateException(e)
    } finally {
        done()
    }
    outer@ for (i in 0 until 10) {
        while (true) break@outer
    }
    do { i++ } while (i < 3)
}
"#;
        let result = parse(src);
        assert!(result.is_ok(), "Parse errors: {:?}", result.errors);
        let body = body_of(&result, 0);
        assert_eq!(body.len(), 5);
        assert!(matches!(body[3].kind, StmtKind::For { label: Some(_), .. }));
    }

    #[test]
    fn parse_class_members() {
        let src = r#"
class Holder(private val source: Reader) : Closeable, Runnable {
    val reader = StringReader("held")
    val size: Int
        get() = reader.hashCode()
    var name: String = ""
        private set

    init {
        println(source)
    }

    constructor(text: String) : this(StringReader(text))

    override fun close() = source.close()

    companion object {
        fun create(): Holder = Holder("x")
    }
}
"#;
        let result = parse(src);
        assert!(result.is_ok(), "Parse errors: {:?}", result.errors);
        let DeclKind::Class(ref class) = result.decls[0].kind else { panic!("Expected class") };
        assert_eq!(class.supertypes.len(), 2);
        assert_eq!(class.members.len(), 7);
        assert!(matches!(class.members[3].kind, DeclKind::Init(_)));
        let DeclKind::Property(ref size) = class.members[1].kind else { panic!() };
        assert!(size.getter.is_some());
    }

    #[test]
    fn parse_infix_and_safe_calls() {
        let result = parse("fun f() {\n    val pair = a to b\n    reader?.let { it.close() }\n    val n = x!!.length ?: 0\n}");
        assert!(result.is_ok(), "Parse errors: {:?}", result.errors);
        let body = body_of(&result, 0);
        let StmtKind::Local { init: Some(init), .. } = &body[0].kind else { panic!() };
        assert!(matches!(&init.kind, ExprKind::MethodCall { method, .. } if method == "to"));
        let StmtKind::Expr(expr) = &body[1].kind else { panic!() };
        assert!(matches!(&expr.kind, ExprKind::MethodCall { safe: true, .. }));
    }

    #[test]
    fn parse_generic_calls_and_comparisons() {
        let result = parse("fun f() {\n    val xs = listOf<Reader>()\n    val ok = a < b && c > d\n}");
        assert!(result.is_ok(), "Parse errors: {:?}", result.errors);
        let body = body_of(&result, 0);
        let StmtKind::Local { init: Some(init), .. } = &body[0].kind else { panic!() };
        assert!(matches!(&init.kind, ExprKind::Call { type_args, .. } if type_args.len() == 1));
        let StmtKind::Local { init: Some(init), .. } = &body[1].kind else { panic!() };
        assert!(matches!(&init.kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn parse_assignment_statements() {
        let result = parse("fun f() {\n    var r: Reader? = null\n    r = StringReader(\"x\")\n    count += 1\n}");
        assert!(result.is_ok(), "Parse errors: {:?}", result.errors);
        let body = body_of(&result, 0);
        assert!(matches!(body[1].kind, StmtKind::Assign { op: None, .. }));
        assert!(matches!(body[2].kind, StmtKind::Assign { op: Some(_), .. }));
    }

    #[test]
    fn parse_local_functions() {
        let result = parse("fun outer() {\n    fun inner() = StringReader(\"x\")\n    inner().close()\n}");
        assert!(result.is_ok(), "Parse errors: {:?}", result.errors);
        let body = body_of(&result, 0);
        assert!(matches!(body[0].kind, StmtKind::Decl(_)));
    }

    #[test]
    fn parse_annotations_and_modifiers() {
        let result = parse("@file:Suppress(\"unused\")\npackage p\n\n@Deprecated(\"x\")\nprivate inline fun f() {}\ndata class D(val a: Int)\nenum class E { A, B; fun g() = 1 }");
        assert!(result.is_ok(), "Parse errors: {:?}", result.errors);
        let DeclKind::Fn(ref f) = result.decls[1].kind else { panic!("Expected function") };
        assert_eq!(f.modifiers, vec!["private", "inline"]);
        let DeclKind::Class(ref e) = result.decls[3].kind else { panic!("Expected enum") };
        assert_eq!(e.members.len(), 1);
    }

    #[test]
    fn error_recovery_continues_after_bad_statement() {
        let result = parse("fun f() {\n    val = 3\n    ok()\n}\nfun g() {}");
        assert!(!result.is_ok());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.decls.len(), 2);
    }

    #[test]
    fn object_expressions_are_rejected() {
        let result = parse("fun f() = object : Runnable { override fun run() {} }");
        assert!(!result.is_ok());
        assert!(result.errors[0].message.contains("not supported"));
    }
}
