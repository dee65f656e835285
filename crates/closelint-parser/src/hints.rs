// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Error hints - suggestions for fixing common mistakes.

use closelint_ast::token::TokenKind;

/// Get a hint for an "expected X" error based on context.
pub fn for_expected(expected: &str, found: &TokenKind) -> Option<&'static str> {
    match (expected, found) {
        ("':'", TokenKind::Eq) => Some("use ':' for types, '=' for values"),
        ("':'", _) => Some("syntax: name: Type"),

        ("'{'", _) => Some("blocks start with '{'"),
        ("'}'", _) => Some("every '{' needs a matching '}'"),

        ("'('", _) => Some("function calls need parentheses"),
        ("')'", TokenKind::Eof) => Some("add ')' to close the parenthesis"),
        ("')'", _) => None,
        ("']'", TokenKind::Eof) => Some("add ']' to close the bracket"),

        ("'>'", _) => Some("close the type argument list with '>'"),
        ("'->'", _) => Some("separate parameters from the body with '->'"),
        ("'in'", _) => Some("syntax: for (item in items)"),

        ("expression", TokenKind::Eq) => Some("put the value after '='"),
        ("expression", TokenKind::Semi) | ("expression", TokenKind::Newline) => {
            Some("statement is incomplete")
        }
        ("expression", _) => Some("try a value, variable, or function call"),

        ("a name", TokenKind::Int(_)) => Some("names can't start with a number"),
        ("a name", _) => Some("names start with a letter or '_'"),

        ("type", _) => Some("try a type like 'String', 'Closeable' or 'List<Int>'"),

        (s, _) if s.starts_with("declaration") => {
            Some("start with 'fun', 'class', 'object', 'interface', 'val' or 'var'")
        }

        ("newline or ';'", _) => Some("end statements with a newline or ';'"),

        _ => None,
    }
}
