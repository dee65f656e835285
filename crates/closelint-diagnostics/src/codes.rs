// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Diagnostic code registry.
//!
//! Maps codes (C0001, C0300, ...) to titles, categories and explanations.
//! Used by `closelint explain <code>` and the JSON report.

use std::collections::BTreeMap;
use std::fmt;

pub const LEX_ERROR: &str = "C0001";
pub const PARSE_ERROR: &str = "C0100";
pub const ANALYSIS_SKIPPED: &str = "C0200";
pub const CLOSEABLE_REQUIRES_USE: &str = "C0300";

pub struct CodeInfo {
    pub code: &'static str,
    pub title: &'static str,
    pub category: Category,
    pub explanation: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Syntax,
    Resolution,
    Ownership,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Syntax => write!(f, "Syntax"),
            Category::Resolution => write!(f, "Resolution"),
            Category::Ownership => write!(f, "Ownership"),
        }
    }
}

macro_rules! register_codes {
    ($($code:expr => ($title:literal, $cat:expr, $explain:literal)),* $(,)?) => {{
        let mut map = BTreeMap::new();
        $(
            map.insert($code, CodeInfo {
                code: $code,
                title: $title,
                category: $cat,
                explanation: $explain,
            });
        )*
        map
    }};
}

/// Registry of all known codes.
pub struct CodeRegistry {
    codes: BTreeMap<&'static str, CodeInfo>,
}

impl Default for CodeRegistry {
    fn default() -> Self {
        use Category::*;

        Self {
            codes: register_codes! {
                LEX_ERROR => ("invalid token", Syntax,
                    "The source contains a character or literal that cannot be tokenized, \
                     such as a stray symbol or an unterminated string. The file is not analyzed."),
                PARSE_ERROR => ("syntax error", Syntax,
                    "The source does not parse. closelint reports the first errors it finds \
                     and does not analyze a file that failed to parse."),
                ANALYSIS_SKIPPED => ("function skipped", Resolution,
                    "A function could not be analyzed because a type or call in it could not be \
                     resolved, for example when return-type inference of mutually recursive \
                     expression-bodied functions does not terminate. Other functions in the \
                     file are still checked. Adding an explicit return type usually fixes it."),
                CLOSEABLE_REQUIRES_USE => ("CloseableRequiresUse", Ownership,
                    "A closeable value created in this function is used before it is closed.\n\
                     \n\
                     A value is owned when the function creates it: a constructor call of a \
                     Closeable type, or a call to a function that returns a new Closeable. \
                     Parameters and extension receivers are borrowed and never reported.\n\
                     \n\
                     An owned value must be closed with `.use { }`, or handed to another owner \
                     by returning it, passing it as an argument, or storing it in a field.\n\
                     \n\
                     Non-compliant:\n\
                     \n    StringReader(\"x\").forEachLine { println(it) }\n\
                     \n\
                     Compliant:\n\
                     \n    StringReader(\"x\").use { it.forEachLine { line -> println(line) } }"),
            },
        }
    }
}

impl CodeRegistry {
    pub fn get(&self, code: &str) -> Option<&CodeInfo> {
        self.codes.get(code)
    }

    /// Lookup that also accepts lowercase codes and the rule name.
    pub fn find(&self, query: &str) -> Option<&CodeInfo> {
        let upper = query.to_ascii_uppercase();
        self.get(&upper)
            .or_else(|| self.codes.values().find(|info| info.title.eq_ignore_ascii_case(query)))
    }

    pub fn all(&self) -> impl Iterator<Item = &CodeInfo> {
        self.codes.values()
    }
}
