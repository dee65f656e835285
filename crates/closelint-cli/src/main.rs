// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! closelint CLI: reports closeable values that are used without `.use { }`.

mod output;

use std::env;
use std::fs;
use std::path::Path;
use std::process;

use closelint_diagnostics::codes::CodeRegistry;
use closelint_diagnostics::formatter::DiagnosticFormatter;
use closelint_diagnostics::json::{to_json_report, to_json_string};
use closelint_diagnostics::{Severity, ToDiagnostic};
use closelint_driver::{check_source, LintConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

struct CheckArgs {
    files: Vec<String>,
    format: Format,
    config: Option<String>,
}

fn main() {
    output::init();
    init_tracing();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    match args[1].as_str() {
        "lex" => {
            if args.len() < 3 {
                eprintln!("Usage: closelint lex <file.kt>");
                process::exit(1);
            }
            cmd_lex(&args[2]);
        }
        "parse" => {
            if args.len() < 3 {
                eprintln!("Usage: closelint parse <file.kt>");
                process::exit(1);
            }
            cmd_parse(&args[2]);
        }
        "check" => match parse_check_args(&args[2..]) {
            Ok(check) => cmd_check(&check),
            Err(msg) => {
                eprintln!("{}: {}", output::error_label(), msg);
                eprintln!("Usage: closelint check <files...> [--format text|json] [--config <path>]");
                process::exit(1);
            }
        },
        "explain" => {
            if args.len() < 3 {
                eprintln!("Usage: closelint explain <code>");
                process::exit(1);
            }
            cmd_explain(&args[2]);
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-V" => {
            println!("closelint {}", VERSION);
        }
        other => {
            // A bare file name is checked
            if other.ends_with(".kt") {
                cmd_check(&CheckArgs { files: args[1..].to_vec(), format: Format::Text, config: None });
            } else {
                eprintln!("Unknown command: {}", other);
                print_usage();
                process::exit(1);
            }
        }
    }
}

/// Logs go to stderr, filtered by `CLOSELINT_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("CLOSELINT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_usage() {
    println!("{} {}", output::title("closelint"), VERSION);
    println!("Reports closeable values that are not released with .use {{ }}");
    println!();
    println!("{}", output::section_header("Usage:"));
    println!("  closelint <command> [args]");
    println!();
    println!("{}", output::section_header("Commands:"));
    println!("  {} {}        Tokenize a file and print tokens", output::command("lex"), output::arg("<file>"));
    println!("  {} {}      Parse a file and print declarations", output::command("parse"), output::arg("<file>"));
    println!("  {} {}  Check files for CloseableRequiresUse", output::command("check"), output::arg("<files...>"));
    println!("  {} {}    Explain a diagnostic code", output::command("explain"), output::arg("<code>"));
    println!("  {}              Show this help", output::command("help"));
    println!("  {}           Show version", output::command("version"));
    println!();
    println!("{}", output::section_header("Check options:"));
    println!("  {} text|json   Output format (default text)", output::arg("--format"));
    println!("  {} <path>      Configuration file (default: closelint.toml next to each file)", output::arg("--config"));
    println!();
    println!("Set CLOSELINT_LOG=debug for analysis logs on stderr.");
}

fn parse_check_args(args: &[String]) -> Result<CheckArgs, String> {
    let mut check = CheckArgs { files: Vec::new(), format: Format::Text, config: None };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--format" => {
                check.format = match iter.next().map(String::as_str) {
                    Some("text") => Format::Text,
                    Some("json") => Format::Json,
                    Some(other) => return Err(format!("unknown format `{}`", other)),
                    None => return Err("--format needs a value".to_string()),
                };
            }
            "--config" => match iter.next() {
                Some(path) => check.config = Some(path.clone()),
                None => return Err("--config needs a path".to_string()),
            },
            flag if flag.starts_with("--") => return Err(format!("unknown option `{}`", flag)),
            file => check.files.push(file.to_string()),
        }
    }
    if check.files.is_empty() {
        return Err("no files given".to_string());
    }
    Ok(check)
}

fn read_source(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: cannot read {}: {}", output::error_label(), path, e);
            process::exit(1);
        }
    }
}

fn config_for(file: &str, explicit: Option<&LintConfig>) -> LintConfig {
    if let Some(config) = explicit {
        return config.clone();
    }
    let dir = Path::new(file).parent().unwrap_or_else(|| Path::new("."));
    match LintConfig::discover(dir) {
        Ok(config) => {
            debug!(file, dir = %dir.display(), "configuration discovered");
            config
        }
        Err(e) => {
            eprintln!("{}: {}", output::error_label(), e);
            process::exit(1);
        }
    }
}

fn cmd_lex(path: &str) {
    let source = read_source(path);
    let result = closelint_lexer::Lexer::new(&source).tokenize();
    let formatter = DiagnosticFormatter::new(&source).with_file_name(path);

    for error in &result.errors {
        eprint!("{}", formatter.format(&error.to_diagnostic()));
    }

    if result.is_ok() {
        println!("=== Tokens ({}) ===\n", result.tokens.len());
        for tok in &result.tokens {
            if matches!(tok.kind, closelint_ast::token::TokenKind::Newline) {
                continue;
            }
            println!("{:4}:{:<3} {:?}", tok.span.start, tok.span.end, tok.kind);
        }
        println!("\n{}", output::banner_ok("Lex"));
    } else {
        eprintln!("\n{}", output::banner_fail("Lex", result.errors.len()));
        process::exit(1);
    }
}

fn cmd_parse(path: &str) {
    let source = read_source(path);
    let formatter = DiagnosticFormatter::new(&source).with_file_name(path);

    let lex_result = closelint_lexer::Lexer::new(&source).tokenize();
    if !lex_result.is_ok() {
        for error in &lex_result.errors {
            eprint!("{}", formatter.format(&error.to_diagnostic()));
        }
        eprintln!("\n{}", output::banner_fail("Lex", lex_result.errors.len()));
        process::exit(1);
    }

    let parse_result = closelint_parser::Parser::new(lex_result.tokens).parse();
    if !parse_result.is_ok() {
        for error in &parse_result.errors {
            eprint!("{}", formatter.format(&error.to_diagnostic()));
        }
        eprintln!("\n{}", output::banner_fail("Parse", parse_result.errors.len()));
        process::exit(1);
    }

    println!("=== AST ({} declarations) ===\n", parse_result.decls.len());
    for (i, decl) in parse_result.decls.iter().enumerate() {
        println!("--- Declaration {} ---", i + 1);
        println!("{:#?}", decl);
        println!();
    }
    println!("{}", output::banner_ok("Parse"));
}

fn cmd_check(args: &CheckArgs) {
    let explicit = args.config.as_deref().map(|path| match LintConfig::load(Path::new(path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", output::error_label(), e);
            process::exit(1);
        }
    });

    let mut failed = false;
    let mut warnings = 0;
    let mut errors = 0;
    let mut json_reports = Vec::new();

    for file in &args.files {
        let source = read_source(file);
        let config = config_for(file, explicit.as_ref());
        let report = check_source(&source, file, &config);
        failed |= report.has_errors();

        match args.format {
            Format::Json => json_reports.push(to_json_report(&report.diagnostics, &source, file)),
            Format::Text => {
                let formatter = DiagnosticFormatter::new(&source).with_file_name(file);
                for diag in &report.diagnostics {
                    eprintln!("{}", formatter.format(diag));
                }
                warnings += report.diagnostics.iter().filter(|d| d.severity == Severity::Warning).count();
                errors += report.diagnostics.iter().filter(|d| d.severity == Severity::Error).count();
            }
        }
    }

    match args.format {
        Format::Json => println!("{}", to_json_string(&json_reports)),
        Format::Text => eprintln!("{}", output::summary(args.files.len(), warnings, errors)),
    }

    if failed {
        process::exit(1);
    }
}

fn cmd_explain(query: &str) {
    let registry = CodeRegistry::default();
    match registry.find(query) {
        Some(info) => {
            println!("{} {} ({})", output::code(info.code), output::title(info.title), info.category);
            println!();
            println!("{}", info.explanation);
        }
        None => {
            eprintln!("{}: no diagnostic code matches `{}`", output::error_label(), query);
            eprintln!();
            eprintln!("Known codes:");
            for info in registry.all() {
                eprintln!("  {}  {}", output::code(info.code), info.title);
            }
            process::exit(1);
        }
    }
}
