// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Library knowledge: closeable JDK types and well-known resource APIs.

use crate::signature::{BodyShape, CalleeKind, CalleeSignature, PassThroughOf};
use crate::types::Type;

/// Types every other closeable type derives from.
pub const CLOSEABLE_ROOTS: &[&str] = &["AutoCloseable", "Closeable"];

/// Closeable library types with their direct supertypes.
pub const CLOSEABLE_TYPES: &[(&str, &[&str])] = &[
    ("Closeable", &["AutoCloseable"]),
    ("Reader", &["Closeable"]),
    ("Writer", &["Closeable"]),
    ("InputStream", &["Closeable"]),
    ("OutputStream", &["Closeable"]),
    ("StringReader", &["Reader"]),
    ("StringWriter", &["Writer"]),
    ("CharArrayReader", &["Reader"]),
    ("CharArrayWriter", &["Writer"]),
    ("BufferedReader", &["Reader"]),
    ("BufferedWriter", &["Writer"]),
    ("LineNumberReader", &["BufferedReader"]),
    ("InputStreamReader", &["Reader"]),
    ("OutputStreamWriter", &["Writer"]),
    ("FileReader", &["InputStreamReader"]),
    ("FileWriter", &["OutputStreamWriter"]),
    ("PrintWriter", &["Writer"]),
    ("FileInputStream", &["InputStream"]),
    ("FileOutputStream", &["OutputStream"]),
    ("ByteArrayInputStream", &["InputStream"]),
    ("ByteArrayOutputStream", &["OutputStream"]),
    ("BufferedInputStream", &["InputStream"]),
    ("BufferedOutputStream", &["OutputStream"]),
    ("DataInputStream", &["InputStream"]),
    ("DataOutputStream", &["OutputStream"]),
    ("ObjectInputStream", &["InputStream"]),
    ("ObjectOutputStream", &["OutputStream"]),
    ("GZIPInputStream", &["InputStream"]),
    ("GZIPOutputStream", &["OutputStream"]),
    ("ZipInputStream", &["InputStream"]),
    ("ZipOutputStream", &["OutputStream"]),
    ("PrintStream", &["OutputStream"]),
    ("RandomAccessFile", &["Closeable"]),
    ("Scanner", &["Closeable"]),
    ("Socket", &["Closeable"]),
    ("ServerSocket", &["Closeable"]),
    ("ZipFile", &["Closeable"]),
    ("JarFile", &["ZipFile"]),
    ("FileChannel", &["Closeable"]),
    ("Connection", &["AutoCloseable"]),
    ("Statement", &["AutoCloseable"]),
    ("PreparedStatement", &["Statement"]),
    ("ResultSet", &["AutoCloseable"]),
    ("Stream", &["AutoCloseable"]),
];

/// A library method that opens a new resource.
struct ResourceMethod {
    name: &'static str,
    ret: &'static str,
    /// Closing the result closes the receiver too (`reader.buffered()`)
    adopts: bool,
    min_args: usize,
    max_args: usize,
    /// Simple name the receiver must have (`Files.lines(path)`)
    on: Option<&'static str>,
}

const fn opens(name: &'static str, ret: &'static str, args: (usize, usize)) -> ResourceMethod {
    ResourceMethod { name, ret, adopts: false, min_args: args.0, max_args: args.1, on: None }
}

const fn wraps(name: &'static str, ret: &'static str, args: (usize, usize)) -> ResourceMethod {
    ResourceMethod { name, ret, adopts: true, min_args: args.0, max_args: args.1, on: None }
}

const fn on_files(name: &'static str, ret: &'static str, args: (usize, usize)) -> ResourceMethod {
    ResourceMethod { name, ret, adopts: false, min_args: args.0, max_args: args.1, on: Some("Files") }
}

/// Names shared with everyday non-resource APIs (`String.lines()`,
/// `Consumer.accept(x)`) are pinned down by argument count or receiver.
const RESOURCE_METHODS: &[ResourceMethod] = &[
    wraps("bufferedReader", "BufferedReader", (0, 2)),
    wraps("bufferedWriter", "BufferedWriter", (0, 2)),
    wraps("buffered", "BufferedReader", (0, 1)),
    wraps("reader", "InputStreamReader", (0, 1)),
    wraps("writer", "OutputStreamWriter", (0, 1)),
    wraps("printWriter", "PrintWriter", (0, 1)),
    opens("inputStream", "InputStream", (0, 0)),
    opens("outputStream", "OutputStream", (0, 1)),
    opens("getInputStream", "InputStream", (0, 0)),
    opens("getOutputStream", "OutputStream", (0, 0)),
    on_files("newBufferedReader", "BufferedReader", (1, 2)),
    on_files("newBufferedWriter", "BufferedWriter", (1, 4)),
    on_files("newInputStream", "InputStream", (1, 4)),
    on_files("newOutputStream", "OutputStream", (1, 4)),
    on_files("lines", "Stream", (1, 2)),
    opens("getConnection", "Connection", (0, 3)),
    opens("createStatement", "Statement", (0, 3)),
    opens("prepareStatement", "PreparedStatement", (1, 3)),
    opens("executeQuery", "ResultSet", (0, 1)),
    opens("accept", "Socket", (0, 0)),
];

/// Scope functions that hand back their receiver unchanged.
const RECEIVER_PASS_THROUGH: &[&str] = &["also", "apply", "takeIf", "takeUnless"];

/// Top-level functions that hand back their first argument unchanged.
const ARGUMENT_PASS_THROUGH: &[&str] = &["requireNotNull", "checkNotNull"];

/// Signature of a well-known library method called as `receiver.name(args)`.
///
/// `receiver` is the simple name of the receiver expression, when it has one.
pub fn method_signature(name: &str, arity: usize, receiver: Option<&str>) -> Option<CalleeSignature> {
    if RECEIVER_PASS_THROUGH.contains(&name) && arity == 1 {
        return Some(CalleeSignature {
            name: name.to_string(),
            kind: CalleeKind::Method,
            params: vec![Type::Unknown],
            ret: Type::Unknown,
            extension_on: None,
            body: BodyShape::PassThrough(PassThroughOf::Receiver),
            adopts_receiver: false,
        });
    }

    RESOURCE_METHODS
        .iter()
        .find(|m| {
            m.name == name
                && (m.min_args..=m.max_args).contains(&arity)
                && m.on.map_or(true, |on| receiver == Some(on))
        })
        .map(|m| CalleeSignature {
            name: name.to_string(),
            kind: CalleeKind::Method,
            params: vec![Type::Unknown; arity],
            ret: Type::named(m.ret),
            extension_on: None,
            body: BodyShape::Fresh,
            adopts_receiver: m.adopts,
        })
}

/// Signature of a well-known top-level library function.
pub fn function_signature(name: &str, arity: usize) -> Option<CalleeSignature> {
    if ARGUMENT_PASS_THROUGH.contains(&name) && arity >= 1 {
        return Some(CalleeSignature {
            name: name.to_string(),
            kind: CalleeKind::Function,
            params: vec![Type::Unknown; arity],
            ret: Type::Unknown,
            extension_on: None,
            body: BodyShape::PassThrough(PassThroughOf::Parameter(0)),
            adopts_receiver: false,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrappers_adopt_their_receiver() {
        let sig = method_signature("bufferedReader", 0, None).unwrap();
        assert!(sig.adopts_receiver);
        assert_eq!(sig.ret, Type::named("BufferedReader"));
        assert!(!method_signature("getInputStream", 0, None).unwrap().adopts_receiver);
    }

    #[test]
    fn shared_names_need_their_resource_form() {
        assert!(method_signature("lines", 0, Some("text")).is_none());
        assert!(method_signature("lines", 1, Some("text")).is_none());
        assert!(method_signature("lines", 1, None).is_none());
        assert_eq!(method_signature("lines", 1, Some("Files")).unwrap().ret, Type::named("Stream"));
        assert!(method_signature("accept", 1, Some("consumer")).is_none());
        assert!(method_signature("accept", 0, Some("server")).is_some());
        assert!(method_signature("reader", 3, None).is_none());
    }

    #[test]
    fn scope_functions_pass_through() {
        assert!(method_signature("also", 1, None).unwrap().is_pass_through());
        assert!(method_signature("also", 0, None).is_none());
        assert!(method_signature("let", 1, None).is_none());
        assert!(function_signature("requireNotNull", 1).unwrap().is_pass_through());
    }

    #[test]
    fn every_builtin_reaches_a_root() {
        for (name, supers) in CLOSEABLE_TYPES {
            assert!(!supers.is_empty(), "{} has no supertype", name);
        }
    }
}
