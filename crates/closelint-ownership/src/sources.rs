// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Ownership source detection: which expressions create a resource the body owns.

use closelint_ast::expr::ExprKind;
use closelint_types::{CalleeKind, CalleeSignature, Resolver};
use tracing::debug;

use crate::body::BodyMap;
use crate::classify::CapabilityClassifier;
use crate::error::AnalysisError;
use crate::state::{Origin, TrackedValue};

/// Whether a call to `sig` hands its caller a resource it now owns.
///
/// Constructors of resource types always do. Other callees do unless they
/// only return their receiver or a parameter.
pub fn is_origin(sig: &CalleeSignature, classifier: &CapabilityClassifier<'_>) -> Result<bool, AnalysisError> {
    if sig.kind != CalleeKind::Constructor && sig.is_pass_through() {
        return Ok(false);
    }
    classifier.is_resource_type(&sig.ret)
}

/// All origins in a body, in source order, each in state `Created`.
pub fn detect_origins(
    map: &BodyMap<'_>,
    resolver: &dyn Resolver,
    classifier: &CapabilityClassifier<'_>,
) -> Result<Vec<TrackedValue>, AnalysisError> {
    let mut values = Vec::new();
    for expr in map.exprs() {
        if !matches!(expr.kind, ExprKind::Call { .. } | ExprKind::MethodCall { .. }) {
            continue;
        }
        let Some(sig) = resolver.callee_signature(expr)? else {
            continue;
        };
        if is_origin(&sig, classifier)? {
            debug!(callee = %sig.name, ty = %sig.ret, span = ?expr.span, "resource origin");
            values.push(TrackedValue::new(Origin { id: expr.id, span: expr.span, ty: sig.ret }));
        }
    }
    values.sort_by_key(|v| (v.origin.span.start, v.origin.span.end));
    Ok(values)
}
