// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Ownership state of tracked resource values.

use closelint_ast::{NodeId, Span};
use closelint_types::Type;

/// Where a tracked value stands.
///
/// Every value starts `Created` and moves to exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipState {
    /// Just created, no use seen yet.
    Created,
    /// Closed by the scoped-closing call.
    Consumed { at: Span },
    /// Ownership left this body: returned, passed on, or stored in a field.
    Transferred { at: Span },
    /// Used as a receiver without being closed first.
    Leaked { at: Span },
    /// The analysis lost sight of the value.
    Untracked,
}

impl OwnershipState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OwnershipState::Created)
    }
}

/// How a value was used at one step of its flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseSiteKind {
    /// Receiver of a call that does not close it
    ChainedCall,
    /// Receiver of the closing call
    ClosingCall,
    /// Passed as an argument
    Argument,
    /// Returned, or the result of a lambda
    Return,
    /// Bound to a local
    Rebind,
    /// Stored into a field or an indexed slot
    FieldStore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UseSite {
    pub kind: UseSiteKind,
    pub span: Span,
}

/// The expression that created a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Origin {
    pub id: NodeId,
    pub span: Span,
    pub ty: Type,
}

/// One resource value followed through a body.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedValue {
    pub origin: Origin,
    pub binding_chain: Vec<UseSite>,
    pub state: OwnershipState,
}

impl TrackedValue {
    pub fn new(origin: Origin) -> Self {
        Self { origin, binding_chain: Vec::new(), state: OwnershipState::Created }
    }

    pub fn record(&mut self, kind: UseSiteKind, span: Span) {
        self.binding_chain.push(UseSite { kind, span });
    }

    /// Move to a terminal state. The first transition wins.
    pub fn settle(&mut self, state: OwnershipState) {
        if !self.state.is_terminal() {
            self.state = state;
        }
    }

    /// The use site a finding for this value points at.
    pub fn terminal_site(&self) -> Option<&UseSite> {
        self.binding_chain.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value() -> TrackedValue {
        TrackedValue::new(Origin { id: NodeId(1), span: Span::new(0, 5), ty: Type::named("StringReader") })
    }

    #[test]
    fn first_transition_wins() {
        let mut v = value();
        v.settle(OwnershipState::Leaked { at: Span::new(6, 10) });
        v.settle(OwnershipState::Consumed { at: Span::new(12, 15) });
        assert_eq!(v.state, OwnershipState::Leaked { at: Span::new(6, 10) });
    }

    #[test]
    fn terminal_site_is_last_recorded() {
        let mut v = value();
        assert!(v.terminal_site().is_none());
        v.record(UseSiteKind::Rebind, Span::new(0, 5));
        v.record(UseSiteKind::ChainedCall, Span::new(20, 29));
        assert_eq!(v.terminal_site().map(|s| s.kind), Some(UseSiteKind::ChainedCall));
    }
}
