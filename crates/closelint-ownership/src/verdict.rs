// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Escape classification.

use crate::state::OwnershipState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Compliant,
    Violation,
    /// Nothing can be said either way
    Neutral,
}

pub fn verdict(state: &OwnershipState) -> Verdict {
    match state {
        OwnershipState::Consumed { .. } | OwnershipState::Transferred { .. } => Verdict::Compliant,
        OwnershipState::Leaked { .. } => Verdict::Violation,
        OwnershipState::Untracked | OwnershipState::Created => Verdict::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use closelint_ast::Span;

    #[test]
    fn only_leaks_are_violations() {
        let at = Span::new(3, 7);
        assert_eq!(verdict(&OwnershipState::Consumed { at }), Verdict::Compliant);
        assert_eq!(verdict(&OwnershipState::Transferred { at }), Verdict::Compliant);
        assert_eq!(verdict(&OwnershipState::Leaked { at }), Verdict::Violation);
        assert_eq!(verdict(&OwnershipState::Untracked), Verdict::Neutral);
        assert_eq!(verdict(&OwnershipState::Created), Verdict::Neutral);
    }
}
