//! Sequence-action resolver
//!
//! Translates a staged parcel's temporary number into its permanent
//! registry number by reading the process's sequence-action log. A temp
//! parcel with no usable row is `Pending`, which is a normal state while
//! the surveyor is still numbering, never an error and never a silent
//! zero.

use cadastre_core::SequenceAction;
use tracing::warn;

/// Outcome of resolving one temporary number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The permanent registry number
    Final(u32),
    /// No final number assigned yet
    Pending,
}

impl Resolution {
    /// The final number, if resolved
    pub fn final_number(&self) -> Option<u32> {
        match self {
            Resolution::Final(n) => Some(*n),
            Resolution::Pending => None,
        }
    }
}

/// Resolve the final number for a temp parcel in its home block
///
/// Rows apply when their temp number matches and their *effective*
/// block (destination block for transfers, home block otherwise) equals
/// the staged parcel's block. A merge maps every temp input to the one
/// merge output, so several staged parcels may resolve to the same
/// final.
///
/// When distinct rows disagree on the final number, that is a
/// data-integrity problem in the log; the answer is still deterministic:
/// action-type precedence first (merge before divide before transfer
/// before judgement before create), then the smallest final number.
pub fn resolve_final(
    temp: u32,
    block: u32,
    sub_block: u32,
    actions: &[&SequenceAction],
) -> Resolution {
    let mut candidates: Vec<(u8, u32)> = actions
        .iter()
        .filter(|a| {
            a.temp_number == temp
                && a.effective_block() == block
                && a.effective_sub_block() == sub_block
        })
        .filter_map(|a| a.final_number.map(|f| (a.action_type.precedence(), f)))
        .collect();
    candidates.sort_unstable();
    candidates.dedup();
    match candidates.as_slice() {
        [] => Resolution::Pending,
        [(_, f)] => Resolution::Final(*f),
        many => {
            let finals: Vec<u32> = many.iter().map(|(_, f)| *f).collect();
            let chosen = many[0].1;
            if finals.windows(2).any(|w| w[0] != w[1]) {
                warn!(
                    temp,
                    block,
                    sub_block,
                    ?finals,
                    chosen,
                    "sequence log assigns multiple finals to one temp parcel"
                );
            }
            Resolution::Final(chosen)
        }
    }
}
