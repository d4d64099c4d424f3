//! Folding per-pair relative transforms into anchor-relative ones.

use align_core::{AbsoluteTransform, Error, Homography, RelativeTransform, Result};
use serde::{Deserialize, Serialize};

/// What to do when a pair's transform could not be estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainPolicy {
    /// Stop at the first failing pair and report it as `ChainBroken`.
    #[default]
    Abort,
    /// Treat the failing pair as identity: the frame inherits its
    /// predecessor's absolute transform and the chain continues.
    CarryForward,
}

/// A pair whose relative transform was replaced by identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    pub frame: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainReport {
    /// One per frame, index-aligned, starting with the anchor.
    pub transforms: Vec<AbsoluteTransform>,
    pub substitutions: Vec<Substitution>,
}

impl ChainReport {
    pub fn is_complete(&self) -> bool {
        self.substitutions.is_empty()
    }
}

fn check_order(position: usize, relative: &RelativeTransform) -> Result<()> {
    let expected = position + 1;
    if relative.source != expected || relative.target + 1 != expected {
        return Err(Error::ChainOrder(format!(
            "expected transform {} -> {}, got {} -> {}",
            expected,
            expected - 1,
            relative.source,
            relative.target
        )));
    }
    Ok(())
}

/// `relatives[k]` must map frame `k + 1` onto frame `k`. Returns one absolute
/// transform per frame: `absolute[0]` is identity and
/// `absolute[i] = absolute[i - 1] ∘ relative[i]`.
pub fn compose(relatives: &[RelativeTransform]) -> Result<Vec<AbsoluteTransform>> {
    relatives.iter().enumerate().try_fold(
        vec![AbsoluteTransform::anchor()],
        |mut chain, (k, relative)| {
            check_order(k, relative)?;
            let next = chain[chain.len() - 1].then(relative);
            chain.push(next);
            Ok(chain)
        },
    )
}

/// Like [`compose`] but takes each pair's estimation outcome, applying
/// `policy` to failures. `outcomes[k]` belongs to the pair `(k + 1, k)`.
pub fn compose_outcomes(
    outcomes: Vec<Result<RelativeTransform>>,
    policy: ChainPolicy,
) -> Result<ChainReport> {
    let mut transforms = Vec::with_capacity(outcomes.len() + 1);
    transforms.push(AbsoluteTransform::anchor());
    let mut substitutions = Vec::new();

    for (k, outcome) in outcomes.into_iter().enumerate() {
        let frame = k + 1;
        let relative = match (outcome, policy) {
            (Ok(relative), _) => {
                check_order(k, &relative)?;
                relative
            }
            (Err(err), ChainPolicy::Abort) => {
                return Err(Error::ChainBroken {
                    frame,
                    source: Box::new(err),
                });
            }
            (Err(err), ChainPolicy::CarryForward) => {
                tracing::warn!(frame, error = %err, "carrying previous transform forward");
                substitutions.push(Substitution {
                    frame,
                    reason: err.to_string(),
                });
                RelativeTransform::new(frame, Homography::identity())
            }
        };
        let next = transforms[transforms.len() - 1].then(&relative);
        transforms.push(next);
    }

    Ok(ChainReport {
        transforms,
        substitutions,
    })
}
