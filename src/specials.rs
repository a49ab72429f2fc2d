//! Special qualities convergence loop.
//!
//! Applying a quality can change an attribute another quality's
//! requirement reads, so applied flags are relaxed to a fixed point:
//! every gated quality is re-evaluated until a full pass changes nothing.
//! There is no oscillation detection beyond an optional pass limit.

use crate::conditional::Conditional;
use crate::error::RuleError;
use crate::sources::SpecialQualityRecord;
use tracing::{debug, trace};

/// The character side of the convergence loop.
pub trait QualityHost {
    /// Evaluate `requirement` as if exactly the applied records in `qualities` were active.
    fn requirement_met(&self, requirement: &Conditional, qualities: &[SpecialQualityRecord]) -> Result<bool, RuleError>;

    /// Called whenever a record's applied flag flips.
    fn qualities_changed(&self);
}

/// Runs the qualities convergence loop.
///
/// # Examples
///
/// ```rust
/// use ruleforge::SpecialsManager;
///
/// let unbounded = SpecialsManager::default();
/// let bounded = SpecialsManager::new(Some(32));
/// # let _ = (unbounded, bounded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecialsManager {
    max_passes: Option<u32>,
}

impl SpecialsManager {
    /// Create a manager with an optional pass limit.
    ///
    /// # Arguments
    ///
    /// * `max_passes` - Give up with `RuleError::NotConverged` after this many
    ///   passes; `None` loops until the flags settle
    pub fn new(max_passes: Option<u32>) -> Self {
        Self { max_passes }
    }

    /// Re-evaluate applied flags until they stop changing.
    ///
    /// Only records with an apply requirement are touched; ungated ones
    /// always apply. The host is told about every flip so it can drop
    /// cached attributes computed under the old flags.
    ///
    /// # Arguments
    ///
    /// * `qualities` - The records whose `applied` flags are settled in place
    /// * `host` - Evaluates requirements against the character
    ///
    /// # Returns
    ///
    /// * `Ok(passes)` - The number of passes, including the final quiet one
    /// * `Err(RuleError)` - If a requirement fails to evaluate or the pass limit is hit
    pub fn reexamine_qualities(
        &self,
        qualities: &mut [SpecialQualityRecord],
        host: &impl QualityHost,
    ) -> Result<u32, RuleError> {
        let mut passes = 0;
        loop {
            if let Some(max) = self.max_passes {
                if passes >= max {
                    return Err(RuleError::NotConverged { passes });
                }
            }
            passes += 1;

            let mut changed = false;
            for idx in 0..qualities.len() {
                let Some(requirement) = qualities[idx].definition.apply_requirement.clone() else {
                    continue;
                };
                let met = host.requirement_met(&requirement, qualities)?;
                if met != qualities[idx].applied {
                    trace!(quality = %qualities[idx].definition.name, applied = met, "quality flipped");
                    qualities[idx].applied = met;
                    changed = true;
                    host.qualities_changed();
                }
            }

            if !changed {
                debug!(passes, qualities = qualities.len(), "special qualities converged");
                return Ok(passes);
            }
        }
    }
}
