//! Modifier resolution.
//!
//! Turns the candidate modifiers for one attribute into calculated
//! modifiers and a total:
//!
//! ```text
//! [candidates] → compute values → gate by source requirement → stacking → sum(Used)
//! ```
//!
//! Stacking works per modifier type (by name). Within a type, the
//! modifiers that do not stack compete: the largest is kept and the rest
//! are marked `Overridden`, ties going to the first one encountered.
//! Stacking modifiers, including every penalty, always count.

use crate::attribute::AttributeDefinition;
use crate::calculated::{CalculatedModifier, ModifierState};
use crate::context::CalculationData;
use crate::error::RuleError;
use crate::modifier::ModifierValue;
use crate::modifier_type::ModifierType;
use crate::sources::modifiers_for;
use tracing::trace;

/// Calculate an attribute's value and modifier breakdown.
pub fn calculate(
    attribute: &AttributeDefinition,
    data: &mut CalculationData<'_>,
) -> Result<(i32, Vec<CalculatedModifier>), RuleError> {
    let data_source = data.resolver().data_source();
    let candidates = modifiers_for(data.sources(), &attribute.name);

    let mut computed = Vec::with_capacity(candidates.len());
    for modifier in candidates {
        let modifier_type = data_source.modifier_type(&modifier.modifier_type)?;
        let value = match &modifier.value {
            ModifierValue::Static(value) => *value,
            ModifierValue::FromAttribute(source) => data.resolve(source)?.modifier(),
        };
        computed.push(CalculatedModifier::new(modifier, modifier_type, value));
    }

    for calculated in computed.iter_mut() {
        let requirement = calculated
            .modifier
            .source
            .as_ref()
            .and_then(|s| s.apply_requirement.clone());
        if let Some(requirement) = requirement {
            if !requirement.evaluate(&mut *data)? {
                trace!(attribute = %attribute.name, modifier = %calculated.modifier.id, "requirement not met");
                calculated.state = ModifierState::NotMet;
            }
        }
    }

    apply_stacking(&mut computed);
    let value = total(&computed).ok_or_else(|| RuleError::Overflow(attribute.name.clone()))?;
    Ok((value, computed))
}

/// Mark competing non-stacking modifiers as overridden.
pub fn apply_stacking(modifiers: &mut [CalculatedModifier]) {
    let mut types: Vec<ModifierType> = Vec::new();
    for m in modifiers.iter() {
        if !types.contains(&m.modifier_type) {
            types.push(m.modifier_type.clone());
        }
    }

    for modifier_type in &types {
        let mut competing: Vec<usize> = modifiers
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_used() && !m.stacks() && &m.modifier_type == modifier_type)
            .map(|(idx, _)| idx)
            .collect();
        competing.sort_by(|&a, &b| modifiers[b].value.cmp(&modifiers[a].value));

        let Some((&kept, beaten)) = competing.split_first() else {
            continue;
        };
        let kept_id = modifiers[kept].modifier.id;
        for &idx in beaten {
            trace!(modifier_type = %modifier_type.name, kept = modifiers[kept].value, beaten = modifiers[idx].value, "overridden");
            modifiers[idx].state = ModifierState::Overridden;
            modifiers[idx].overridden_by = Some(kept_id);
        }
    }
}

/// Sum of every modifier still in use, or `None` if it leaves the `i32` range.
pub fn total(modifiers: &[CalculatedModifier]) -> Option<i32> {
    modifiers
        .iter()
        .filter(|m| m.is_used())
        .try_fold(0i32, |sum, m| sum.checked_add(m.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::Modifier;
    use crate::modifier_type::{StackingOverride, StackingPolicy};

    fn entry(ty: &str, policy: StackingPolicy, value: i32) -> CalculatedModifier {
        entry_with(ty, policy, StackingOverride::Default, value)
    }

    fn entry_with(ty: &str, policy: StackingPolicy, stacking: StackingOverride, value: i32) -> CalculatedModifier {
        let modifier = Modifier::builder(ty)
            .static_value(value)
            .target("Strength")
            .stacking(stacking)
            .build()
            .unwrap();
        CalculatedModifier::new(modifier, ModifierType::new(ty, policy), value)
    }

    #[test]
    fn test_largest_non_stacking_wins() {
        let mut mods = vec![
            entry("Enhancement", StackingPolicy::NonStacking, 3),
            entry("Enhancement", StackingPolicy::NonStacking, 5),
        ];
        apply_stacking(&mut mods);
        assert_eq!(total(&mods), Some(5));
        assert_eq!(mods[0].state, ModifierState::Overridden);
        assert_eq!(mods[0].overridden_by, Some(mods[1].modifier.id));
        assert_eq!(mods[1].state, ModifierState::Used);
        assert_eq!(mods[1].overridden_by, None);
    }

    #[test]
    fn test_tie_keeps_first() {
        let mut mods = vec![
            entry("Enhancement", StackingPolicy::NonStacking, 4),
            entry("Enhancement", StackingPolicy::NonStacking, 4),
        ];
        apply_stacking(&mut mods);
        assert_eq!(mods[0].state, ModifierState::Used);
        assert_eq!(mods[1].state, ModifierState::Overridden);
        assert_eq!(mods[1].overridden_by, Some(mods[0].modifier.id));
        assert_eq!(total(&mods), Some(4));
    }

    #[test]
    fn test_penalty_always_counts() {
        let mut mods = vec![
            entry("Enhancement", StackingPolicy::NonStacking, 6),
            entry("Enhancement", StackingPolicy::NonStacking, -2),
        ];
        apply_stacking(&mut mods);
        assert!(mods.iter().all(|m| m.state == ModifierState::Used));
        assert_eq!(total(&mods), Some(4));
    }

    #[test]
    fn test_different_types_do_not_compete() {
        let mut mods = vec![
            entry("Enhancement", StackingPolicy::NonStacking, 2),
            entry("Morale", StackingPolicy::NonStacking, 1),
        ];
        apply_stacking(&mut mods);
        assert_eq!(total(&mods), Some(3));
    }

    #[test]
    fn test_stacking_type_sums() {
        let mut mods = vec![
            entry("Dodge", StackingPolicy::Stacking, 1),
            entry("Dodge", StackingPolicy::Stacking, 1),
            entry("Dodge", StackingPolicy::Stacking, 2),
        ];
        apply_stacking(&mut mods);
        assert_eq!(total(&mods), Some(4));
    }

    #[test]
    fn test_stacking_override_opts_out_of_competition() {
        let mut mods = vec![
            entry("Enhancement", StackingPolicy::NonStacking, 5),
            entry_with("Enhancement", StackingPolicy::NonStacking, StackingOverride::Stacking, 2),
            entry("Enhancement", StackingPolicy::NonStacking, 3),
        ];
        apply_stacking(&mut mods);
        assert_eq!(mods[1].state, ModifierState::Used);
        assert_eq!(mods[2].state, ModifierState::Overridden);
        assert_eq!(total(&mods), Some(7));
    }

    #[test]
    fn test_not_met_excluded_from_competition() {
        let mut mods = vec![
            entry("Enhancement", StackingPolicy::NonStacking, 6),
            entry("Enhancement", StackingPolicy::NonStacking, 2),
        ];
        mods[0].state = ModifierState::NotMet;
        apply_stacking(&mut mods);
        assert_eq!(mods[0].state, ModifierState::NotMet);
        assert_eq!(mods[1].state, ModifierState::Used);
        assert_eq!(total(&mods), Some(2));
    }

    #[test]
    fn test_empty() {
        let mut mods: Vec<CalculatedModifier> = Vec::new();
        apply_stacking(&mut mods);
        assert_eq!(total(&mods), Some(0));
    }

    #[test]
    fn test_total_overflow() {
        let mods = vec![
            entry("Dodge", StackingPolicy::Stacking, i32::MAX),
            entry("Dodge", StackingPolicy::Stacking, 1),
        ];
        assert_eq!(total(&mods), None);
    }
}
