//! Character example: building a multiclass character from a JSON catalog
//!
//! This example demonstrates:
//! - Loading attributes and modifier types from a catalog document
//! - Race, class levels, feats and gated special qualities
//! - Non-stacking modifiers and the per-attribute breakdown
//! - Cache invalidation when the character changes
//!
//! Run with `RUST_LOG=ruleforge=debug` to see the resolver at work.

use ruleforge::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const CATALOG: &str = r#"{
    "attributes": [
        {"name": "Strength", "category": "Ability", "kind": "AbilityScore"},
        {"name": "Dexterity", "category": "Ability", "kind": "AbilityScore"},
        {"name": "Armor Class", "category": "Defense", "kind": "Direct"}
    ],
    "modifier_types": [
        {"name": "Base", "stacking": "Stacking"},
        {"name": "Ability", "stacking": "Stacking"},
        {"name": "Enhancement", "stacking": "NonStacking"},
        {"name": "Dodge", "stacking": "Stacking"}
    ],
    "campaign_modifiers": [
        {"modifier_type": "Base", "targets": ["Armor Class"], "value": {"Static": 10}}
    ]
}"#;

fn print_attribute(hero: &mut Character, attribute: &AttributeDefinition) -> Result<(), RuleError> {
    let resolved = hero.attribute(attribute)?;
    println!("  {} = {} (modifier {:+})", attribute.name, resolved.value(), resolved.modifier());
    for line in resolved.breakdown() {
        println!("      {line}");
    }
    Ok(())
}

fn main() -> Result<(), RuleError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    println!("=== Character Demo ===\n");

    let catalog = Catalog::from_json(CATALOG)?;
    let strength = AttributeDefinition::new("Strength", "Ability", ModifierKind::AbilityScore);
    let dexterity = AttributeDefinition::new("Dexterity", "Ability", ModifierKind::AbilityScore);
    let armor_class = AttributeDefinition::new("Armor Class", "Defense", ModifierKind::Direct);

    let elf = Definition::race("Elf")
        .with_modifier(Modifier::new_static("Racial", 2, [dexterity.name.clone()])?)
        .with_modifier(Modifier::new_static("Racial", -2, [strength.name.clone()])?);

    let fighter = Arc::new(
        Definition::class("Fighter", DieType::D10)
            .with_level(Definition::level(2).with_modifier(Modifier::new_static("Dodge", 1, [armor_class.name.clone()])?)),
    );
    let rogue = Arc::new(
        Definition::class("Rogue", DieType::D6).with_special_quality(
            Definition::special_quality("Evasive")
                .with_apply_requirement(Conditional::compare(dexterity.clone(), Relation::GreaterThanOrEqual, 3))
                .with_modifier(Modifier::new_static("Dodge", 2, [armor_class.name.clone()])?),
        ),
    );

    let mut hero = Character::new("Aerin", Arc::new(catalog));
    hero.add_modifier(Modifier::new_static("Base", 13, [strength.name.clone()])?);
    hero.add_modifier(Modifier::new_static("Base", 14, [dexterity.name.clone()])?);
    hero.add_modifier(Modifier::new_from_attribute("Ability", dexterity.clone(), [armor_class.name.clone()])?);
    hero.set_race(Some(Arc::new(elf)));
    hero.add_level(fighter.clone());
    hero.add_level(rogue);
    hero.add_level(fighter);

    let character_level = hero.value(total_class_level())?;
    println!("1. {} at character level {}\n", hero.name, character_level);
    for die in DieType::ALL {
        let count = hero.value(hit_die(die))?;
        if count > 0 {
            println!("  {count}d{}", die.sides());
        }
    }
    println!();
    for attribute in [&strength, &dexterity, &armor_class] {
        print_attribute(&mut hero, attribute)?;
    }

    println!("\n2. Gloves of Dexterity +2 and a Cat's Grace +4\n");
    hero.add_modifier(Modifier::new_static("Enhancement", 2, [dexterity.name.clone()])?);
    hero.add_modifier(Modifier::new_static("Enhancement", 4, [dexterity.name.clone()])?);
    print_attribute(&mut hero, &dexterity)?;
    print_attribute(&mut hero, &armor_class)?;

    println!("\n3. Qualities\n");
    for quality in hero.qualities() {
        let marker = if quality.applied { "applied" } else { "not applied" };
        println!("  {} ({marker})", quality.definition.name);
    }

    println!("\n4. Losing a level\n");
    if let Some(class) = hero.remove_level() {
        println!("  removed a {} level", class.name);
    }
    println!("  character level {}", hero.value(total_class_level())?);
    print_attribute(&mut hero, &armor_class)?;

    Ok(())
}
