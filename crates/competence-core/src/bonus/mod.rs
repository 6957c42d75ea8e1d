//! Skill bonuses from equipment and the companion.

pub mod aggregator;
pub mod source;

pub use aggregator::BonusAggregator;
pub use source::{CompanionBonusCache, CompanionBonusSource, EquipmentSource, ModifierResolver};
