// Synergy Linker
//
// Keeps discount-synergy conditions symmetric across discounts: when A lists B,
// B lists A. Removing the last id from a remote list deletes the remote
// condition, and a group left without conditions is deleted with it.

use std::collections::HashMap;

use crate::pricing::{
    error::{PricingError, PricingResult},
    models::{ConditionGroup, Discount, DiscountCondition},
    types::{ConditionType, DiscountId, LogicalOperator},
};

pub struct SynergyLinker;

impl SynergyLinker {
    /// Mirror a change of `id`'s synergy list, given the list it had before
    ///
    /// Every referenced discount must exist; nothing is changed otherwise.
    pub fn link(
        discounts: &mut HashMap<DiscountId, Discount>,
        id: DiscountId,
        previous: &[DiscountId],
    ) -> PricingResult<()> {
        let current = discounts
            .get(&id)
            .map(Discount::synergy_ids)
            .ok_or(PricingError::DiscountNotFound(id))?;

        if let Some(missing) = current.iter().find(|remote| !discounts.contains_key(remote)) {
            return Err(PricingError::DiscountNotFound(*missing));
        }

        for remote in current.iter().filter(|r| !previous.contains(r)) {
            if let Some(discount) = discounts.get_mut(remote) {
                add_synergy(discount, id);
            }
        }
        for remote in previous.iter().filter(|r| !current.contains(r)) {
            if let Some(discount) = discounts.get_mut(remote) {
                remove_synergy(discount, id);
            }
        }

        tracing::debug!("Mirrored synergy of discount {} onto {:?}", id, current);
        Ok(())
    }

    /// Drop every mirrored reference to a deleted discount
    pub fn unlink(discounts: &mut HashMap<DiscountId, Discount>, id: DiscountId) {
        for discount in discounts.values_mut() {
            remove_synergy(discount, id);
        }
    }
}

fn add_synergy(discount: &mut Discount, id: DiscountId) {
    match discount.synergy_condition_mut() {
        Some(condition) => {
            if !condition.payload.synergy.contains(&id) {
                condition.payload.synergy.push(id);
            }
        }
        None => discount.condition_groups.push(ConditionGroup::new(
            LogicalOperator::And,
            vec![DiscountCondition::synergy(vec![id])],
        )),
    }
}

fn remove_synergy(discount: &mut Discount, id: DiscountId) {
    for group in &mut discount.condition_groups {
        for condition in &mut group.conditions {
            if condition.condition_type == ConditionType::DiscountSynergy {
                condition.payload.synergy.retain(|other| *other != id);
            }
        }
        group.conditions.retain(|c| {
            c.condition_type != ConditionType::DiscountSynergy || !c.payload.synergy.is_empty()
        });
    }
    discount.condition_groups.retain(|g| !g.conditions.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::types::{DiscountType, ValueType};
    use rust_decimal_macros::dec;

    fn store(ids: &[DiscountId]) -> HashMap<DiscountId, Discount> {
        ids.iter()
            .map(|id| (*id, Discount::new(*id, DiscountType::AnyOffer, dec!(5), ValueType::Percent)))
            .collect()
    }

    fn set_synergy(discounts: &mut HashMap<DiscountId, Discount>, id: DiscountId, ids: Vec<DiscountId>) {
        let discount = discounts.get_mut(&id).unwrap();
        discount.condition_groups = vec![ConditionGroup::new(
            LogicalOperator::And,
            vec![DiscountCondition::synergy(ids)],
        )];
    }

    #[test]
    fn test_link_mirrors_onto_every_remote() {
        let mut discounts = store(&[1, 2, 3]);
        set_synergy(&mut discounts, 1, vec![2, 3]);

        SynergyLinker::link(&mut discounts, 1, &[]).unwrap();

        assert_eq!(discounts[&2].synergy_ids(), vec![1]);
        assert_eq!(discounts[&3].synergy_ids(), vec![1]);
    }

    #[test]
    fn test_link_extends_existing_remote_list() {
        let mut discounts = store(&[1, 2, 3]);
        set_synergy(&mut discounts, 2, vec![3]);
        set_synergy(&mut discounts, 1, vec![2]);

        SynergyLinker::link(&mut discounts, 1, &[]).unwrap();

        assert_eq!(discounts[&2].synergy_ids(), vec![1, 3]);
        assert_eq!(discounts[&2].condition_groups.len(), 1);
    }

    #[test]
    fn test_removing_last_id_deletes_remote_condition() {
        let mut discounts = store(&[1, 2, 3]);
        set_synergy(&mut discounts, 1, vec![2, 3]);
        SynergyLinker::link(&mut discounts, 1, &[]).unwrap();

        set_synergy(&mut discounts, 1, vec![2]);
        SynergyLinker::link(&mut discounts, 1, &[2, 3]).unwrap();

        assert_eq!(discounts[&2].synergy_ids(), vec![1]);
        assert!(discounts[&3].synergy_condition().is_none());
        assert!(discounts[&3].condition_groups.is_empty());
    }

    #[test]
    fn test_unknown_remote_changes_nothing() {
        let mut discounts = store(&[1, 2]);
        set_synergy(&mut discounts, 1, vec![2, 9]);

        let err = SynergyLinker::link(&mut discounts, 1, &[]).unwrap_err();

        assert!(matches!(err, PricingError::DiscountNotFound(9)));
        assert!(discounts[&2].synergy_condition().is_none());
    }

    #[test]
    fn test_unlink_on_delete() {
        let mut discounts = store(&[1, 2, 3]);
        set_synergy(&mut discounts, 1, vec![2, 3]);
        SynergyLinker::link(&mut discounts, 1, &[]).unwrap();

        discounts.remove(&1);
        SynergyLinker::unlink(&mut discounts, 1);

        assert!(discounts.values().all(|d| d.synergy_ids().is_empty()));
    }
}
