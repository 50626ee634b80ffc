// Discount Calculator
//
// Orchestrates filter -> sort -> apply over a pricing input. Undecided delivery
// candidates are priced in isolated passes that are rolled back, then a final
// pass commits against the selected delivery. Afterwards per-discount
// attributions are reconciled with the visible price and free items are
// settled at zero.

use rust_decimal::Decimal;

use crate::pricing::{
    appliers::{applier_for, is_free_discount},
    conditions::{ConditionContext, ConditionEvaluator, ConditionScope},
    config_store::CategoryTree,
    filter::{DiscountFilter, DiscountSorter},
    input::{DeliveryOption, PriceSnapshot, PricingInput},
    models::{ConditionGroup, Discount, DiscountCondition},
    output::AppliedDiscount,
    types::{DiscountId, DiscountType, LogicalOperator, ValueType},
};

pub struct DiscountCalculator<'a> {
    categories: &'a CategoryTree,
}

impl<'a> DiscountCalculator<'a> {
    pub fn new(categories: &'a CategoryTree) -> Self {
        Self { categories }
    }

    /// Price the input with the candidate discounts, committing the result
    pub fn calculate(&self, input: &mut PricingInput, candidates: Vec<Discount>) -> Vec<AppliedDiscount> {
        let candidates = compile_synergy(candidates);

        let previews = if input.free_delivery {
            zero_deliveries(input);
            Vec::new()
        } else {
            self.simulate_deliveries(input, &candidates)
        };

        input.deliveries.current = input
            .deliveries
            .selected
            .filter(|idx| *idx < input.deliveries.items.len());
        let order = self.run_pass(input, &candidates);

        reconcile(input);
        free_product_pass(input, &candidates);

        for (idx, preview) in previews {
            input.deliveries.items[idx] = preview;
        }

        let applied = collect_applied(input, &candidates, &order);
        tracing::info!(
            "Applied {} discounts, total discount {}",
            applied.len(),
            input.total_cost() - input.total_price()
        );
        applied
    }

    /// Amount the candidates would take off the basket and the selected
    /// delivery, leaving `input` as it was
    pub fn measure(&self, input: &mut PricingInput, candidates: Vec<Discount>) -> Decimal {
        let candidates = compile_synergy(candidates);
        let snapshot = input.snapshot();
        let previous_current = input.deliveries.current;

        input.deliveries.current = input.deliveries.selected;
        let before = payable_total(input);
        self.run_pass(input, &candidates);
        reconcile(input);
        free_product_pass(input, &candidates);
        let after = payable_total(input);

        self.rollback(input, &snapshot);
        input.deliveries.current = previous_current;
        before - after
    }

    /// Undo every price mutation made since `snapshot`
    pub fn rollback(&self, input: &mut PricingInput, snapshot: &PriceSnapshot) {
        input.restore(snapshot);
    }

    /// Price every non-selected delivery candidate in isolation
    fn simulate_deliveries(
        &self,
        input: &mut PricingInput,
        candidates: &[Discount],
    ) -> Vec<(usize, DeliveryOption)> {
        let selected = input.deliveries.selected;
        let snapshot = input.snapshot();
        let mut previews = Vec::new();

        for idx in 0..input.deliveries.items.len() {
            if selected == Some(idx) {
                continue;
            }

            input.deliveries.current = Some(idx);
            self.run_pass(input, candidates);
            previews.push((idx, input.deliveries.items[idx].clone()));

            tracing::debug!(
                "Delivery candidate {} would cost {}",
                idx,
                input.deliveries.items[idx].price
            );
            self.rollback(input, &snapshot);
        }

        input.deliveries.current = None;
        previews
    }

    /// One filter -> sort -> apply pass; returns applied ids in order
    fn run_pass(&self, input: &mut PricingInput, candidates: &[Discount]) -> Vec<DiscountId> {
        let mut filtered = DiscountFilter::filter(candidates, input, self.categories);
        {
            let ctx = ConditionContext::new(input, self.categories);
            filtered.retain(|d| ConditionEvaluator::check_discount(d, &ctx, ConditionScope::DeliveryOnly));
        }

        let sorted = DiscountSorter::sort(filtered, input, self.categories);
        let (deliveries, items): (Vec<Discount>, Vec<Discount>) = sorted
            .into_iter()
            .partition(|d| d.discount_type == DiscountType::Delivery);

        let mut applied: Vec<DiscountId> = Vec::new();

        for discount in &items {
            if applied.contains(&discount.id) {
                continue;
            }

            let amount = applier_for(discount.discount_type).apply(discount, input, self.categories);
            let attached = input.items.iter().any(|i| i.carries_discount(discount.id));
            if amount > Decimal::ZERO || attached {
                tracing::debug!("Applied discount {} for {}", discount.id, amount);
                applied.push(discount.id);
            } else {
                tracing::debug!("Discount {} changed nothing", discount.id);
            }
        }

        if !input.free_delivery {
            if let Some(id) = self.apply_delivery_discount(input, deliveries) {
                applied.push(id);
            }
        }

        applied
    }

    /// Percent discounts by descending value, then fixed ones; the first that
    /// changes the price wins
    fn apply_delivery_discount(&self, input: &mut PricingInput, mut deliveries: Vec<Discount>) -> Option<DiscountId> {
        deliveries.sort_by(|a, b| {
            let rank = |d: &Discount| match d.value_type {
                ValueType::Percent => 0,
                ValueType::FixedAmount => 1,
            };
            rank(a).cmp(&rank(b)).then_with(|| b.value.cmp(&a.value))
        });

        for discount in &deliveries {
            let amount = applier_for(DiscountType::Delivery).apply(discount, input, self.categories);
            if amount > Decimal::ZERO {
                tracing::debug!("Applied delivery discount {} for {}", discount.id, amount);
                return Some(discount.id);
            }
        }
        None
    }
}

/// Merge `summarizable_with_all` discounts into every synergy list
///
/// A summarizable discount lists every other candidate, and every other
/// candidate lists it.
pub fn compile_synergy(mut candidates: Vec<Discount>) -> Vec<Discount> {
    let all_ids: Vec<DiscountId> = candidates.iter().map(|d| d.id).collect();
    let summarizable: Vec<DiscountId> = candidates
        .iter()
        .filter(|d| d.summarizable_with_all)
        .map(|d| d.id)
        .collect();
    if summarizable.is_empty() {
        return candidates;
    }

    for discount in candidates.iter_mut() {
        let source = if discount.summarizable_with_all {
            &all_ids
        } else {
            &summarizable
        };
        let extra: Vec<DiscountId> = source.iter().copied().filter(|id| *id != discount.id).collect();
        if extra.is_empty() {
            continue;
        }

        match discount.synergy_condition_mut() {
            Some(condition) => {
                condition.payload.synergy.extend(extra);
                condition.payload.synergy.sort_unstable();
                condition.payload.synergy.dedup();
            }
            None => discount.condition_groups.push(ConditionGroup::new(
                LogicalOperator::And,
                vec![DiscountCondition::synergy(extra)],
            )),
        }
    }

    candidates
}

/// Make every per-discount change sum to the line's visible discount
///
/// The residual is spread evenly over non-bundle attributions; what does not
/// divide evenly goes to the first one.
pub fn reconcile(input: &mut PricingInput) {
    for item in input.items.iter_mut() {
        item.discount = item.cost - item.price;
        if item.discounts.is_empty() {
            continue;
        }

        let recorded: Decimal = item.discounts.iter().map(|d| d.change).sum();
        let residual = item.discount - recorded;
        if residual.is_zero() {
            continue;
        }

        let mut targets: Vec<usize> = item
            .discounts
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.bundle)
            .map(|(idx, _)| idx)
            .collect();
        if targets.is_empty() {
            targets = (0..item.discounts.len()).collect();
        }

        let count = Decimal::from(targets.len() as u64);
        let share = (residual / count).trunc();
        for idx in &targets {
            item.discounts[*idx].change += share;
        }
        item.discounts[targets[0]].change += residual - share * count;

        tracing::debug!("Reconciled residual {} on offer {}", residual, item.offer_id);
    }
}

/// A line whose only discount is a full item-level one, already taken down
/// to the price floor, ends up free
///
/// Cart-total values are order-level and qty-limited discounts cover part of
/// the line, so neither frees it.
pub fn free_product_pass(input: &mut PricingInput, candidates: &[Discount]) {
    for item in input.items.iter_mut() {
        if item.discounts.len() != 1 || item.price.is_zero() {
            continue;
        }

        let only = &item.discounts[0];
        let discount = match candidates.iter().find(|d| d.id == only.discount_id) {
            Some(discount) => discount,
            None => continue,
        };
        if matches!(discount.discount_type, DiscountType::CartTotal | DiscountType::Delivery) {
            continue;
        }
        if matches!(discount.product_qty_limit, Some(limit) if item.qty > limit) {
            continue;
        }

        let at_floor = only.change >= item.cost - item.lowest_possible_price();
        if at_floor && is_free_discount(discount, item.cost) {
            item.price = Decimal::ZERO;
            item.discount = item.cost;
            item.discounts[0].change = item.cost;
        }
    }
}

fn zero_deliveries(input: &mut PricingInput) {
    for delivery in input.deliveries.items.iter_mut() {
        delivery.discount = delivery.cost;
        delivery.price = Decimal::ZERO;
    }
}

fn payable_total(input: &PricingInput) -> Decimal {
    input.total_price()
        + input
            .deliveries
            .current()
            .map(|d| d.price)
            .unwrap_or(Decimal::ZERO)
}

fn collect_applied(input: &PricingInput, candidates: &[Discount], order: &[DiscountId]) -> Vec<AppliedDiscount> {
    let selected = input.deliveries.current();

    order
        .iter()
        .filter_map(|id| candidates.iter().find(|d| d.id == *id))
        .map(|discount| {
            let on_items: Decimal = input
                .items
                .iter()
                .flat_map(|item| {
                    item.discounts
                        .iter()
                        .filter(|d| d.discount_id == discount.id)
                        .map(move |d| d.change * item.qty_decimal())
                })
                .sum();
            let on_delivery: Decimal = selected
                .map(|delivery| {
                    delivery
                        .discounts
                        .iter()
                        .filter(|d| d.discount_id == discount.id)
                        .map(|d| d.change)
                        .sum()
                })
                .unwrap_or(Decimal::ZERO);

            AppliedDiscount::new(discount, on_items + on_delivery, input.is_promo_discount(discount.id))
        })
        .collect()
}
