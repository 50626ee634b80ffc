// Pricing input model
//
// Request-scoped, hydrated view of a checkout: basket lines, customer, payment,
// delivery candidates and promo code. Appliers mutate the price fields in place;
// snapshots allow a pass to be undone exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::models::Discount;
use crate::pricing::types::{
    BonusId, BrandId, BundleId, CategoryId, CustomerId, DeliveryMethodId, DiscountId,
    MerchantId, OfferId, PaymentMethod, PropertyId, PublicEventId, RegionId, RoleId, SegmentId,
    ValueType,
};

/// Physical goods or a non-physical ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    #[default]
    Product,
    Masterclass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductProperty {
    pub property_id: PropertyId,
    pub value: String,
}

/// Attribution of one discount on one line or delivery
///
/// `change` is the per-unit amount taken off by this discount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDiscount {
    pub discount_id: DiscountId,
    pub change: Decimal,
    pub value: Decimal,
    pub value_type: ValueType,
    #[serde(default)]
    pub bundle: bool,
}

impl ItemDiscount {
    pub fn new(discount: &Discount, change: Decimal) -> Self {
        Self {
            discount_id: discount.id,
            change,
            value: discount.value,
            value_type: discount.value_type,
            bundle: discount.discount_type.is_bundle(),
        }
    }
}

/// Loyalty points accrued on a line by one bonus rule (per unit)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemBonus {
    pub bonus_id: BonusId,
    pub value: i64,
}

/// One basket line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketItem {
    pub offer_id: OfferId,
    /// Bundle this line was bought in; `None` for a standalone line
    pub bundle_id: Option<BundleId>,
    pub qty: u32,
    /// Live, progressively discounted unit price
    pub price: Decimal,
    /// Undiscounted unit price baseline
    pub cost: Decimal,
    /// Cumulative unit discount
    pub discount: Decimal,
    pub brand_id: Option<BrandId>,
    pub category_id: Option<CategoryId>,
    pub merchant_id: Option<MerchantId>,
    pub kind: ItemKind,
    pub public_event_id: Option<PublicEventId>,
    pub properties: Vec<ProductProperty>,
    pub discounts: Vec<ItemDiscount>,
    /// Accrued points per unit
    pub bonus: i64,
    pub bonuses: Vec<ItemBonus>,
    /// Points spent on the whole line
    pub bonus_spent: i64,
    /// Currency paid with points on the whole line
    pub bonus_discount: Decimal,
}

impl BasketItem {
    pub fn new(offer_id: OfferId, qty: u32, price: Decimal) -> Self {
        Self {
            offer_id,
            bundle_id: None,
            qty,
            price,
            cost: price,
            discount: Decimal::ZERO,
            brand_id: None,
            category_id: None,
            merchant_id: None,
            kind: ItemKind::Product,
            public_event_id: None,
            properties: Vec::new(),
            discounts: Vec::new(),
            bonus: 0,
            bonuses: Vec::new(),
            bonus_spent: 0,
            bonus_discount: Decimal::ZERO,
        }
    }

    pub fn qty_decimal(&self) -> Decimal {
        Decimal::from(self.qty)
    }

    /// Floor the unit price may never cross
    ///
    /// Tickets may become free; physical goods keep one currency unit.
    pub fn lowest_possible_price(&self) -> Decimal {
        match self.kind {
            ItemKind::Masterclass => Decimal::ZERO,
            ItemKind::Product => Decimal::ONE,
        }
    }

    /// Unit amount that can still be taken off
    pub fn room(&self) -> Decimal {
        (self.price - self.lowest_possible_price()).max(Decimal::ZERO)
    }

    pub fn total_price(&self) -> Decimal {
        self.price * self.qty_decimal()
    }

    pub fn total_cost(&self) -> Decimal {
        self.cost * self.qty_decimal()
    }

    pub fn is_bundled(&self) -> bool {
        self.bundle_id.is_some()
    }

    pub fn applied_discount_ids(&self) -> Vec<DiscountId> {
        self.discounts.iter().map(|d| d.discount_id).collect()
    }

    /// Takes `amount` off the unit price and records the attribution
    pub fn apply_discount(&mut self, discount: &Discount, amount: Decimal) {
        apply_price_change(
            &mut self.price,
            &mut self.discount,
            &mut self.discounts,
            discount,
            amount,
        );
    }

    /// Records the discount on the line without changing the price
    pub fn attach_discount(&mut self, discount: &Discount) {
        if !self.discounts.iter().any(|d| d.discount_id == discount.id) {
            self.discounts.push(ItemDiscount::new(discount, Decimal::ZERO));
        }
    }

    pub fn carries_discount(&self, discount_id: DiscountId) -> bool {
        self.discounts.iter().any(|d| d.discount_id == discount_id)
    }

    fn price_state(&self) -> PriceState {
        PriceState {
            price: self.price,
            cost: self.cost,
            discount: self.discount,
            discounts: self.discounts.clone(),
        }
    }

    fn restore_price_state(&mut self, state: &PriceState) {
        self.price = state.price;
        self.cost = state.cost;
        self.discount = state.discount;
        self.discounts = state.discounts.clone();
    }
}

/// One delivery candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOption {
    /// Synthetic id, the candidate's position in the request
    pub id: usize,
    pub method: DeliveryMethodId,
    pub price: Decimal,
    pub cost: Decimal,
    pub discount: Decimal,
    pub discounts: Vec<ItemDiscount>,
}

impl DeliveryOption {
    pub fn new(id: usize, method: DeliveryMethodId, price: Decimal) -> Self {
        Self {
            id,
            method,
            price,
            cost: price,
            discount: Decimal::ZERO,
            discounts: Vec::new(),
        }
    }

    /// Free delivery is allowed
    pub fn room(&self) -> Decimal {
        self.price.max(Decimal::ZERO)
    }

    pub fn apply_discount(&mut self, discount: &Discount, amount: Decimal) {
        apply_price_change(
            &mut self.price,
            &mut self.discount,
            &mut self.discounts,
            discount,
            amount,
        );
    }

    fn price_state(&self) -> PriceState {
        PriceState {
            price: self.price,
            cost: self.cost,
            discount: self.discount,
            discounts: self.discounts.clone(),
        }
    }

    fn restore_price_state(&mut self, state: &PriceState) {
        self.price = state.price;
        self.cost = state.cost;
        self.discount = state.discount;
        self.discounts = state.discounts.clone();
    }
}

fn apply_price_change(
    price: &mut Decimal,
    total_discount: &mut Decimal,
    discounts: &mut Vec<ItemDiscount>,
    discount: &Discount,
    amount: Decimal,
) {
    if amount <= Decimal::ZERO {
        return;
    }
    *price -= amount;
    *total_discount += amount;

    match discounts.iter_mut().find(|d| d.discount_id == discount.id) {
        Some(existing) => existing.change += amount,
        None => discounts.push(ItemDiscount::new(discount, amount)),
    }
}

/// Delivery candidates with the customer's pick and the one currently priced
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Deliveries {
    pub items: Vec<DeliveryOption>,
    /// Candidate chosen by the customer
    pub selected: Option<usize>,
    /// Candidate the running pass prices against
    #[serde(skip)]
    pub current: Option<usize>,
}

impl Deliveries {
    pub fn current(&self) -> Option<&DeliveryOption> {
        self.current.and_then(|idx| self.items.get(idx))
    }

    pub fn current_mut(&mut self) -> Option<&mut DeliveryOption> {
        match self.current {
            Some(idx) => self.items.get_mut(idx),
            None => None,
        }
    }
}

/// Customer as far as pricing is concerned
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Customer {
    /// `None` for a guest
    pub id: Option<CustomerId>,
    #[serde(default)]
    pub roles: Vec<RoleId>,
    #[serde(default)]
    pub segment: Option<SegmentId>,
    /// Completed orders so far
    #[serde(default)]
    pub orders_count: u32,
    #[serde(default)]
    pub bonus_balance: i64,
}

impl Customer {
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> Vec<SegmentId> {
        self.segment.into_iter().collect()
    }
}

/// Hydrated pricing request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PricingInput {
    pub items: Vec<BasketItem>,
    pub customer: Customer,
    pub payment: Option<PaymentMethod>,
    pub deliveries: Deliveries,
    pub region_id: Option<RegionId>,
    pub promo_code: Option<String>,
    /// Points the customer asked to spend
    pub bonus_to_spend: i64,
    /// Set by a delivery promo code
    pub free_delivery: bool,
    /// Discounts unlocked by the resolved promo code
    pub promo_discount_ids: Vec<DiscountId>,
    /// Bonuses unlocked by the resolved promo code
    pub promo_bonus_ids: Vec<BonusId>,
}

impl PricingInput {
    pub fn new(items: Vec<BasketItem>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    /// Sum of undiscounted line totals
    pub fn total_cost(&self) -> Decimal {
        self.items.iter().map(BasketItem::total_cost).sum()
    }

    /// Sum of live line totals
    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(BasketItem::total_price).sum()
    }

    pub fn find_item(&self, offer_id: OfferId, bundle_id: Option<BundleId>) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.offer_id == offer_id && item.bundle_id == bundle_id)
    }

    pub fn offer_ids(&self) -> Vec<OfferId> {
        let mut ids: Vec<OfferId> = self.items.iter().map(|i| i.offer_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn brand_ids(&self) -> Vec<BrandId> {
        let mut ids: Vec<BrandId> = self.items.iter().filter_map(|i| i.brand_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn category_ids(&self) -> Vec<CategoryId> {
        let mut ids: Vec<CategoryId> = self.items.iter().filter_map(|i| i.category_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn bundle_ids(&self) -> Vec<BundleId> {
        let mut ids: Vec<BundleId> = self.items.iter().filter_map(|i| i.bundle_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn is_promo_discount(&self, discount_id: DiscountId) -> bool {
        self.promo_discount_ids.contains(&discount_id)
    }

    /// Captures every mutable price field of lines and deliveries
    pub fn snapshot(&self) -> PriceSnapshot {
        PriceSnapshot {
            items: self.items.iter().map(BasketItem::price_state).collect(),
            deliveries: self
                .deliveries
                .items
                .iter()
                .map(DeliveryOption::price_state)
                .collect(),
        }
    }

    /// Puts back the fields captured by `snapshot`
    pub fn restore(&mut self, snapshot: &PriceSnapshot) {
        for (item, state) in self.items.iter_mut().zip(&snapshot.items) {
            item.restore_price_state(state);
        }
        for (delivery, state) in self.deliveries.items.iter_mut().zip(&snapshot.deliveries) {
            delivery.restore_price_state(state);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PriceState {
    price: Decimal,
    cost: Decimal,
    discount: Decimal,
    discounts: Vec<ItemDiscount>,
}

/// Saved price fields, restored by `PricingInput::restore`
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    items: Vec<PriceState>,
    deliveries: Vec<PriceState>,
}
