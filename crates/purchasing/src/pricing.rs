//! Line item pricing and order totals.
//!
//! Money is in the smallest currency unit (cents). Percentages are basis
//! points: `1250` is 12.5 %. Percent amounts round half up.

use serde::{Deserialize, Serialize};

use medstock_core::{DomainError, DomainResult, ProductId};

/// 100 %.
pub const MAX_BASIS_POINTS: u32 = 10_000;

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: u64,
    #[serde(default)]
    pub discount_bps: u32,
    #[serde(default)]
    pub tax_bps: u32,
}

/// Computed amounts for a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineAmounts {
    pub gross: u64,
    pub discount: u64,
    pub tax: u64,
}

impl LineAmounts {
    /// Gross less discount plus tax.
    pub fn net(&self) -> DomainResult<u64> {
        let discounted = self
            .gross
            .checked_sub(self.discount)
            .ok_or_else(|| DomainError::invariant("discount exceeds gross amount"))?;
        checked_sum(discounted, self.tax)
    }
}

/// Order-level totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: u64,
    pub discount: u64,
    pub tax: u64,
    pub total: u64,
}

impl LineItem {
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if self.discount_bps > MAX_BASIS_POINTS {
            return Err(DomainError::validation("discount cannot exceed 100%"));
        }
        if self.tax_bps > MAX_BASIS_POINTS {
            return Err(DomainError::validation("tax cannot exceed 100%"));
        }
        Ok(())
    }

    pub fn amounts(&self) -> DomainResult<LineAmounts> {
        self.validate()?;

        let gross = (self.quantity as u64)
            .checked_mul(self.unit_price)
            .ok_or_else(|| DomainError::invariant("line amount overflow"))?;
        let discount = percent_of(gross, self.discount_bps)?;
        // discount <= gross because discount_bps <= 100 %.
        let tax = percent_of(gross - discount, self.tax_bps)?;

        Ok(LineAmounts {
            gross,
            discount,
            tax,
        })
    }
}

impl OrderTotals {
    pub fn from_lines(lines: &[LineItem]) -> DomainResult<Self> {
        let mut totals = OrderTotals::default();
        for line in lines {
            let amounts = line.amounts()?;
            totals.subtotal = checked_sum(totals.subtotal, amounts.gross)?;
            totals.discount = checked_sum(totals.discount, amounts.discount)?;
            totals.tax = checked_sum(totals.tax, amounts.tax)?;
        }
        totals.total = checked_sum(totals.subtotal - totals.discount, totals.tax)?;
        Ok(totals)
    }
}

fn percent_of(amount: u64, bps: u32) -> DomainResult<u64> {
    let scaled = (amount as u128) * (bps as u128) + (MAX_BASIS_POINTS as u128 / 2);
    u64::try_from(scaled / MAX_BASIS_POINTS as u128)
        .map_err(|_| DomainError::invariant("percentage amount overflow"))
}

fn checked_sum(a: u64, b: u64) -> DomainResult<u64> {
    a.checked_add(b)
        .ok_or_else(|| DomainError::invariant("order total overflow"))
}
