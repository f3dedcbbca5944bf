use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::primitives::*;

/// Cached aggregate of approved entries for one (account, currency) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheafValues {
    pub account_id: AccountId,
    pub currency: Currency,
    pub amount: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyBalance {
    pub currency: Currency,
    pub amount: Decimal,
}

/// Per-currency totals, base currency first and the rest ordered by code.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary(Vec<CurrencyBalance>);

impl BalanceSummary {
    pub fn new(
        totals: impl IntoIterator<Item = (Currency, Decimal)>,
        base_currency: Currency,
    ) -> Self {
        let mut balances: Vec<_> = totals
            .into_iter()
            .map(|(currency, amount)| CurrencyBalance { currency, amount })
            .collect();
        balances.sort_by(|a, b| {
            (a.currency != base_currency, a.currency).cmp(&(b.currency != base_currency, b.currency))
        });
        Self(balances)
    }

    pub fn get(&self, currency: Currency) -> Option<Decimal> {
        self.0
            .iter()
            .find(|balance| balance.currency == currency)
            .map(|balance| balance.amount)
    }

    pub fn currencies(&self) -> impl Iterator<Item = Currency> + '_ {
        self.0.iter().map(|balance| balance.currency)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CurrencyBalance> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<CurrencyBalance> {
        self.0
    }
}

impl IntoIterator for BalanceSummary {
    type Item = CurrencyBalance;
    type IntoIter = std::vec::IntoIter<CurrencyBalance>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn currency(code: &str) -> Currency {
        code.parse().unwrap()
    }

    #[test]
    fn base_currency_goes_first() {
        let summary = BalanceSummary::new(
            [
                (currency("USD"), Decimal::ONE),
                (currency("EUR"), Decimal::TWO),
                (currency("RUB"), Decimal::TEN),
                (currency("GBP"), Decimal::ONE),
            ],
            currency("RUB"),
        );
        let codes: Vec<_> = summary.currencies().map(|c| c.code()).collect();
        assert_eq!(codes, vec!["RUB", "EUR", "GBP", "USD"]);
        assert_eq!(summary.get(currency("RUB")), Some(Decimal::TEN));
        assert_eq!(summary.get(currency("JPY")), None);
    }

    #[test]
    fn missing_base_currency_keeps_alphabetical_order() {
        let summary = BalanceSummary::new(
            [(currency("USD"), Decimal::ONE), (currency("EUR"), Decimal::TWO)],
            currency("RUB"),
        );
        let codes: Vec<_> = summary.currencies().map(|c| c.code()).collect();
        assert_eq!(codes, vec!["EUR", "USD"]);
    }
}
