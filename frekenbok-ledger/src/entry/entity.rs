use chrono::NaiveDate;
use derive_builder::Builder;
use rust_decimal::Decimal;

pub use frekenbok_types::entry::*;

use crate::primitives::*;

/// One signed money movement against one account.
#[derive(Clone, Debug)]
pub struct Entry {
    values: EntryValues,
}

impl Entry {
    pub(super) fn new(values: EntryValues) -> Self {
        Self { values }
    }

    pub fn id(&self) -> EntryId {
        self.values.id
    }

    pub fn version(&self) -> i64 {
        self.values.version
    }

    pub fn account_id(&self) -> AccountId {
        self.values.account_id
    }

    pub fn amount(&self) -> Decimal {
        self.values.amount
    }

    pub fn currency(&self) -> Currency {
        self.values.currency
    }

    pub fn date(&self) -> NaiveDate {
        self.values.date
    }

    pub fn is_approved(&self) -> bool {
        self.values.approved
    }

    pub fn invoice_id(&self) -> Option<InvoiceId> {
        self.values.invoice_id
    }

    pub fn values(&self) -> &EntryValues {
        &self.values
    }

    pub fn into_values(self) -> EntryValues {
        self.values
    }

    /// Applies the changes and returns the names of the fields that changed.
    pub(super) fn update(
        &mut self,
        builder: impl Into<EntryUpdate>,
    ) -> Result<Vec<&'static str>, UnknownCurrencyError> {
        let EntryUpdateValues {
            date,
            approved,
            account_id,
            amount,
            currency,
            quantity,
            unit,
            invoice_id,
            comment,
        } = builder
            .into()
            .build()
            .expect("EntryUpdateValues always exist");

        let mut updated_fields = Vec::new();
        if let Some(currency) = currency {
            let currency: Currency = currency.parse()?;
            if currency != self.values.currency {
                self.values.currency = currency;
                updated_fields.push("currency");
            }
        }
        if let Some(date) = date {
            if date != self.values.date {
                self.values.date = date;
                updated_fields.push("date");
            }
        }
        if let Some(approved) = approved {
            if approved != self.values.approved {
                self.values.approved = approved;
                updated_fields.push("approved");
            }
        }
        if let Some(account_id) = account_id {
            if account_id != self.values.account_id {
                self.values.account_id = account_id;
                updated_fields.push("account_id");
            }
        }
        if let Some(amount) = amount {
            if amount != self.values.amount {
                self.values.amount = amount;
                updated_fields.push("amount");
            }
        }
        if let Some(quantity) = quantity {
            if quantity != self.values.quantity {
                self.values.quantity = quantity;
                updated_fields.push("quantity");
            }
        }
        if let Some(unit) = unit {
            if unit != self.values.unit {
                self.values.unit = unit;
                updated_fields.push("unit");
            }
        }
        if let Some(invoice_id) = invoice_id {
            if invoice_id != self.values.invoice_id {
                self.values.invoice_id = invoice_id;
                updated_fields.push("invoice_id");
            }
        }
        if let Some(comment) = comment {
            if comment != self.values.comment {
                self.values.comment = comment;
                updated_fields.push("comment");
            }
        }
        Ok(updated_fields)
    }
}

#[derive(Builder, Debug, Clone)]
pub struct NewEntry {
    #[builder(setter(into), default = "EntryId::new()")]
    pub id: EntryId,
    #[builder(setter(into))]
    pub(super) account_id: AccountId,
    pub(super) amount: Decimal,
    /// ISO 4217 code, validated when the entry is created.
    #[builder(setter(into))]
    pub(super) currency: String,
    pub(super) date: NaiveDate,
    #[builder(default = "true")]
    pub(super) approved: bool,
    #[builder(setter(strip_option), default)]
    pub(super) quantity: Option<Decimal>,
    #[builder(setter(strip_option, into), default)]
    pub(super) unit: Option<String>,
    #[builder(setter(strip_option, into), default)]
    pub(super) invoice_id: Option<InvoiceId>,
    #[builder(setter(into), default)]
    pub(super) comment: String,
}

impl NewEntry {
    pub fn builder() -> NewEntryBuilder {
        NewEntryBuilder::default()
    }

    pub(crate) fn assign_invoice(&mut self, invoice_id: InvoiceId) {
        self.invoice_id = Some(invoice_id);
    }

    pub(super) fn into_values(self) -> Result<EntryValues, UnknownCurrencyError> {
        Ok(EntryValues {
            id: self.id,
            version: 1,
            date: self.date,
            approved: self.approved,
            account_id: self.account_id,
            amount: self.amount,
            currency: self.currency.parse()?,
            quantity: self.quantity,
            unit: self.unit,
            invoice_id: self.invoice_id,
            comment: self.comment,
        })
    }
}

#[derive(Debug, Builder, Default)]
#[builder(name = "EntryUpdate", default)]
pub struct EntryUpdateValues {
    #[builder(setter(strip_option))]
    pub date: Option<NaiveDate>,
    #[builder(setter(strip_option))]
    pub approved: Option<bool>,
    #[builder(setter(strip_option, into))]
    pub account_id: Option<AccountId>,
    #[builder(setter(strip_option))]
    pub amount: Option<Decimal>,
    #[builder(setter(strip_option, into))]
    pub currency: Option<String>,
    #[builder(setter(into))]
    pub quantity: Option<Option<Decimal>>,
    #[builder(setter(into))]
    pub unit: Option<Option<String>>,
    #[builder(setter(into))]
    pub invoice_id: Option<Option<InvoiceId>>,
    #[builder(setter(strip_option, into))]
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 4, 1).unwrap()
    }

    #[test]
    fn it_builds() {
        let new_entry = NewEntry::builder()
            .account_id(AccountId::new())
            .amount(dec!(700))
            .currency("rub")
            .date(date())
            .build()
            .unwrap();
        assert!(new_entry.approved);
        let values = new_entry.into_values().unwrap();
        assert_eq!(values.currency.code(), "RUB");
        assert_eq!(values.version, 1);
    }

    #[test]
    fn fails_when_mandatory_fields_are_missing() {
        let new_entry = NewEntry::builder().amount(dec!(1)).build();
        assert!(new_entry.is_err());
    }

    #[test]
    fn rejects_unknown_currency() {
        let new_entry = NewEntry::builder()
            .account_id(AccountId::new())
            .amount(dec!(1))
            .currency("XXY")
            .date(date())
            .build()
            .unwrap();
        assert_eq!(
            new_entry.into_values().unwrap_err(),
            UnknownCurrencyError("XXY".to_string())
        );
    }

    #[test]
    fn update_reports_changed_fields_only() {
        let values = NewEntry::builder()
            .account_id(AccountId::new())
            .amount(dec!(10))
            .currency("USD")
            .date(date())
            .build()
            .unwrap()
            .into_values()
            .unwrap();
        let mut entry = Entry::new(values);
        let mut update = EntryUpdate::default();
        update.amount(dec!(10)).currency("EUR").approved(false);
        let fields = entry.update(update).unwrap();
        assert_eq!(fields, vec!["currency", "approved"]);
        assert!(!entry.is_approved());
    }
}
