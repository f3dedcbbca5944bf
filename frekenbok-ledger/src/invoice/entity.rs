use chrono::{DateTime, Utc};
use derive_builder::Builder;

pub use frekenbok_types::invoice::*;

use crate::primitives::*;

/// A group of entries that is expected to net to zero in every currency.
#[derive(Clone, Debug)]
pub struct Invoice {
    values: InvoiceValues,
}

impl Invoice {
    pub(super) fn new(values: InvoiceValues) -> Self {
        Self { values }
    }

    pub fn id(&self) -> InvoiceId {
        self.values.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.values.timestamp
    }

    pub fn comment(&self) -> &str {
        &self.values.comment
    }

    pub fn values(&self) -> &InvoiceValues {
        &self.values
    }

    pub fn into_values(self) -> InvoiceValues {
        self.values
    }
}

#[derive(Builder, Debug, Clone)]
pub struct NewInvoice {
    #[builder(setter(into), default = "InvoiceId::new()")]
    pub id: InvoiceId,
    #[builder(default = "Utc::now()")]
    pub(super) timestamp: DateTime<Utc>,
    #[builder(setter(into), default)]
    pub(super) comment: String,
    /// Reference to whoever submitted the invoice, e.g. a messenger user.
    #[builder(setter(strip_option, into), default)]
    pub(super) user: Option<String>,
}

impl NewInvoice {
    pub fn builder() -> NewInvoiceBuilder {
        NewInvoiceBuilder::default()
    }
}

impl From<NewInvoice> for InvoiceValues {
    fn from(new_invoice: NewInvoice) -> Self {
        InvoiceValues {
            id: new_invoice.id,
            timestamp: new_invoice.timestamp,
            comment: new_invoice.comment,
            user: new_invoice.user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_builds_with_defaults() {
        let new_invoice = NewInvoice::builder().comment("Receipt").build().unwrap();
        let values = InvoiceValues::from(new_invoice);
        assert_eq!(values.comment, "Receipt");
        assert_eq!(values.user, None);
        assert!(values.timestamp <= Utc::now());
    }
}
