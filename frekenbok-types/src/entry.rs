use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::primitives::*;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntryValues {
    pub id: EntryId,
    pub version: i64,
    pub date: NaiveDate,
    pub approved: bool,
    pub account_id: AccountId,
    pub amount: Decimal,
    pub currency: Currency,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub invoice_id: Option<InvoiceId>,
    pub comment: String,
}
