use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::primitives::*;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvoiceValues {
    pub id: InvoiceId,
    pub timestamp: DateTime<Utc>,
    pub comment: String,
    pub user: Option<String>,
}
