use derive_builder::Builder;

use crate::primitives::Currency;

/// Currency summaries list first unless configured otherwise.
pub const DEFAULT_BASE_CURRENCY: &str = "RUB";

#[derive(Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct FrekenbokLedgerConfig {
    #[builder(setter(into, strip_option), default)]
    pub(super) db_url: Option<String>,
    #[builder(setter(into, strip_option), default)]
    pub(super) max_connections: Option<u32>,
    #[builder(default)]
    pub(super) exec_migrations: bool,
    #[builder(setter(into, strip_option), default)]
    pub(super) pool: Option<sqlx::SqlitePool>,
    #[builder(setter(into), default = "DEFAULT_BASE_CURRENCY.to_string()")]
    pub(super) base_currency: String,
}

impl FrekenbokLedgerConfig {
    pub fn builder() -> FrekenbokLedgerConfigBuilder {
        FrekenbokLedgerConfigBuilder::default()
    }
}

impl FrekenbokLedgerConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match (self.db_url.as_ref(), self.pool.as_ref()) {
            (None, None) | (Some(None), None) | (None, Some(None)) => {
                return Err("One of db_url or pool must be set".to_string())
            }
            (Some(_), Some(_)) => return Err("Only one of db_url or pool must be set".to_string()),
            _ => (),
        }
        if let Some(code) = self.base_currency.as_ref() {
            code.parse::<Currency>().map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}
