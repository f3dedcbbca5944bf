use chrono::NaiveDate;
use derive_builder::Builder;

pub use frekenbok_types::account::*;

use crate::primitives::*;

#[derive(Clone, Debug)]
pub struct Account {
    values: AccountValues,
}

impl Account {
    pub(super) fn new(values: AccountValues) -> Self {
        Self { values }
    }

    pub fn id(&self) -> AccountId {
        self.values.id
    }

    pub fn title(&self) -> &str {
        &self.values.title
    }

    pub fn account_type(&self) -> AccountType {
        self.values.account_type
    }

    pub fn position(&self) -> TreePosition {
        self.values.position
    }

    pub fn is_leaf(&self) -> bool {
        self.values.position.is_leaf()
    }

    pub fn is_open_on(&self, date: NaiveDate) -> bool {
        self.values.is_open_on(date)
    }

    pub fn values(&self) -> &AccountValues {
        &self.values
    }

    pub fn into_values(self) -> AccountValues {
        self.values
    }

    pub(super) fn close(&mut self, date: NaiveDate) {
        self.values.closed = Some(date);
    }

    /// Applies the attribute changes and returns the names of the fields that changed.
    pub fn update(&mut self, builder: impl Into<AccountUpdate>) -> Vec<&'static str> {
        let AccountUpdateValues {
            title,
            bank_title,
            dashboard,
            opened,
            credentials,
        } = builder
            .into()
            .build()
            .expect("AccountUpdateValues always exist");

        let mut updated_fields = Vec::new();
        if let Some(title) = title {
            if title != self.values.title {
                self.values.title = title;
                updated_fields.push("title");
            }
        }
        if let Some(bank_title) = bank_title {
            if bank_title != self.values.bank_title {
                self.values.bank_title = bank_title;
                updated_fields.push("bank_title");
            }
        }
        if let Some(dashboard) = dashboard {
            if dashboard != self.values.dashboard {
                self.values.dashboard = dashboard;
                updated_fields.push("dashboard");
            }
        }
        if let Some(opened) = opened {
            if opened != self.values.opened {
                self.values.opened = opened;
                updated_fields.push("opened");
            }
        }
        if let Some(credentials) = credentials {
            if credentials != self.values.credentials {
                self.values.credentials = credentials;
                updated_fields.push("credentials");
            }
        }
        updated_fields
    }
}

#[derive(Builder, Debug)]
pub struct NewAccount {
    #[builder(setter(into), default = "AccountId::new()")]
    pub id: AccountId,
    #[builder(setter(into))]
    pub(super) title: String,
    pub(super) account_type: AccountType,
    #[builder(setter(strip_option, into), default)]
    pub(super) parent: Option<AccountId>,
    #[builder(setter(strip_option, into), default)]
    pub(super) bank_title: Option<String>,
    #[builder(default)]
    pub(super) dashboard: bool,
    #[builder(setter(strip_option), default)]
    pub(super) opened: Option<NaiveDate>,
    #[builder(setter(strip_option), default)]
    pub(super) closed: Option<NaiveDate>,
    #[builder(setter(into), default)]
    pub(super) credentials: String,
}

impl NewAccount {
    pub fn builder() -> NewAccountBuilder {
        NewAccountBuilder::default()
    }

    pub(super) fn into_values(self, position: TreePosition) -> AccountValues {
        AccountValues {
            id: self.id,
            title: self.title,
            bank_title: self.bank_title,
            account_type: self.account_type,
            dashboard: self.dashboard,
            opened: self.opened,
            closed: self.closed,
            credentials: self.credentials,
            position,
        }
    }
}

#[derive(Debug, Builder, Default)]
#[builder(name = "AccountUpdate", default)]
pub struct AccountUpdateValues {
    #[builder(setter(strip_option, into))]
    pub title: Option<String>,
    #[builder(setter(into))]
    pub bank_title: Option<Option<String>>,
    #[builder(setter(strip_option))]
    pub dashboard: Option<bool>,
    #[builder(setter(into))]
    pub opened: Option<Option<NaiveDate>>,
    #[builder(setter(strip_option, into))]
    pub credentials: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_builds() {
        let new_account = NewAccount::builder()
            .title("Wallet")
            .account_type(AccountType::Account)
            .build()
            .unwrap();
        assert_eq!(new_account.title, "Wallet");
        assert_eq!(new_account.parent, None);
        assert!(!new_account.dashboard);
        assert_eq!(new_account.credentials, "");
    }

    #[test]
    fn fails_when_mandatory_fields_are_missing() {
        let new_account = NewAccount::builder().title("Wallet").build();
        assert!(new_account.is_err());
    }

    #[test]
    fn update_reports_changed_fields_only() {
        let mut account = Account::new(
            NewAccount::builder()
                .title("Card")
                .account_type(AccountType::Account)
                .build()
                .unwrap()
                .into_values(TreePosition::root(TreeId::from(1))),
        );
        let mut update = AccountUpdate::default();
        update
            .title("Card")
            .bank_title(Some("Karta *1234".to_string()))
            .dashboard(true);
        let fields = account.update(update);
        assert_eq!(fields, vec!["bank_title", "dashboard"]);
        assert_eq!(account.values().bank_title.as_deref(), Some("Karta *1234"));
    }
}
