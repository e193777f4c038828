//! Customers and the customer persistence contract.

use crate::current_timestamp;
use crate::error::CommerceError;
use crate::ids::{CustomerId, UserId};
use serde::{Deserialize, Serialize};

/// A customer record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub locale: Option<String>,
    /// Account the customer is attached to, if they registered.
    pub user_id: Option<UserId>,
    /// Placeholder customers created for guest checkouts.
    pub is_fake: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Customer {
    pub fn new() -> Self {
        let now = current_timestamp();
        Self {
            id: CustomerId::generate(),
            first_name: String::new(),
            last_name: String::new(),
            email: None,
            phone: None,
            locale: None,
            user_id: None,
            is_fake: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl Default for Customer {
    fn default() -> Self {
        Self::new()
    }
}

/// Filter for customer lookups. Every field that is set must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerCriteria {
    pub id: Option<CustomerId>,
    pub email: Option<String>,
    pub user_id: Option<UserId>,
    pub last_name: Option<String>,
    pub is_fake: Option<bool>,
}

impl CustomerCriteria {
    pub fn by_id(id: CustomerId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn by_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Emails compare case-insensitively.
    pub fn matches(&self, customer: &Customer) -> bool {
        if let Some(id) = &self.id {
            if &customer.id != id {
                return false;
            }
        }
        if let Some(email) = &self.email {
            match &customer.email {
                Some(actual) if actual.eq_ignore_ascii_case(email) => {}
                _ => return false,
            }
        }
        if let Some(user_id) = &self.user_id {
            if customer.user_id.as_ref() != Some(user_id) {
                return false;
            }
        }
        if let Some(last_name) = &self.last_name {
            if &customer.last_name != last_name {
                return false;
            }
        }
        if let Some(is_fake) = self.is_fake {
            if customer.is_fake != is_fake {
                return false;
            }
        }
        true
    }
}

/// Customer storage used by checkout and order flows.
pub trait CustomerManager: Send + Sync {
    /// A new, unsaved customer.
    fn create(&self) -> Customer;

    /// Insert or update.
    fn save(&self, customer: &Customer) -> Result<(), CommerceError>;

    fn delete(&self, customer: &Customer) -> Result<(), CommerceError>;

    fn find_one_by(&self, criteria: &CustomerCriteria) -> Result<Option<Customer>, CommerceError>;

    fn find_by(&self, criteria: &CustomerCriteria) -> Result<Vec<Customer>, CommerceError>;

    /// Name of the concrete customer type managed.
    fn class_name(&self) -> &'static str {
        std::any::type_name::<Customer>()
    }
}
