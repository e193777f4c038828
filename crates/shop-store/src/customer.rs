//! Customer manager backed by the key-value store.

use crate::{store_key, Store};
use shop_commerce::customer::{Customer, CustomerCriteria, CustomerManager};
use shop_commerce::CommerceError;
use tracing::{debug, info};

const NAMESPACE: &str = "customer";

/// [`CustomerManager`] keeping each customer under `customer:<id>`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomerManager {
    store: Store,
}

impl InMemoryCustomerManager {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn all(&self) -> Result<Vec<Customer>, CommerceError> {
        let prefix = format!("{NAMESPACE}:");
        let mut customers = Vec::new();
        for key in self.store.keys_with_prefix(&prefix)? {
            if let Some(customer) = self.store.get::<Customer>(&key)? {
                customers.push(customer);
            }
        }
        customers.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(customers)
    }
}

impl CustomerManager for InMemoryCustomerManager {
    fn create(&self) -> Customer {
        Customer::new()
    }

    fn save(&self, customer: &Customer) -> Result<(), CommerceError> {
        let mut stored = customer.clone();
        stored.updated_at = chrono::Utc::now().timestamp();
        self.store.set(&store_key!(NAMESPACE, stored.id), &stored)?;
        info!(customer = %stored.id, "customer saved");
        Ok(())
    }

    fn delete(&self, customer: &Customer) -> Result<(), CommerceError> {
        self.store.delete(&store_key!(NAMESPACE, customer.id))?;
        info!(customer = %customer.id, "customer deleted");
        Ok(())
    }

    fn find_one_by(&self, criteria: &CustomerCriteria) -> Result<Option<Customer>, CommerceError> {
        if let Some(id) = &criteria.id {
            let found = self
                .store
                .get::<Customer>(&store_key!(NAMESPACE, id))?
                .filter(|c| criteria.matches(c));
            return Ok(found);
        }
        Ok(self.all()?.into_iter().find(|c| criteria.matches(c)))
    }

    fn find_by(&self, criteria: &CustomerCriteria) -> Result<Vec<Customer>, CommerceError> {
        let found: Vec<Customer> = self
            .all()?
            .into_iter()
            .filter(|c| criteria.matches(c))
            .collect();
        debug!(matches = found.len(), "customer lookup");
        Ok(found)
    }
}
