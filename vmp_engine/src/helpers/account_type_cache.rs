use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use log::*;

use crate::db_types::AccountType;

/// Remembers the account id of each singleton account type.
///
/// Singleton accounts are created when the schema is bootstrapped and never change afterwards, so entries are never
/// invalidated. Clones share the same underlying map, so a single cache can be handed to every clone of a database
/// backend for the lifetime of the process.
#[derive(Clone, Default)]
pub struct AccountTypeCache {
    ids: Arc<RwLock<HashMap<AccountType, i64>>>,
}

impl AccountTypeCache {
    pub fn get(&self, account_type: AccountType) -> Option<i64> {
        match self.ids.read() {
            Ok(ids) => ids.get(&account_type).copied(),
            Err(e) => {
                warn!("🧾️ Account type cache is poisoned ({e}). Treating as a cache miss.");
                None
            },
        }
    }

    pub fn insert(&self, account_type: AccountType, id: i64) {
        match self.ids.write() {
            Ok(mut ids) => {
                ids.insert(account_type, id);
            },
            Err(e) => warn!("🧾️ Account type cache is poisoned ({e}). {account_type} will not be cached."),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.read().map(|ids| ids.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for AccountTypeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountTypeCache({} entries)", self.len())
    }
}
