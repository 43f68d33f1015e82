mod account_type_cache;

pub use account_type_cache::AccountTypeCache;
