//! Source reading and cache persistence.

pub mod audit;
pub mod record_store;
pub mod source;

#[cfg(test)]
pub mod tests;
