//! `stockbook-buyers` — wholesale buyer accounts.

pub mod account;

pub use account::{BuyerAccount, ContactInfo};
