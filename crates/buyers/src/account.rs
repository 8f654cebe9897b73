use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{BuyerId, DomainError, DomainResult, UserId};

/// Contact information for a buyer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A wholesale client account.
///
/// The running balance is signed: negative means the buyer owes money. It is
/// mutated only through ledger-computed deltas; buyer accounts are never
/// deleted, only edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyerAccount {
    id: BuyerId,
    owner_id: UserId,
    name: String,
    contact: ContactInfo,
    balance: Decimal,
    created_at: DateTime<Utc>,
    version: u64,
}

impl BuyerAccount {
    pub fn register(
        id: BuyerId,
        owner_id: UserId,
        name: impl Into<String>,
        contact: ContactInfo,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::invalid_input("buyer name cannot be empty"));
        }
        Ok(Self {
            id,
            owner_id,
            name,
            contact,
            balance: Decimal::ZERO,
            created_at: now,
            version: 1,
        })
    }

    pub fn id(&self) -> BuyerId {
        self.id
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether the buyer currently owes money.
    pub fn owes(&self) -> bool {
        self.balance.is_sign_negative() && !self.balance.is_zero()
    }

    /// Apply a signed ledger delta to the running balance.
    pub fn apply_balance_delta(&mut self, delta: Decimal) -> Decimal {
        self.balance += delta;
        self.version += 1;
        self.balance
    }

    pub fn update_details(&mut self, name: Option<String>, contact: Option<ContactInfo>) -> DomainResult<()> {
        if let Some(name) = name {
            if name.trim().is_empty() {
                return Err(DomainError::invalid_input("buyer name cannot be empty"));
            }
            self.name = name;
        }
        if let Some(contact) = contact {
            self.contact = contact;
        }
        self.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_buyer() -> BuyerAccount {
        BuyerAccount::register(
            BuyerId::new(),
            UserId::new(),
            "Al-Noor Traders",
            ContactInfo::default(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn new_buyer_starts_at_zero_balance() {
        let buyer = test_buyer();
        assert_eq!(buyer.balance(), Decimal::ZERO);
        assert!(!buyer.owes());
    }

    #[test]
    fn deltas_accumulate_and_sign_tracks_debt() {
        let mut buyer = test_buyer();
        buyer.apply_balance_delta(dec!(-30.00)); // sale on credit
        assert!(buyer.owes());
        let balance = buyer.apply_balance_delta(dec!(30.00)); // payment received
        assert_eq!(balance, Decimal::ZERO);
        assert!(!buyer.owes());
    }

    #[test]
    fn blank_name_is_rejected_on_register_and_update() {
        let err = BuyerAccount::register(
            BuyerId::new(),
            UserId::new(),
            " ",
            ContactInfo::default(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        let mut buyer = test_buyer();
        let err = buyer.update_details(Some(String::new()), None).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }
}
