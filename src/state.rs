//! Per-user conversation state
//!
//! Multi-step flows (registration, wallet entry, deal entry, top-up entry,
//! admin listing entry) advance through a tagged union: each variant carries
//! exactly the fields that are valid at that step, so a handler can never
//! read a field the flow has not collected yet.
//!
//! State lives in memory only. Losing it on restart abandons mid-typing
//! scratch values, never money: no ledger mutation happens before the
//! explicit confirmation step.

use crate::database::RecipientKind;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::RwLock;

/// Conversation step of a single user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversation {
    /// Unregistered user arrived via a referral link; remembered until the
    /// registration completes
    ReferredBy { referrer: i64 },
    /// Registration: waiting for the user to type a display name
    AwaitingName { referrer: Option<i64> },
    /// Profile: waiting for a TON wallet address
    AwaitingWallet,
    /// Profile: waiting for a card number
    AwaitingCard,
    /// Language menu is open
    ChoosingLanguage,

    // Withdrawal flow
    DealChoosingRecipient,
    DealEnteringAddress {
        kind: RecipientKind,
    },
    DealEnteringAmount {
        kind: RecipientKind,
        address: String,
    },
    DealAwaitingConfirmation {
        kind: RecipientKind,
        address: String,
        amount: Decimal,
    },

    // Top-up flow
    TopUpEnteringAmount,
    TopUpAwaitingConfirmation {
        amount: Decimal,
    },

    // Admin flows
    AdminAddingPair,
    /// Listing-management menu is open for a pair
    AdminListingMenu {
        pair: String,
    },
    AdminListingNickname {
        pair: String,
    },
    AdminListingPrice {
        pair: String,
        nickname: String,
    },
    AdminListingLimit {
        pair: String,
        nickname: String,
        price: String,
    },
    AdminListingAction {
        pair: String,
        nickname: String,
        price: String,
        limit: String,
    },
}

/// In-memory store of conversation states, keyed by user id
#[derive(Default)]
pub struct ConversationStore {
    states: RwLock<HashMap<i64, Conversation>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) the state of a user. Starting a new flow silently
    /// replaces an abandoned one, since the map is single-valued per user.
    pub fn set(&self, user_id: i64, state: Conversation) {
        self.states.write().unwrap().insert(user_id, state);
    }

    /// Current state of a user, if any
    pub fn get(&self, user_id: i64) -> Option<Conversation> {
        self.states.read().unwrap().get(&user_id).cloned()
    }

    /// Remove and return the state of a user
    pub fn take(&self, user_id: i64) -> Option<Conversation> {
        self.states.write().unwrap().remove(&user_id)
    }

    /// Drop the state of a user (return-to-main-menu, cancel)
    pub fn clear(&self, user_id: i64) {
        self.states.write().unwrap().remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_clear() {
        let store = ConversationStore::new();
        assert_eq!(store.get(1), None);

        store.set(1, Conversation::AwaitingWallet);
        assert_eq!(store.get(1), Some(Conversation::AwaitingWallet));

        store.clear(1);
        assert_eq!(store.get(1), None);
    }

    #[test]
    fn test_new_flow_overwrites_abandoned_one() {
        let store = ConversationStore::new();
        store.set(1, Conversation::AwaitingCard);
        store.set(1, Conversation::DealChoosingRecipient);
        assert_eq!(store.get(1), Some(Conversation::DealChoosingRecipient));
    }

    #[test]
    fn test_states_are_per_user() {
        let store = ConversationStore::new();
        store.set(1, Conversation::AwaitingWallet);
        store.set(2, Conversation::AwaitingCard);
        store.clear(1);
        assert_eq!(store.get(2), Some(Conversation::AwaitingCard));
    }

    #[test]
    fn test_take_removes() {
        let store = ConversationStore::new();
        store.set(
            1,
            Conversation::DealEnteringAmount {
                kind: RecipientKind::Card,
                address: "1234567890123456".to_string(),
            },
        );
        let taken = store.take(1);
        assert!(matches!(
            taken,
            Some(Conversation::DealEnteringAmount { .. })
        ));
        assert_eq!(store.get(1), None);
    }
}
