//! Order and buyer info models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use autoreg_core::{AccountId, OrderId};

/// Billing address entered at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub country: String,
}

impl Address {
    /// True when every field is blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        [
            &self.line1,
            &self.line2,
            &self.city,
            &self.state,
            &self.zip,
            &self.country,
        ]
        .iter()
        .all(|field| field.trim().is_empty())
    }
}

/// Buyer details attached to an order.
///
/// `email` is kept as entered; it is only validated when the handler needs
/// it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerInfo {
    /// Linked account. Guests carry no id, or `0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AccountId>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

impl BuyerInfo {
    /// The linked account, ignoring the empty identifier.
    #[must_use]
    pub fn linked_account(&self) -> Option<AccountId> {
        self.id.filter(|id| !id.is_unset())
    }

    /// Checkout address, if one with any content was captured.
    #[must_use]
    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref().filter(|address| !address.is_blank())
    }
}

/// An order as delivered with the "order created" event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer: BuyerInfo,
    /// Arbitrary key/value metadata carried by the order.
    #[serde(default)]
    pub meta: Map<String, Value>,
}

/// The persisted payment record stored under
/// [`keys::PAYMENT_META`](super::keys::PAYMENT_META).
///
/// Only `user_info` is interpreted; every other key is carried through
/// untouched so rewriting the record does not lose data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentMeta {
    #[serde(default)]
    pub user_info: BuyerInfo,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_zero_id_is_not_linked() {
        let info: BuyerInfo =
            serde_json::from_value(json!({"id": 0, "email": "a@b.c"})).unwrap();
        assert_eq!(info.linked_account(), None);

        let info: BuyerInfo =
            serde_json::from_value(json!({"id": 9, "email": "a@b.c"})).unwrap();
        assert_eq!(info.linked_account(), Some(AccountId::new(9)));
    }

    #[test]
    fn test_blank_address_is_ignored() {
        let info = BuyerInfo {
            email: "a@b.c".into(),
            address: Some(Address::default()),
            ..BuyerInfo::default()
        };
        assert!(info.address().is_none());
    }

    #[test]
    fn test_partial_user_info_decodes() {
        let meta: PaymentMeta =
            serde_json::from_value(json!({"user_info": {"first_name": "Jane"}, "currency": "EUR"}))
                .unwrap();
        assert_eq!(meta.user_info.first_name, "Jane");
        assert!(meta.user_info.email.is_empty());
        assert_eq!(meta.extra["currency"], "EUR");
    }

    #[test]
    fn test_payment_meta_keeps_unknown_keys() {
        let raw = json!({
            "user_info": {"email": "a@b.c", "first_name": "A"},
            "currency": "EUR",
            "cart_details": [{"id": 3}]
        });
        let mut meta: PaymentMeta = serde_json::from_value(raw).unwrap();
        meta.user_info.id = Some(AccountId::new(5));

        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["currency"], "EUR");
        assert_eq!(back["cart_details"][0]["id"], 3);
        assert_eq!(back["user_info"]["id"], 5);
    }
}
