//! Clients (people who owe us money) and suppliers (people we owe money to).
//!
//! Both are the same shape on the wire and only differ in which collection
//! they live in.

use super::ApiError;
use crate::{client::ApiClient, identity::text_field};
use reqwest::Method;
use serde::{Deserialize, Deserializer};
use serde_derive::Serialize;
use serde_json::Value;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ContactKind {
    Client,
    Supplier,
}

impl ContactKind {
    fn collection(self) -> &'static str {
        match self {
            ContactKind::Client => "/clients",
            ContactKind::Supplier => "/suppliers",
        }
    }

    pub fn noun(self) -> &'static str {
        match self {
            ContactKind::Client => "client",
            ContactKind::Supplier => "supplier",
        }
    }

    /// The message to show when saving a contact fails.
    pub fn save_failure(self, error: &ApiError) -> String {
        match error.message() {
            Some(msg) => msg.to_string(),
            None => format!("Failed to save {}", self.noun()),
        }
    }
}

/// A single client or supplier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Contact {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub amount_owed: f64,
    pub notes: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Contact {
    /// Build a [`Contact`] from whatever the server sent, tolerating missing
    /// fields and `_id`-style identifiers.
    pub fn from_record(record: &Value) -> Self {
        Contact {
            id: text_field(record, &["id", "_id"]).unwrap_or_default(),
            user_id: text_field(record, &["user_id"]),
            name: text_field(record, &["name"]).unwrap_or_default(),
            phone: text_field(record, &["phone"]),
            email: text_field(record, &["email"]),
            amount_owed: amount(record.get("amount_owed")).unwrap_or(0.0),
            notes: text_field(record, &["notes"]),
            created_at: text_field(record, &["created_at"]),
            updated_at: text_field(record, &["updated_at"]),
        }
    }
}

impl<'de> Deserialize<'de> for Contact {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let record = Value::deserialize(deserializer)?;
        Ok(Contact::from_record(&record))
    }
}

fn amount(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Raw user input for creating or editing a contact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub amount_owed: String,
    pub notes: String,
}

impl ContactForm {
    /// Check the form before anything gets sent to the server.
    pub fn validate(&self) -> Result<ContactDraft, FormError> {
        let amount = self.amount_owed.trim();
        if amount.is_empty() {
            return Err(FormError::MissingAmount);
        }

        let amount_owed: f64 =
            amount.parse().map_err(|_| FormError::InvalidAmount)?;
        if !amount_owed.is_finite() {
            return Err(FormError::InvalidAmount);
        }

        let digits = self.phone.chars().filter(char::is_ascii_digit).count();
        if digits != 10 {
            return Err(FormError::InvalidPhone);
        }

        Ok(ContactDraft {
            name: self.name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            amount_owed,
            notes: self.notes.clone(),
        })
    }
}

impl From<&Contact> for ContactForm {
    fn from(contact: &Contact) -> ContactForm {
        ContactForm {
            name: contact.name.clone(),
            phone: contact.phone.clone().unwrap_or_default(),
            email: contact.email.clone().unwrap_or_default(),
            amount_owed: contact.amount_owed.to_string(),
            notes: contact.notes.clone().unwrap_or_default(),
        }
    }
}

/// A validated [`ContactForm`], ready to be sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactDraft {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub amount_owed: f64,
    pub notes: String,
}

/// Reasons a [`ContactForm`] may be rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Please provide amount owed.")]
    MissingAmount,
    #[error("amount_owed must be a valid number.")]
    InvalidAmount,
    #[error("Please enter a valid phone number.")]
    InvalidPhone,
}

/// Fetch every contact of a particular kind, optionally filtered by a search
/// term.
pub async fn list(
    api: &ApiClient,
    kind: ContactKind,
    search: Option<&str>,
) -> Result<Vec<Contact>, ApiError> {
    let mut request = api.request(Method::GET, kind.collection());

    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        request = request.query(&[("search", term)]);
    }

    let response = super::send(request).await?;
    let contacts: Vec<Contact> = super::read_json(response).await?;
    log::debug!("Fetched {} {}s", contacts.len(), kind.noun());

    Ok(contacts)
}

pub async fn create(
    api: &ApiClient,
    kind: ContactKind,
    draft: &ContactDraft,
) -> Result<(), ApiError> {
    log::trace!("Payload: {:#?}", draft);

    let path = format!("{}/", kind.collection());
    super::send(api.request(Method::POST, &path).json(draft)).await?;

    Ok(())
}

pub async fn update(
    api: &ApiClient,
    kind: ContactKind,
    id: &str,
    draft: &ContactDraft,
) -> Result<(), ApiError> {
    log::trace!("Payload: {:#?}", draft);

    let path = format!("{}/{}", kind.collection(), id);
    super::send(api.request(Method::PUT, &path).json(draft)).await?;

    Ok(())
}

pub async fn delete(
    api: &ApiClient,
    kind: ContactKind,
    id: &str,
) -> Result<(), ApiError> {
    let path = format!("{}/{}", kind.collection(), id);
    super::send(api.request(Method::DELETE, &path)).await?;

    Ok(())
}
