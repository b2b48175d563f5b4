use super::{ApiError, Contact};
use crate::client::ApiClient;
use reqwest::Method;
use serde::de::{Deserialize, Deserializer};
use serde_derive::Deserialize;

/// Aggregate totals across every client and supplier.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DashboardStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_money_owed_to_me: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_money_i_owe: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub net_position: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_clients: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_suppliers: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recent_clients: Vec<Contact>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recent_suppliers: Vec<Contact>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Get the current user's [`DashboardStats`].
pub async fn stats(api: &ApiClient) -> Result<DashboardStats, ApiError> {
    let response = super::send(api.request(Method::GET, "/dashboard")).await?;

    super::read_json(response).await
}
