use async_trait::async_trait;
use aws_sdk_dynamodb::operation::scan::ScanOutput;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use std::collections::HashMap;
use thiserror::Error;

use crate::types::User;

/// Raw DynamoDB item, attribute name to value.
pub type Item = HashMap<String, AttributeValue>;

const EMAIL: &str = "email";
const FIRST_NAME: &str = "firstName";
const LAST_NAME: &str = "lastName";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    fn backend(operation: &'static str, error: impl std::fmt::Display) -> Self {
        StoreError::Backend {
            operation,
            message: error.to_string(),
        }
    }
}

/// The four storage primitives the user service relies on.
///
/// Every call names its table so one client can serve several tables.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Unconditional upsert keyed by the item's `email` attribute.
    async fn put(&self, table_name: &str, item: Item) -> Result<(), StoreError>;

    /// Fetch one item. `None` when nothing is stored under `email`.
    async fn get(&self, table_name: &str, email: &str) -> Result<Option<Item>, StoreError>;

    /// Return the first page of a full table scan, in storage order.
    async fn scan(&self, table_name: &str) -> Result<Vec<Item>, StoreError>;

    /// Remove the item stored under `email`. Absent keys are not an error.
    async fn delete(&self, table_name: &str, email: &str) -> Result<(), StoreError>;
}

/// `UserStore` backed by a DynamoDB table with `email` as its partition key.
#[derive(Clone)]
pub struct DynamoStore {
    client: DynamoClient,
}

impl DynamoStore {
    pub fn new(client: DynamoClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserStore for DynamoStore {
    async fn put(&self, table_name: &str, item: Item) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("PutItem on {} failed: {:?}", table_name, e);
                StoreError::backend("PutItem", e)
            })?;
        Ok(())
    }

    async fn get(&self, table_name: &str, email: &str) -> Result<Option<Item>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(table_name)
            .key(EMAIL, AttributeValue::S(email.to_string()))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("GetItem on {} failed: {:?}", table_name, e);
                StoreError::backend("GetItem", e)
            })?;

        Ok(result.item)
    }

    async fn scan(&self, table_name: &str) -> Result<Vec<Item>, StoreError> {
        let result = self
            .client
            .scan()
            .table_name(table_name)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Scan on {} failed: {:?}", table_name, e);
                StoreError::backend("Scan", e)
            })?;

        let (items, truncated) = first_page(result);
        if truncated {
            tracing::warn!(
                "Scan on {} returned a partial page; remaining items were not read",
                table_name
            );
        }

        Ok(items)
    }

    async fn delete(&self, table_name: &str, email: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(table_name)
            .key(EMAIL, AttributeValue::S(email.to_string()))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("DeleteItem on {} failed: {:?}", table_name, e);
                StoreError::backend("DeleteItem", e)
            })?;
        Ok(())
    }
}

/// Items of a single scan page, and whether DynamoDB reported more pages.
/// The continuation key is never followed.
fn first_page(output: ScanOutput) -> (Vec<Item>, bool) {
    let truncated = output.last_evaluated_key.is_some();
    (output.items.unwrap_or_default(), truncated)
}

// ========== MAPPING ==========

/// Storage-native form of a user.
pub fn user_to_item(user: &User) -> Item {
    HashMap::from([
        (EMAIL.to_string(), AttributeValue::S(user.email.clone())),
        (FIRST_NAME.to_string(), AttributeValue::S(user.first_name.clone())),
        (LAST_NAME.to_string(), AttributeValue::S(user.last_name.clone())),
    ])
}

/// Decode a stored item. Missing attributes become empty strings; an
/// attribute of the wrong type is an error.
pub fn item_to_user(item: &Item) -> Result<User, String> {
    Ok(User {
        email: string_attr(item, EMAIL)?,
        first_name: string_attr(item, FIRST_NAME)?,
        last_name: string_attr(item, LAST_NAME)?,
    })
}

fn string_attr(item: &Item, name: &str) -> Result<String, String> {
    match item.get(name) {
        None | Some(AttributeValue::Null(_)) => Ok(String::new()),
        Some(value) => value
            .as_s()
            .map(|s| s.to_string())
            .map_err(|_| format!("attribute {} is not a string: {:?}", name, value)),
    }
}
