use crate::store::{item_to_user, user_to_item, UserStore};
use crate::types::{User, UserError, Users};
use crate::validators::is_email_valid;

/// Decode a request body. A bare `null` body is an empty user.
fn parse_user(body: &[u8]) -> Result<User, UserError> {
    serde_json::from_slice::<Option<User>>(body)
        .map(Option::unwrap_or_default)
        .map_err(|e| {
            tracing::warn!("Rejected user body: {}", e);
            UserError::BadRequest(format!("invalid user body: {}", e))
        })
}

/// Create (or overwrite) a user from a JSON request body.
pub async fn create<S: UserStore + ?Sized>(
    store: &S,
    table_name: &str,
    body: &[u8],
) -> Result<User, UserError> {
    let user = parse_user(body)?;

    if !is_email_valid(&user.email) {
        tracing::warn!("Rejected invalid email: {:?}", user.email);
        return Err(UserError::BadRequest(format!("invalid email: {:?}", user.email)));
    }

    store.put(table_name, user_to_item(&user)).await?;
    Ok(user)
}

/// List every user on the first scan page.
pub async fn list<S: UserStore + ?Sized>(store: &S, table_name: &str) -> Result<Users, UserError> {
    let items = store.scan(table_name).await?;

    items
        .iter()
        .map(|item| item_to_user(item).map_err(UserError::InternalServer))
        .collect()
}

/// Look a user up by email, `None` when nothing is stored.
pub async fn find<S: UserStore + ?Sized>(
    store: &S,
    table_name: &str,
    email: &str,
) -> Result<Option<User>, UserError> {
    match store.get(table_name, email).await? {
        Some(item) => item_to_user(&item)
            .map(Some)
            .map_err(UserError::InternalServer),
        None => Ok(None),
    }
}

/// Fetch a user by email. An absent user comes back with every field empty.
pub async fn get<S: UserStore + ?Sized>(
    store: &S,
    table_name: &str,
    email: &str,
) -> Result<User, UserError> {
    Ok(find(store, table_name, email).await?.unwrap_or_default())
}

/// Write a user only if no record exists under its email yet.
///
/// The existence check and the write are separate calls, so concurrent
/// writers for the same email can both pass the check.
pub async fn update<S: UserStore + ?Sized>(
    store: &S,
    table_name: &str,
    body: &[u8],
) -> Result<User, UserError> {
    let user = parse_user(body)?;

    if find(store, table_name, &user.email).await?.is_some() {
        tracing::warn!("User {} already exists", user.email);
        return Err(UserError::BadRequest(format!(
            "user {} already exists",
            user.email
        )));
    }

    store.put(table_name, user_to_item(&user)).await?;
    Ok(user)
}

/// Delete the user stored under `email`. Succeeds when nothing was stored.
pub async fn delete<S: UserStore + ?Sized>(
    store: &S,
    table_name: &str,
    email: &str,
) -> Result<(), UserError> {
    store.delete(table_name, email).await?;
    Ok(())
}
