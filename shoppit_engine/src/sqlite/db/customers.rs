use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    api::{AccountApiError, AuthApiError},
    db_types::{Customer, CustomerProfileUpdate, NewCustomer, Role, Roles},
    helpers::passwords,
};

pub async fn insert_customer(
    new_customer: NewCustomer,
    conn: &mut SqliteConnection,
) -> Result<Customer, AccountApiError> {
    let username_taken: Option<(i64,)> = sqlx::query_as("SELECT id FROM customers WHERE username = $1")
        .bind(&new_customer.username)
        .fetch_optional(&mut *conn)
        .await?;
    if username_taken.is_some() {
        return Err(AccountApiError::DuplicateUsername(new_customer.username));
    }
    let email_taken: Option<(i64,)> = sqlx::query_as("SELECT id FROM customers WHERE email = $1")
        .bind(&new_customer.email)
        .fetch_optional(&mut *conn)
        .await?;
    if email_taken.is_some() {
        return Err(AccountApiError::DuplicateEmail(new_customer.email));
    }
    let password_hash = passwords::hash_password(&new_customer.password);
    let customer: Customer = sqlx::query_as(
        r#"
            INSERT INTO customers (username, email, password_hash, first_name, last_name, phone, city, state)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(new_customer.username)
    .bind(new_customer.email)
    .bind(password_hash)
    .bind(new_customer.first_name)
    .bind(new_customer.last_name)
    .bind(new_customer.phone)
    .bind(new_customer.city)
    .bind(new_customer.state)
    .fetch_one(&mut *conn)
    .await?;
    grant_roles(customer.id, &[Role::User], conn).await.map_err(|e| AccountApiError::DatabaseError(e.to_string()))?;
    debug!("🗃️ Customer '{}' inserted with id {}", customer.username, customer.id);
    Ok(customer)
}

pub async fn fetch_customer_by_id(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Customer>, AccountApiError> {
    let customer = sqlx::query_as("SELECT * FROM customers WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(customer)
}

pub async fn fetch_customer_by_username(
    username: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Customer>, AccountApiError> {
    let customer =
        sqlx::query_as("SELECT * FROM customers WHERE username = $1").bind(username).fetch_optional(conn).await?;
    Ok(customer)
}

/// Checks a username/password pair. The caller cannot tell an unknown username from a wrong password.
pub async fn verify_credentials(
    username: &str,
    password: &str,
    conn: &mut SqliteConnection,
) -> Result<Customer, AccountApiError> {
    let stored: Option<(String,)> = sqlx::query_as("SELECT password_hash FROM customers WHERE username = $1")
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;
    let valid = match &stored {
        Some((hash,)) => passwords::verify_password(password, hash),
        None => false,
    };
    if !valid {
        return Err(AccountApiError::InvalidCredentials);
    }
    fetch_customer_by_username(username, conn).await?.ok_or(AccountApiError::InvalidCredentials)
}

pub async fn update_profile(
    id: i64,
    update: CustomerProfileUpdate,
    conn: &mut SqliteConnection,
) -> Result<Customer, AccountApiError> {
    if update.is_empty() {
        return Err(AccountApiError::ProfileUpdateNoOp);
    }
    let mut builder = QueryBuilder::new("UPDATE customers SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(first_name) = update.first_name {
        set_clause.push("first_name = ");
        set_clause.push_bind_unseparated(first_name);
    }
    if let Some(last_name) = update.last_name {
        set_clause.push("last_name = ");
        set_clause.push_bind_unseparated(last_name);
    }
    if let Some(phone) = update.phone {
        set_clause.push("phone = ");
        set_clause.push_bind_unseparated(phone);
    }
    if let Some(city) = update.city {
        set_clause.push("city = ");
        set_clause.push_bind_unseparated(city);
    }
    if let Some(state) = update.state {
        set_clause.push("state = ");
        set_clause.push_bind_unseparated(state);
    }
    if let Some(address) = update.address {
        set_clause.push("address = ");
        set_clause.push_bind_unseparated(address);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let result =
        builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Customer::from_row(&row)).transpose()?;
    result.ok_or(AccountApiError::CustomerNotFound(id))
}

//--------------------------------------        Roles         --------------------------------------------------------

pub async fn fetch_roles(customer_id: i64, conn: &mut SqliteConnection) -> Result<Roles, AuthApiError> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT role FROM customer_roles WHERE customer_id = $1 ORDER BY role ASC")
            .bind(customer_id)
            .fetch_all(conn)
            .await?;
    Ok(rows.into_iter().map(|(r,)| Role::from(r)).collect())
}

pub async fn check_has_roles(
    customer_id: i64,
    roles: &[Role],
    conn: &mut SqliteConnection,
) -> Result<(), AuthApiError> {
    let held = fetch_roles(customer_id, conn).await?;
    let missing = roles.iter().filter(|r| !held.contains(r)).count();
    if missing > 0 {
        return Err(AuthApiError::RoleNotAllowed(missing));
    }
    Ok(())
}

pub async fn grant_roles(
    customer_id: i64,
    roles: &[Role],
    conn: &mut SqliteConnection,
) -> Result<(), AuthApiError> {
    for role in roles {
        sqlx::query("INSERT INTO customer_roles (customer_id, role) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(customer_id)
            .bind(role.to_string())
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn revoke_roles(
    customer_id: i64,
    roles: &[Role],
    conn: &mut SqliteConnection,
) -> Result<u64, AuthApiError> {
    let mut removed = 0;
    for role in roles {
        let result = sqlx::query("DELETE FROM customer_roles WHERE customer_id = $1 AND role = $2")
            .bind(customer_id)
            .bind(role.to_string())
            .execute(&mut *conn)
            .await?;
        removed += result.rows_affected();
    }
    Ok(removed)
}
