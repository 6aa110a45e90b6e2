//! Request schemas.
//!
//! Every route parses its input into one of the structs below and runs the
//! `validator` rules declared on it. Failures are collected into a
//! [`SchemaError`] whose details follow the field order of the schema, one
//! `"<path>: <message>"` entry per offending field.

use axum::extract::Query;
use axum::http::Uri;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use authgate_core::{Credentials, UserLookup};

/// Top-level error message of every schema failure.
pub const INVALID_PARAMETERS: &str = "Invalid parameters";

/// Input that failed schema validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{INVALID_PARAMETERS}: {}", .details.join("; "))]
pub struct SchemaError {
    details: Vec<String>,
}

impl SchemaError {
    fn single(path: &str, message: impl std::fmt::Display) -> Self {
        Self {
            details: vec![format!("{path}: {message}")],
        }
    }

    /// Offending fields as `"<path>: <message>"`, in schema order.
    #[must_use]
    pub fn details(&self) -> &[String] {
        &self.details
    }

    /// Consume the error, returning its details.
    #[must_use]
    pub fn into_details(self) -> Vec<String> {
        self.details
    }
}

/// A validated request schema.
pub trait Schema: DeserializeOwned + Validate {
    /// `(field, wire name)` pairs in declaration order. Details are reported
    /// in this order, under the wire name.
    const FIELDS: &'static [(&'static str, &'static str)];

    /// Cross-field rule checked once every field is valid.
    ///
    /// # Errors
    ///
    /// Returns the message reported under the input's root path.
    fn check_shape(&self) -> Result<(), &'static str> {
        Ok(())
    }
}

/// Parse and validate a JSON request body. An empty body counts as `{}`.
///
/// A declared field holding a non-string value is reported under its own
/// path together with the failures of the other fields.
///
/// # Errors
///
/// Returns [`SchemaError`] if the body is not a JSON object or a field rule
/// fails.
pub fn from_body<T: Schema>(body: &[u8]) -> Result<T, SchemaError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };

    let mut fields = match serde_json::from_slice(body) {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => {
            return Err(SchemaError::single(
                "body",
                format!("Invalid input: expected object, received {}", json_kind(&other)),
            ));
        }
        Err(e) => return Err(SchemaError::single("body", e)),
    };

    let mistyped: Vec<(&str, &str)> = T::FIELDS
        .iter()
        .filter_map(|(_, wire)| match fields.get(*wire) {
            Some(value) if !value.is_string() => Some((*wire, json_kind(value))),
            _ => None,
        })
        .collect();
    fields.retain(|key, _| !mistyped.iter().any(|(wire, _)| *wire == key.as_str()));

    let value: T = serde_json::from_value(Value::Object(fields))
        .map_err(|e| SchemaError::single("body", e))?;
    check(value, "body", &mistyped)
}

/// Parse and validate the query string of `uri`.
///
/// # Errors
///
/// Returns [`SchemaError`] if the query cannot be decoded or a field rule fails.
pub fn from_query<T: Schema>(uri: &Uri) -> Result<T, SchemaError> {
    let Query(value) = Query::<T>::try_from_uri(uri)
        .map_err(|e| SchemaError::single("query", e.body_text()))?;
    check(value, "query", &[])
}

fn check<T: Schema>(value: T, root: &str, mistyped: &[(&str, &str)]) -> Result<T, SchemaError> {
    let errors = value.validate().err();
    if errors.is_some() || !mistyped.is_empty() {
        return Err(SchemaError {
            details: ordered_details::<T>(errors.as_ref(), mistyped),
        });
    }

    value
        .check_shape()
        .map_err(|message| SchemaError::single(root, message))?;

    Ok(value)
}

fn ordered_details<T: Schema>(
    errors: Option<&ValidationErrors>,
    mistyped: &[(&str, &str)],
) -> Vec<String> {
    let mut details = Vec::new();

    for (field, wire) in T::FIELDS {
        if let Some((_, kind)) = mistyped.iter().find(|(name, _)| name == wire) {
            details.push(format!("{wire}: Invalid input: expected string, received {kind}"));
            continue;
        }

        let found = errors.and_then(|errors| {
            errors.errors().iter().find(|(name, _)| {
                let name: &str = name.as_ref();
                name == *field
            })
        });

        if let Some((_, ValidationErrorsKind::Field(failures))) = found {
            // Report the first failing rule per field.
            if let Some(failure) = failures.first() {
                let message = failure
                    .message
                    .as_deref()
                    .map_or_else(|| failure.code.to_string(), ToString::to_string);
                details.push(format!("{wire}: {message}"));
            }
        }
    }

    details
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Body of `/register` and `/login`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CredentialsBody {
    /// Account email address.
    #[validate(required(message = "Invalid input: expected string, received undefined"), email(message = "Invalid email address"))]
    pub email: Option<String>,
    /// Plaintext password.
    #[validate(
        required(message = "Invalid input: expected string, received undefined"),
        length(min = 6, max = 100, message = "Expected string to have between 6 and 100 characters")
    )]
    pub password: Option<String>,
}

impl CredentialsBody {
    /// The validated credential pair.
    #[must_use]
    pub fn into_credentials(self) -> Credentials {
        Credentials::new(
            self.email.unwrap_or_default(),
            self.password.unwrap_or_default(),
        )
    }
}

impl Schema for CredentialsBody {
    const FIELDS: &'static [(&'static str, &'static str)] =
        &[("email", "email"), ("password", "password")];
}

/// Body of `/refresh-token`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshTokenBody {
    /// Access token being replaced. May be expired.
    #[validate(
        required(message = "Invalid input: expected string, received undefined"),
        length(min = 1, message = "Too small: expected string to have >=1 characters")
    )]
    pub access_token: Option<String>,
    /// Refresh token issued with it.
    #[validate(
        required(message = "Invalid input: expected string, received undefined"),
        length(min = 1, message = "Too small: expected string to have >=1 characters")
    )]
    pub refresh_token: Option<String>,
}

impl RefreshTokenBody {
    /// `(access token, refresh token)`.
    #[must_use]
    pub fn into_pair(self) -> (String, String) {
        (
            self.access_token.unwrap_or_default(),
            self.refresh_token.unwrap_or_default(),
        )
    }
}

impl Schema for RefreshTokenBody {
    const FIELDS: &'static [(&'static str, &'static str)] = &[
        ("access_token", "accessToken"),
        ("refresh_token", "refreshToken"),
    ];
}

/// Body of `/refresh-token/revoke`: exactly one of `id` or `email`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RevokeTargetBody {
    /// User ID.
    #[validate(length(min = 1, message = "Too small: expected string to have >=1 characters"))]
    pub id: Option<String>,
    /// User email address.
    #[validate(length(min = 1, message = "Too small: expected string to have >=1 characters"))]
    pub email: Option<String>,
}

impl RevokeTargetBody {
    /// The lookup this body identifies.
    #[must_use]
    pub fn into_lookup(self) -> UserLookup {
        match (self.id, self.email) {
            (Some(id), _) => UserLookup::Id(id),
            (None, email) => UserLookup::Email(email.unwrap_or_default()),
        }
    }
}

impl Schema for RevokeTargetBody {
    const FIELDS: &'static [(&'static str, &'static str)] = &[("id", "id"), ("email", "email")];

    fn check_shape(&self) -> Result<(), &'static str> {
        match (&self.id, &self.email) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            _ => Err("Expected exactly one of id or email"),
        }
    }
}

/// Query of `GET /register/send-email` and `GET /reset-password`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct EmailQuery {
    /// Account email address.
    #[validate(required(message = "Invalid input: expected string, received undefined"), email(message = "Invalid email address"))]
    pub email: Option<String>,
}

impl EmailQuery {
    /// The validated address.
    #[must_use]
    pub fn into_email(self) -> String {
        self.email.unwrap_or_default()
    }
}

impl Schema for EmailQuery {
    const FIELDS: &'static [(&'static str, &'static str)] = &[("email", "email")];
}

/// Body of `POST /register/confirm-email`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ConfirmEmailBody {
    /// Account email address.
    #[validate(required(message = "Invalid input: expected string, received undefined"), email(message = "Invalid email address"))]
    pub email: Option<String>,
    /// Token from the confirmation email.
    #[validate(
        required(message = "Invalid input: expected string, received undefined"),
        length(min = 1, message = "Too small: expected string to have >=1 characters")
    )]
    pub token: Option<String>,
}

impl ConfirmEmailBody {
    /// `(email, token)`.
    #[must_use]
    pub fn into_parts(self) -> (String, String) {
        (
            self.email.unwrap_or_default(),
            self.token.unwrap_or_default(),
        )
    }
}

impl Schema for ConfirmEmailBody {
    const FIELDS: &'static [(&'static str, &'static str)] =
        &[("email", "email"), ("token", "token")];
}

/// Body of `POST /reset-password`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ConfirmResetPasswordBody {
    /// Account email address.
    #[validate(required(message = "Invalid input: expected string, received undefined"), email(message = "Invalid email address"))]
    pub email: Option<String>,
    /// Token from the reset email.
    #[validate(
        required(message = "Invalid input: expected string, received undefined"),
        length(min = 1, message = "Too small: expected string to have >=1 characters")
    )]
    pub token: Option<String>,
    /// New password.
    #[validate(
        required(message = "Invalid input: expected string, received undefined"),
        length(min = 6, max = 100, message = "Expected string to have between 6 and 100 characters")
    )]
    pub password: Option<String>,
}

impl ConfirmResetPasswordBody {
    /// `(email, token, new password)`.
    #[must_use]
    pub fn into_parts(self) -> (String, String, String) {
        (
            self.email.unwrap_or_default(),
            self.token.unwrap_or_default(),
            self.password.unwrap_or_default(),
        )
    }
}

impl Schema for ConfirmResetPasswordBody {
    const FIELDS: &'static [(&'static str, &'static str)] =
        &[("email", "email"), ("token", "token"), ("password", "password")];
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MISSING: &str = "Invalid input: expected string, received undefined";
    const EMAIL: &str = "Invalid email address";
    const PASSWORD_LENGTH: &str = "Expected string to have between 6 and 100 characters";
    const NON_EMPTY: &str = "Too small: expected string to have >=1 characters";

    #[test]
    fn test_valid_credentials() {
        let body: CredentialsBody =
            from_body(br#"{"email":"a@b.com","password":"secret1"}"#).unwrap();
        let creds = body.into_credentials();
        assert_eq!(creds.email, "a@b.com");
        assert_eq!(creds.password, "secret1");
    }

    #[test]
    fn test_missing_fields_in_declared_order() {
        let err = from_body::<CredentialsBody>(b"{}").unwrap_err();
        assert_eq!(
            err.details(),
            &[format!("email: {MISSING}"), format!("password: {MISSING}")]
        );
    }

    #[test]
    fn test_empty_body_is_empty_object() {
        let err = from_body::<ConfirmResetPasswordBody>(b"").unwrap_err();
        assert_eq!(err.details().len(), 3);
        assert!(err.details()[0].starts_with("email: "));
        assert!(err.details()[1].starts_with("token: "));
        assert!(err.details()[2].starts_with("password: "));
    }

    #[test]
    fn test_invalid_email_and_short_password() {
        let err =
            from_body::<CredentialsBody>(br#"{"email":"nope","password":"123"}"#).unwrap_err();
        assert_eq!(
            err.into_details(),
            vec![format!("email: {EMAIL}"), format!("password: {PASSWORD_LENGTH}")]
        );
    }

    #[test]
    fn test_password_too_long() {
        let body = format!(r#"{{"email":"a@b.com","password":"{}"}}"#, "x".repeat(101));
        let err = from_body::<CredentialsBody>(body.as_bytes()).unwrap_err();
        assert_eq!(err.details(), &[format!("password: {PASSWORD_LENGTH}")]);
    }

    #[test]
    fn test_camel_case_paths() {
        let err = from_body::<RefreshTokenBody>(br#"{"accessToken":""}"#).unwrap_err();
        assert_eq!(
            err.details(),
            &[
                format!("accessToken: {NON_EMPTY}"),
                format!("refreshToken: {MISSING}")
            ]
        );
    }

    #[test]
    fn test_malformed_json_is_single_detail() {
        let err = from_body::<CredentialsBody>(b"{not json").unwrap_err();
        assert_eq!(err.details().len(), 1);
        assert!(err.details()[0].starts_with("body: "));

        let err = from_body::<CredentialsBody>(b"[1,2]").unwrap_err();
        assert_eq!(
            err.details(),
            &["body: Invalid input: expected object, received array".to_string()]
        );
    }

    #[test]
    fn test_wrong_type_reported_per_field() {
        let err = from_body::<CredentialsBody>(br#"{"email":5}"#).unwrap_err();
        assert_eq!(
            err.details(),
            &[
                "email: Invalid input: expected string, received number".to_string(),
                format!("password: {MISSING}"),
            ]
        );

        let err = from_body::<ConfirmResetPasswordBody>(
            br#"{"email":"a@b.com","token":null,"password":["x"]}"#,
        )
        .unwrap_err();
        assert_eq!(
            err.details(),
            &[
                "token: Invalid input: expected string, received null".to_string(),
                "password: Invalid input: expected string, received array".to_string(),
            ]
        );
    }

    #[test]
    fn test_wrong_type_on_optional_field() {
        let err = from_body::<RevokeTargetBody>(br#"{"id":true}"#).unwrap_err();
        assert_eq!(
            err.details(),
            &["id: Invalid input: expected string, received boolean".to_string()]
        );
    }

    #[test]
    fn test_revoke_target() {
        let by_id: RevokeTargetBody = from_body(br#"{"id":"user_1"}"#).unwrap();
        assert_eq!(by_id.into_lookup(), UserLookup::Id("user_1".into()));

        let by_email: RevokeTargetBody = from_body(br#"{"email":"a@b.com"}"#).unwrap();
        assert_eq!(by_email.into_lookup(), UserLookup::Email("a@b.com".into()));

        let neither = from_body::<RevokeTargetBody>(b"{}").unwrap_err();
        assert_eq!(
            neither.details(),
            &["body: Expected exactly one of id or email".to_string()]
        );

        let both = from_body::<RevokeTargetBody>(br#"{"id":"1","email":"a@b.com"}"#);
        assert!(both.is_err());

        let empty = from_body::<RevokeTargetBody>(br#"{"id":""}"#).unwrap_err();
        assert_eq!(empty.details(), &[format!("id: {NON_EMPTY}")]);
    }

    #[test]
    fn test_email_query() {
        let uri: Uri = "/reset-password?email=a%40b.com".parse().unwrap();
        let query: EmailQuery = from_query(&uri).unwrap();
        assert_eq!(query.into_email(), "a@b.com");

        let uri: Uri = "/reset-password".parse().unwrap();
        let err = from_query::<EmailQuery>(&uri).unwrap_err();
        assert_eq!(err.details(), &[format!("email: {MISSING}")]);

        let uri: Uri = "/reset-password?email=bad".parse().unwrap();
        let err = from_query::<EmailQuery>(&uri).unwrap_err();
        assert_eq!(err.details(), &[format!("email: {EMAIL}")]);
    }

    #[test]
    fn test_schema_error_display() {
        let err = from_body::<CredentialsBody>(b"{}").unwrap_err();
        assert!(err.to_string().starts_with("Invalid parameters: email: "));
    }
}
