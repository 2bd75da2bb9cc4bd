use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};

use icon_types::{Caller, PrivilegeSet};

use crate::config::UserConfig;
use crate::error::{ServerError, ServerResult};

/// What a request presented to identify itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    /// Read the `Authorization` header. No header means anonymous.
    pub fn from_headers(headers: &HeaderMap) -> ServerResult<Self> {
        let Some(value) = headers.get(header::AUTHORIZATION) else {
            return Ok(Self::Anonymous);
        };
        let value = value
            .to_str()
            .map_err(|_| ServerError::AuthFailed("malformed Authorization header".into()))?;
        match value.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(Self::Bearer(token.trim().to_string())),
            _ => Err(ServerError::AuthFailed(
                "expected a Bearer token".into(),
            )),
        }
    }
}

/// Turns credentials into a [`Caller`].
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Caller>;
}

/// Static token table taken from configuration.
#[derive(Clone, Debug, Default)]
pub struct TokenAuth {
    callers: HashMap<String, Caller>,
}

impl TokenAuth {
    pub fn new(users: &[UserConfig]) -> Self {
        let callers = users
            .iter()
            .map(|u| {
                let privileges: PrivilegeSet = u.privileges.iter().copied().collect();
                (u.token.clone(), Caller::new(&u.name, privileges))
            })
            .collect();
        Self { callers }
    }

    pub fn user_count(&self) -> usize {
        self.callers.len()
    }
}

#[async_trait]
impl AuthProvider for TokenAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Caller> {
        match credentials {
            Credentials::Anonymous => Ok(Caller::anonymous()),
            Credentials::Bearer(token) => self
                .callers
                .get(token)
                .cloned()
                .ok_or_else(|| ServerError::AuthFailed("unknown token".into())),
        }
    }
}
