//! Verified caller identity, forwarded by the gateway in front of us.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};

use crate::{appresult::AppError, config::Config, error::CoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    fn from_parts(parts: &Parts, config: &Config) -> Option<Self> {
        parts
            .headers
            .get(&config.actor_header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| Actor(id.to_owned()))
    }
}

impl<S> FromRequestParts<S> for Actor
where
    Arc<Config>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Arc::<Config>::from_ref(state);
        Actor::from_parts(parts, &config).ok_or(AppError(CoreError::Unauthorized))
    }
}

impl<S> OptionalFromRequestParts<S> for Actor
where
    Arc<Config>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let config = Arc::<Config>::from_ref(state);
        Ok(Actor::from_parts(parts, &config))
    }
}
