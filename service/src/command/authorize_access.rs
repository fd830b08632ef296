//! [`Command`] for authorizing an access [`Token`].
//!
//! [`Token`]: access::Token

use derive_more::{Display, Error, From};
use jsonwebtoken::Validation;
use tracerr::Traced;

use crate::{domain::access, Service};

use super::Command;

/// [`Command`] for authorizing an access [`Token`] issued by the external
/// authentication provider.
///
/// [`Token`]: access::Token
#[derive(Clone, Debug, From)]
pub struct AuthorizeAccess {
    /// [`Token`] to authorize.
    ///
    /// [`Token`]: access::Token
    pub token: access::Token,
}

impl<Db, Ls> Command<AuthorizeAccess> for Service<Db, Ls> {
    type Ok = access::Claims;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeAccess,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeAccess { token } = cmd;

        // `Validation::default()` verifies the `exp` claim, so an expired
        // token never authorizes.
        let claims = jsonwebtoken::decode::<access::Claims>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims;

        Ok(claims)
    }
}

/// Error of [`AuthorizeAccess`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),
}
