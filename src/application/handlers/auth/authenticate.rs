//! AuthenticateHandler - resolves an access token to a directory user.

use std::sync::Arc;

use crate::domain::directory::User;
use crate::domain::foundation::AuthError;
use crate::ports::{Directory, TokenVerifier};

/// Command carried by an `auth` frame.
#[derive(Debug, Clone)]
pub struct AuthenticateCommand {
    pub token: String,
}

/// Handler for authenticating a connection.
pub struct AuthenticateHandler {
    verifier: Arc<dyn TokenVerifier>,
    directory: Arc<dyn Directory>,
}

impl AuthenticateHandler {
    pub fn new(verifier: Arc<dyn TokenVerifier>, directory: Arc<dyn Directory>) -> Self {
        Self {
            verifier,
            directory,
        }
    }

    pub async fn handle(&self, cmd: AuthenticateCommand) -> Result<User, AuthError> {
        // 1. Verify the token and extract the subject
        let user_id = self.verifier.verify(&cmd.token).await?;

        // 2. The subject must still exist in the directory
        self.directory
            .find_user(&user_id)
            .await
            .map_err(|e| AuthError::service_unavailable(e.to_string()))?
            .ok_or(AuthError::UserNotFound)
    }
}
