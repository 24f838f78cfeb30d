//! Three-step login: phone → code → optional 2FA password.

use rand::RngCore;

use super::srp::{self, SRP_BYTES};
use super::{LoginState, Session};
use crate::error::AuthError;
use crate::rpc::{Authorization, SentCode, with_timeout};

/// Successful outcome of a login step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginStatus {
    /// A one-time code was sent; call [`Session::submit_code`] next
    CodeSent,
    /// The session is authenticated
    Success,
    /// The account has 2FA enabled; call [`Session::submit_password`] next
    PasswordRequired,
    /// The phone number has no account yet
    SignUpRequired,
}

impl LoginStatus {
    /// Token returned to shells
    pub fn as_token(&self) -> &'static str {
        match self {
            LoginStatus::CodeSent => "CODE_SENT",
            LoginStatus::Success => "LOGIN_SUCCESS",
            LoginStatus::PasswordRequired => "PASSWORD_REQUIRED",
            LoginStatus::SignUpRequired => "SIGNUP_REQUIRED",
        }
    }
}

impl std::fmt::Display for LoginStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Strip spaces, hyphens and parentheses
pub(crate) fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect()
}

/// Last two digits only, for logs
fn phone_suffix(phone: &str) -> &str {
    let start = phone.len().saturating_sub(2);
    phone.get(start..).unwrap_or_default()
}

impl Session {
    /// Request a one-time login code for `phone`.
    ///
    /// The number must start with `+` once spaces, hyphens and parentheses are
    /// removed; otherwise this fails without any network call. An already
    /// authenticated session answers [`LoginStatus::Success`] immediately.
    pub async fn start_login(&self, phone: &str) -> Result<LoginStatus, AuthError> {
        let phone = normalize_phone(phone);
        if !phone.starts_with('+') {
            return Err(AuthError::InvalidPhoneFormat);
        }
        let api = self.api()?;
        if self.is_authenticated() {
            tracing::info!("Session already authenticated, skipping code request");
            return Ok(LoginStatus::Success);
        }

        tracing::info!(phone_suffix = phone_suffix(&phone), "Requesting login code");
        let (api_id, api_hash) = self.credentials();
        let sent = with_timeout(self.rpc_timeout(), api.send_code(&phone, api_id, api_hash)).await?;

        match sent {
            SentCode::CodeSent { phone_code_hash } => {
                self.set_login(LoginState::AwaitingCode {
                    phone,
                    phone_code_hash,
                });
                Ok(LoginStatus::CodeSent)
            }
            SentCode::Success => {
                tracing::info!("Authorized without a code challenge");
                self.set_login(LoginState::Authenticated);
                Ok(LoginStatus::Success)
            }
        }
    }

    /// Submit the one-time code received after [`start_login`](Self::start_login).
    ///
    /// A wrong or expired code fails with [`AuthError::InvalidCode`] and keeps
    /// the flow waiting for another code.
    pub async fn submit_code(&self, code: &str) -> Result<LoginStatus, AuthError> {
        let (phone, phone_code_hash) = match &*self.read_login() {
            LoginState::AwaitingCode {
                phone,
                phone_code_hash,
            } => (phone.clone(), phone_code_hash.clone()),
            _ => return Err(AuthError::NoActiveLoginFlow),
        };
        let api = self.api()?;

        let result = with_timeout(
            self.rpc_timeout(),
            api.sign_in(&phone, &phone_code_hash, code.trim()),
        )
        .await;

        match result {
            Ok(Authorization::Authorized) => {
                tracing::info!("Signed in");
                self.set_login(LoginState::Authenticated);
                Ok(LoginStatus::Success)
            }
            Ok(Authorization::SignUpRequired) => {
                tracing::warn!(
                    phone_suffix = phone_suffix(&phone),
                    "Phone number is not registered"
                );
                Ok(LoginStatus::SignUpRequired)
            }
            Err(e) if e.is("SESSION_PASSWORD_NEEDED") => {
                tracing::info!("Account requires its 2FA password");
                self.set_login(LoginState::AwaitingPassword);
                Ok(LoginStatus::PasswordRequired)
            }
            Err(e) if e.is("PHONE_CODE_*") => {
                tracing::warn!(error = %e, "Code rejected");
                Err(AuthError::InvalidCode)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Submit the 2FA password.
    ///
    /// Only a salted SRP proof derived from the server's challenge and fresh
    /// randomness is sent; the plaintext never leaves the process.
    pub async fn submit_password(&self, password: &str) -> Result<LoginStatus, AuthError> {
        if !matches!(*self.read_login(), LoginState::AwaitingPassword) {
            return Err(AuthError::NoActiveLoginFlow);
        }
        let api = self.api()?;

        let params = with_timeout(self.rpc_timeout(), api.get_password()).await?;
        let mut secret = [0u8; SRP_BYTES];
        rand::thread_rng().fill_bytes(&mut secret);
        let proof = srp::password_proof(&params, password.as_bytes(), &secret)?;

        match with_timeout(self.rpc_timeout(), api.check_password(proof)).await? {
            Authorization::Authorized => {
                tracing::info!("2FA password accepted");
                self.set_login(LoginState::Authenticated);
                Ok(LoginStatus::Success)
            }
            Authorization::SignUpRequired => Ok(LoginStatus::SignUpRequired),
        }
    }
}
