use tracing::{Level, event};

use crate::{
    MarketError,
    models::{CodeCheck, CodeRequest, CodeVerdict, IssuedCode},
    ports::Application,
    verification::normalize,
};

fn checked_email(raw: &str) -> Result<String, MarketError> {
    let email = normalize(raw);
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.contains('@')
        })
        && !email.contains(char::is_whitespace);
    if well_formed {
        Ok(email)
    } else {
        Err(MarketError::Validation(format!(
            "`{}` is not an email address",
            raw.trim()
        )))
    }
}

/// Issue a single-use code for an email address, replacing any earlier one
pub async fn issue_verification_code<A: Application>(
    app: &A,
    request: &CodeRequest,
) -> Result<IssuedCode, MarketError> {
    let email = checked_email(&request.email)?;
    let codes = app.verification_codes();
    let now = app.now();
    let code = codes.issue(&email, now);
    event!(Level::INFO, email = %email, "verification code issued");
    Ok(IssuedCode {
        email,
        code,
        expires_at: now + codes.ttl(),
    })
}

/// Check a code; a match consumes it
pub async fn verify_code<A: Application>(
    app: &A,
    check: &CodeCheck,
) -> Result<CodeVerdict, MarketError> {
    let email = checked_email(&check.email)?;
    let verified = app
        .verification_codes()
        .verify(&email, &check.code, app.now());
    if !verified {
        event!(Level::DEBUG, email = %email, "verification code rejected");
    }
    Ok(CodeVerdict { email, verified })
}
