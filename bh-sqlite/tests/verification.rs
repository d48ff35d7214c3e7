mod common;

use bh_core::{
    MarketError,
    models::{CodeCheck, CodeRequest},
    services,
};
use common::{T0, TestApp};
use time::Duration;

fn request(email: &str) -> CodeRequest {
    CodeRequest {
        email: email.to_owned(),
    }
}

#[tokio::test]
async fn test_codes_follow_the_clock() -> anyhow::Result<()> {
    let app = TestApp::new().await?;

    let issued = services::issue_verification_code(&app, &request("Dev9@Example.com")).await?;
    assert_eq!(issued.email, "dev9@example.com");
    assert_eq!(issued.expires_at, T0 + Duration::minutes(5));

    // a later issue replaces the first code and restarts the window
    app.set_now(T0 + Duration::minutes(4));
    let reissued = services::issue_verification_code(&app, &request("dev9@example.com")).await?;
    assert_eq!(app.codes.len(), 1);

    app.set_now(T0 + Duration::minutes(8));
    let check = CodeCheck {
        email: "dev9@example.com".to_owned(),
        code: reissued.code.clone(),
    };
    assert!(services::verify_code(&app, &check).await?.verified);
    assert!(!services::verify_code(&app, &check).await?.verified);
    assert!(app.codes.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_malformed_addresses_are_rejected() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    for email in ["", "dev9", "@example.com", "dev9@localhost", "dev 9@example.com"] {
        assert!(
            matches!(
                services::issue_verification_code(&app, &request(email)).await,
                Err(MarketError::Validation(_))
            ),
            "{email:?} was accepted"
        );
    }
    assert!(app.codes.is_empty());
    Ok(())
}
