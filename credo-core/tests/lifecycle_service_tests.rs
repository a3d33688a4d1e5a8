use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use credo_core::auth::{encode_opaque, verify_password};
use credo_core::config::Config;
use credo_core::error::AuthError;
use credo_core::mail::{PASSWORD_RESET_SUBJECT, RecordingMailer, VERIFICATION_SUBJECT};
use credo_core::models::{
    Account, ForgotPasswordInput, NewAccount, ResetPasswordInput, Role, SignInInput, SignUpInput,
};
use credo_core::services::{
    ACCOUNT_NOT_VERIFIED, EMAIL_TAKEN, INVALID_CODE, INVALID_OR_EXPIRED, LifecycleService,
    PASSWORD_MISMATCH, PASSWORD_UPDATED, RESET_EMAIL_SENT, SessionService, VERIFIED,
};
use credo_core::store::{AccountStore, MemoryAccountStore, StoreError};
use credo_core::testing::test_config;

struct Harness {
    store: Arc<MemoryAccountStore>,
    mailer: Arc<RecordingMailer>,
    lifecycle: LifecycleService,
    session: SessionService,
}

fn harness_with(config: Config) -> Harness {
    let config = Arc::new(config);
    let store = Arc::new(MemoryAccountStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    let lifecycle = LifecycleService::new(store.clone(), mailer.clone(), config.clone());
    let session = SessionService::new(store.clone(), config).unwrap();
    Harness {
        store,
        mailer,
        lifecycle,
        session,
    }
}

fn harness() -> Harness {
    harness_with(test_config())
}

fn sign_up_input(email: &str, password: &str, confirm: &str) -> SignUpInput {
    SignUpInput {
        name: "A B".to_string(),
        email: email.to_string(),
        password: password.to_string(),
        password_confirm: confirm.to_string(),
    }
}

fn reset_input(password: &str, confirm: &str) -> ResetPasswordInput {
    ResetPasswordInput {
        password: password.to_string(),
        password_confirm: confirm.to_string(),
    }
}

fn forgot_input(email: &str) -> ForgotPasswordInput {
    ForgotPasswordInput {
        email: email.to_string(),
    }
}

impl Harness {
    async fn register_verified(&self, email: &str, password: &str) {
        let res = self
            .lifecycle
            .sign_up(sign_up_input(email, password, password))
            .await;
        assert_eq!(res.status_code, StatusCode::OK, "{}", res.message);
        let code = self.mailer.last_code_for(email).unwrap();
        assert_eq!(
            self.lifecycle.verify_email(&code).await.status_code,
            StatusCode::OK
        );
    }

    async fn request_reset(&self, email: &str) -> String {
        let res = self.lifecycle.forgot_password(forgot_input(email)).await;
        assert_eq!(res.status_code, StatusCode::OK, "{}", res.message);
        self.mailer.last_code_for(&email.to_lowercase()).unwrap()
    }
}

#[tokio::test]
async fn sign_up_persists_an_unverified_account() {
    let h = harness();
    let res = h
        .lifecycle
        .sign_up(sign_up_input("a@x.com", "12345678", "12345678"))
        .await;

    assert_eq!(res.status_code, StatusCode::OK);
    assert_eq!(
        res.message,
        "An email with the verification code has been sent to a@x.com"
    );

    let account = h.store.snapshot("a@x.com").unwrap();
    assert!(!account.verified);
    assert_eq!(account.role, Role::User);
    assert_ne!(account.password_digest, "12345678");
    assert!(verify_password("12345678", &account.password_digest).unwrap());

    // The mail carries the raw code, the store holds its encoded form.
    let raw = h.mailer.last_code_for("a@x.com").unwrap();
    assert_eq!(account.verification_code, Some(encode_opaque(&raw)));

    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, VERIFICATION_SUBJECT);
    assert_eq!(
        sent[0].link,
        format!("http://localhost:8000/api/auth/verifyemail/{}", raw)
    );
    assert!(sent[0].text.contains("Hi A,"));
}

#[tokio::test]
async fn sign_up_lowercases_the_email() {
    let h = harness();
    h.lifecycle
        .sign_up(sign_up_input("Mixed@Case.COM", "12345678", "12345678"))
        .await;
    assert_eq!(h.store.snapshot("mixed@case.com").unwrap().email, "mixed@case.com");
}

#[tokio::test]
async fn mismatched_confirmation_never_touches_the_store() {
    let h = harness();

    let res = h
        .lifecycle
        .sign_up(sign_up_input("a@x.com", "12345678", "87654321"))
        .await;
    assert_eq!(res.status_code, StatusCode::BAD_REQUEST);
    assert_eq!(res.message, PASSWORD_MISMATCH);

    let res = h
        .lifecycle
        .reset_password("any-token", reset_input("12345678", "87654321"))
        .await;
    assert_eq!(res.status_code, StatusCode::BAD_REQUEST);
    assert_eq!(res.message, PASSWORD_MISMATCH);

    assert_eq!(h.store.calls(), 0);
    assert_eq!(h.mailer.count(), 0);
}

#[tokio::test]
async fn invalid_input_never_touches_the_store() {
    let h = harness();
    let res = h
        .lifecycle
        .sign_up(sign_up_input("not-an-email", "short", "short"))
        .await;
    assert_eq!(res.status_code, StatusCode::BAD_REQUEST);

    let res = h
        .lifecycle
        .reset_password("any-token", reset_input("short", "short"))
        .await;
    assert_eq!(res.status_code, StatusCode::BAD_REQUEST);

    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let h = harness();
    h.lifecycle
        .sign_up(sign_up_input("a@x.com", "12345678", "12345678"))
        .await;

    let res = h
        .lifecycle
        .sign_up(sign_up_input("A@X.com", "12345678", "12345678"))
        .await;
    assert_eq!(res.status_code, StatusCode::CONFLICT);
    assert_eq!(res.message, EMAIL_TAKEN);
    assert!(matches!(res.error, Some(AuthError::Conflict(_))));
    assert_eq!(h.mailer.count(), 1);
}

#[tokio::test]
async fn mail_failure_fails_sign_up_but_keeps_the_account() {
    let h = harness();
    h.mailer.set_failing(true);

    let res = h
        .lifecycle
        .sign_up(sign_up_input("a@x.com", "12345678", "12345678"))
        .await;
    assert_eq!(res.status_code, StatusCode::BAD_GATEWAY);
    assert!(matches!(res.error, Some(AuthError::Mail(_))));

    let account = h.store.snapshot("a@x.com").unwrap();
    assert!(account.verification_code.is_some());
}

#[tokio::test]
async fn store_outage_during_sign_up_is_bad_gateway() {
    let h = harness();
    h.store.set_unavailable(true);
    let res = h
        .lifecycle
        .sign_up(sign_up_input("a@x.com", "12345678", "12345678"))
        .await;
    assert_eq!(res.status_code, StatusCode::BAD_GATEWAY);
    assert_eq!(h.mailer.count(), 0);
}

#[tokio::test]
async fn verification_code_works_exactly_once() {
    let h = harness();
    h.lifecycle
        .sign_up(sign_up_input("a@x.com", "12345678", "12345678"))
        .await;
    let code = h.mailer.last_code_for("a@x.com").unwrap();

    let first = h.lifecycle.verify_email(&code).await;
    assert_eq!(first.status_code, StatusCode::OK);
    assert_eq!(first.message, VERIFIED);

    let account = h.store.snapshot("a@x.com").unwrap();
    assert!(account.verified);
    assert!(account.verification_code.is_none());

    let second = h.lifecycle.verify_email(&code).await;
    assert_eq!(second.status_code, StatusCode::FORBIDDEN);
    assert_eq!(second.message, INVALID_CODE);
}

#[tokio::test]
async fn encoded_code_is_not_accepted_as_the_link_code() {
    let h = harness();
    h.lifecycle
        .sign_up(sign_up_input("a@x.com", "12345678", "12345678"))
        .await;
    let stored = h.store.snapshot("a@x.com").unwrap().verification_code.unwrap();

    let res = h.lifecycle.verify_email(&stored).await;
    assert_eq!(res.status_code, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn store_outage_during_verification_is_bad_gateway() {
    let h = harness();
    h.store.set_unavailable(true);
    let res = h.lifecycle.verify_email("whatever").await;
    assert_eq!(res.status_code, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn forgot_password_for_unknown_email_is_silent() {
    let h = harness();
    let res = h
        .lifecycle
        .forgot_password(forgot_input("nobody@example.com"))
        .await;

    assert_eq!(res.status_code, StatusCode::OK);
    assert_eq!(res.message, RESET_EMAIL_SENT);
    assert_eq!(h.mailer.count(), 0);
}

#[tokio::test]
async fn forgot_password_responses_match_for_known_and_unknown_emails() {
    let h = harness();
    h.register_verified("a@x.com", "12345678").await;

    let known = h.lifecycle.forgot_password(forgot_input("a@x.com")).await;
    let unknown = h.lifecycle.forgot_password(forgot_input("b@x.com")).await;
    assert_eq!(
        serde_json::to_value(known.body()).unwrap(),
        serde_json::to_value(unknown.body()).unwrap()
    );
}

#[tokio::test]
async fn forgot_password_rejects_unverified_accounts() {
    let h = harness();
    h.lifecycle
        .sign_up(sign_up_input("a@x.com", "12345678", "12345678"))
        .await;

    let res = h.lifecycle.forgot_password(forgot_input("a@x.com")).await;
    assert_eq!(res.status_code, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message, ACCOUNT_NOT_VERIFIED);
    assert_eq!(h.mailer.count(), 1);
}

#[tokio::test]
async fn forgot_password_stores_encoded_token_with_expiry() {
    let h = harness();
    h.register_verified("a@x.com", "12345678").await;

    let before = Utc::now();
    let raw = h.request_reset("A@X.COM").await;

    let account = h.store.snapshot("a@x.com").unwrap();
    assert_eq!(account.password_reset_token, Some(encode_opaque(&raw)));

    let expires_at = account.password_reset_expires_at.unwrap();
    let ttl = expires_at - before;
    // Rounded up to a whole second, never short of the full lifetime.
    assert_eq!(expires_at.timestamp_subsec_nanos(), 0);
    assert!(ttl >= chrono::Duration::minutes(15));
    assert!(ttl <= chrono::Duration::minutes(15) + chrono::Duration::seconds(2));

    let sent = h.mailer.sent();
    let mail = sent.last().unwrap();
    assert_eq!(mail.subject, PASSWORD_RESET_SUBJECT);
    assert_eq!(
        mail.link,
        format!("http://localhost:8000/api/auth/resetpassword/{}", raw)
    );
}

#[tokio::test]
async fn mail_failure_during_forgot_password_is_bad_gateway() {
    let h = harness();
    h.register_verified("a@x.com", "12345678").await;
    h.mailer.set_failing(true);

    let res = h.lifecycle.forgot_password(forgot_input("a@x.com")).await;
    assert_eq!(res.status_code, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn reset_replaces_the_password_once() {
    let h = harness();
    h.register_verified("a@x.com", "12345678").await;
    let token = h.request_reset("a@x.com").await;

    let res = h
        .lifecycle
        .reset_password(&token, reset_input("new-password", "new-password"))
        .await;
    assert_eq!(res.status_code, StatusCode::OK);
    assert_eq!(res.message, PASSWORD_UPDATED);

    let account = h.store.snapshot("a@x.com").unwrap();
    assert!(account.password_reset_token.is_none());
    assert!(account.password_reset_expires_at.is_none());

    let old = h
        .session
        .sign_in(SignInInput {
            email: "a@x.com".to_string(),
            password: "12345678".to_string(),
        })
        .await;
    assert_eq!(old.status_code, StatusCode::BAD_REQUEST);

    let new = h
        .session
        .sign_in(SignInInput {
            email: "a@x.com".to_string(),
            password: "new-password".to_string(),
        })
        .await;
    assert_eq!(new.status_code, StatusCode::OK);

    let replay = h
        .lifecycle
        .reset_password(&token, reset_input("third-password", "third-password"))
        .await;
    assert_eq!(replay.status_code, StatusCode::FORBIDDEN);
    assert_eq!(replay.message, INVALID_OR_EXPIRED);
}

#[tokio::test]
async fn unknown_reset_token_is_forbidden() {
    let h = harness();
    let res = h
        .lifecycle
        .reset_password("never-issued", reset_input("new-password", "new-password"))
        .await;
    assert_eq!(res.status_code, StatusCode::FORBIDDEN);
    assert_eq!(res.message, INVALID_OR_EXPIRED);
}

#[tokio::test]
async fn reset_token_expires() {
    let mut config = test_config();
    config.password_reset_expires_in = chrono::Duration::seconds(1);
    let h = harness_with(config);
    h.register_verified("a@x.com", "12345678").await;
    let token = h.request_reset("a@x.com").await;

    tokio::time::sleep(StdDuration::from_secs(2)).await;

    let res = h
        .lifecycle
        .reset_password(&token, reset_input("new-password", "new-password"))
        .await;
    assert_eq!(res.status_code, StatusCode::FORBIDDEN);
    assert_eq!(res.message, INVALID_OR_EXPIRED);

    let account = h.store.snapshot("a@x.com").unwrap();
    assert!(verify_password("12345678", &account.password_digest).unwrap());
}

#[tokio::test]
async fn newer_reset_request_supersedes_the_older_one() {
    let h = harness();
    h.register_verified("a@x.com", "12345678").await;
    let first = h.request_reset("a@x.com").await;
    let second = h.request_reset("a@x.com").await;

    let stale = h
        .lifecycle
        .reset_password(&first, reset_input("new-password", "new-password"))
        .await;
    assert_eq!(stale.status_code, StatusCode::FORBIDDEN);

    let fresh = h
        .lifecycle
        .reset_password(&second, reset_input("new-password", "new-password"))
        .await;
    assert_eq!(fresh.status_code, StatusCode::OK);
}

/// Delegates to a memory store after a fixed delay.
struct SlowStore {
    inner: MemoryAccountStore,
    delay: StdDuration,
}

#[async_trait]
impl AccountStore for SlowStore {
    async fn find_by_id(&self, id: &str) -> Result<Account, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Account, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_by_email(email).await
    }

    async fn insert(&self, draft: NewAccount) -> Result<Account, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.insert(draft).await
    }

    async fn set_verification_code(&self, id: &str, code: &str) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.set_verification_code(id, code).await
    }

    async fn set_role(&self, id: &str, role: Role) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.set_role(id, role).await
    }

    async fn set_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.set_reset_token(email, token, expires_at).await
    }

    async fn consume_verification_code(&self, code: &str) -> Result<u64, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.consume_verification_code(code).await
    }

    async fn consume_reset_token(&self, token: &str, new_digest: &str) -> Result<u64, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.consume_reset_token(token, new_digest).await
    }
}

#[tokio::test]
async fn slow_store_times_out_as_bad_gateway() {
    let mut config = test_config();
    config.upstream_timeout = StdDuration::from_millis(50);
    let store = Arc::new(SlowStore {
        inner: MemoryAccountStore::new(),
        delay: StdDuration::from_millis(500),
    });
    let lifecycle = LifecycleService::new(
        store,
        Arc::new(RecordingMailer::new()),
        Arc::new(config),
    );

    let res = lifecycle.forgot_password(forgot_input("a@x.com")).await;
    assert_eq!(res.status_code, StatusCode::BAD_GATEWAY);
    assert!(matches!(
        res.error,
        Some(AuthError::Store(StoreError::Timeout(_)))
    ));

    let res = lifecycle.verify_email("code").await;
    assert_eq!(res.status_code, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn padded_email_is_normalized_in_every_flow() {
    let h = harness();
    let res = h
        .lifecycle
        .sign_up(sign_up_input("  A@X.com ", "12345678", "12345678"))
        .await;
    assert_eq!(res.status_code, StatusCode::OK, "{}", res.message);
    assert!(h.store.snapshot("a@x.com").is_some());

    let code = h.mailer.last_code_for("a@x.com").unwrap();
    assert_eq!(h.lifecycle.verify_email(&code).await.status_code, StatusCode::OK);

    let signed_in = h
        .session
        .sign_in(SignInInput {
            email: " a@X.COM  ".to_string(),
            password: "12345678".to_string(),
        })
        .await;
    assert_eq!(signed_in.status_code, StatusCode::OK, "{}", signed_in.message);

    let res = h.lifecycle.forgot_password(forgot_input("\tA@x.com ")).await;
    assert_eq!(res.status_code, StatusCode::OK);
    assert_eq!(h.mailer.count(), 2);
    assert!(h.store.snapshot("a@x.com").unwrap().password_reset_token.is_some());
}
