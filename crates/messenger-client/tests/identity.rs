mod common;

use messenger_client::ClientError;
use messenger_client::validation::{LoginForm, ProfileForm};
use messenger_service::StaticProvider;
use messenger_types::store::DocumentStore;
use messenger_types::{AuthError, UserProfile};

use common::{backend, client, register, registration};

async fn stored_profile(backend: &messenger_service::LocalBackend, profile: &UserProfile) -> UserProfile {
    let doc = backend.get_profile(&profile.id).await.unwrap().unwrap();
    UserProfile::try_from(&doc).unwrap()
}

fn login_form(email: &str, password: &str) -> LoginForm {
    LoginForm {
        email: email.into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn register_writes_profile_and_signs_in() {
    let backend = backend();
    let (client, _) = client(&backend);

    let profile = client.identity.register(&registration("alice")).await.unwrap();
    assert_eq!(profile.username.as_deref(), Some("alice"));
    assert_eq!(profile.email, "alice@example.com");
    assert_eq!(
        profile.photo_url.as_deref(),
        Some("https://ui-avatars.com/api/?background=random&color=fff&name=alice")
    );
    assert_eq!(profile.provider.as_deref(), Some("password"));
    assert!(profile.online);
    assert!(profile.created_at.is_some());

    assert_eq!(client.session.current_id(), Some(profile.id.clone()));
    assert!(client.session.token().is_some());
}

#[tokio::test]
async fn existing_email_is_a_field_error() {
    let backend = backend();
    register(&backend, "alice").await;

    let (client, _) = client(&backend);
    let err = client.identity.register(&registration("alice")).await.unwrap_err();
    let ClientError::Validation(errors) = err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert_eq!(errors.get("email"), Some("Email already registered"));
    assert!(!client.session.is_signed_in());
}

#[tokio::test]
async fn invalid_forms_never_reach_the_service() {
    let backend = backend();
    let (client, _) = client(&backend);

    let mut form = registration("alice");
    form.confirm_password = "different".into();
    assert!(matches!(
        client.identity.register(&form).await,
        Err(ClientError::Validation(_))
    ));

    // Nothing was created, so a correct registration still succeeds
    client.identity.register(&registration("alice")).await.unwrap();
}

#[tokio::test]
async fn login_failures_are_auth_errors() {
    let backend = backend();
    register(&backend, "alice").await;
    let (client, _) = client(&backend);

    let err = client
        .identity
        .login(&login_form("alice@example.com", "wrong-password"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Auth(AuthError::InvalidCredentials)));
    assert_eq!(err.notice(), "Invalid email or password");

    let err = client
        .identity
        .login(&login_form("nobody@example.com", "secret1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Auth(AuthError::UnknownUser(_))));
    assert!(!client.session.is_signed_in());
}

#[tokio::test]
async fn presence_follows_login_and_logout() {
    let backend = backend();
    let alice = register(&backend, "alice").await;
    let (client, _) = client(&backend);

    client
        .identity
        .login(&login_form("alice@example.com", "secret1"))
        .await
        .unwrap();
    assert!(stored_profile(&backend, &alice).await.online);

    client.identity.logout().await.unwrap();
    assert!(!stored_profile(&backend, &alice).await.online);
    assert!(!client.session.is_signed_in());

    assert!(matches!(client.identity.logout().await, Err(ClientError::NotSignedIn)));

    client
        .identity
        .login(&login_form("ALICE@example.com ", "secret1"))
        .await
        .unwrap();
    assert!(stored_profile(&backend, &alice).await.online);
}

#[tokio::test]
async fn provider_sign_in_creates_a_profile_once() {
    let backend = backend();
    let (client, _) = client(&backend);
    let provider = StaticProvider::signed_in(
        "google",
        "carol@example.com",
        Some("Carol".into()),
        Some("https://example.com/carol.png".into()),
    );

    let profile = client.identity.login_with_provider(&provider).await.unwrap();
    assert_eq!(profile.username.as_deref(), Some("Carol"));
    assert_eq!(profile.provider.as_deref(), Some("google"));
    assert!(profile.online);

    client.identity.logout().await.unwrap();
    let again = client.identity.login_with_provider(&provider).await.unwrap();
    assert_eq!(again.id, profile.id);
    assert!(again.online);

    let err = client
        .identity
        .login_with_provider(&StaticProvider::cancelled("google"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Auth(AuthError::ProviderCancelled)));
}

#[tokio::test]
async fn restore_resumes_from_a_token() {
    let backend = backend();
    let (first, _) = client(&backend);
    let alice = first.identity.register(&registration("alice")).await.unwrap();
    let token = first.session.token().unwrap();

    let (second, _) = client(&backend);
    let restored = second.identity.restore(&token).await.unwrap();
    assert_eq!(restored.id, alice.id);
    assert_eq!(second.session.current_id(), Some(alice.id));

    let (third, _) = client(&backend);
    assert!(matches!(
        third.identity.restore("garbage").await,
        Err(ClientError::Auth(AuthError::InvalidToken))
    ));
}

#[tokio::test]
async fn profile_edit_rejects_taken_usernames() {
    let backend = backend();
    register(&backend, "bob").await;
    let (client, _) = client(&backend);
    client.identity.register(&registration("alice")).await.unwrap();

    let mut form = client.identity.profile_form().await.unwrap();
    assert_eq!(form.username, "alice");

    form.username = "bob".into();
    form.photo_url = "https://example.com/a.png".into();
    let err = client.identity.update_profile(&form).await.unwrap_err();
    let ClientError::Validation(errors) = err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert_eq!(errors.get("username"), Some("Username already in use"));

    // Keeping your own username is fine
    let form = ProfileForm {
        username: "alice".into(),
        bio: "hello there".into(),
        photo_url: "https://example.com/a.png".into(),
    };
    let updated = client.identity.update_profile(&form).await.unwrap();
    assert_eq!(updated.bio.as_deref(), Some("hello there"));
    assert_eq!(updated.photo_url.as_deref(), Some("https://example.com/a.png"));
    assert_eq!(
        client.session.current_user().unwrap().bio.as_deref(),
        Some("hello there")
    );
}
