use super::*;

fn config(url: &str) -> AuthConfig {
    AuthConfig {
        url: url.into(),
        api_key: "anon".into(),
        email: "ada@example.test".into(),
        password: "pw".into(),
    }
}

#[test]
fn endpoint_joins_base_url() {
    let client = GoTrueClient::new(&config("https://auth.example.test/"));
    assert_eq!(client.endpoint("logout"), "https://auth.example.test/auth/v1/logout");
}

#[test]
fn token_response_identity_prefers_full_name() {
    let token: TokenResponse = serde_json::from_str(
        r#"{
            "access_token": "jwt",
            "token_type": "bearer",
            "user": { "id": "u1", "email": "ada@example.test", "user_metadata": { "full_name": "Ada Lovelace" } }
        }"#,
    )
    .unwrap();
    assert_eq!(token.access_token, "jwt");
    let identity = token.user.identity();
    assert_eq!(identity.user_id, "u1");
    assert_eq!(identity.user_name, "Ada Lovelace");
    assert_eq!(identity.color, scene::color::color_of("u1"));
}

#[test]
fn token_response_falls_back_to_email_prefix() {
    let user: AccountUser = serde_json::from_str(r#"{ "id": "u2", "email": "grace@example.test" }"#).unwrap();
    assert_eq!(user.identity().user_name, "grace");
}

#[test]
fn token_response_without_name_or_email_uses_placeholder() {
    let user: AccountUser = serde_json::from_str(r#"{ "id": "u3", "user_metadata": {} }"#).unwrap();
    assert_eq!(user.identity().user_name, "User");
}

#[test]
fn auth_error_codes() {
    assert_eq!(AuthError::Request("x".into()).error_code(), "E_AUTH_REQUEST");
    assert_eq!(AuthError::Rejected { status: 400, body: String::new() }.error_code(), "E_AUTH_REJECTED");
    assert_eq!(AuthError::Parse("x".into()).error_code(), "E_AUTH_PARSE");
}
