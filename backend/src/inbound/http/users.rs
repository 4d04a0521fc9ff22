//! Sign-in and profile handlers.
//!
//! ```text
//! POST /api/v1/login {"identifier":"ada@example.com"}
//! POST /api/v1/logout
//! GET  /api/v1/me
//! PUT  /api/v1/me {"displayName":"Ada","city":"Pune"}
//! ```

use actix_web::{HttpResponse, get, post, put, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::domain::{Error, Profile, ProfileUpdate, User, UserIdentifier, UserIdentifierError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Login request body for `POST /api/v1/login`.
///
/// The identifier is an email address, a phone number or, in development,
/// any other token.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[schema(example = "ada@example.com")]
    pub identifier: String,
}

fn map_identifier_error(err: UserIdentifierError) -> Error {
    match err {
        UserIdentifierError::Empty => Error::invalid_request("identifier must not be empty")
            .with_details(json!({ "field": "identifier", "code": "empty_identifier" })),
    }
}

/// Resolve or create the user behind an identifier and establish a session.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = User,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["users"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<User>> {
    let identifier = UserIdentifier::parse(&payload.identifier).map_err(map_identifier_error)?;
    let user = state.login.login(&identifier).await?;
    session.persist_user(user.id())?;
    info!(user_id = %user.id(), "user signed in");
    Ok(web::Json(user))
}

/// End the current session.
#[utoipa::path(
    post,
    path = "/api/v1/logout",
    responses((status = 204, description = "Session cleared")),
    tags = ["users"],
    operation_id = "logout",
    security([])
)]
#[post("/logout")]
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.purge();
    HttpResponse::NoContent().finish()
}

/// Profile edit for `PUT /api/v1/me`. Omitted fields stay as they are.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileBody {
    #[serde(alias = "name")]
    #[schema(example = "Ada")]
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    #[schema(example = "+919876543210")]
    pub phone: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub default_currency: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub preferences: Option<Value>,
}

impl From<UpdateProfileBody> for ProfileUpdate {
    fn from(body: UpdateProfileBody) -> Self {
        Self {
            display_name: body.display_name,
            avatar_url: body.avatar_url,
            bio: body.bio,
            phone: body.phone,
            address_line1: body.address_line1,
            address_line2: body.address_line2,
            city: body.city,
            state: body.state,
            postal_code: body.postal_code,
            country: body.country,
            default_currency: body.default_currency,
            preferences: body.preferences,
        }
    }
}

/// The caller's profile.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Profile", body = Profile),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "User no longer exists", body = Error)
    ),
    tags = ["users"],
    operation_id = "getProfile"
)]
#[get("/me")]
pub async fn get_profile(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Profile>> {
    let auth = session.require_auth()?;
    Ok(web::Json(state.profile.profile(&auth).await?))
}

/// Edit the caller's profile.
#[utoipa::path(
    put,
    path = "/api/v1/me",
    request_body = UpdateProfileBody,
    responses(
        (status = 200, description = "Updated profile", body = Profile),
        (status = 400, description = "Invalid field", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "User no longer exists", body = Error),
        (status = 409, description = "Phone belongs to another account", body = Error)
    ),
    tags = ["users"],
    operation_id = "updateProfile"
)]
#[put("/me")]
pub async fn update_profile(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<UpdateProfileBody>,
) -> ApiResult<web::Json<Profile>> {
    let auth = session.require_auth()?;
    let profile = state
        .profile
        .update_profile(&auth, payload.into_inner().into())
        .await?;
    Ok(web::Json(profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::{api_app, login_cookie};
    use crate::test_support::shop::TestShop;
    use actix_web::body::MessageBody;
    use actix_web::cookie::Cookie;
    use actix_web::dev::{Service, ServiceResponse};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::Value;

    #[rstest]
    #[case("ada@example.com", "ada")]
    #[case("someone", "Dev User")]
    #[actix_web::test]
    async fn login_returns_the_resolved_user(#[case] identifier: &str, #[case] name: &str) {
        let shop = TestShop::new(Vec::new());
        let app = actix_test::init_service(api_app(shop.state)).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/login")
                .set_json(LoginRequest {
                    identifier: identifier.to_owned(),
                })
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body.get("displayName").and_then(Value::as_str), Some(name));
        assert!(body.get("id").and_then(Value::as_str).is_some());
    }

    #[actix_web::test]
    async fn blank_identifiers_are_rejected() {
        let shop = TestShop::new(Vec::new());
        let app = actix_test::init_service(api_app(shop.state)).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/login")
                .set_json(json!({ "identifier": "   " }))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(
            body.pointer("/details/code").and_then(Value::as_str),
            Some("empty_identifier")
        );
    }

    #[actix_web::test]
    async fn logout_ends_the_session() {
        let shop = TestShop::new(Vec::new());
        let app = actix_test::init_service(api_app(shop.state)).await;
        let cookie = login_cookie(&app, "ada@example.com").await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/logout")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let cleared = res
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("removal cookie")
            .into_owned();

        let cart = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/cart")
                .cookie(cleared)
                .to_request(),
        )
        .await;
        assert_eq!(cart.status(), StatusCode::UNAUTHORIZED);
    }

    async fn put_profile<S, B>(app: &S, cookie: Cookie<'static>, body: Value) -> ServiceResponse<B>
    where
        S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        actix_test::call_service(
            app,
            actix_test::TestRequest::put()
                .uri("/api/v1/me")
                .cookie(cookie)
                .set_json(body)
                .to_request(),
        )
        .await
    }

    #[actix_web::test]
    async fn profile_requires_a_session() {
        let shop = TestShop::new(Vec::new());
        let app = actix_test::init_service(api_app(shop.state)).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/api/v1/me").to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn profile_edits_are_returned_and_persisted() {
        let shop = TestShop::new(Vec::new());
        let app = actix_test::init_service(api_app(shop.state)).await;
        let cookie = login_cookie(&app, "ada@example.com").await;

        let res = put_profile(
            &app,
            cookie.clone(),
            json!({ "name": "Ada L.", "city": "Pune", "preferences": { "newsletter": true } }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/me")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body.get("displayName").and_then(Value::as_str), Some("Ada L."));
        assert_eq!(body.get("email").and_then(Value::as_str), Some("ada@example.com"));
        assert_eq!(body.get("city").and_then(Value::as_str), Some("Pune"));
        assert_eq!(body.pointer("/preferences/newsletter"), Some(&Value::Bool(true)));
    }

    #[actix_web::test]
    async fn claiming_another_accounts_phone_conflicts() {
        let shop = TestShop::new(Vec::new());
        let app = actix_test::init_service(api_app(shop.state)).await;
        login_cookie(&app, "+919876543210").await;
        let cookie = login_cookie(&app, "ada@example.com").await;

        let res = put_profile(&app, cookie, json!({ "phone": "+919876543210" })).await;

        assert_eq!(res.status(), StatusCode::CONFLICT);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(
            body.pointer("/details/code").and_then(Value::as_str),
            Some("phone_taken")
        );
    }

    #[rstest]
    #[case(json!({ "phone": "12-34" }), "phone")]
    #[case(json!({ "avatarUrl": "not a url" }), "avatarUrl")]
    #[case(json!({ "defaultCurrency": "RUPEES-INR" }), "defaultCurrency")]
    #[actix_web::test]
    async fn malformed_profile_fields_are_rejected(#[case] body: Value, #[case] field: &str) {
        let shop = TestShop::new(Vec::new());
        let app = actix_test::init_service(api_app(shop.state)).await;
        let cookie = login_cookie(&app, "ada@example.com").await;

        let res = put_profile(&app, cookie, body).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(
            body.pointer("/details/field").and_then(Value::as_str),
            Some(field)
        );
    }
}
