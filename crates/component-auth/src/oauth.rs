//! Web login on behalf of an authorizer
//!
//! Flow for an official account that authorized this platform:
//! 1. Send the user to [`build_oauth_url`] (browser redirect, no network call here)
//! 2. WeChat redirects back with `code`; exchange it via [`OAuthAccessToken`]
//! 3. Keep the user token fresh with [`RefreshOAuthToken`]
//! 4. Read the profile with [`fetch_user_info`] (`snsapi_userinfo` scope only)
//!
//! Steps 2 and 3 need the platform credential and run through the
//! dispatcher. Step 4 is authenticated by the user token alone.

use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::constants::{
    COMPONENT_LOGIN_PAGE_URL, DEFAULT_OAUTH_SCOPE, OAUTH_ACCESS_TOKEN_PATH, OAUTH_AUTHORIZE_URL,
    OAUTH_REDIRECT_FRAGMENT, OAUTH_REFRESH_TOKEN_PATH, USER_INFO_PATH,
};
use crate::dispatch::{AuthenticatedOperation, CallContext};
use crate::error::Result;
use crate::store::BoxFuture;

/// Build the authorize URL for web login on behalf of `appid`.
///
/// `scope` defaults to `snsapi_base`. `state` is returned unchanged to the
/// redirect target and may be empty.
pub fn build_oauth_url(
    component_appid: &str,
    appid: &str,
    redirect_uri: &str,
    state: &str,
    scope: Option<&str>,
) -> String {
    let mut url = reqwest::Url::parse_with_params(
        OAUTH_AUTHORIZE_URL,
        &[
            ("appid", appid),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.unwrap_or(DEFAULT_OAUTH_SCOPE)),
            ("state", state),
            ("component_appid", component_appid),
        ],
    )
    .expect("authorize endpoint constant is a valid URL");
    url.set_fragment(Some(OAUTH_REDIRECT_FRAGMENT));
    url.into()
}

/// Build the page where an account administrator authorizes this platform.
pub fn build_login_page_url(
    component_appid: &str,
    pre_auth_code: &str,
    redirect_uri: &str,
) -> String {
    reqwest::Url::parse_with_params(
        COMPONENT_LOGIN_PAGE_URL,
        &[
            ("component_appid", component_appid),
            ("pre_auth_code", pre_auth_code),
            ("redirect_uri", redirect_uri),
        ],
    )
    .expect("login page constant is a valid URL")
    .into()
}

/// User token issued by web login.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub expires_in: u64,
    pub refresh_token: String,
    pub openid: String,
    pub scope: String,
}

/// Profile returned by `/sns/userinfo`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserInfo {
    pub openid: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub sex: u8,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub headimgurl: String,
    #[serde(default)]
    pub privilege: Vec<String>,
    /// Present only when the account is bound to an Open Platform account
    #[serde(default)]
    pub unionid: Option<String>,
}

/// Exchange a web-login `code` for a user token.
#[derive(Debug, Clone)]
pub struct OAuthAccessToken {
    pub appid: String,
    pub code: String,
}

impl AuthenticatedOperation for OAuthAccessToken {
    type Output = OAuthToken;

    fn name(&self) -> &'static str {
        "oauth_access_token"
    }

    fn execute<'a>(&'a self, ctx: CallContext<'a>) -> BoxFuture<'a, Result<OAuthToken>> {
        Box::pin(async move {
            ctx.api
                .get_json(
                    OAUTH_ACCESS_TOKEN_PATH,
                    &[
                        ("appid", self.appid.as_str()),
                        ("code", self.code.as_str()),
                        ("grant_type", "authorization_code"),
                        ("component_appid", ctx.component_appid),
                        ctx.token_query(),
                    ],
                )
                .await
        })
    }
}

/// Refresh a web-login user token.
#[derive(Debug, Clone)]
pub struct RefreshOAuthToken {
    pub appid: String,
    pub refresh_token: String,
}

impl AuthenticatedOperation for RefreshOAuthToken {
    type Output = OAuthToken;

    fn name(&self) -> &'static str {
        "refresh_oauth_token"
    }

    fn execute<'a>(&'a self, ctx: CallContext<'a>) -> BoxFuture<'a, Result<OAuthToken>> {
        Box::pin(async move {
            ctx.api
                .get_json(
                    OAUTH_REFRESH_TOKEN_PATH,
                    &[
                        ("appid", self.appid.as_str()),
                        ("grant_type", "refresh_token"),
                        ("component_appid", ctx.component_appid),
                        ctx.token_query(),
                        ("refresh_token", self.refresh_token.as_str()),
                    ],
                )
                .await
        })
    }
}

/// Fetch the user's profile with a web-login user token.
///
/// `lang` is one of `zh_CN`, `zh_TW`, `en`.
pub async fn fetch_user_info(
    api: &ApiClient,
    access_token: &str,
    openid: &str,
    lang: &str,
) -> Result<UserInfo> {
    api.get_json(
        USER_INFO_PATH,
        &[
            ("access_token", access_token),
            ("openid", openid),
            ("lang", lang),
        ],
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::ComponentToken;
    use crate::testing::spawn_mock;
    use axum::Json;
    use axum::extract::Query;
    use axum::routing::get;
    use serde_json::{Value, json};
    use std::collections::HashMap;

    fn query_of(url: &str) -> HashMap<String, String> {
        reqwest::Url::parse(url)
            .unwrap()
            .query_pairs()
            .into_owned()
            .collect()
    }

    #[test]
    fn oauth_url_defaults_to_base_scope() {
        let url = build_oauth_url("wx_component", "A", "http://example.com", "", None);
        let query = query_of(&url);

        assert!(url.starts_with(OAUTH_AUTHORIZE_URL));
        assert!(url.ends_with("#wechat_redirect"), "got: {url}");
        assert_eq!(query["scope"], "snsapi_base");
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["appid"], "A");
        assert_eq!(query["redirect_uri"], "http://example.com");
        assert_eq!(query["state"], "");
        assert_eq!(query["component_appid"], "wx_component");
    }

    #[test]
    fn oauth_url_encodes_redirect_and_keeps_scope() {
        let url = build_oauth_url(
            "wx_component",
            "A",
            "https://example.com/cb?next=/home",
            "xyz",
            Some("snsapi_userinfo"),
        );
        assert!(url.contains("redirect_uri=https%3A%2F%2Fexample.com%2Fcb%3Fnext%3D%2Fhome"));
        assert!(url.contains("scope=snsapi_userinfo"));
        assert!(url.contains("state=xyz"));
    }

    #[test]
    fn login_page_url_contains_pre_auth_code() {
        let url = build_login_page_url("wx_component", "pac_1", "https://example.com/authorized");
        let query = query_of(&url);
        assert!(url.starts_with(COMPONENT_LOGIN_PAGE_URL));
        assert_eq!(query["pre_auth_code"], "pac_1");
        assert_eq!(query["redirect_uri"], "https://example.com/authorized");
    }

    fn oauth_token_reply(query: &HashMap<String, String>) -> Json<Value> {
        let grant_type = query.get("grant_type").cloned().unwrap_or_default();
        Json(json!({
            "access_token": format!("user_{grant_type}"),
            "expires_in": 7200,
            "refresh_token": "user_refresh",
            "openid": "openid_1",
            "scope": "snsapi_userinfo",
            "echo": query,
        }))
    }

    async fn run<O: AuthenticatedOperation>(app: axum::Router, op: &O) -> Result<O::Output> {
        let (base, _handle) = spawn_mock(app).await;
        let api = ApiClient::with_base_url(reqwest::Client::new(), base);
        let token = ComponentToken::new("T1", u64::MAX);
        op.execute(CallContext {
            api: &api,
            component_appid: "wx_component",
            token: &token,
        })
        .await
    }

    #[tokio::test]
    async fn access_token_exchange_sends_component_credential() {
        let app = axum::Router::new().route(
            OAUTH_ACCESS_TOKEN_PATH,
            get(|Query(query): Query<HashMap<String, String>>| async move {
                assert_eq!(query["appid"], "wx_authorizer");
                assert_eq!(query["code"], "login_code");
                assert_eq!(query["component_appid"], "wx_component");
                assert_eq!(query["component_access_token"], "T1");
                oauth_token_reply(&query)
            }),
        );
        let op = OAuthAccessToken {
            appid: "wx_authorizer".into(),
            code: "login_code".into(),
        };

        let token = run(app, &op).await.unwrap();
        assert_eq!(token.access_token, "user_authorization_code");
        assert_eq!(token.openid, "openid_1");
    }

    #[tokio::test]
    async fn refresh_sends_refresh_token() {
        let app = axum::Router::new().route(
            OAUTH_REFRESH_TOKEN_PATH,
            get(|Query(query): Query<HashMap<String, String>>| async move {
                assert_eq!(query["refresh_token"], "user_refresh");
                assert_eq!(query["component_access_token"], "T1");
                oauth_token_reply(&query)
            }),
        );
        let op = RefreshOAuthToken {
            appid: "wx_authorizer".into(),
            refresh_token: "user_refresh".into(),
        };

        let token = run(app, &op).await.unwrap();
        assert_eq!(token.access_token, "user_refresh_token");
    }

    #[tokio::test]
    async fn user_info_uses_user_token() {
        let app = axum::Router::new().route(
            USER_INFO_PATH,
            get(|Query(query): Query<HashMap<String, String>>| async move {
                assert_eq!(query["access_token"], "user_access");
                assert!(!query.contains_key("component_access_token"));
                Json(json!({
                    "openid": query["openid"],
                    "nickname": "Band",
                    "sex": 1,
                    "privilege": ["PRIVILEGE1"],
                }))
            }),
        );
        let (base, _handle) = spawn_mock(app).await;
        let api = ApiClient::with_base_url(reqwest::Client::new(), base);

        let info = fetch_user_info(&api, "user_access", "openid_1", "zh_CN")
            .await
            .unwrap();
        assert_eq!(info.openid, "openid_1");
        assert_eq!(info.nickname, "Band");
        assert_eq!(info.privilege, vec!["PRIVILEGE1"]);
        assert!(info.unionid.is_none());
    }
}
