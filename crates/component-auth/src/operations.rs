//! Authorizer management operations
//!
//! Each operation is a plain value implementing [`AuthenticatedOperation`]:
//! one POST to a `/cgi-bin/component/*` endpoint with the platform credential
//! in the query string and a JSON body naming the platform and authorizer.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::constants::{
    AUTHORIZER_INFO_PATH, AUTHORIZER_TOKEN_PATH, GET_AUTHORIZER_OPTION_PATH, PRE_AUTH_CODE_PATH,
    QUERY_AUTH_PATH, SET_AUTHORIZER_OPTION_PATH,
};
use crate::dispatch::{AuthenticatedOperation, CallContext};
use crate::error::Result;
use crate::store::BoxFuture;

/// One-time code that starts the authorization page flow.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreAuthCode {
    pub pre_auth_code: String,
    /// Seconds until the code expires; callers must check it themselves.
    pub expires_in: u64,
}

/// Per-application credentials returned after an authorization.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorizationInfo {
    pub authorizer_appid: String,
    pub authorizer_access_token: String,
    pub expires_in: u64,
    pub authorizer_refresh_token: String,
    /// Permission sets granted by the authorizer, kept as raw JSON
    #[serde(default)]
    pub func_info: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryAuthResponse {
    pub authorization_info: AuthorizationInfo,
}

/// Refreshed per-application credential pair.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorizerToken {
    pub authorizer_access_token: String,
    pub expires_in: u64,
    pub authorizer_refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthorizerOptionValue {
    pub authorizer_appid: String,
    pub option_name: String,
    pub option_value: String,
}

fn post<'a, T>(ctx: CallContext<'a>, path: &'a str, body: Value) -> BoxFuture<'a, Result<T>>
where
    T: serde::de::DeserializeOwned + Send + 'a,
{
    Box::pin(async move { ctx.api.post_json(path, &[ctx.token_query()], &body).await })
}

/// `api_create_preauthcode`
#[derive(Debug, Clone, Default)]
pub struct CreatePreAuthCode;

impl AuthenticatedOperation for CreatePreAuthCode {
    type Output = PreAuthCode;

    fn name(&self) -> &'static str {
        "create_pre_auth_code"
    }

    fn execute<'a>(&'a self, ctx: CallContext<'a>) -> BoxFuture<'a, Result<PreAuthCode>> {
        post(
            ctx,
            PRE_AUTH_CODE_PATH,
            json!({ "component_appid": ctx.component_appid }),
        )
    }
}

/// `api_query_auth`: exchange an authorization code for the authorizer's
/// credentials. Call once, from the authorization callback.
#[derive(Debug, Clone)]
pub struct QueryAuth {
    pub authorization_code: String,
}

impl AuthenticatedOperation for QueryAuth {
    type Output = QueryAuthResponse;

    fn name(&self) -> &'static str {
        "query_auth"
    }

    fn execute<'a>(&'a self, ctx: CallContext<'a>) -> BoxFuture<'a, Result<QueryAuthResponse>> {
        post(
            ctx,
            QUERY_AUTH_PATH,
            json!({
                "component_appid": ctx.component_appid,
                "authorization_code": self.authorization_code,
            }),
        )
    }
}

/// `api_authorizer_token`
#[derive(Debug, Clone)]
pub struct RefreshAuthorizerToken {
    pub authorizer_appid: String,
    pub authorizer_refresh_token: String,
}

impl AuthenticatedOperation for RefreshAuthorizerToken {
    type Output = AuthorizerToken;

    fn name(&self) -> &'static str {
        "refresh_authorizer_token"
    }

    fn execute<'a>(&'a self, ctx: CallContext<'a>) -> BoxFuture<'a, Result<AuthorizerToken>> {
        post(
            ctx,
            AUTHORIZER_TOKEN_PATH,
            json!({
                "component_appid": ctx.component_appid,
                "authorizer_appid": self.authorizer_appid,
                "authorizer_refresh_token": self.authorizer_refresh_token,
            }),
        )
    }
}

/// `api_get_authorizer_info`. The payload (account profile plus granted
/// permissions) is returned as raw JSON.
#[derive(Debug, Clone)]
pub struct GetAuthorizerInfo {
    pub authorizer_appid: String,
}

impl AuthenticatedOperation for GetAuthorizerInfo {
    type Output = Value;

    fn name(&self) -> &'static str {
        "get_authorizer_info"
    }

    fn execute<'a>(&'a self, ctx: CallContext<'a>) -> BoxFuture<'a, Result<Value>> {
        post(
            ctx,
            AUTHORIZER_INFO_PATH,
            json!({
                "component_appid": ctx.component_appid,
                "authorizer_appid": self.authorizer_appid,
            }),
        )
    }
}

/// `api_get_authorizer_option` (e.g. `location_report`, `voice_recognize`)
#[derive(Debug, Clone)]
pub struct GetAuthorizerOption {
    pub authorizer_appid: String,
    pub option_name: String,
}

impl AuthenticatedOperation for GetAuthorizerOption {
    type Output = AuthorizerOptionValue;

    fn name(&self) -> &'static str {
        "get_authorizer_option"
    }

    fn execute<'a>(&'a self, ctx: CallContext<'a>) -> BoxFuture<'a, Result<AuthorizerOptionValue>> {
        post(
            ctx,
            GET_AUTHORIZER_OPTION_PATH,
            json!({
                "component_appid": ctx.component_appid,
                "authorizer_appid": self.authorizer_appid,
                "option_name": self.option_name,
            }),
        )
    }
}

/// `api_set_authorizer_option`
#[derive(Debug, Clone)]
pub struct SetAuthorizerOption {
    pub authorizer_appid: String,
    pub option_name: String,
    pub option_value: String,
}

impl AuthenticatedOperation for SetAuthorizerOption {
    type Output = ();

    fn name(&self) -> &'static str {
        "set_authorizer_option"
    }

    fn execute<'a>(&'a self, ctx: CallContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let body = json!({
                "component_appid": ctx.component_appid,
                "authorizer_appid": self.authorizer_appid,
                "option_name": self.option_name,
                "option_value": self.option_value,
            });
            let _: IgnoredAny = ctx
                .api
                .post_json(SET_AUTHORIZER_OPTION_PATH, &[ctx.token_query()], &body)
                .await?;
            Ok(())
        })
    }
}
