//! High-level client for a third-party platform
//!
//! `ComponentAuth` wires identity, ticket source, and store into a manager
//! and dispatcher, then exposes one method per remote operation. Every
//! method that needs the platform credential goes through the dispatcher.

use std::sync::Arc;

use serde_json::Value;

use crate::api::ApiClient;
use crate::credential::{AppIdentity, ComponentToken};
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::manager::CredentialManager;
use crate::oauth::{
    OAuthAccessToken, OAuthToken, RefreshOAuthToken, UserInfo, build_login_page_url,
    build_oauth_url, fetch_user_info,
};
use crate::operations::{
    AuthorizerOptionValue, AuthorizerToken, CreatePreAuthCode, GetAuthorizerInfo,
    GetAuthorizerOption, PreAuthCode, QueryAuth, QueryAuthResponse, RefreshAuthorizerToken,
    SetAuthorizerOption,
};
use crate::store::CredentialStore;
use crate::ticket::TicketSource;

/// Entry point for an embedding application.
///
/// Cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct ComponentAuth {
    dispatcher: Dispatcher,
}

impl ComponentAuth {
    /// The store is required: with several processes it must be shared
    /// storage, otherwise each process keeps invalidating the others' token.
    pub fn new(
        identity: AppIdentity,
        api: ApiClient,
        tickets: Arc<dyn TicketSource>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let manager = CredentialManager::new(identity, api, tickets, store);
        Self {
            dispatcher: Dispatcher::new(Arc::new(manager)),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn component_appid(&self) -> &str {
        self.dispatcher.manager().identity().appid()
    }

    /// Current platform token, minted if the stored one is missing or expired.
    pub async fn latest_token(&self) -> Result<ComponentToken> {
        self.dispatcher.manager().usable().await
    }

    pub async fn pre_auth_code(&self) -> Result<PreAuthCode> {
        self.dispatcher.dispatch(&CreatePreAuthCode).await
    }

    /// Exchange the `auth_code` from the authorization callback for the
    /// authorizer's credentials.
    pub async fn query_auth(&self, authorization_code: &str) -> Result<QueryAuthResponse> {
        let op = QueryAuth {
            authorization_code: authorization_code.to_owned(),
        };
        self.dispatcher.dispatch(&op).await
    }

    pub async fn refresh_authorizer_token(
        &self,
        authorizer_appid: &str,
        authorizer_refresh_token: &str,
    ) -> Result<AuthorizerToken> {
        let op = RefreshAuthorizerToken {
            authorizer_appid: authorizer_appid.to_owned(),
            authorizer_refresh_token: authorizer_refresh_token.to_owned(),
        };
        self.dispatcher.dispatch(&op).await
    }

    pub async fn authorizer_info(&self, authorizer_appid: &str) -> Result<Value> {
        let op = GetAuthorizerInfo {
            authorizer_appid: authorizer_appid.to_owned(),
        };
        self.dispatcher.dispatch(&op).await
    }

    pub async fn authorizer_option(
        &self,
        authorizer_appid: &str,
        option_name: &str,
    ) -> Result<AuthorizerOptionValue> {
        let op = GetAuthorizerOption {
            authorizer_appid: authorizer_appid.to_owned(),
            option_name: option_name.to_owned(),
        };
        self.dispatcher.dispatch(&op).await
    }

    pub async fn set_authorizer_option(
        &self,
        authorizer_appid: &str,
        option_name: &str,
        option_value: &str,
    ) -> Result<()> {
        let op = SetAuthorizerOption {
            authorizer_appid: authorizer_appid.to_owned(),
            option_name: option_name.to_owned(),
            option_value: option_value.to_owned(),
        };
        self.dispatcher.dispatch(&op).await
    }

    /// Authorization page URL for an account administrator.
    pub fn login_page_url(&self, pre_auth_code: &str, redirect_uri: &str) -> String {
        build_login_page_url(self.component_appid(), pre_auth_code, redirect_uri)
    }

    /// Web-login authorize URL for a user of authorizer `appid`.
    pub fn oauth_url(
        &self,
        appid: &str,
        redirect_uri: &str,
        state: &str,
        scope: Option<&str>,
    ) -> String {
        build_oauth_url(self.component_appid(), appid, redirect_uri, state, scope)
    }

    pub async fn oauth_access_token(&self, appid: &str, code: &str) -> Result<OAuthToken> {
        let op = OAuthAccessToken {
            appid: appid.to_owned(),
            code: code.to_owned(),
        };
        self.dispatcher.dispatch(&op).await
    }

    pub async fn refresh_oauth_token(
        &self,
        appid: &str,
        refresh_token: &str,
    ) -> Result<OAuthToken> {
        let op = RefreshOAuthToken {
            appid: appid.to_owned(),
            refresh_token: refresh_token.to_owned(),
        };
        self.dispatcher.dispatch(&op).await
    }

    pub async fn user_info(
        &self,
        access_token: &str,
        openid: &str,
        lang: &str,
    ) -> Result<UserInfo> {
        fetch_user_info(self.dispatcher.manager().api(), access_token, openid, lang).await
    }
}
