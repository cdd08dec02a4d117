//! WeChat Open Platform endpoint constants
//!
//! Paths are relative to the API base (`DEFAULT_API_BASE` in production,
//! a local mock server in tests). The authorize and login-page URLs are
//! absolute because they are opened by a browser, never called by us.

/// Production API host for all server-to-server calls
pub const DEFAULT_API_BASE: &str = "https://api.weixin.qq.com";

/// Issues the platform-level `component_access_token`
pub const COMPONENT_TOKEN_PATH: &str = "/cgi-bin/component/api_component_token";

pub const PRE_AUTH_CODE_PATH: &str = "/cgi-bin/component/api_create_preauthcode";
pub const QUERY_AUTH_PATH: &str = "/cgi-bin/component/api_query_auth";
pub const AUTHORIZER_TOKEN_PATH: &str = "/cgi-bin/component/api_authorizer_token";
pub const AUTHORIZER_INFO_PATH: &str = "/cgi-bin/component/api_get_authorizer_info";
pub const GET_AUTHORIZER_OPTION_PATH: &str = "/cgi-bin/component/api_get_authorizer_option";
pub const SET_AUTHORIZER_OPTION_PATH: &str = "/cgi-bin/component/api_set_authorizer_option";

/// Web-login (OAuth on behalf of an authorizer) token endpoints
pub const OAUTH_ACCESS_TOKEN_PATH: &str = "/sns/oauth2/component/access_token";
pub const OAUTH_REFRESH_TOKEN_PATH: &str = "/sns/oauth2/component/refresh_token";

/// User profile, authenticated by the user's web-login token
pub const USER_INFO_PATH: &str = "/sns/userinfo";

/// Browser-facing authorize endpoint for web login
pub const OAUTH_AUTHORIZE_URL: &str = "https://open.weixin.qq.com/connect/oauth2/authorize";

/// Fragment the authorize page requires at the end of the URL
pub const OAUTH_REDIRECT_FRAGMENT: &str = "wechat_redirect";

/// Scope used when the caller does not pick one (silent, openid only)
pub const DEFAULT_OAUTH_SCOPE: &str = "snsapi_base";

/// Page where an account administrator grants the platform access
pub const COMPONENT_LOGIN_PAGE_URL: &str = "https://mp.weixin.qq.com/cgi-bin/componentloginpage";

/// Remote error code meaning the platform credential was rejected.
pub const STALE_CREDENTIAL_ERRCODE: i64 = 40001;

/// Seconds subtracted from the declared token lifetime to absorb clock
/// skew and network latency.
pub const EXPIRY_SAFETY_MARGIN_SECS: u64 = 100;
