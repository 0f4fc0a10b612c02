//! Kakao OAuth authorization-code exchange and profile lookup.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{config::Config, error::IdentityError};

pub const KAKAO_AUTHORIZE_URL: &str = "https://kauth.kakao.com/oauth/authorize";
pub const KAKAO_TOKEN_URL: &str = "https://kauth.kakao.com/oauth/token";
pub const KAKAO_PROFILE_URL: &str = "https://kapi.kakao.com/v2/user/me";
pub const KAKAO_LOGOUT_URL: &str = "https://kapi.kakao.com/v1/user/logout";

#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KakaoProfile {
    pub id: i64,
    #[serde(default)]
    pub properties: Option<ProfileProperties>,
    #[serde(default)]
    pub kakao_account: Option<KakaoAccount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileProperties {
    pub nickname: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KakaoAccount {
    pub email: Option<String>,
}

impl KakaoProfile {
    pub fn nickname(&self) -> Option<&str> {
        self.properties.as_ref()?.nickname.as_deref()
    }

    pub fn profile_image(&self) -> Option<&str> {
        self.properties.as_ref()?.profile_image.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.kakao_account.as_ref()?.email.as_deref()
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Browser-facing URL that starts the authorization-code flow.
    fn authorize_url(&self, redirect_uri: &str) -> Result<String, IdentityError>;

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AccessToken, IdentityError>;

    async fn fetch_profile(&self, access_token: &str) -> Result<KakaoProfile, IdentityError>;

    async fn revoke(&self, access_token: &str) -> Result<(), IdentityError>;
}

#[derive(Serialize)]
struct TokenForm<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    redirect_uri: &'a str,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<&'a str>,
}

#[derive(Deserialize)]
struct ProviderError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

pub struct KakaoClient {
    client: reqwest::Client,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl KakaoClient {
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        Self {
            client,
            client_id: config.kakao_client_id.clone(),
            client_secret: config.kakao_client_secret.clone(),
        }
    }

    fn client_id(&self) -> Result<&str, IdentityError> {
        self.client_id.as_deref().ok_or(IdentityError::MissingClientId)
    }
}

#[async_trait]
impl IdentityProvider for KakaoClient {
    fn authorize_url(&self, redirect_uri: &str) -> Result<String, IdentityError> {
        let url = Url::parse_with_params(
            KAKAO_AUTHORIZE_URL,
            &[
                ("client_id", self.client_id()?),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
            ],
        )?;
        Ok(url.into())
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AccessToken, IdentityError> {
        let form = TokenForm {
            grant_type: "authorization_code",
            client_id: self.client_id()?,
            redirect_uri,
            code,
            client_secret: self.client_secret.as_deref(),
        };
        tracing::debug!(
            redirect_uri,
            has_secret = form.client_secret.is_some(),
            "requesting kakao access token"
        );

        let resp = self.client.post(KAKAO_TOKEN_URL).form(&form).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            log_token_failure(&body, redirect_uri);
            return Err(IdentityError::Status {
                step: "token exchange",
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<KakaoProfile, IdentityError> {
        let resp = self
            .client
            .get(KAKAO_PROFILE_URL)
            .bearer_auth(access_token)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded;charset=utf-8",
            )
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(IdentityError::Status {
                step: "profile fetch",
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(resp.json().await?)
    }

    async fn revoke(&self, access_token: &str) -> Result<(), IdentityError> {
        let resp = self
            .client
            .post(KAKAO_LOGOUT_URL)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(IdentityError::Status {
                step: "logout",
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

fn log_token_failure(body: &str, redirect_uri: &str) {
    let Ok(err) = serde_json::from_str::<ProviderError>(body) else {
        tracing::error!(body, "kakao token exchange failed with unparseable body");
        return;
    };
    let hint = match err.error.as_str() {
        "invalid_client" => "client id or secret rejected; check the kakao developer console",
        "invalid_grant" => "code or redirect uri rejected; the redirect uri must match the registered one",
        _ => "",
    };
    tracing::error!(
        error = %err.error,
        description = err.error_description.as_deref().unwrap_or(""),
        redirect_uri,
        hint,
        "kakao token exchange failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: Option<&str>, secret: Option<&str>) -> KakaoClient {
        KakaoClient {
            client: reqwest::Client::new(),
            client_id: id.map(String::from),
            client_secret: secret.map(String::from),
        }
    }

    #[test]
    fn authorize_url_encodes_redirect_uri() {
        let url = client(Some("abc123"), None)
            .authorize_url("http://localhost:3000/auth/kakao/callback")
            .unwrap();
        assert_eq!(
            url,
            "https://kauth.kakao.com/oauth/authorize?client_id=abc123\
             &redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fkakao%2Fcallback\
             &response_type=code"
        );
    }

    #[test]
    fn authorize_url_requires_client_id() {
        assert!(matches!(
            client(None, None).authorize_url("http://localhost:3000/cb"),
            Err(IdentityError::MissingClientId)
        ));
    }

    #[test]
    fn secret_only_sent_when_configured() {
        let without = serde_json::to_value(TokenForm {
            grant_type: "authorization_code",
            client_id: "id",
            redirect_uri: "http://x/cb",
            code: "c",
            client_secret: None,
        })
        .unwrap();
        assert!(without.get("client_secret").is_none());

        let with = serde_json::to_value(TokenForm {
            grant_type: "authorization_code",
            client_id: "id",
            redirect_uri: "http://x/cb",
            code: "c",
            client_secret: Some("s"),
        })
        .unwrap();
        assert_eq!(with["client_secret"], "s");
    }

    #[test]
    fn profile_accessors_tolerate_missing_sections() {
        let profile: KakaoProfile = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(profile.id, 42);
        assert!(profile.nickname().is_none());
        assert!(profile.email().is_none());

        let profile: KakaoProfile = serde_json::from_str(
            r#"{"id": 7, "properties": {"nickname": "민수"}, "kakao_account": {"email": "m@example.com"}}"#,
        )
        .unwrap();
        assert_eq!(profile.nickname(), Some("민수"));
        assert_eq!(profile.email(), Some("m@example.com"));
    }
}
