use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;

use crate::error::ApiError;
use crate::settings::Settings;

pub fn verify_token(
    settings: &Settings,
    auth: Option<Authorization<Bearer>>,
    query_token: Option<&str>,
) -> Result<(), ApiError> {
    let provided_token = auth
        .map(|a| a.token().to_string())
        .or_else(|| query_token.map(|s| s.to_string()));
    match provided_token {
        Some(token) if token == settings.auth_token => Ok(()),
        _ => Err(ApiError::Unauthorized(
            "Invalid authentication token".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;

    fn test_settings() -> Settings {
        Settings {
            data_file: "classes.json".into(),
            timezone: chrono_tz::Asia::Seoul,
            debug: false,
            auth_token: "secret".to_string(),
            enable_swagger: true,
            port: 8080,
            discord_api_base: Url::parse("https://discord.com/api/v10").unwrap(),
            discord_bot_token: "bot-token".to_string(),
        }
    }

    #[test]
    fn test_verify_token_header() {
        let auth = Authorization::bearer("secret").unwrap();
        assert!(verify_token(&test_settings(), Some(auth), None).is_ok());
    }

    #[test]
    fn test_verify_token_query() {
        let settings = test_settings();
        assert!(verify_token(&settings, None, Some("secret")).is_ok());
        assert!(verify_token(&settings, None, Some("bad")).is_err());
        assert!(verify_token(&settings, None, None).is_err());
    }
}
