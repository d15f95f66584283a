use crate::error::{AppError, AppResult};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// 身份服务签发的令牌内容
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    #[serde(default)]
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
    pub token_type: String, // "access" or "refresh"
}

#[derive(Clone)]
pub struct JwtService {
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<Claims> {
        let claims = self.verify_token(token)?;

        if claims.token_type != "access" {
            return Err(AppError::AuthError("Invalid access token type".to_string()));
        }

        Ok(claims)
    }
}

#[cfg(test)]
pub(crate) fn sign_for_test(secret: &str, user_id: i64, is_admin: bool, token_type: &str) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        is_admin,
        exp: (now + chrono::Duration::hours(1)).timestamp(),
        iat: now.timestamp(),
        token_type: token_type.to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_access_token_with_admin_flag() {
        let service = JwtService::new("secret");
        let token = sign_for_test("secret", 42, true, "access");
        let claims = service.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert!(claims.is_admin);
    }

    #[test]
    fn rejects_refresh_token_as_access() {
        let service = JwtService::new("secret");
        let token = sign_for_test("secret", 42, false, "refresh");
        assert!(matches!(
            service.verify_access_token(&token),
            Err(AppError::AuthError(_))
        ));
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let service = JwtService::new("secret");
        let token = sign_for_test("other", 42, false, "access");
        assert!(matches!(
            service.verify_access_token(&token),
            Err(AppError::JwtError(_))
        ));
    }

    #[test]
    fn missing_admin_claim_defaults_to_false() {
        use jsonwebtoken::{EncodingKey, Header, encode};
        let now = chrono::Utc::now().timestamp();
        let token = encode(
            &Header::default(),
            &serde_json::json!({
                "sub": "7",
                "exp": now + 3600,
                "iat": now,
                "token_type": "access"
            }),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        let claims = JwtService::new("secret").verify_access_token(&token).unwrap();
        assert!(!claims.is_admin);
    }
}
