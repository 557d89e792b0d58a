use crate::config::AppConfig;
use crate::errors::{AssignFlowError, Result as AssignFlowResult};
use crate::models::principals::entities::{Principal, PrincipalRole};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

const ACCESS_TOKEN_TYPE: &str = "access";

// JWT Claims 结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Subject (user ID)
    pub role: String, // 调用者角色
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<i64>, // 学生身份标识，仅学生令牌携带
    pub token_type: String, // token类型，目前只签发 "access"
    pub exp: usize,         // Expiration time (时间戳)
    pub iat: usize,         // Issued at (签发时间)
}

pub struct JwtUtils;

impl JwtUtils {
    // 获取 JWT 密钥
    fn get_secret() -> String {
        AppConfig::get().jwt.secret.clone()
    }

    // 为调用者生成 Access Token
    pub fn generate_access_token(principal: &Principal) -> Result<String, jsonwebtoken::errors::Error> {
        let config = AppConfig::get();
        Self::generate_token_with_expiry(
            principal,
            ACCESS_TOKEN_TYPE,
            chrono::Duration::minutes(config.jwt.access_token_expiry),
        )
    }

    // 生成带自定义过期时间的 Token
    pub fn generate_token_with_expiry(
        principal: &Principal,
        token_type: &str,
        expiry_duration: chrono::Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now();
        let expiration = now + expiry_duration;

        let claims = Claims {
            sub: principal.user_id.to_string(),
            role: principal.role.to_string(),
            student_id: principal.student_id,
            token_type: token_type.to_string(),
            exp: expiration.timestamp().max(0) as usize,
            iat: now.timestamp() as usize,
        };

        let secret = Self::get_secret();
        let encoding_key = EncodingKey::from_secret(secret.as_ref());

        encode(&Header::default(), &claims, &encoding_key)
    }

    // 验证 JWT token
    pub fn verify_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let secret = Self::get_secret();
        let decoding_key = DecodingKey::from_secret(secret.as_ref());
        let validation = Validation::default();

        decode::<Claims>(token, &decoding_key, &validation).map(|token_data| token_data.claims)
    }

    // 验证 Access Token
    pub fn verify_access_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let claims = Self::verify_token(token)?;
        if claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(jsonwebtoken::errors::Error::from(
                jsonwebtoken::errors::ErrorKind::InvalidToken,
            ));
        }
        Ok(claims)
    }

    /// 将已验证的 Claims 转换为调用者身份
    ///
    /// 学生令牌必须携带 `student_id`，否则视为无效令牌。
    pub fn principal_from_claims(claims: &Claims) -> AssignFlowResult<Principal> {
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AssignFlowError::authentication("Invalid user ID in JWT"))?;
        let role = claims.role.parse::<PrincipalRole>().map_err(|_| {
            AssignFlowError::authentication(format!("Unknown role in JWT: {}", claims.role))
        })?;

        match role {
            PrincipalRole::Student => {
                let student_id = claims.student_id.ok_or_else(|| {
                    AssignFlowError::authentication("Student token carries no student_id")
                })?;
                Ok(Principal::student(user_id, student_id))
            }
            PrincipalRole::Teacher => Ok(Principal::teacher(user_id)),
            PrincipalRole::Principal => Ok(Principal::principal(user_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_round_trips_principal() {
        let principal = Principal::student(7, 70);
        let token = JwtUtils::generate_access_token(&principal).unwrap();

        let claims = JwtUtils::verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, "student");
        assert_eq!(
            JwtUtils::principal_from_claims(&claims).unwrap(),
            principal
        );
    }

    #[test]
    fn test_other_token_types_are_rejected() {
        let token = JwtUtils::generate_token_with_expiry(
            &Principal::teacher(3),
            "refresh",
            chrono::Duration::minutes(5),
        )
        .unwrap();

        assert!(JwtUtils::verify_token(&token).is_ok());
        assert!(JwtUtils::verify_access_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = JwtUtils::generate_token_with_expiry(
            &Principal::teacher(3),
            ACCESS_TOKEN_TYPE,
            chrono::Duration::hours(-2),
        )
        .unwrap();

        assert!(JwtUtils::verify_access_token(&token).is_err());
    }

    #[test]
    fn test_student_claims_require_student_id() {
        let claims = Claims {
            sub: "5".into(),
            role: "student".into(),
            student_id: None,
            token_type: ACCESS_TOKEN_TYPE.into(),
            exp: 0,
            iat: 0,
        };
        let err = JwtUtils::principal_from_claims(&claims).unwrap_err();
        assert!(matches!(err, AssignFlowError::Authentication(_)));
        assert!(err.message().contains("student_id"));

        let bogus_role = Claims {
            role: "janitor".into(),
            ..claims.clone()
        };
        let err = JwtUtils::principal_from_claims(&bogus_role).unwrap_err();
        assert_eq!(err.code(), "E004");

        let bogus_sub = Claims {
            sub: "not-a-number".into(),
            role: "teacher".into(),
            ..claims
        };
        assert!(matches!(
            JwtUtils::principal_from_claims(&bogus_sub),
            Err(AssignFlowError::Authentication(_))
        ));
    }
}
