/*!
 * JWT 认证中间件
 *
 * 验证 `Authorization: Bearer <token>` 中的访问令牌，并把解析出的调用者身份
 * (`Principal`) 存入请求扩展，供后续中间件与处理程序使用。
 *
 * ## 使用方法
 *
 * ```rust,ignore
 * use actix_web::{web, HttpRequest, HttpResponse, Result};
 * use crate::middlewares::RequireJWT;
 *
 * web::scope("/api").wrap(RequireJWT).route("/me", web::get().to(handler));
 *
 * async fn handler(req: HttpRequest) -> Result<HttpResponse> {
 *     match RequireJWT::extract_principal(&req) {
 *         Some(principal) => Ok(HttpResponse::Ok().json(principal)),
 *         None => Ok(HttpResponse::Unauthorized().finish()),
 *     }
 * }
 * ```
 *
 * ## 认证流程
 *
 * 1. 提取并验证令牌签名、过期时间与令牌类型
 * 2. 将 Claims 转换为 `Principal`；学生令牌缺少 `student_id` 视为无效
 * 3. 任何一步失败都返回 401
 */

use crate::errors::{AssignFlowError, Result};
use crate::models::ErrorCode;
use crate::models::principals::entities::Principal;
use crate::utils::jwt::JwtUtils;
use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use tracing::{debug, info};

use super::create_error_response;

const BEARER_PREFIX: &str = "Bearer ";
const AUTHORIZATION_HEADER: &str = "Authorization";

#[derive(Clone)]
pub struct RequireJWT;

// 辅助函数：提取并验证 JWT access token
fn extract_and_validate_jwt(req: &ServiceRequest) -> Result<Principal> {
    let token = req
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix(BEARER_PREFIX))
        .ok_or_else(|| {
            AssignFlowError::authentication("Missing or invalid Authorization header")
        })?;

    let claims = JwtUtils::verify_access_token(token).map_err(|err| {
        info!("JWT token validation failed: {}", err);
        AssignFlowError::authentication("Invalid JWT token")
    })?;

    JwtUtils::principal_from_claims(&claims)
}

impl<S, B> Transform<S, ServiceRequest> for RequireJWT
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireJWTMiddleware<S>;
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireJWTMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireJWTMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireJWTMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        Box::pin(async move {
            // 处理 OPTIONS 请求
            if req.method() == actix_web::http::Method::OPTIONS {
                return Ok(req.into_response(
                    create_error_response(StatusCode::NO_CONTENT, ErrorCode::Success, "")
                        .map_into_right_body(),
                ));
            }

            match extract_and_validate_jwt(&req) {
                Ok(principal) => {
                    debug!(
                        "JWT authentication successful for {} {}",
                        principal.role, principal.user_id
                    );
                    req.extensions_mut().insert(principal);
                    let res = srv.call(req).await?.map_into_left_body();
                    Ok(res)
                }
                Err(err) => {
                    info!(
                        "JWT authentication failed for request to {}: {}",
                        req.path(),
                        err.format_simple()
                    );
                    Ok(req.into_response(
                        create_error_response(
                            StatusCode::UNAUTHORIZED,
                            ErrorCode::Unauthorized,
                            &format!("Unauthorized: {}", err.message()),
                        )
                        .map_into_right_body(),
                    ))
                }
            }
        })
    }
}

// 辅助函数：从请求中提取调用者信息
impl RequireJWT {
    /// 从请求扩展中提取调用者身份
    /// 此函数应该在应用了RequireJWT中间件的路由处理程序中使用
    pub fn extract_principal(req: &actix_web::HttpRequest) -> Option<Principal> {
        req.extensions().get::<Principal>().cloned()
    }
}
