/*!
 * 基于角色的访问控制中间件
 *
 * 必须在 RequireJWT 之后使用：
 *
 * ```rust,ignore
 * web::scope("/api/v1/teacher")
 *     .wrap(RequireRole::new_any(PrincipalRole::teacher_roles()))
 *     .wrap(RequireJWT)
 * ```
 *
 * actix 中后注册的 wrap 先执行，因此 RequireJWT 写在最后。
 */

use actix_service::{Service, Transform};
use actix_web::{
    Error,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use tracing::info;

use crate::{
    middlewares::RequireJWT,
    models::{ErrorCode, principals::entities::PrincipalRole},
};

use super::create_error_response;

#[derive(Clone)]
pub struct RequireRole {
    required_roles: Vec<PrincipalRole>,
}

impl RequireRole {
    /// 创建需要任一角色的中间件
    pub fn new_any(roles: &[&PrincipalRole]) -> Self {
        Self {
            required_roles: roles.iter().map(|r| **r).collect(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireRoleMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireRoleMiddleware {
            service: Rc::new(service),
            required_roles: self.required_roles.clone(),
        }))
    }
}

pub struct RequireRoleMiddleware<S> {
    service: Rc<S>,
    required_roles: Vec<PrincipalRole>,
}

impl<S, B> Service<ServiceRequest> for RequireRoleMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let required_roles = self.required_roles.clone();

        Box::pin(async move {
            let Some(principal) = RequireJWT::extract_principal(req.request()) else {
                info!(
                    "Role check failed: no principal found in request. Make sure RequireJWT middleware is applied first."
                );
                return Ok(req.into_response(
                    create_error_response(
                        StatusCode::UNAUTHORIZED,
                        ErrorCode::Unauthorized,
                        "Authentication required",
                    )
                    .map_into_right_body(),
                ));
            };

            if required_roles.contains(&principal.role) {
                let res = srv.call(req).await?.map_into_left_body();
                return Ok(res);
            }

            info!(
                "Access denied for user {} (role: {}). Required roles: {:?}",
                principal.user_id, principal.role, required_roles
            );
            Ok(req.into_response(
                create_error_response(
                    StatusCode::FORBIDDEN,
                    ErrorCode::Forbidden,
                    "Access denied.",
                )
                .map_into_right_body(),
            ))
        })
    }
}
