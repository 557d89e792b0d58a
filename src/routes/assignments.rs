use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, dev::HttpServiceFactory, web};
use once_cell::sync::Lazy;

use crate::middlewares::{self, RequireJWT};
use crate::models::assignments::requests::{
    GradeAssignmentRequest, SubmitAssignmentRequest, UpsertAssignmentRequest,
};
use crate::models::principals::entities::PrincipalRole;
use crate::services::AssignmentService;

// 懒加载的全局 AssignmentService 实例
static ASSIGNMENT_SERVICE: Lazy<AssignmentService> = Lazy::new(AssignmentService::new_lazy);

// 学生：列出自己的作业
pub async fn list_student_assignments(req: HttpRequest) -> ActixResult<HttpResponse> {
    ASSIGNMENT_SERVICE.list_student_assignments(&req).await
}

// 学生：创建或编辑草稿
pub async fn save_draft(
    req: HttpRequest,
    body: web::Json<UpsertAssignmentRequest>,
) -> ActixResult<HttpResponse> {
    ASSIGNMENT_SERVICE.save_draft(&req, body.into_inner()).await
}

// 学生：提交作业
pub async fn submit_assignment(
    req: HttpRequest,
    body: web::Json<SubmitAssignmentRequest>,
) -> ActixResult<HttpResponse> {
    ASSIGNMENT_SERVICE
        .submit_assignment(&req, body.into_inner())
        .await
}

// 教师/校长：列出分配给自己的作业
pub async fn list_teacher_assignments(req: HttpRequest) -> ActixResult<HttpResponse> {
    ASSIGNMENT_SERVICE.list_teacher_assignments(&req).await
}

// 教师/校长：评分
pub async fn grade_assignment(
    req: HttpRequest,
    body: web::Json<GradeAssignmentRequest>,
) -> ActixResult<HttpResponse> {
    ASSIGNMENT_SERVICE
        .grade_assignment(&req, body.into_inner())
        .await
}

// 教师/校长：重新评分
pub async fn regrade_assignment(
    req: HttpRequest,
    body: web::Json<GradeAssignmentRequest>,
) -> ActixResult<HttpResponse> {
    ASSIGNMENT_SERVICE
        .regrade_assignment(&req, body.into_inner())
        .await
}

// 评分端的路由在教师与校长两个前缀下完全一致
fn grader_scope(path: &str, roles: &[&PrincipalRole]) -> impl HttpServiceFactory + use<> {
    web::scope(path)
        .wrap(middlewares::RequireJWT)
        .service(
            web::resource("")
                .route(web::get().to(list_teacher_assignments))
                .wrap(middlewares::RequireRole::new_any(roles)),
        )
        .service(
            web::resource("/grade")
                .route(web::post().to(grade_assignment))
                .wrap(middlewares::RequireRole::new_any(roles)),
        )
        .service(
            web::resource("/regrade")
                .route(web::post().to(regrade_assignment))
                .wrap(middlewares::RequireRole::new_any(roles)),
        )
}

// 配置路由
pub fn configure_assignment_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/student/assignments")
            .wrap(RequireJWT)
            .service(
                web::resource("")
                    .route(web::get().to(list_student_assignments))
                    .route(web::post().to(save_draft))
                    .wrap(middlewares::RequireRole::new_any(
                        PrincipalRole::student_roles(),
                    )),
            )
            .service(
                web::resource("/submit")
                    .route(web::post().to(submit_assignment))
                    .wrap(middlewares::RequireRole::new_any(
                        PrincipalRole::student_roles(),
                    )),
            ),
    )
    .service(grader_scope(
        "/api/v1/teacher/assignments",
        PrincipalRole::teacher_roles(),
    ))
    .service(grader_scope(
        "/api/v1/principal/assignments",
        PrincipalRole::principal_roles(),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::models::principals::entities::Principal;
    use crate::storage::{Storage, create_storage};
    use crate::utils::{json_error_handler, jwt::JwtUtils};
    use actix_web::{App, http::StatusCode, test};
    use serde_json::{Value, json};
    use std::sync::Arc;

    async fn storage() -> Arc<dyn Storage> {
        create_storage(&DatabaseConfig {
            url: ":memory:".to_string(),
            pool_size: 1,
            timeout: 5,
        })
        .await
        .expect("in-memory storage")
    }

    fn bearer(principal: &Principal) -> (&'static str, String) {
        let token = JwtUtils::generate_access_token(principal).unwrap();
        ("Authorization", format!("Bearer {token}"))
    }

    macro_rules! app {
        ($storage:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                    .app_data(web::Data::new($storage))
                    .configure(configure_assignment_routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_lifecycle_over_http() {
        let app = app!(storage().await);
        let student = Principal::student(11, 1);
        let teacher = Principal::teacher(101);

        let req = test::TestRequest::post()
            .uri("/api/v1/student/assignments")
            .insert_header(bearer(&student))
            .set_json(json!({ "content": "hello" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["state"], "DRAFT");
        let id = body["data"]["id"].as_i64().unwrap();

        let req = test::TestRequest::post()
            .uri("/api/v1/student/assignments/submit")
            .insert_header(bearer(&student))
            .set_json(json!({ "id": id, "teacher_id": 101 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["state"], "SUBMITTED");
        assert_eq!(body["data"]["teacher_id"], 101);

        let req = test::TestRequest::post()
            .uri("/api/v1/teacher/assignments/grade")
            .insert_header(bearer(&teacher))
            .set_json(json!({ "id": id, "grade": "A" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["state"], "GRADED");
        assert_eq!(body["data"]["grade"], "A");

        let req = test::TestRequest::post()
            .uri("/api/v1/teacher/assignments/regrade")
            .insert_header(bearer(&teacher))
            .set_json(json!({ "id": id, "grade": "B" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["grade"], "B");

        let req = test::TestRequest::get()
            .uri("/api/v1/teacher/assignments")
            .insert_header(bearer(&teacher))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::get()
            .uri("/api/v1/student/assignments")
            .insert_header(bearer(&student))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["grade"], "B");
    }

    #[actix_web::test]
    async fn test_missing_token_is_unauthorized() {
        let app = app!(storage().await);
        let req = test::TestRequest::get()
            .uri("/api/v1/student/assignments")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], 1001);
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .contains("Missing or invalid Authorization header")
        );

        let req = test::TestRequest::get()
            .uri("/api/v1/teacher/assignments")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Unauthorized: Invalid JWT token");
    }

    #[actix_web::test]
    async fn test_role_gates_scopes() {
        let app = app!(storage().await);

        let req = test::TestRequest::get()
            .uri("/api/v1/student/assignments")
            .insert_header(bearer(&Principal::teacher(101)))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );

        let req = test::TestRequest::get()
            .uri("/api/v1/principal/assignments")
            .insert_header(bearer(&Principal::teacher(101)))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );

        let req = test::TestRequest::get()
            .uri("/api/v1/principal/assignments")
            .insert_header(bearer(&Principal::principal(900)))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::OK
        );
    }

    #[actix_web::test]
    async fn test_lifecycle_errors_map_to_status_and_code() {
        let app = app!(storage().await);
        let student = Principal::student(11, 1);

        // null content
        let req = test::TestRequest::post()
            .uri("/api/v1/student/assignments")
            .insert_header(bearer(&student))
            .set_json(json!({ "content": null }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], 3003);

        // 不存在的作业
        let req = test::TestRequest::post()
            .uri("/api/v1/teacher/assignments/grade")
            .insert_header(bearer(&Principal::teacher(101)))
            .set_json(json!({ "id": 404, "grade": "A" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], 3000);

        // 草稿不能评分
        let req = test::TestRequest::post()
            .uri("/api/v1/student/assignments")
            .insert_header(bearer(&student))
            .set_json(json!({ "content": "x" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let id = body["data"]["id"].as_i64().unwrap();

        let req = test::TestRequest::post()
            .uri("/api/v1/teacher/assignments/grade")
            .insert_header(bearer(&Principal::teacher(101)))
            .set_json(json!({ "id": id, "grade": "A" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], 3001);

        // 他人评分
        let req = test::TestRequest::post()
            .uri("/api/v1/student/assignments/submit")
            .insert_header(bearer(&student))
            .set_json(json!({ "id": id, "teacher_id": 101 }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::OK
        );

        let req = test::TestRequest::post()
            .uri("/api/v1/teacher/assignments/grade")
            .insert_header(bearer(&Principal::teacher(102)))
            .set_json(json!({ "id": id, "grade": "A" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], 3002);
    }

    #[actix_web::test]
    async fn test_unknown_grade_is_rejected_as_invalid_input() {
        let app = app!(storage().await);
        let req = test::TestRequest::post()
            .uri("/api/v1/teacher/assignments/grade")
            .insert_header(bearer(&Principal::teacher(101)))
            .set_json(json!({ "id": 1, "grade": "E" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], 3003);
    }
}
