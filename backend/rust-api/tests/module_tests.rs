use axum::http::StatusCode;
use disasterprep_api::models::UserRole;
use serde_json::{json, Value};

mod common;

use common::TestApp;

async fn create_quiz(app: &TestApp, token: &str, passing_score: Option<i32>) -> String {
    let (status, module) = app
        .request(
            "POST",
            "/api/v1/modules",
            Some(token),
            Some(json!({
                "title": "Earthquake Safety",
                "description": "Drop, cover and hold on",
                "module_type": "quiz",
                "difficulty_level": "beginner",
                "order_index": 1,
                "passing_score": passing_score
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = module["id"].as_str().unwrap().to_string();

    for (i, (question, correct)) in [("Where do you shelter?", 1), ("What do you grab?", 0)]
        .into_iter()
        .enumerate()
    {
        let (status, _) = app
            .request(
                "POST",
                &format!("/api/v1/modules/{}/questions", id),
                Some(token),
                Some(json!({
                    "question": question,
                    "options": ["Doorway", "Under a table", "Outside"],
                    "correct_answer": correct,
                    "explanation": "Sturdy furniture protects from falling debris",
                    "order_index": i
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    id
}

#[tokio::test]
async fn test_student_cannot_create_module() {
    let app = common::create_test_app().await;
    let (_, token) = app.login("Sam", UserRole::Student).await;

    let (status, _) = app
        .request(
            "POST",
            "/api/v1/modules",
            Some(&token),
            Some(json!({ "title": "Mine", "module_type": "theory", "order_index": 0 })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_module_rejects_unknown_enum_literal() {
    let app = common::create_test_app().await;
    let (_, token) = app.login("Tess", UserRole::Teacher).await;

    let (status, _) = app
        .request(
            "POST",
            "/api/v1/modules",
            Some(&token),
            Some(json!({ "title": "Odd", "module_type": "podcast", "order_index": 0 })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_students_never_see_answer_keys() {
    let app = common::create_test_app().await;
    let (_, teacher) = app.login("Tess", UserRole::Teacher).await;
    let (_, student) = app.login("Sam", UserRole::Student).await;
    let id = create_quiz(&app, &teacher, Some(50)).await;
    let uri = format!("/api/v1/modules/{}", id);

    let (status, detail) = app.request("GET", &uri, Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    let questions = detail["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert!(questions.iter().all(|q| q.get("correct_answer").is_none()));
    assert!(questions.iter().all(|q| q.get("explanation").is_none()));

    let (_, detail) = app.request("GET", &uri, Some(&teacher), None).await;
    assert_eq!(detail["title"], "Earthquake Safety");
    assert_eq!(detail["questions"][0]["correct_answer"], 1);
}

#[tokio::test]
async fn test_inactive_modules_hidden_from_students() {
    let app = common::create_test_app().await;
    let (_, teacher) = app.login("Tess", UserRole::Teacher).await;
    let (_, student) = app.login("Sam", UserRole::Student).await;
    let id = create_quiz(&app, &teacher, None).await;
    let uri = format!("/api/v1/modules/{}", id);

    let (status, module) = app
        .request("PATCH", &uri, Some(&teacher), Some(json!({ "is_active": false })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(module["is_active"], false);

    let (status, _) = app.request("GET", &uri, Some(&student), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = app
        .request("GET", "/api/v1/modules?include_inactive=true", Some(&student), None)
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 0);

    let (_, listed) = app
        .request("GET", "/api/v1/modules?include_inactive=true", Some(&teacher), None)
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_teacher_edits_only_own_modules() {
    let app = common::create_test_app().await;
    let (_, author) = app.login("Tess", UserRole::Teacher).await;
    let (_, other) = app.login("Tom", UserRole::Teacher).await;
    let (_, admin) = app.login("Ada", UserRole::Admin).await;
    let id = create_quiz(&app, &author, Some(50)).await;
    let uri = format!("/api/v1/modules/{}", id);

    let (status, _) = app
        .request("PATCH", &uri, Some(&other), Some(json!({ "title": "Hijacked" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, module) = app
        .request("PATCH", &uri, Some(&admin), Some(json!({ "passing_score": null })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(module["passing_score"].is_null());

    let (status, _) = app
        .request("PATCH", &uri, Some(&author), Some(json!({ "passing_score": 101 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_question_answer_must_index_options() {
    let app = common::create_test_app().await;
    let (_, teacher) = app.login("Tess", UserRole::Teacher).await;
    let id = create_quiz(&app, &teacher, None).await;

    let (status, _) = app
        .request(
            "POST",
            &format!("/api/v1/modules/{}/questions", id),
            Some(&teacher),
            Some(json!({
                "question": "Pick one",
                "options": ["a", "b"],
                "correct_answer": 2,
                "order_index": 3
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_attempts_track_best_score_and_completion() {
    let app = common::create_test_app().await;
    let (_, teacher) = app.login("Tess", UserRole::Teacher).await;
    let (_, student) = app.login("Sam", UserRole::Student).await;
    let id = create_quiz(&app, &teacher, Some(100)).await;
    let uri = format!("/api/v1/modules/{}/attempts", id);

    let (status, result) = app
        .request("POST", &uri, Some(&student), Some(json!({ "answers": [1] })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["score"], 50);
    assert_eq!(result["passed"], false);
    assert_eq!(result["question_count"], 2);
    assert_eq!(result["feedback"][1]["correct"], false);
    assert_eq!(result["progress"]["is_completed"], false);

    let (_, result) = app
        .request("POST", &uri, Some(&student), Some(json!({ "answers": [1, 0] })))
        .await;
    assert_eq!(result["score"], 100);
    assert_eq!(result["passed"], true);
    assert_eq!(result["progress"]["attempts"], 2);
    assert_eq!(result["progress"]["is_completed"], true);

    let (_, result) = app
        .request("POST", &uri, Some(&student), Some(json!({ "answers": [0, 1] })))
        .await;
    assert_eq!(result["score"], 0);
    assert_eq!(result["progress"]["score"], 100);
    assert_eq!(result["progress"]["is_completed"], true);

    let (status, progress) = app
        .request("GET", "/api/v1/progress", Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows: &Vec<Value> = progress.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["attempts"], 3);
    assert_eq!(rows[0]["module_id"], id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_attempts_keep_one_row_and_count_every_attempt() {
    let app = std::sync::Arc::new(common::create_test_app().await);
    let (_, teacher) = app.login("Tess", UserRole::Teacher).await;
    let (_, student) = app.login("Sam", UserRole::Student).await;
    let id = create_quiz(&app, &teacher, Some(50)).await;
    let uri = format!("/api/v1/modules/{}/attempts", id);

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let app = app.clone();
            let student = student.clone();
            let uri = uri.clone();
            tokio::spawn(async move {
                app.request("POST", &uri, Some(&student), Some(json!({ "answers": [1, 0] })))
                    .await
                    .0
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let (_, progress) = app
        .request("GET", "/api/v1/progress", Some(&student), None)
        .await;
    let rows = progress.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["attempts"], 20);
    assert_eq!(rows[0]["score"], 100);
}

#[tokio::test]
async fn test_attempt_on_missing_module() {
    let app = common::create_test_app().await;
    let (_, student) = app.login("Sam", UserRole::Student).await;

    let (status, _) = app
        .request(
            "POST",
            &format!("/api/v1/modules/{}/attempts", uuid::Uuid::new_v4()),
            Some(&student),
            Some(json!({ "answers": [] })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_modules_filters() {
    let app = common::create_test_app().await;
    let (_, teacher) = app.login("Tess", UserRole::Teacher).await;
    create_quiz(&app, &teacher, None).await;
    let (status, _) = app
        .request(
            "POST",
            "/api/v1/modules",
            Some(&teacher),
            Some(json!({
                "title": "Wildfire Evacuation",
                "module_type": "theory",
                "difficulty_level": "advanced",
                "order_index": 0
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, all) = app.request("GET", "/api/v1/modules", Some(&teacher), None).await;
    let titles: Vec<&str> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Wildfire Evacuation", "Earthquake Safety"]);

    let (_, quizzes) = app
        .request("GET", "/api/v1/modules?module_type=quiz", Some(&teacher), None)
        .await;
    assert_eq!(quizzes.as_array().unwrap().len(), 1);
    assert_eq!(quizzes[0]["module_type"], "quiz");
}
