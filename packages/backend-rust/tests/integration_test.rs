mod common;

use axum::http::{header, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;

use common::{app_without_db, TestApp, FAKE_MP3, OPENING_LINE};
use tutor_backend_rust::db::operations as ops;
use tutor_backend_rust::domain::Role;

#[tokio::test]
async fn root_and_health_endpoints_respond() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["endpoints"]["startSession"], "/api/session/start");

    let (status, body) = app.get("/api/test").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Backend is running!");

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");

    let (status, body) = app.get("/health/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.get("/health/info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["llmConfigured"], true);
    assert_eq!(body["nativeLanguage"], "Czech");
}

#[tokio::test]
async fn unknown_routes_get_json_404() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/nothing-here").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Endpoint not found");
}

#[tokio::test]
async fn start_creates_one_lesson_with_one_opening_message() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/session/start",
            json!({ "level": "b1", "scenario": "airport", "username": "anna" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], OPENING_LINE);
    assert_eq!(body["level"], "B1");
    assert_eq!(body["scenario"], "airport");

    let session_id: i64 = body["sessionId"].as_str().unwrap().parse().unwrap();
    let pool = app.db.pool();
    let user = ops::find_user_by_username(pool, "anna").await.unwrap().unwrap();
    assert_eq!(body["userId"], user.id);

    let lessons = ops::list_user_lessons(pool, user.id, 10).await.unwrap();
    assert_eq!(lessons.len(), 1);
    assert_eq!(lessons[0].id, session_id);
    assert!(!lessons[0].is_ended());

    let messages = ops::list_lesson_messages(pool, session_id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::Assistant);
    assert_eq!(messages[0].content, OPENING_LINE);

    let requests = app.llm.all();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["model"], "gpt-3.5-turbo");
    assert!(requests[0]["messages"][0]["content"]
        .as_str()
        .unwrap()
        .contains("B1 (intermediate)"));
}

#[tokio::test]
async fn start_defaults_to_guest_and_random_scene() {
    let app = TestApp::new().await;
    let (status, body) = app.post("/api/session/start", json!({ "level": "A2" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["scenario"], "random");

    let guest = ops::find_user_by_username(app.db.pool(), "guest").await.unwrap();
    assert!(guest.is_some());
}

#[tokio::test]
async fn start_rejects_bad_level_and_scenario_without_writing() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post("/api/session/start", json!({ "level": "Z9", "username": "anna" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid level");

    let (status, _) = app.post("/api/session/start", json!({ "username": "anna" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/session/start",
            json!({ "level": "A1", "scenario": "moon-base", "username": "anna" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid scenario");

    assert!(ops::find_user_by_username(app.db.pool(), "anna").await.unwrap().is_none());
    assert!(app.llm.all().is_empty());
}

#[tokio::test]
async fn mistyped_body_fields_get_the_json_400() {
    let app = TestApp::new().await;

    let (status, body) = app.post("/api/session/start", json!({ "level": 5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));

    let session_id = app.start_lesson("petr", "A1").await;
    let (status, body) = app
        .post(
            "/api/session/message",
            json!({ "sessionId": session_id, "message": "hi", "correctImmediately": "true" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app.post("/api/tts", json!({ "text": 42 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app.post("/api/analyze/words", json!(["not", "an", "object"])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn message_with_mistakes_stores_them_and_replies() {
    let app = TestApp::new().await;
    let session_id = app.start_lesson("petr", "A2").await;

    let (status, body) = app
        .post(
            "/api/session/message",
            json!({ "sessionId": session_id, "message": "Yesterday I goed to the Airport" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["message"].as_str().unwrap().contains("What happens next?"));

    // The capitalisation-only correction is filtered out.
    let mistakes = body["mistakes"].as_array().unwrap();
    assert_eq!(mistakes.len(), 1);
    assert_eq!(mistakes[0]["original"], "I goed");
    assert_eq!(mistakes[0]["corrected"], "I went");
    assert_eq!(mistakes[0]["type"], "grammar");

    let id: i64 = session_id.parse().unwrap();
    let stored = ops::list_lesson_mistakes(app.db.pool(), id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].practiced);

    let messages = ops::list_lesson_messages(app.db.pool(), id).await.unwrap();
    let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::Assistant, Role::User, Role::Assistant]);
    assert_eq!(messages[1].content, "Yesterday I goed to the Airport");
}

#[tokio::test]
async fn clean_message_has_null_mistakes() {
    let app = TestApp::new().await;
    let session_id = app.start_lesson("petr", "A2").await;

    let (status, body) = app
        .post(
            "/api/session/message",
            json!({ "sessionId": session_id, "message": "I want a window seat." }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["mistakes"].is_null());
}

#[tokio::test]
async fn immediate_correction_adds_hint_to_the_reply_prompt() {
    let app = TestApp::new().await;
    let session_id = app.start_lesson("jana", "B2").await;

    let (status, body) = app
        .post(
            "/api/session/message",
            json!({
                "sessionId": session_id.parse::<i64>().unwrap(),
                "message": "I goed there last week",
                "correctImmediately": true
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["message"].as_str().unwrap().starts_with("Oh, you went there?"));

    let reply_request = app.llm.all().pop().unwrap();
    let hint = reply_request["messages"][1]["content"].as_str().unwrap();
    assert!(hint.contains("The student made these mistakes"));
    assert!(hint.contains("I went"));
}

#[tokio::test]
async fn message_to_unknown_or_blank_is_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post("/api/session/message", json!({ "sessionId": "9999", "message": "hi" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Lesson not found");

    let (status, _) = app
        .post("/api/session/message", json!({ "sessionId": "abc", "message": "hi" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let session_id = app.start_lesson("petr", "A1").await;
    let (status, body) = app
        .post("/api/session/message", json!({ "sessionId": session_id, "message": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message is required");
}

#[tokio::test]
async fn transcript_lists_messages_in_order() {
    let app = TestApp::new().await;
    let session_id = app.start_lesson("petr", "C1").await;
    for text in ["First answer.", "Second answer."] {
        let (status, _) = app
            .post("/api/session/message", json!({ "sessionId": session_id, "message": text }))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app.get(&format!("/api/session/{session_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lesson"]["level"], "C1");
    assert!(body["lesson"]["ended_at"].is_null());

    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0]["role"], "assistant");
    assert_eq!(messages[1]["content"], "First answer.");
    assert_eq!(messages[3]["content"], "Second answer.");

    let (status, _) = app.get("/api/session/424242").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn finishing_twice_counts_the_lesson_once() {
    let app = TestApp::new().await;
    let session_id = app.start_lesson("eva", "B1").await;
    app.post(
        "/api/session/message",
        json!({ "sessionId": session_id, "message": "I goed home" }),
    )
    .await;

    let (status, body) = app.get(&format!("/api/session/{session_id}/mistakes")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["totalMistakes"], 1);
    assert_eq!(body["mistakesByType"]["grammar"].as_array().unwrap().len(), 1);
    for key in ["spelling", "word-order", "vocabulary"] {
        assert_eq!(body["mistakesByType"][key], json!([]), "{key}");
    }
    assert_eq!(body["allMistakes"][0]["userMessage"], "I goed");

    let (status, again) = app.get(&format!("/api/session/{session_id}/mistakes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["totalMistakes"], 1);

    let pool = app.db.pool();
    let user = ops::find_user_by_username(pool, "eva").await.unwrap().unwrap();
    let stats = ops::list_user_stats(pool, user.id).await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].lessons_completed, 1);
    assert_eq!(stats[0].total_mistakes, 1);
    assert_eq!(stats[0].total_messages, 3);

    let lesson = ops::get_lesson(pool, session_id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(lesson.is_ended());
    assert_eq!(lesson.total_messages, 3);
    assert_eq!(lesson.total_mistakes, 1);
}

#[tokio::test]
async fn ended_lesson_takes_no_more_messages() {
    let app = TestApp::new().await;
    let session_id = app.start_lesson("eva", "B1").await;
    app.post(
        "/api/session/message",
        json!({ "sessionId": session_id, "message": "I goed home" }),
    )
    .await;
    let (_, first) = app.get(&format!("/api/session/{session_id}/mistakes")).await;

    let (status, body) = app
        .post(
            "/api/session/message",
            json!({ "sessionId": session_id, "message": "I goed again" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Lesson already ended");

    let id: i64 = session_id.parse().unwrap();
    let pool = app.db.pool();
    assert_eq!(ops::list_lesson_mistakes(pool, id).await.unwrap().len(), 1);
    assert_eq!(ops::count_lesson_messages(pool, id).await.unwrap(), 3);

    let (status, again) = app.get(&format!("/api/session/{session_id}/mistakes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again, first);

    let lesson = ops::get_lesson(pool, id).await.unwrap().unwrap();
    assert_eq!(lesson.total_mistakes, 1);
    let user = ops::find_user_by_username(pool, "eva").await.unwrap().unwrap();
    let stats = ops::list_user_stats(pool, user.id).await.unwrap();
    assert_eq!(stats[0].total_mistakes, 1);
    assert_eq!(stats[0].total_messages, 3);
}

#[tokio::test]
async fn lesson_without_mistakes_has_empty_buckets() {
    let app = TestApp::new().await;
    let session_id = app.start_lesson("eva", "A1").await;

    let (status, body) = app.get(&format!("/api/session/{session_id}/mistakes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalMistakes"], 0);
    assert_eq!(body["allMistakes"], json!([]));
    assert_eq!(body["mistakesByType"]["grammar"], json!([]));
}

#[tokio::test]
async fn recap_summarizes_the_lesson() {
    let app = TestApp::new().await;
    let session_id = app.start_lesson("eva", "B1").await;
    app.post(
        "/api/session/message",
        json!({ "sessionId": session_id, "message": "I goed home" }),
    )
    .await;

    let (status, body) = app.get(&format!("/api/session/{session_id}/recap")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["recap"], "Great work today! Watch your irregular verbs.");
    assert_eq!(body["totalMistakes"], 1);
}

#[tokio::test]
async fn profile_aggregates_lessons_and_mistakes() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/user/nobody/profile").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");

    let first = app.start_lesson("karel", "A2").await;
    app.post("/api/session/message", json!({ "sessionId": first, "message": "I goed out" }))
        .await;
    app.get(&format!("/api/session/{first}/mistakes")).await;
    let second = app.start_lesson("karel", "B1").await;

    let (status, body) = app.get("/api/user/karel/profile").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["username"], "karel");
    assert_eq!(body["stats"]["total"]["total_lessons"], 1);
    assert_eq!(body["stats"]["total"]["total_mistakes"], 1);
    assert_eq!(body["stats"]["total"]["total_messages"], 3);

    let by_level = &body["stats"]["byLevel"][0];
    assert_eq!(by_level["level"], "A2");
    assert_eq!(by_level["lessons_completed"], 1);
    assert!(by_level["last_lesson_date"].is_string());
    assert_eq!(body["stats"]["mistakesByType"][0]["mistake_type"], "grammar");
    assert_eq!(body["stats"]["mistakesByType"][0]["count"], 1);

    let recent = body["recentLessons"].as_array().unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0]["id"].to_string(), second);
    assert!(recent[1]["started_at"].is_string());
    assert_eq!(recent[1]["total_messages"], 3);
    assert_eq!(recent[1]["total_mistakes"], 1);

    let mistake = &body["unpracticedMistakes"][0];
    assert_eq!(mistake["original_text"], "I goed");
    assert_eq!(mistake["corrected_text"], "I went");
    assert_eq!(mistake["mistake_type"], "grammar");
    assert!(mistake.get("originalText").is_none());
    assert_eq!(body["recentMistakes"].as_array().unwrap().len(), 1);
    assert_eq!(body["unpracticedMistakes"].as_array().unwrap().len(), 1);

    let (status, body) = app.get("/api/user/karel/lessons").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lessons"].as_array().unwrap().len(), 2);

    let (status, _) = app.get("/api/user/nobody/lessons").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn practiced_mistakes_leave_the_review_list() {
    let app = TestApp::new().await;
    let session_id = app.start_lesson("olga", "A2").await;
    app.post(
        "/api/session/message",
        json!({ "sessionId": session_id, "message": "I goed to school" }),
    )
    .await;

    let (_, profile) = app.get("/api/user/olga/profile").await;
    let mistake_id = profile["unpracticedMistakes"][0]["id"].as_i64().unwrap();

    let (status, body) = app
        .post(&format!("/api/mistakes/{mistake_id}/practiced"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["mistakeId"], mistake_id);
    assert_eq!(body["practiced"], true);

    let (_, profile) = app.get("/api/user/olga/profile").await;
    assert_eq!(profile["unpracticedMistakes"], json!([]));
    assert_eq!(profile["recentMistakes"][0]["practiced"], true);

    let (status, _) = app.post("/api/mistakes/77777/practiced", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tts_returns_mpeg_audio() {
    let app = TestApp::new().await;

    let response = app.post_raw("/api/tts", json!({ "text": "Hello there" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(
        response.headers()[header::CONTENT_LENGTH],
        FAKE_MP3.len().to_string().as_str()
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], FAKE_MP3);

    let speech_request = app.llm.all().pop().unwrap();
    assert_eq!(speech_request["input"], "Hello there");
    assert_eq!(speech_request["voice"], "nova");

    let (status, body) = app.post("/api/tts", json!({ "text": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Text is required");
}

#[tokio::test]
async fn translations_are_trimmed() {
    let app = TestApp::new().await;

    let (status, body) = app.post("/api/translate/word", json!({ "word": "luggage" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["translation"], "zavazadla");

    let (status, body) = app
        .post("/api/translate/sentence", json!({ "sentence": "Where is my gate?" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["translation"], "Kde je moje brána?");

    let (status, body) = app.post("/api/translate/word", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Word is required");

    let (status, body) = app.post("/api/translate/sentence", json!({ "sentence": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Sentence is required");
}

#[tokio::test]
async fn word_analysis_returns_pairs() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/analyze/words",
            json!({ "text": "Please put your luggage on the belt and go to gate 5.", "level": "b1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let words = body["words"].as_array().unwrap();
    assert_eq!(words.len(), 2);
    assert_eq!(words[0], json!({ "word": "luggage", "translation": "zavazadla" }));

    let request = app.llm.all().pop().unwrap();
    assert!(request["messages"][0]["content"].as_str().unwrap().contains("level B1"));

    let (status, _) = app.post("/api/analyze/words", json!({ "level": "A1" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post("/api/analyze/words", json!({ "text": "hello", "level": "X1" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid level");
}

#[tokio::test]
async fn provider_failure_is_a_generic_500_and_writes_nothing() {
    let app = TestApp::with_unreachable_llm().await;

    let (status, body) = app
        .post("/api/session/start", json!({ "level": "A1", "username": "tomas" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Server error");
    assert!(ops::find_user_by_username(app.db.pool(), "tomas").await.unwrap().is_none());

    let (status, body) = app.post("/api/translate/word", json!({ "word": "gate" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Server error");
}

#[tokio::test]
async fn unreachable_provider_degrades_analysis_and_recap() {
    let app = TestApp::with_unreachable_llm().await;
    let pool = app.db.pool();
    let user = ops::get_or_create_user(pool, "tomas").await.unwrap();
    let lesson_id = ops::create_lesson(
        pool,
        user.id,
        tutor_backend_rust::domain::Level::A1,
        tutor_backend_rust::domain::Scenario::Cafe,
    )
    .await
    .unwrap();

    let (status, body) = app.get(&format!("/api/session/{lesson_id}/recap")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["recap"],
        "Lesson recap could not be generated due to a technical issue."
    );

    // Detection fails quietly; the reply itself is what surfaces the outage.
    let (status, _) = app
        .post("/api/session/message", json!({ "sessionId": lesson_id, "message": "Hello" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(ops::list_lesson_mistakes(pool, lesson_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn data_routes_answer_503_without_a_database() {
    use tower::ServiceExt;

    let router = app_without_db();
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/session/start")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(r#"{"level":"A1"}"#))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let request = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
