// End-to-end coverage of the event and registration workflows over HTTP.
mod common;

use serde_json::{json, Value};

/// The whole happy path: draft -> submit -> approve -> join -> approve
/// registration -> complete, then cancel-after-complete fails.
#[tokio::test]
async fn full_volunteer_lifecycle() {
    let server = common::spawn().await;
    let owner = server.register_and_login("owner").await;
    let volunteer = server.register_and_login("volunteer").await;
    let admin = server.admin_token().await;

    // Owner creates a draft
    let event = server.create_event(&owner, "River cleanup").await;
    let event_id = event["id"].as_str().unwrap();
    assert_eq!(event["status"], "DRAFT");

    // Volunteer cannot join a draft
    let response = server
        .client
        .post(server.url(&format!("/api/registrations/{}/join", event_id)))
        .bearer_auth(&volunteer)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // Submit, approve
    let response = server
        .client
        .post(server.url(&format!("/api/events/{}/submit", event_id)))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "PENDING");

    let response = server
        .client
        .post(server.url(&format!("/api/admin/events/{}/approve", event_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "APPROVED");

    // Volunteer joins before the deadline
    let response = server
        .client
        .post(server.url(&format!("/api/registrations/{}/join", event_id)))
        .bearer_auth(&volunteer)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let registration: Value = response.json().await.unwrap();
    let registration_id = registration["id"].as_str().unwrap();
    assert_eq!(registration["status"], "PENDING");
    assert_eq!(registration["eventName"], "River cleanup");

    // Joining again returns the same registration
    let response = server
        .client
        .post(server.url(&format!("/api/registrations/{}/join", event_id)))
        .bearer_auth(&volunteer)
        .send()
        .await
        .unwrap();
    let again: Value = response.json().await.unwrap();
    assert_eq!(again["id"], registration["id"]);

    // Owner approves, then completes
    let response = server
        .client
        .post(server.url(&format!("/api/registrations/{}/approve", registration_id)))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "APPROVED");

    let response = server
        .client
        .post(server.url(&format!("/api/registrations/{}/complete", registration_id)))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "COMPLETED");

    // Completed participation cannot be cancelled
    let response = server
        .client
        .post(server.url(&format!("/api/registrations/{}/cancel-join", event_id)))
        .bearer_auth(&volunteer)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], 400);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("completed participation"));
}

#[tokio::test]
async fn submit_is_only_valid_from_draft_or_rejected() {
    let server = common::spawn().await;
    let owner = server.register_and_login("owner").await;
    let admin = server.admin_token().await;

    let event = server.create_event(&owner, "Food drive").await;
    let event_id = event["id"].as_str().unwrap();

    let submit_url = server.url(&format!("/api/events/{}/submit", event_id));
    let response = server.client.post(&submit_url).bearer_auth(&owner).send().await.unwrap();
    assert_eq!(response.status(), 200);

    // Second submit: PENDING is not submittable
    let response = server.client.post(&submit_url).bearer_auth(&owner).send().await.unwrap();
    assert_eq!(response.status(), 400);

    // Reject, then resubmit works
    let response = server
        .client
        .post(server.url(&format!("/api/admin/events/{}/reject", event_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = server.client.post(&submit_url).bearer_auth(&owner).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "PENDING");
}

#[tokio::test]
async fn admin_routes_reject_regular_users() {
    let server = common::spawn().await;
    let owner = server.register_and_login("owner").await;

    let event = server.create_event(&owner, "Garden day").await;
    let event_id = event["id"].as_str().unwrap();
    server
        .client
        .post(server.url(&format!("/api/events/{}/submit", event_id)))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();

    let response = server
        .client
        .post(server.url(&format!("/api/admin/events/{}/approve", event_id)))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn listing_hides_other_peoples_unapproved_events() {
    let server = common::spawn().await;
    let owner = server.register_and_login("owner").await;
    let other = server.register_and_login("other").await;
    let admin = server.admin_token().await;

    server.create_event(&owner, "Hidden draft").await;
    server.approved_event(&owner, "Public event").await;

    let names = |body: Vec<Value>| -> Vec<String> {
        body.iter()
            .map(|e| e["name"].as_str().unwrap().to_string())
            .collect()
    };

    // Stranger sees only the approved event
    let body: Vec<Value> = server
        .client
        .get(server.url("/api/events"))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(names(body), vec!["Public event"]);

    // Owner additionally sees their own draft
    let body: Vec<Value> = server
        .client
        .get(server.url("/api/events"))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let mut seen = names(body);
    seen.sort();
    assert_eq!(seen, vec!["Hidden draft", "Public event"]);

    // Admin sees everything
    let body: Vec<Value> = server
        .client
        .get(server.url("/api/events"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body.len(), 2);

    // Direct read of a foreign draft is forbidden
    let body: Vec<Value> = server
        .client
        .get(server.url("/api/events?status=DRAFT"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let draft_id = body[0]["id"].as_str().unwrap();
    let response = server
        .client
        .get(server.url(&format!("/api/events/{}", draft_id)))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn event_search_filter_is_conjunctive() {
    let server = common::spawn().await;
    let owner = server.register_and_login("owner").await;

    server.approved_event(&owner, "Beach cleanup").await;
    server.approved_event(&owner, "Beach patrol").await;
    server.approved_event(&owner, "Forest walk").await;

    let body: Vec<Value> = server
        .client
        .get(server.url("/api/events?search=Beach&status=APPROVED"))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body.len(), 2);

    let body: Vec<Value> = server
        .client
        .get(server.url("/api/events?search=Beach&status=DRAFT"))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn patch_validation_rejects_bad_schedule() {
    let server = common::spawn().await;
    let owner = server.register_and_login("owner").await;

    let event = server.create_event(&owner, "Tight schedule").await;
    let event_id = event["id"].as_str().unwrap();

    // Deadline after start date
    let bad_deadline = chrono::Utc::now() + chrono::Duration::days(10);
    let response = server
        .client
        .patch(server.url(&format!("/api/events/{}", event_id)))
        .bearer_auth(&owner)
        .json(&json!({ "dateDeadline": bad_deadline }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Row unchanged
    let body: Value = server
        .client
        .get(server.url(&format!("/api/events/{}", event_id)))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["dateDeadline"], event["dateDeadline"]);
}

#[tokio::test]
async fn registration_listing_visibility() {
    let server = common::spawn().await;
    let owner = server.register_and_login("owner").await;
    let volunteer = server.register_and_login("volunteer").await;
    let stranger = server.register_and_login("stranger").await;

    let event_id = server.approved_event(&owner, "Visible event").await;
    let response = server
        .client
        .post(server.url(&format!("/api/registrations/{}/join", event_id)))
        .bearer_auth(&volunteer)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let count_for = |token: String| {
        let server = &server;
        async move {
            let body: Vec<Value> = server
                .client
                .get(server.url("/api/registrations"))
                .bearer_auth(&token)
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            body.len()
        }
    };

    assert_eq!(count_for(volunteer.clone()).await, 1);
    assert_eq!(count_for(owner.clone()).await, 1);
    assert_eq!(count_for(stranger.clone()).await, 0);
    assert_eq!(count_for(server.admin_token().await).await, 1);
}

#[tokio::test]
async fn error_envelope_has_status_message_and_path() {
    let server = common::spawn().await;

    // Unknown route
    let response = server
        .client
        .get(server.url("/api/does-not-exist"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], 404);
    assert_eq!(body["path"], "/api/does-not-exist");
    assert!(body["message"].is_string());

    // Wrong verb on a known route
    let response = server
        .client
        .delete(server.url("/api/auth/login"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 405);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], 405);
    assert_eq!(body["path"], "/api/auth/login");

    // Missing credentials
    let response = server
        .client
        .get(server.url("/api/events"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], 401);
    assert_eq!(body["path"], "/api/events");
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let server = common::spawn().await;
    server.register_and_login("taken").await;

    let response = server
        .client
        .post(server.url("/api/users"))
        .json(&json!({
            "firstname": "Second",
            "lastname": "User",
            "username": "taken",
            "password": "password123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("already taken"));
}
