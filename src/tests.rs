#[cfg(test)]
mod integration_tests {
    use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
    use axum_test::{TestResponse, TestServer};
    use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
    use serde_json::{json, Value};

    use model::entities::user::{self, Role};
    use model::entities::{accommodation, accommodation_image, booking};

    use crate::schemas::{ApiResponse, ErrorResponse};
    use crate::test_utils::test_utils::{seed_admin, setup_test_app, setup_test_app_with_state};

    fn bearer(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
    }

    fn student_payload(phone: &str) -> Value {
        json!({
            "phone": phone,
            "password": "password123",
            "role": "student",
        })
    }

    fn owner_payload(phone: &str, email: &str) -> Value {
        json!({
            "phone": phone,
            "email": email,
            "password": "password123",
            "role": "owner",
            "company_name": "Sunrise Stays",
            "business_registration": "REG-1234",
        })
    }

    async fn register_ok(server: &TestServer, payload: &Value) -> Value {
        let response = server.post("/api/v1/auth/register").json(payload).await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        assert!(body.success);
        body.data
    }

    async fn login_with(server: &TestServer, phone: &str, password: &str) -> TestResponse {
        server
            .post("/api/v1/auth/login")
            .json(&json!({ "phone": phone, "password": password }))
            .await
    }

    async fn login_token(server: &TestServer, phone: &str) -> String {
        let response = login_with(server, phone, "password123").await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Value> = response.json();
        body.data["token"].as_str().unwrap().to_string()
    }

    async fn create_listing(server: &TestServer, token: &str, name: &str) -> i32 {
        let response = server
            .post("/api/v1/owner/accommodations")
            .add_header(AUTHORIZATION, bearer(token))
            .json(&json!({
                "name": name,
                "description": "Two sharing room near campus",
                "address": "12 College Road",
                "price": "8500.00",
                "amenities": ["wifi", "laundry"],
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        body.data["id"].as_i64().unwrap() as i32
    }

    async fn create_booking(server: &TestServer, token: &str, accommodation_id: i32) -> TestResponse {
        server
            .post("/api/v1/bookings")
            .add_header(AUTHORIZATION, bearer(token))
            .json(&json!({ "accommodation_id": accommodation_id }))
            .await
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/health").await;

        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_register_student_defaults() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let data = register_ok(&server, &student_payload("9876543210")).await;

        assert_eq!(data["role"], "student");
        assert_eq!(data["is_approved"], true);
        assert_eq!(data["phone"], "+919876543210");
        assert!(data["id"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_register_owner_starts_unapproved() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let data = register_ok(&server, &owner_payload("9876543211", "owner@example.com")).await;

        assert_eq!(data["role"], "owner");
        assert_eq!(data["is_approved"], false);
        assert_eq!(data["company_name"], "Sunrise Stays");
    }

    #[tokio::test]
    async fn test_register_owner_requires_business_fields() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "phone": "9876543212",
                "password": "password123",
                "role": "owner",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_register_rejects_admin_role() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "phone": "9876543213",
                "password": "password123",
                "role": "admin",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_duplicate_phone_conflicts() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register_ok(&server, &student_payload("9876543214")).await;

        // Same number in a different spelling still collides
        let response = server
            .post("/api/v1/auth/register")
            .json(&student_payload("+91 98765 43214"))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "CONFLICT");
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "phone": "9876543215",
                "password": "short",
                "role": "student",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_and_me_roundtrip() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register_ok(&server, &student_payload("98765 43216")).await;

        // Login with the normalized spelling of the same number
        let token = login_token(&server, "+919876543216").await;

        let response = server
            .get("/api/v1/auth/me")
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["phone"], "+919876543216");
        assert_eq!(body.data["role"], "student");
    }

    #[tokio::test]
    async fn test_login_wrong_password_unauthorized() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register_ok(&server, &student_payload("9876543217")).await;

        let response = login_with(&server, "9876543217", "not-the-password").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_protected_route_without_token_unauthorized() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/api/v1/auth/me").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "UNAUTHENTICATED");
        // One generic message for every authentication failure
        assert_eq!(body.error, "please authenticate");
    }

    #[tokio::test]
    async fn test_protected_route_with_garbage_token_unauthorized() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .get("/api/v1/auth/me")
            .add_header(AUTHORIZATION, bearer("not-a-real-token"))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "please authenticate");
    }

    #[tokio::test]
    async fn test_stale_role_token_rejected() {
        let (app, state) = setup_test_app_with_state().await;
        let server = TestServer::new(app).unwrap();

        register_ok(&server, &student_payload("9876543218")).await;
        let token = login_token(&server, "9876543218").await;

        // The token still verifies, but the stored role has moved on
        let stored = user::Entity::find()
            .filter(user::Column::Phone.eq("+919876543218"))
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        let mut active: user::ActiveModel = stored.into();
        active.role = Set(Role::Owner);
        active.update(&state.db).await.unwrap();

        let response = server
            .get("/api/v1/auth/me")
            .add_header(AUTHORIZATION, bearer(&token))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "please authenticate");
    }

    #[tokio::test]
    async fn test_deleted_user_token_rejected() {
        let (app, state) = setup_test_app_with_state().await;
        let server = TestServer::new(app).unwrap();

        let data = register_ok(&server, &student_payload("9876543219")).await;
        let token = login_token(&server, "9876543219").await;

        user::Entity::delete_by_id(data["id"].as_i64().unwrap() as i32)
            .exec(&state.db)
            .await
            .unwrap();

        let response = server
            .get("/api/v1/auth/me")
            .add_header(AUTHORIZATION, bearer(&token))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_role_gate_denies_students_and_admits_admins() {
        let (app, state) = setup_test_app_with_state().await;
        let server = TestServer::new(app).unwrap();

        register_ok(&server, &student_payload("9876543220")).await;
        let student_token = login_token(&server, "9876543220").await;

        let response = server
            .get("/api/v1/admin/owners")
            .add_header(AUTHORIZATION, bearer(&student_token))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "FORBIDDEN");
        assert!(body.error.contains("admin"));

        seed_admin(&state.db, "+919000000001", "password123").await;
        let admin_token = login_token(&server, "+919000000001").await;

        let response = server
            .get("/api/v1/admin/owners")
            .add_header(AUTHORIZATION, bearer(&admin_token))
            .await;
        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_role_gate_denies_students_listing_management() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register_ok(&server, &student_payload("9876543221")).await;
        let token = login_token(&server, "9876543221").await;

        let response = server
            .post("/api/v1/owner/accommodations")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({
                "name": "Should not exist",
                "description": "x",
                "address": "x",
                "price": "1000.00",
            }))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_booking_lifecycle() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register_ok(&server, &owner_payload("9876543222", "owner1@example.com")).await;
        let owner_token = login_token(&server, "9876543222").await;
        let listing = create_listing(&server, &owner_token, "Sunrise PG").await;

        register_ok(&server, &student_payload("9876543223")).await;
        let student_token = login_token(&server, "9876543223").await;

        // Create: pending, enriched with the accommodation snapshot
        let response = create_booking(&server, &student_token, listing).await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["status"], "pending");
        assert_eq!(body.data["accommodation"]["id"], listing);
        assert_eq!(body.data["accommodation"]["name"], "Sunrise PG");
        assert_eq!(body.data["accommodation"]["address"], "12 College Road");
        assert!(body.data["message"].as_str().unwrap().contains("interested"));
        let booking_id = body.data["id"].as_i64().unwrap();

        // A second identical request is rejected while one is pending
        let response = create_booking(&server, &student_token, listing).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error: ErrorResponse = response.json();
        assert_eq!(error.code, "DUPLICATE_REQUEST");

        // Cancel
        let response = server
            .put(&format!("/api/v1/bookings/{booking_id}/cancel"))
            .add_header(AUTHORIZATION, bearer(&student_token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["status"], "cancelled");

        // A second cancel is surfaced, not silently accepted
        let response = server
            .put(&format!("/api/v1/bookings/{booking_id}/cancel"))
            .add_header(AUTHORIZATION, bearer(&student_token))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error: ErrorResponse = response.json();
        assert_eq!(error.code, "ALREADY_CANCELLED");

        // With no pending request left, a fresh one goes through
        let response = create_booking(&server, &student_token, listing).await;
        response.assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_booking_unknown_accommodation_not_found() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register_ok(&server, &student_payload("9876543224")).await;
        let token = login_token(&server, "9876543224").await;

        let response = create_booking(&server, &token, 9999).await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancel_foreign_booking_not_found() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register_ok(&server, &owner_payload("9876543225", "owner2@example.com")).await;
        let owner_token = login_token(&server, "9876543225").await;
        let listing = create_listing(&server, &owner_token, "Moonlight Hostel").await;

        register_ok(&server, &student_payload("9876543226")).await;
        let first_token = login_token(&server, "9876543226").await;
        let response = create_booking(&server, &first_token, listing).await;
        let body: ApiResponse<Value> = response.json();
        let booking_id = body.data["id"].as_i64().unwrap();

        register_ok(&server, &student_payload("9876543227")).await;
        let second_token = login_token(&server, "9876543227").await;

        // Someone else's booking reads the same as a missing one
        let response = server
            .put(&format!("/api/v1/bookings/{booking_id}/cancel"))
            .add_header(AUTHORIZATION, bearer(&second_token))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        let response = server
            .put("/api/v1/bookings/424242/cancel")
            .add_header(AUTHORIZATION, bearer(&second_token))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bookings_listed_newest_first() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register_ok(&server, &owner_payload("9876543228", "owner3@example.com")).await;
        let owner_token = login_token(&server, "9876543228").await;
        let first_listing = create_listing(&server, &owner_token, "First PG").await;
        let second_listing = create_listing(&server, &owner_token, "Second PG").await;

        register_ok(&server, &student_payload("9876543229")).await;
        let token = login_token(&server, "9876543229").await;
        create_booking(&server, &token, first_listing)
            .await
            .assert_status(StatusCode::CREATED);
        create_booking(&server, &token, second_listing)
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .get("/api/v1/bookings")
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 2);
        assert_eq!(body.data[0]["accommodation"]["id"], second_listing);
        assert_eq!(body.data[1]["accommodation"]["id"], first_listing);
    }

    #[tokio::test]
    async fn test_public_listing_visibility_follows_owner_approval() {
        let (app, state) = setup_test_app_with_state().await;
        let server = TestServer::new(app).unwrap();

        let owner = register_ok(&server, &owner_payload("9876543230", "owner4@example.com")).await;
        let owner_token = login_token(&server, "9876543230").await;
        let listing = create_listing(&server, &owner_token, "Hidden PG").await;

        // Unapproved owner: nothing surfaces publicly
        let response = server.get("/api/v1/accommodations").await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<Value>> = response.json();
        assert!(body.data.is_empty());

        let response = server
            .get(&format!("/api/v1/accommodations/{listing}"))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        // Approval flips the switch
        seed_admin(&state.db, "+919000000002", "password123").await;
        let admin_token = login_token(&server, "+919000000002").await;
        let owner_id = owner["id"].as_i64().unwrap();
        let response = server
            .put(&format!("/api/v1/admin/owners/{owner_id}/approve"))
            .add_header(AUTHORIZATION, bearer(&admin_token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["is_approved"], true);

        let response = server.get("/api/v1/accommodations").await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
        assert_eq!(body.data[0]["name"], "Hidden PG");
        assert_eq!(body.data[0]["price"], "8500.00");

        let response = server
            .get(&format!("/api/v1/accommodations/{listing}"))
            .await;
        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_owner_cannot_touch_foreign_listing() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register_ok(&server, &owner_payload("9876543231", "owner5@example.com")).await;
        let first_token = login_token(&server, "9876543231").await;
        let listing = create_listing(&server, &first_token, "First Owner PG").await;

        register_ok(&server, &owner_payload("9876543232", "owner6@example.com")).await;
        let second_token = login_token(&server, "9876543232").await;

        let response = server
            .put(&format!("/api/v1/owner/accommodations/{listing}"))
            .add_header(AUTHORIZATION, bearer(&second_token))
            .json(&json!({ "name": "Taken over" }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        let response = server
            .delete(&format!("/api/v1/owner/accommodations/{listing}"))
            .add_header(AUTHORIZATION, bearer(&second_token))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_accommodation_delete_cascades() {
        let (app, state) = setup_test_app_with_state().await;
        let server = TestServer::new(app).unwrap();

        register_ok(&server, &owner_payload("9876543233", "owner7@example.com")).await;
        let owner_token = login_token(&server, "9876543233").await;
        let listing = create_listing(&server, &owner_token, "Doomed PG").await;

        register_ok(&server, &student_payload("9876543234")).await;
        let student_token = login_token(&server, "9876543234").await;
        create_booking(&server, &student_token, listing)
            .await
            .assert_status(StatusCode::CREATED);

        // Hosted image rows, as the upload endpoint would have left them
        for public_id in ["way2pg/img-1", "way2pg/img-2"] {
            accommodation_image::ActiveModel {
                accommodation_id: Set(listing),
                url: Set(format!("https://media.example.com/{public_id}")),
                public_id: Set(public_id.to_string()),
                ..Default::default()
            }
            .insert(&state.db)
            .await
            .unwrap();
        }

        let response = server
            .delete(&format!("/api/v1/owner/accommodations/{listing}"))
            .add_header(AUTHORIZATION, bearer(&owner_token))
            .await;
        response.assert_status(StatusCode::OK);

        // Dependents are gone along with the parent
        let bookings = booking::Entity::find()
            .filter(booking::Column::AccommodationId.eq(listing))
            .all(&state.db)
            .await
            .unwrap();
        assert!(bookings.is_empty());
        let images = accommodation_image::Entity::find()
            .filter(accommodation_image::Column::AccommodationId.eq(listing))
            .all(&state.db)
            .await
            .unwrap();
        assert!(images.is_empty());
        let gone = accommodation::Entity::find_by_id(listing)
            .one(&state.db)
            .await
            .unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_admin_delete_owner_cascades() {
        let (app, state) = setup_test_app_with_state().await;
        let server = TestServer::new(app).unwrap();

        let owner = register_ok(&server, &owner_payload("9876543235", "owner8@example.com")).await;
        let owner_token = login_token(&server, "9876543235").await;
        let listing = create_listing(&server, &owner_token, "Orphaned PG").await;

        register_ok(&server, &student_payload("9876543236")).await;
        let student_token = login_token(&server, "9876543236").await;
        create_booking(&server, &student_token, listing)
            .await
            .assert_status(StatusCode::CREATED);

        seed_admin(&state.db, "+919000000003", "password123").await;
        let admin_token = login_token(&server, "+919000000003").await;

        let owner_id = owner["id"].as_i64().unwrap() as i32;
        let response = server
            .delete(&format!("/api/v1/admin/users/{owner_id}"))
            .add_header(AUTHORIZATION, bearer(&admin_token))
            .await;
        response.assert_status(StatusCode::OK);

        assert!(user::Entity::find_by_id(owner_id)
            .one(&state.db)
            .await
            .unwrap()
            .is_none());
        assert!(accommodation::Entity::find_by_id(listing)
            .one(&state.db)
            .await
            .unwrap()
            .is_none());
        assert!(booking::Entity::find()
            .filter(booking::Column::AccommodationId.eq(listing))
            .all(&state.db)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_admin_pending_owner_filter() {
        let (app, state) = setup_test_app_with_state().await;
        let server = TestServer::new(app).unwrap();

        let pending = register_ok(&server, &owner_payload("9876543237", "owner9@example.com")).await;
        let approved = register_ok(&server, &owner_payload("9876543238", "owner10@example.com")).await;

        seed_admin(&state.db, "+919000000004", "password123").await;
        let admin_token = login_token(&server, "+919000000004").await;

        let approved_id = approved["id"].as_i64().unwrap();
        server
            .put(&format!("/api/v1/admin/owners/{approved_id}/approve"))
            .add_header(AUTHORIZATION, bearer(&admin_token))
            .await
            .assert_status(StatusCode::OK);

        let response = server
            .get("/api/v1/admin/owners")
            .add_query_param("pending", true)
            .add_header(AUTHORIZATION, bearer(&admin_token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
        assert_eq!(body.data[0]["id"], pending["id"]);
    }

    #[tokio::test]
    async fn test_change_password_roundtrip() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register_ok(&server, &student_payload("9876543239")).await;
        let token = login_token(&server, "9876543239").await;

        let response = server
            .put("/api/v1/auth/password")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({
                "current_password": "password123",
                "new_password": "password456",
            }))
            .await;
        response.assert_status(StatusCode::OK);

        login_with(&server, "9876543239", "password123")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        login_with(&server, "9876543239", "password456")
            .await
            .assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_change_password_requires_current_password() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register_ok(&server, &student_payload("9876543240")).await;
        let token = login_token(&server, "9876543240").await;

        let response = server
            .put("/api/v1/auth/password")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({
                "current_password": "not-the-password",
                "new_password": "password456",
            }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}
