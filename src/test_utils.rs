#[cfg(test)]
pub mod test_utils {
    use crate::auth::password::hash_password;
    use crate::auth::token::TokenService;
    use crate::router::create_router;
    use crate::schemas::AppState;
    use crate::services::mail::MailClient;
    use crate::services::media::MediaClient;
    use axum::Router;
    use chrono::{Duration, Utc};
    use migration::{Migrator, MigratorTrait};
    use moka::future::Cache;
    use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    use model::entities::user::{self, Role};

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        // Run migrations
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    /// Create AppState for testing. The media and mail clients run
    /// unconfigured so no external calls leave the test process.
    pub async fn setup_test_app_state() -> AppState {
        let db = setup_test_db().await;
        let cache = Cache::new(100);

        AppState {
            db,
            cache,
            tokens: TokenService::new("test_secret_key", Duration::hours(1)),
            media: MediaClient::new(None),
            mailer: MailClient::new(None),
        }
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is determined by the RUST_LOG environment variable,
    /// defaulting to WARN if not set.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| match level.to_uppercase().as_str() {
                "ERROR" => Some(Level::ERROR),
                "WARN" => Some(Level::WARN),
                "INFO" => Some(Level::INFO),
                "DEBUG" => Some(Level::DEBUG),
                "TRACE" => Some(Level::TRACE),
                _ => None,
            })
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr) // Output to stderr, which is captured by tests
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create axum app for testing
    pub async fn setup_test_app() -> Router {
        let _ = init_test_tracing();

        let state = setup_test_app_state().await;
        create_router(state)
    }

    /// Create axum app for testing, handing back the state so tests can
    /// reach into the database directly
    pub async fn setup_test_app_with_state() -> (Router, AppState) {
        let _ = init_test_tracing();

        let state = setup_test_app_state().await;
        let router = create_router(state.clone());
        (router, state)
    }

    /// Inserts an admin user directly; admins are provisioned out of
    /// band and cannot self-register.
    pub async fn seed_admin(db: &DatabaseConnection, phone: &str, password: &str) -> user::Model {
        let admin = user::ActiveModel {
            phone: Set(phone.to_string()),
            email: Set(None),
            password_hash: Set(hash_password(password).expect("Failed to hash password")),
            role: Set(Role::Admin),
            company_name: Set(None),
            business_registration: Set(None),
            is_approved: Set(true),
            phone_verified: Set(false),
            email_verified: Set(false),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        };

        admin.insert(db).await.expect("Failed to seed admin")
    }
}
