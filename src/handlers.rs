pub mod auth;
pub mod billing;
pub mod invitation;
pub mod notification;
pub mod organization;
pub mod post;
pub mod upload;
pub mod user;
pub mod widget;

use actix_web::http::Method;
use actix_web::middleware::DefaultHeaders;
use actix_web::web::{self, delete, get, patch, post, put, resource, scope, JsonConfig, PathConfig, QueryConfig, ServiceConfig};

use crate::core::ports::mailer::Mailer;
use crate::core::ports::payment::PaymentGateway;
use crate::core::ports::repository::Manager;
use crate::core::ports::uploader::Uploader;
use crate::error::Error;

fn widget_cors() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add(("Access-Control-Allow-Headers", "Authorization, Content-Type"))
        .add(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
        .add(("Access-Control-Max-Age", "86400"))
}

fn options() -> actix_web::Route {
    web::method(Method::OPTIONS).to(widget::preflight)
}

/// Registers every route. Shared state (`Data<M>`, `Data<P>`, `Data<Ml>`,
/// `Data<U>`, `Data<Config>`, `Data<Tokeners>`, `Data<WidgetCache>`) is
/// expected on the app; sessions are resolved by `SessionMiddleware`.
pub fn configure<M, P, Ml, U>(cfg: &mut ServiceConfig)
where
    M: Manager,
    P: PaymentGateway,
    Ml: Mailer,
    U: Uploader + 'static,
{
    cfg.app_data(JsonConfig::default().error_handler(|err, _| Error::bad_request(err.to_string()).into()))
        .app_data(QueryConfig::default().error_handler(|err, _| Error::bad_request(err.to_string()).into()))
        .app_data(PathConfig::default().error_handler(|err, _| Error::bad_request(err.to_string()).into()))
        .service(
            scope("/auth")
                .route("/signup", post().to(auth::signup::<M, Ml>))
                .route("/login", post().to(auth::login::<M>))
                .route("/logout", post().to(auth::logout))
                .route("/magic-link", post().to(auth::magic_link::<M, Ml>))
                .route("/verify", get().to(auth::verify::<M>)),
        )
        .service(resource("/me").route(get().to(auth::me::<M>)).route(patch().to(auth::update_me::<M>)))
        .service(
            scope("/organizations")
                .route("", get().to(organization::list::<M>))
                .route("", post().to(organization::create::<M>))
                .route("/{id}", get().to(organization::detail::<M>))
                .route("/{id}", put().to(organization::update::<M>))
                .route("/{id}", delete().to(organization::delete::<M>))
                .route("/{id}/members", get().to(organization::members::<M>))
                .route("/{id}/members/{user_id}", put().to(organization::set_role::<M>))
                .route("/{id}/members/{user_id}", delete().to(organization::remove_member::<M>))
                .route("/{id}/posts", get().to(organization::posts::<M>))
                .route("/{id}/invitations", get().to(invitation::list::<M>))
                .route("/{id}/invitations", post().to(invitation::create::<M, Ml>))
                .route("/{id}/invitations/{invitation_id}", delete().to(invitation::revoke::<M>))
                .route("/{id}/billing", get().to(billing::detail::<M>))
                .route("/{id}/billing/checkout", post().to(billing::checkout::<M, P>))
                .route("/{id}/billing/portal", post().to(billing::portal::<M, P>)),
        )
        .route("/invitations/accept", get().to(invitation::accept_link::<M>))
        .route("/invitations/accept", post().to(invitation::accept::<M>))
        .service(
            scope("/posts")
                .route("", get().to(post::feed::<M>))
                .route("", post().to(post::create::<M>))
                .route("/{id}", get().to(post::detail::<M>))
                .route("/{id}", put().to(post::update::<M>))
                .route("/{id}", delete().to(post::delete::<M>))
                .route("/{id}/comments", get().to(post::comments::<M>))
                .route("/{id}/comments", post().to(post::add_comment::<M>))
                .route("/{id}/like", post().to(post::like::<M>))
                .route("/{id}/like", delete().to(post::unlike::<M>))
                .route("/{id}/bookmark", post().to(post::bookmark::<M>))
                .route("/{id}/bookmark", delete().to(post::unbookmark::<M>)),
        )
        .route("/comments/{id}", delete().to(post::delete_comment::<M>))
        .route("/bookmarks", get().to(post::bookmarks::<M>))
        .service(
            scope("/users")
                .route("/{id}", get().to(user::profile::<M>))
                .route("/{id}/follow", post().to(user::follow::<M>))
                .route("/{id}/follow", delete().to(user::unfollow::<M>)),
        )
        .service(
            scope("/notifications")
                .route("", get().to(notification::list::<M>))
                .route("/unread-count", get().to(notification::unread_count::<M>))
                .route("/read", post().to(notification::mark_read::<M>))
                .route("/{id}", delete().to(notification::delete::<M>)),
        )
        .route("/billing/webhook", post().to(billing::webhook::<M, P>))
        .service(
            scope("/widget")
                .wrap(widget_cors())
                .service(resource("/token").route(post().to(widget::token)).route(options()))
                .service(resource("/posts").route(get().to(widget::posts::<M>)).route(options()))
                .service(resource("/profile").route(get().to(widget::profile::<M>)).route(options())),
        )
        .service(
            scope("/uploads")
                .route("", post().to(upload::create::<M, U>))
                .route("/{name}", get().to(upload::fetch::<M, U>)),
        );
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use actix_web::cookie::Cookie;
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::web::Data;
    use actix_web::App;
    use serde_json::{json, Value};

    use super::*;
    use crate::config::Config;
    use crate::context::Tokeners;
    use crate::core::services::widget::{WidgetCache, WIDGET_AUDIENCE};
    use crate::impls::mailer::memory::MemoryMailer;
    use crate::impls::payment::fake::FakeGateway;
    use crate::impls::payment::stripe::sign_payload;
    use crate::impls::repository::memory::MemManager;
    use crate::impls::tokener::jwt::JWT;
    use crate::impls::uploaders::local_storage::LocalStorage;
    use crate::middlewares::jwt::{SessionMiddleware, SESSION_COOKIE};

    struct Deps {
        config: Config,
        manager: MemManager,
        mailer: MemoryMailer,
        gateway: FakeGateway,
        storage: LocalStorage,
    }

    impl Deps {
        fn new() -> Self {
            let mut config = Config::for_test();
            config.upload_path = std::env::temp_dir().join(format!("commune-test-{}", uuid::Uuid::new_v4())).to_string_lossy().into_owned();
            let webhook_secret = config.stripe.webhook_secret.clone().unwrap_or_default();
            Self {
                storage: LocalStorage::new(&config.upload_path).unwrap(),
                gateway: FakeGateway::new(&webhook_secret),
                manager: MemManager::new(),
                mailer: MemoryMailer::default(),
                config,
            }
        }
    }

    macro_rules! app {
        ($deps:expr) => {{
            let deps = &$deps;
            test::init_service(
                App::new()
                    .wrap(SessionMiddleware::new(deps.config.jwt_secret.as_bytes().to_vec()))
                    .app_data(Data::new(deps.config.clone()))
                    .app_data(Data::new(deps.manager.clone()))
                    .app_data(Data::new(deps.mailer.clone()))
                    .app_data(Data::new(deps.gateway.clone()))
                    .app_data(Data::new(deps.storage.clone()))
                    .app_data(Data::new(Tokeners {
                        session: JWT::new(deps.config.jwt_secret.as_bytes().to_vec()),
                        widget: JWT::with_audience(deps.config.widget_secret.as_bytes().to_vec(), WIDGET_AUDIENCE),
                    }))
                    .app_data(Data::new(WidgetCache::new(Duration::from_secs(deps.config.cache_ttl_secs))))
                    .configure(configure::<MemManager, FakeGateway, MemoryMailer, LocalStorage>),
            )
            .await
        }};
    }

    macro_rules! sign_in {
        ($app:expr, $name:expr) => {{
            let email = format!("{}@example.com", $name);
            let req = TestRequest::post()
                .uri("/auth/signup")
                .set_json(json!({"name": $name, "email": email, "password": "password123"}))
                .to_request();
            let resp = test::call_service(&$app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let me: Value = test::read_body_json(resp).await;
            let req = TestRequest::post()
                .uri("/auth/login")
                .set_json(json!({"email": email, "password": "password123"}))
                .to_request();
            let resp = test::call_service(&$app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let cookie = resp.response().cookies().find(|c| c.name() == SESSION_COOKIE).unwrap().into_owned();
            (me["id"].as_i64().unwrap(), cookie)
        }};
    }

    fn get(uri: &str, cookie: &Cookie<'static>) -> TestRequest {
        TestRequest::get().uri(uri).cookie(cookie.clone())
    }

    fn post(uri: &str, cookie: &Cookie<'static>) -> TestRequest {
        TestRequest::post().uri(uri).cookie(cookie.clone())
    }

    #[actix_web::test]
    async fn test_auth_flow() {
        let deps = Deps::new();
        let app = app!(deps);
        let resp = test::call_service(&app, TestRequest::get().uri("/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());

        let (id, cookie) = sign_in!(app, "ann");
        let me: Value = test::call_and_read_body_json(&app, get("/me", &cookie).to_request()).await;
        assert_eq!(me["id"].as_i64(), Some(id));
        assert_eq!(me["email_verified"], json!(false));

        let req = TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({"email": "ann@example.com", "password": "wrong-password"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let token = deps.mailer.last_token_for("ann@example.com").await.unwrap();
        let resp = test::call_service(&app, TestRequest::get().uri(&format!("/auth/verify?token={}", token)).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.response().cookies().any(|c| c.name() == SESSION_COOKIE));
        let me: Value = test::read_body_json(resp).await;
        assert_eq!(me["email_verified"], json!(true));
        let again = TestRequest::get().uri(&format!("/auth/verify?token={}", token)).to_request();
        assert_eq!(test::call_service(&app, again).await.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(&app, post("/auth/logout", &cookie).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let removal = resp.response().cookies().find(|c| c.name() == SESSION_COOKIE).unwrap();
        assert_eq!(removal.value(), "");
    }

    #[actix_web::test]
    async fn test_magic_link_creates_user() {
        let deps = Deps::new();
        let app = app!(deps);
        let req = TestRequest::post().uri("/auth/magic-link").set_json(json!({"email": "New@Example.com"})).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::ACCEPTED);
        let token = deps.mailer.last_token_for("new@example.com").await.unwrap();
        let resp = test::call_service(&app, TestRequest::get().uri(&format!("/auth/verify?token={}", token)).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp.response().cookies().find(|c| c.name() == SESSION_COOKIE).unwrap().into_owned();
        let me: Value = test::call_and_read_body_json(&app, get("/me", &cookie).to_request()).await;
        assert_eq!(me["email"], json!("new@example.com"));
    }

    #[actix_web::test]
    async fn test_malformed_input_is_bad_request() {
        let deps = Deps::new();
        let app = app!(deps);
        let (_, cookie) = sign_in!(app, "ann");
        let req = post("/posts", &cookie).insert_header(("Content-Type", "application/json")).set_payload("{not json").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
        let req = get("/posts/abc", &cookie).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
        let req = get("/posts?cursor=zz", &cookie).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
        let req = get("/posts?size=500", &cookie).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_posts_likes_and_comments() {
        let deps = Deps::new();
        let app = app!(deps);
        let (ann, ann_cookie) = sign_in!(app, "ann");
        let (_, bob_cookie) = sign_in!(app, "bob");

        let mut ids = Vec::new();
        for i in 0..3 {
            let req = post("/posts", &ann_cookie).set_json(json!({"content": format!("post {}", i)})).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let body: Value = test::read_body_json(resp).await;
            ids.push(body["id"].as_i64().unwrap());
        }
        let req = post("/posts", &ann_cookie).set_json(json!({"content": "draft", "published": false})).to_request();
        let draft: Value = test::call_and_read_body_json(&app, req).await;

        let page: Value = test::call_and_read_body_json(&app, TestRequest::get().uri("/posts?size=2").to_request()).await;
        assert_eq!(page["items"].as_array().unwrap().len(), 2);
        assert_eq!(page["items"][0]["id"].as_i64(), Some(ids[2]));
        let cursor = page["next_cursor"].as_str().unwrap().to_owned();
        let page: Value = test::call_and_read_body_json(&app, TestRequest::get().uri(&format!("/posts?size=2&cursor={}", cursor)).to_request()).await;
        assert_eq!(page["items"].as_array().unwrap().len(), 1);
        assert_eq!(page["items"][0]["id"].as_i64(), Some(ids[0]));
        assert!(page["next_cursor"].is_null());

        let uri = format!("/posts/{}", draft["id"]);
        assert_eq!(test::call_service(&app, get(&uri, &bob_cookie).to_request()).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(test::call_service(&app, get(&uri, &ann_cookie).to_request()).await.status(), StatusCode::OK);

        let like = format!("/posts/{}/like", ids[0]);
        let status: Value = test::call_and_read_body_json(&app, post(&like, &bob_cookie).to_request()).await;
        assert_eq!(status, json!({"liked": true, "like_count": 1}));
        let status: Value = test::call_and_read_body_json(&app, post(&like, &bob_cookie).to_request()).await;
        assert_eq!(status["like_count"], json!(1));
        let req = TestRequest::delete().uri(&like).cookie(bob_cookie.clone()).to_request();
        let status: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(status, json!({"liked": false, "like_count": 0}));

        let comments = format!("/posts/{}/comments", ids[0]);
        let req = post(&comments, &bob_cookie).set_json(json!({"content": "nice"})).to_request();
        let comment: Value = test::read_body_json(test::call_service(&app, req).await).await;
        let page: Value = test::call_and_read_body_json(&app, TestRequest::get().uri(&comments).to_request()).await;
        assert_eq!(page["items"][0]["content"], json!("nice"));

        let count: Value = test::call_and_read_body_json(&app, get("/notifications/unread-count", &ann_cookie).to_request()).await;
        assert_eq!(count["count"], json!(2));

        let req = TestRequest::delete().uri(&format!("/comments/{}", comment["id"])).cookie(ann_cookie.clone()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = TestRequest::put().uri(&format!("/posts/{}", ids[0])).cookie(bob_cookie.clone()).set_json(json!({"content": "mine"})).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
        let req = TestRequest::delete().uri(&format!("/posts/{}", ids[0])).cookie(ann_cookie.clone()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
        let req = TestRequest::get().uri(&format!("/posts/{}", ids[0])).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let profile: Value = test::call_and_read_body_json(&app, TestRequest::get().uri(&format!("/users/{}", ann)).to_request()).await;
        assert_eq!(profile["post_count"], json!(2));
    }

    #[actix_web::test]
    async fn test_follow_and_bookmarks() {
        let deps = Deps::new();
        let app = app!(deps);
        let (ann, ann_cookie) = sign_in!(app, "ann");
        let (bob, bob_cookie) = sign_in!(app, "bob");
        let req = post("/posts", &ann_cookie).set_json(json!({"content": "hello"})).to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;

        let status: Value = test::call_and_read_body_json(&app, post(&format!("/users/{}/follow", ann), &bob_cookie).to_request()).await;
        assert_eq!(status, json!({"following": true, "follower_count": 1}));
        let req = post(&format!("/users/{}/follow", bob), &bob_cookie).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let feed: Value = test::call_and_read_body_json(&app, get("/posts?following=true", &bob_cookie).to_request()).await;
        assert_eq!(feed["items"].as_array().unwrap().len(), 1);
        let feed: Value = test::call_and_read_body_json(&app, get("/posts?following=true", &ann_cookie).to_request()).await;
        assert!(feed["items"].as_array().unwrap().is_empty());
        let req = TestRequest::get().uri("/posts?following=true").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let status: Value = test::call_and_read_body_json(&app, post(&format!("/posts/{}/bookmark", created["id"]), &bob_cookie).to_request()).await;
        assert_eq!(status, json!({"bookmarked": true}));
        let page: Value = test::call_and_read_body_json(&app, get("/bookmarks", &bob_cookie).to_request()).await;
        assert_eq!(page["items"][0]["id"], created["id"]);
        assert_eq!(page["items"][0]["bookmarked"], json!(true));

        let notifications: Value = test::call_and_read_body_json(&app, get("/notifications?unread=true", &ann_cookie).to_request()).await;
        assert_eq!(notifications["items"][0]["kind"], json!("FOLLOW"));
        let updated: Value = test::call_and_read_body_json(&app, post("/notifications/read", &ann_cookie).set_json(json!({})).to_request()).await;
        assert_eq!(updated["updated"], json!(1));
        let count: Value = test::call_and_read_body_json(&app, get("/notifications/unread-count", &ann_cookie).to_request()).await;
        assert_eq!(count["count"], json!(0));
    }

    #[actix_web::test]
    async fn test_organizations_and_invitations() {
        let deps = Deps::new();
        let app = app!(deps);
        let (_, ann_cookie) = sign_in!(app, "ann");
        let (bob, bob_cookie) = sign_in!(app, "bob");

        let req = post("/organizations", &ann_cookie).set_json(json!({"name": "Acme", "slug": "acme"})).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let org: Value = test::read_body_json(resp).await;
        let org_uri = format!("/organizations/{}", org["id"]);
        let req = post("/organizations", &bob_cookie).set_json(json!({"name": "Other", "slug": "acme"})).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
        assert_eq!(test::call_service(&app, get(&org_uri, &bob_cookie).to_request()).await.status(), StatusCode::FORBIDDEN);

        let req = post(&format!("{}/invitations", org_uri), &ann_cookie).set_json(json!({"email": "bob@example.com", "role": "MEMBER"})).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        let token = deps.mailer.last_token_for("bob@example.com").await.unwrap();
        let req = post("/invitations/accept", &ann_cookie).set_json(json!({ "token": token })).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
        let req = post("/invitations/accept", &bob_cookie).set_json(json!({ "token": token })).to_request();
        let joined: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(joined["id"], org["id"]);

        let members: Value = test::call_and_read_body_json(&app, get(&format!("{}/members", org_uri), &bob_cookie).to_request()).await;
        assert_eq!(members["items"].as_array().unwrap().len(), 2);
        let req = TestRequest::put()
            .uri(&format!("{}/members/{}", org_uri, bob))
            .cookie(bob_cookie.clone())
            .set_json(json!({"role": "ADMIN"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = post("/posts", &bob_cookie).set_json(json!({"content": "internal", "organization_id": org["id"]})).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        let posts: Value = test::call_and_read_body_json(&app, get(&format!("{}/posts", org_uri), &ann_cookie).to_request()).await;
        assert_eq!(posts["items"].as_array().unwrap().len(), 1);
        let feed: Value = test::call_and_read_body_json(&app, TestRequest::get().uri("/posts").to_request()).await;
        assert!(feed["items"].as_array().unwrap().is_empty());

        let req = TestRequest::delete().uri(&format!("{}/members/{}", org_uri, bob)).cookie(bob_cookie.clone()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(test::call_service(&app, get(&org_uri, &bob_cookie).to_request()).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_invitation_email_link_accepts() {
        let deps = Deps::new();
        let app = app!(deps);
        let (_, ann_cookie) = sign_in!(app, "ann");
        let (_, bob_cookie) = sign_in!(app, "bob");
        let req = post("/organizations", &ann_cookie).set_json(json!({"name": "Acme", "slug": "acme"})).to_request();
        let org: Value = test::call_and_read_body_json(&app, req).await;
        let req = post(&format!("/organizations/{}/invitations", org["id"]), &ann_cookie)
            .set_json(json!({"email": "bob@example.com", "role": "MEMBER"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let sent = deps.mailer.sent().await;
        let mail = sent.iter().rev().find(|m| m.to == "bob@example.com").unwrap();
        let (_, link) = mail.body.split_once(deps.config.public_url.as_str()).unwrap();
        assert!(link.starts_with("/invitations/accept?token="));

        let anonymous = TestRequest::get().uri(link).to_request();
        assert_eq!(test::call_service(&app, anonymous).await.status(), StatusCode::UNAUTHORIZED);
        let resp = test::call_service(&app, get(link, &bob_cookie).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let joined: Value = test::read_body_json(resp).await;
        assert_eq!(joined["id"], org["id"]);
        let again = test::call_service(&app, get(link, &bob_cookie).to_request()).await;
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_billing_checkout_and_webhook() {
        let deps = Deps::new();
        let app = app!(deps);
        let (_, cookie) = sign_in!(app, "ann");
        let req = post("/organizations", &cookie).set_json(json!({"name": "Acme", "slug": "acme"})).to_request();
        let org: Value = test::call_and_read_body_json(&app, req).await;
        let org_uri = format!("/organizations/{}", org["id"]);

        let url: Value = test::call_and_read_body_json(&app, post(&format!("{}/billing/checkout", org_uri), &cookie).to_request()).await;
        assert_eq!(url["url"], json!(format!("https://checkout.stripe.test/cus_{}/price_pro", org["id"])));
        test::call_service(&app, post(&format!("{}/billing/checkout", org_uri), &cookie).to_request()).await;
        assert_eq!(deps.gateway.customers_created(), 1);

        let payload = json!({
            "type": "checkout.session.completed",
            "data": {"object": {
                "customer": format!("cus_{}", org["id"]),
                "subscription": "sub_1",
                "metadata": {"organization_id": org["id"].to_string()}
            }}
        })
        .to_string();
        let req = TestRequest::post().uri("/billing/webhook").set_payload(payload.clone()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
        let req = TestRequest::post()
            .uri("/billing/webhook")
            .insert_header((billing::SIGNATURE_HEADER, "t=1,v1=00"))
            .set_payload(payload.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let signature = sign_payload("whsec_test", &payload, chrono::Utc::now().timestamp()).unwrap();
        let req = TestRequest::post()
            .uri("/billing/webhook")
            .insert_header((billing::SIGNATURE_HEADER, signature))
            .set_payload(payload)
            .to_request();
        let received: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(received, json!({"received": true}));
        let billing: Value = test::call_and_read_body_json(&app, get(&format!("{}/billing", org_uri), &cookie).to_request()).await;
        assert_eq!(billing["plan"], json!("PRO"));

        let url: Value = test::call_and_read_body_json(&app, post(&format!("{}/billing/portal", org_uri), &cookie).to_request()).await;
        assert!(url["url"].as_str().unwrap().starts_with("https://billing.stripe.test/"));
    }

    #[actix_web::test]
    async fn test_widget_api() {
        let deps = Deps::new();
        let app = app!(deps);
        let (ann, cookie) = sign_in!(app, "ann");
        test::call_service(&app, post("/posts", &cookie).set_json(json!({"content": "public"})).to_request()).await;

        let req = TestRequest::default().method(Method::OPTIONS).uri("/widget/posts").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers().get("Access-Control-Allow-Origin").unwrap(), "*");

        let resp = test::call_service(&app, TestRequest::get().uri("/widget/posts").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers().get("Access-Control-Allow-Origin").unwrap(), "*");
        let req = TestRequest::get()
            .uri("/widget/posts")
            .insert_header(("Authorization", format!("Bearer {}", cookie.value())))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let issued: Value = test::call_and_read_body_json(&app, post("/widget/token", &cookie).to_request()).await;
        let bearer = format!("Bearer {}", issued["token"].as_str().unwrap());
        let req = TestRequest::get().uri("/widget/posts").insert_header(("Authorization", bearer.clone())).to_request();
        let page: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(page["items"][0]["content"], json!("public"));
        let req = TestRequest::get().uri("/widget/profile").insert_header(("Authorization", bearer)).to_request();
        let profile: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(profile["id"].as_i64(), Some(ann));
    }

    #[actix_web::test]
    async fn test_upload_and_fetch() {
        let deps = Deps::new();
        let app = app!(deps);
        let (_, cookie) = sign_in!(app, "ann");
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"hello.TXT\"\r\nContent-Type: text/plain\r\n\r\nhello world\r\n--{b}--\r\n",
            b = boundary
        );
        let req = post("/uploads", &cookie)
            .insert_header(("Content-Type", format!("multipart/form-data; boundary={}", boundary)))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let uploaded: Value = test::read_body_json(resp).await;
        let name = uploaded[0]["name"].as_str().unwrap().to_owned();
        assert!(name.ends_with(".txt"));

        let resp = test::call_service(&app, TestRequest::get().uri(&format!("/uploads/{}", name)).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, "hello world");
        let resp = test::call_service(&app, TestRequest::get().uri("/uploads/missing.txt").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
