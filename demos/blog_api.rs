use std::sync::{Arc, PoisonError, RwLock};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use drygate::{
    config::{read_config, set_environment},
    prelude::*,
    setup_tracing::setup_tracing,
    table::permission_table,
};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
struct Post {
    id: u32,
    author_id: u32,
    title: String,
    published: bool,
}

struct User {
    id: u32,
    staff: bool,
}

impl Principal for User {
    fn is_authenticated(&self) -> bool {
        true
    }

    fn is_staff(&self) -> bool {
        self.staff
    }
}

fn is_author(post: &Post, request: &PermissionRequest) -> bool {
    request
        .principal::<User>()
        .is_some_and(|user| user.id == post.author_id)
}

impl PermissionModel for Post {
    fn permissions() -> PermissionTable<Self> {
        let mut table = PermissionTable::new("Post")
            .read(|_| true)
            .write(|request| request.is_authenticated())
            .object_read(|post: &Post, request| post.published || is_author(post, request))
            .object_write(is_author);

        // Authors publish their own posts, staff publish anything.
        table
            .global_check("publish", authenticated_users(GlobalCheck::new(|_| true)))
            .object_check("publish", allow_staff_or_superuser(ObjectCheck::new(is_author)));

        table
    }
}

enum ApiError {
    NotFound,
    Access(AccessError),
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        Self::Access(err)
    }
}

impl From<PermissionError> for ApiError {
    fn from(err: PermissionError) -> Self {
        Self::Access(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            Self::Access(err) => err.into_response(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    posts: Arc<RwLock<Vec<Post>>>,
    gate: PermissionGate<Post>,
    field: Arc<drygate::field::BoundPermissionsField<Post>>,
    filters: FilterRouter<Vec<Post>>,
}

impl AppState {
    fn find(&self, view: &ViewContext) -> Result<Post, ApiError> {
        let id = view
            .kwargs()
            .get(view.lookup_field())
            .and_then(|id| id.parse::<u32>().ok());

        self.posts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|post| Some(post.id) == id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    fn render(&self, post: &Post, request: &PermissionRequest) -> serde_json::Value {
        let mut representation = match serde_json::to_value(post) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        self.field.serialize_into(&mut representation, post, request);
        serde_json::Value::Object(representation)
    }
}

/// Resolve the user from the `x-user-id` header, id 1 being staff.
async fn authenticate(mut req: Request, next: Next) -> Response {
    let user = req
        .headers()
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u32>().ok());

    let principal = match user {
        Some(id) => CurrentPrincipal::new(User { id, staff: id == 1 }),
        None => CurrentPrincipal::new(drygate::request::AnonymousUser),
    };
    req.extensions_mut().insert(principal);

    next.run(req).await
}

async fn list_posts(
    State(state): State<AppState>,
    request: PermissionRequest,
    view: ViewContext,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    let posts = state
        .posts
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    let posts = state.filters.filter_queryset(&request, posts, &view)?;

    Ok(Json(posts.iter().map(|post| state.render(post, &request)).collect()))
}

async fn show_post(
    State(state): State<AppState>,
    request: PermissionRequest,
    view: ViewContext,
) -> Result<Json<serde_json::Value>, ApiError> {
    let post = state.find(&view)?;
    authorize_object!(state.gate, &request, &view, &post);

    Ok(Json(state.render(&post, &request)))
}

async fn publish_post(
    State(state): State<AppState>,
    request: PermissionRequest,
    view: ViewContext,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut post = state.find(&view)?;
    authorize_object!(state.gate, &request, &view, &post);

    post.published = true;
    let mut posts = state.posts.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(stored) = posts.iter_mut().find(|stored| stored.id == post.id) {
        stored.published = true;
    }
    drop(posts);

    Ok(Json(state.render(&post, &request)))
}

fn visible_posts(request: &PermissionRequest, posts: Vec<Post>, _view: &ViewContext) -> Vec<Post> {
    posts
        .into_iter()
        .filter(|post| {
            post.published
                || request
                    .principal::<User>()
                    .is_some_and(|user| user.id == post.author_id)
        })
        .collect()
}

fn drafts(request: &PermissionRequest, posts: Vec<Post>, _view: &ViewContext) -> Vec<Post> {
    let Some(user) = request.principal::<User>() else {
        return Vec::new();
    };
    posts
        .into_iter()
        .filter(|post| !post.published && post.author_id == user.id)
        .collect()
}

fn app_router(state: AppState) -> Router {
    let guard = from_fn_with_state(
        GateLayer::new(state.gate.clone(), "PostView"),
        permission_middleware::<Post>,
    );

    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/{id}", get(show_post))
        .route_layer(guard.clone())
        .route(
            "/posts/drafts",
            get(list_posts)
                .layer::<_, std::convert::Infallible>(guard.clone())
                .layer(Extension(with_action("drafts"))),
        )
        .route(
            "/posts/{id}/publish",
            post(publish_post)
                .layer::<_, std::convert::Infallible>(guard)
                .layer(Extension(with_action("publish"))),
        )
        .layer(from_fn(authenticate))
        .with_state(state)
}

fn seed() -> Vec<Post> {
    vec![
        Post {
            id: 1,
            author_id: 2,
            title: "Hello".to_string(),
            published: true,
        },
        Post {
            id: 2,
            author_id: 2,
            title: "Work in progress".to_string(),
            published: false,
        },
        Post {
            id: 3,
            author_id: 3,
            title: "Someone else's draft".to_string(),
            published: false,
        },
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = read_config(&set_environment())?;
    setup_tracing(&config.tracing.log_level)?;

    let permissions = config.permissions;
    let field = PermissionsField::new(permissions.field)?
        .bind("permissions", permission_table::<Post>())?;

    let state = AppState {
        posts: Arc::new(RwLock::new(seed())),
        gate: PermissionGate::new(permissions.gate, Registered::<Post>::new()),
        field: Arc::new(field),
        filters: FilterRouter::new(permissions.filter)
            .list(visible_posts)
            .action("drafts", drafts),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app_router(state)).await?;

    Ok(())
}
