use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::auth::login,
        api::auth::logout,
        api::auth::me,
        api::content::list_services,
        api::content::list_projects,
        api::content::get_project,
        api::content::list_posts,
        api::content::get_post,
        api::content::list_tags,
    ),
    components(
        schemas(
            api::health::HealthResponse,
            api::auth::LoginRequest,
            api::auth::MeResponse,
            crate::supabase::User,
            crate::domain::PostWithTags,
            crate::models::Service,
            crate::models::PortfolioProject,
            crate::models::BlogPost,
            crate::models::BlogTag,
            crate::models::PostStatus,
        )
    ),
    tags(
        (name = "folio", description = "Portfolio site API")
    )
)]
pub struct ApiDoc;
