use std::sync::Arc;

use async_trait::async_trait;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use shelf_authz::{CurrentUser, IdentityResolver};
use shelf_kernel::{InitCtx, Module};

/// Caller identity endpoints
pub struct UsersModule {
    resolver: Arc<IdentityResolver>,
}

impl UsersModule {
    pub fn new(resolver: Arc<IdentityResolver>) -> Self {
        Self { resolver }
    }
}

#[derive(Debug, Serialize)]
struct Me {
    user_id: Uuid,
}

#[async_trait]
impl Module for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if ctx.settings.auth.jwt_secret.is_none() {
            tracing::warn!(
                module = self.name(),
                "auth.jwt_secret is not set; every caller will be anonymous"
            );
        }
        Ok(())
    }

    fn routes(&self) -> Router {
        let router = Router::new()
            .route("/me", get(me))
            .route("/health", get(health_check));
        shelf_authz::protect(router, self.resolver.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/me": {
                    "get": {
                        "summary": "Identity of the authenticated caller",
                        "tags": ["Users"],
                        "security": [{ "bearer": [] }],
                        "responses": {
                            "200": {
                                "description": "Caller identity",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "user_id": { "type": "string", "format": "uuid" }
                                            },
                                            "required": ["user_id"]
                                        }
                                    }
                                }
                            },
                            "401": {
                                "description": "Authentication required",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Users health check",
                        "tags": ["Users"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                }
            }
        }))
    }
}

async fn health_check() -> &'static str {
    "users module is healthy"
}

async fn me(CurrentUser(user_id): CurrentUser) -> Json<Me> {
    tracing::debug!(user_id = %user_id, "identity requested");
    Json(Me { user_id })
}

/// Create a new instance of the users module
pub fn create_module(resolver: Arc<IdentityResolver>) -> Arc<dyn Module> {
    Arc::new(UsersModule::new(resolver))
}
