pub mod error;
pub mod models;
pub mod progress;
pub mod routes;
pub mod service;
pub mod shelves;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;

use shelf_authz::IdentityResolver;
use shelf_db::LibraryRepository;
use shelf_kernel::{InitCtx, Migration, Module};

use service::LibraryService;

/// The user's personal library and reading progress
pub struct LibraryModule {
    service: LibraryService,
    resolver: Arc<IdentityResolver>,
}

impl LibraryModule {
    pub fn new(repository: Arc<dyn LibraryRepository>, resolver: Arc<IdentityResolver>) -> Self {
        Self {
            service: LibraryService::new(repository),
            resolver,
        }
    }
}

#[async_trait]
impl Module for LibraryModule {
    fn name(&self) -> &'static str {
        shelf_db::schema::LIBRARY_MODULE
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "library module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        shelf_authz::protect(routes::router(self.service.clone()), self.resolver.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let entry = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/LibraryEntry" }
                    }
                }
            })
        };
        let book_id_param = json!({
            "name": "book_id",
            "in": "path",
            "required": true,
            "schema": { "type": "string", "format": "uuid" }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "Get the caller's library grouped by status",
                        "tags": ["Library"],
                        "security": [{ "bearer": [] }],
                        "responses": {
                            "200": {
                                "description": "Library shelves",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Shelves" }
                                    }
                                }
                            },
                            "401": error("Authentication required"),
                            "500": error("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Add a book to the caller's library",
                        "tags": ["Library"],
                        "security": [{ "bearer": [] }],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/AddBookRequest" }
                                }
                            }
                        },
                        "responses": {
                            "201": entry("Created library entry"),
                            "401": error("Authentication required"),
                            "404": error("Book is not in the catalog"),
                            "409": error("Book already in library"),
                            "422": error("Validation error"),
                            "500": error("Internal server error")
                        }
                    }
                },
                "/{book_id}": {
                    "get": {
                        "summary": "Get one library entry",
                        "tags": ["Library"],
                        "security": [{ "bearer": [] }],
                        "parameters": [book_id_param.clone()],
                        "responses": {
                            "200": entry("Library entry"),
                            "401": error("Authentication required"),
                            "404": error("Book not in library"),
                            "422": error("Validation error")
                        }
                    },
                    "patch": {
                        "summary": "Update reading status and/or progress",
                        "tags": ["Library"],
                        "security": [{ "bearer": [] }],
                        "parameters": [book_id_param],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/UpdateProgressRequest" }
                                }
                            }
                        },
                        "responses": {
                            "200": entry("Updated library entry"),
                            "401": error("Authentication required"),
                            "404": error("Book not in library"),
                            "422": error("Validation error"),
                            "500": error("Internal server error")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Library health check",
                        "tags": ["Library"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "ReadingStatus": {
                        "type": "string",
                        "enum": ["to_read", "reading", "finished", "abandoned"]
                    },
                    "LibraryEntry": {
                        "type": "object",
                        "properties": {
                            "user_id": { "type": "string", "format": "uuid" },
                            "book_id": { "type": "string", "format": "uuid" },
                            "status": { "$ref": "#/components/schemas/ReadingStatus" },
                            "progress_percentage": { "type": "integer", "minimum": 0, "maximum": 100 },
                            "started_reading_at": { "type": "string", "format": "date-time", "nullable": true },
                            "finished_reading_at": { "type": "string", "format": "date-time", "nullable": true },
                            "last_progress_update_at": { "type": "string", "format": "date-time" }
                        },
                        "required": ["user_id", "book_id", "status", "progress_percentage", "last_progress_update_at"]
                    },
                    "ShelfBook": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "title": { "type": "string" },
                            "author": { "type": "string", "nullable": true },
                            "cover_image_url": { "type": "string", "nullable": true },
                            "book_id": { "type": "string", "format": "uuid" },
                            "status": { "$ref": "#/components/schemas/ReadingStatus" },
                            "progress_percentage": { "type": "integer" },
                            "started_reading_at": { "type": "string", "format": "date-time", "nullable": true },
                            "finished_reading_at": { "type": "string", "format": "date-time", "nullable": true },
                            "last_progress_update_at": { "type": "string", "format": "date-time" }
                        },
                        "required": ["book_id", "status", "progress_percentage", "last_progress_update_at"]
                    },
                    "Shelves": {
                        "type": "object",
                        "properties": {
                            "to_read": { "type": "array", "items": { "$ref": "#/components/schemas/ShelfBook" } },
                            "reading": { "type": "array", "items": { "$ref": "#/components/schemas/ShelfBook" } },
                            "finished": { "type": "array", "items": { "$ref": "#/components/schemas/ShelfBook" } },
                            "abandoned": { "type": "array", "items": { "$ref": "#/components/schemas/ShelfBook" } }
                        },
                        "required": ["to_read", "reading", "finished", "abandoned"]
                    },
                    "AddBookRequest": {
                        "type": "object",
                        "properties": {
                            "book_id": { "type": "string", "format": "uuid" }
                        },
                        "required": ["book_id"]
                    },
                    "UpdateProgressRequest": {
                        "type": "object",
                        "properties": {
                            "status": { "$ref": "#/components/schemas/ReadingStatus" },
                            "progress": { "type": "integer", "minimum": 0, "maximum": 100 }
                        }
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        shelf_db::schema::library_migrations()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "library module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "library module stopped");
        Ok(())
    }
}

/// Create a new instance of the library module
pub fn create_module(
    repository: Arc<dyn LibraryRepository>,
    resolver: Arc<IdentityResolver>,
) -> Arc<dyn Module> {
    Arc::new(LibraryModule::new(repository, resolver))
}
