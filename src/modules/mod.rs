pub mod library;
pub mod users;

use std::sync::Arc;

use shelf_authz::IdentityResolver;
use shelf_db::LibraryRepository;
use shelf_kernel::ModuleRegistry;

/// Register all feature modules with the registry
pub fn register_all(
    registry: &mut ModuleRegistry,
    repository: Arc<dyn LibraryRepository>,
    resolver: Arc<IdentityResolver>,
) {
    registry.register(users::create_module(resolver.clone()));
    registry.register(library::create_module(repository, resolver));
}
