/// Database plumbing for the PostgreSQL store
///
/// # Modules
///
/// - `pool`: Connection pool creation, health check, and shutdown
/// - `migrations`: Embedded schema migrations
///
/// SQL for individual entities lives next to each model in `models`.

pub mod migrations;
pub mod pool;
