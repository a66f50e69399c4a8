/// HTTP server factory and configuration.
/// Provides a reusable function to create and configure the HTTP server
/// for use in both the main binary and tests.

use crate::db::DbPool;
use crate::handlers::{
    compose_message, create_group, get_mailbox, get_message, health, list_replies, post_reply,
    register_user,
};
use actix_web::{middleware, web, App, HttpServer};

/// Register all REST routes on an application
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/users", web::post().to(register_user))
        .route("/users/{username}/mailbox", web::get().to(get_mailbox))
        .route("/groups", web::post().to(create_group))
        .route("/messages", web::post().to(compose_message))
        .route("/messages/{id}", web::get().to(get_message))
        .route("/messages/{id}/replies", web::get().to(list_replies))
        .route("/messages/{id}/replies", web::post().to(post_reply));
}

/// Create a configured HTTP server
///
/// Takes a database pool and bind address, then returns a fully configured
/// `HttpServer` ready to be run.
///
/// # Arguments
/// * `pool` - Database connection pool wrapped in web::Data
/// * `bind_addr` - Address to bind the server to (e.g., "127.0.0.1:4000")
///
/// # Example
/// ```ignore
/// let pool = web::Data::new(db::create_pool("messages.db")?);
/// let server = server::create_http_server(pool, "127.0.0.1:4000")?;
/// server.run().await?;
/// ```
pub fn create_http_server(
    pool: web::Data<DbPool>,
    bind_addr: &str,
) -> std::io::Result<actix_web::dev::Server> {
    let pool_clone = pool.clone();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(pool_clone.clone())
            .wrap(middleware::Logger::default())
            .configure(register_routes)
    })
    .bind(bind_addr)?
    .run();

    Ok(server)
}

/// Create a test HTTP server with an in-memory database
///
/// Binds to a random available port.
///
/// # Returns
/// A tuple of (server, bind_address) where bind_address can be used to make
/// requests
pub fn create_test_http_server() -> std::io::Result<(actix_web::dev::Server, String)> {
    let pool = web::Data::new(crate::db::create_test_pool());

    // Bind to 127.0.0.1:0 to get a random available port
    let bind_addr = "127.0.0.1:0";
    let pool_clone = pool.clone();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(pool_clone.clone())
            .wrap(middleware::Logger::default())
            .configure(register_routes)
    })
    .bind(bind_addr)?;

    // Get the actual bind address (including the assigned port)
    let addrs = server.addrs();
    let addr_str = addrs
        .first()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "No bind address found"))?
        .to_string();

    let server = server.run();

    Ok((server, addr_str))
}
