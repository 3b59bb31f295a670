use actix_web::web;

use crate::middleware::idempotency::IdempotencyGuard;
use crate::middleware::jwt_extract::JwtExtract;

pub mod drafts;
pub mod health;
pub mod leagues;

/// Register every route. Shared by `main` and the test app builder so both
/// see the same middleware on `/api`.
///
/// `JwtExtract` is the outer wrap: the idempotency guard needs the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/health").configure(health::configure_routes));

    cfg.service(
        web::scope("/api")
            .wrap(IdempotencyGuard)
            .wrap(JwtExtract)
            .service(web::scope("/drafts").configure(drafts::configure_routes))
            .service(web::scope("/leagues").configure(leagues::configure_routes)),
    );
}
