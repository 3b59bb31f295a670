pub mod current_user;
pub mod idempotency_key;
pub mod path_id;
pub mod validated_json;

pub use current_user::CurrentUser;
pub use idempotency_key::IdempotencyKey;
pub use path_id::PathId;
pub use validated_json::ValidatedJson;
