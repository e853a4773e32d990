mod auth;

pub use auth::RequireApiKey;
