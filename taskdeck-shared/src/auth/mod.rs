/// Authentication utilities
///
/// - `jwt`: token creation and validation (HS256 access/refresh pairs)
/// - `password`: Argon2id hashing and strength validation
/// - `middleware`: axum Bearer-token middleware

pub mod jwt;
pub mod middleware;
pub mod password;
