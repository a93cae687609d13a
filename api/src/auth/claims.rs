use serde::{Deserialize, Serialize};

/// Claims carried by a bearer JWT from the institution's identity layer.
///
/// `sub` is the row id in `users`; `admin` short-circuits the teacher
/// guard without a role lookup.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i64,
    pub exp: usize,
    pub admin: bool,
}

/// An authenticated caller, as extracted from the Authorization header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);
