/// Authentication and authorization utilities
///
/// - `jwt`: HS256 token creation/validation (access + refresh)
/// - `password`: Argon2id hashing and strength checks
/// - `policy`: pure authorization decision functions
/// - `middleware`: the `Actor` request extractor

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod policy;

use rand::RngCore;

/// Generates a random 32-byte hex token for email verification
pub fn generate_verification_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
