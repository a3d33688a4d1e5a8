pub mod jwt;
pub mod opaque;
pub mod password;

pub use jwt::{Claims, TokenAlgorithm, TokenKeys, create_token, validate_token};
pub use opaque::{decode_opaque, encode_opaque, generate_code};
pub use password::{hash_password, verify_password};
