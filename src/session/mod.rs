//! Session credential storage.
//!
//! The access/refresh token pair (plus the signed-in user's id) lives in
//! HTTP-only cookies. The `TokenStore` trait hides that behind `get/set/clear`
//! so the request pipeline can be exercised against an in-memory fake.

pub mod cookie;
pub mod store;

pub use cookie::CookieTokenStore;
pub use store::{MemoryTokenStore, SessionKey, TokenPolicy, TokenStore};
