//! Authentication: session token codec, cookie formatting, and linking of
//! external (Google) identities to local users.

pub mod cookie;
pub mod google;
pub mod identity;
pub mod jwt;
