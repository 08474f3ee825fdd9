//! Auth-domain identifiers, scope sets, authorities, and authentication results.

pub mod authentication;
pub mod authority;
pub mod id;
pub mod scope;
pub mod token;

pub use authentication::*;
pub use authority::*;
pub use id::*;
pub use scope::*;
pub use token::*;
