//! DNS-related modules.

pub mod blocker;
pub mod blocking;
pub mod groups;
pub mod resolver;
pub mod response;

pub use blocker::{BlockMatch, Blocker};
pub use blocking::BlockingResolver;
pub use groups::ClientGroups;
pub use resolver::{
    ChainedResolver, Request, Resolver, Response, ResponseKind, UpstreamResolver, chain,
};
pub use response::BlockType;
