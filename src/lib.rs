// Transit Gateway route resolution and path walking

pub mod config;
pub mod error;
pub mod gateway;
pub mod path;
pub mod render;
pub mod routes;
pub mod store;
pub mod topology;

pub use error::{RetryConfig, RouterError, RouterResult};
pub use gateway::{Gateway, RouteFetchReport, discover_gateways, update_routing};
pub use path::{MAX_HOPS, Path, WalkOutcome};
pub use routes::{AttachmentRef, Route, RouteKind, RouteState, RouteTable};
pub use store::{GatewaySnapshot, SnapshotStore};
pub use topology::{InMemoryTopology, RetryingSource, TopologySource};
