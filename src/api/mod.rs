pub mod registrar;

pub use registrar::{handler, ArgKind, ArgSpec, HandlerFn, Permission, RouteRequest, RouteShape, RouteSpec, RouteTable};
