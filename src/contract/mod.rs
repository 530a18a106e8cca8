/// Contract Module Index
///
/// Everything needed to declare an endpoint as data: the shapes it accepts and returns
/// (`schema`), the per-route record (`route`), and the immutable lookup table the
/// dispatcher matches requests against (`registry`).
pub mod registry;
pub mod route;
pub mod schema;

pub use registry::{ContractRegistry, RegistryError, RouteMatch, RouteNotFound};
pub use route::RouteContract;
pub use schema::{FieldSchema, ObjectSchema, ParamKind, ParamSchema, ParamValue, Schema};
