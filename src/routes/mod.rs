/// Route Table Index
///
/// Every endpoint the service exposes, declared as a [`RouteContract`] bound to its
/// handler. Access rules live in the contracts themselves, so there is no per-module
/// middleware; the dispatcher applies the same gate to every route.
///
/// [`RouteContract`]: crate::contract::RouteContract
use crate::dispatch::RouteBinding;

/// Server time and liveness. `/time` stays reachable while offline.
pub mod system;

/// Global and per-contest announcements.
pub mod announcement;

/// User listings, profiles, and account edits.
pub mod user;

/// Problem catalogue and statement documents.
pub mod problem;

/// The complete route table, in declaration order.
pub fn bindings() -> Vec<RouteBinding> {
    let mut bindings = system::routes();
    bindings.extend(announcement::routes());
    bindings.extend(user::routes());
    bindings.extend(problem::routes());
    bindings
}
