// Package model for the resolver
//
// Packages carry identity (name, version), link maps to other packages and
// optional source/dist descriptors. Repository membership and priority are
// tracked by the pool, not by the package itself.

mod convert;
mod link;
mod package;
mod source;

pub use link::{Link, LinkType};
pub use package::Package;
pub use source::{Dist, Source};
