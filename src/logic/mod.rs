//! Pure decision logic, free of store and TLS dependencies

mod negotiate;

pub use negotiate::negotiate;
