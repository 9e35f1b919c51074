//! # Conflux Pool
//!
//! A thread-safe bounded object pool. The pool hands out at most `max`
//! resources at a time, keeps at least `min` warm while open, and validates
//! every resource on release: rejected resources are discarded and replaced
//! when the warm set runs low.
//!
//! ## Examples
//!
//! ```rust
//! use conflux_pool::{Pool, PoolResource};
//!
//! struct Conn(u32);
//! impl PoolResource for Conn {}
//!
//! # fn main() -> Result<(), conflux_pool::PoolError> {
//! let pool = Pool::new(1, 4, || Conn(0), |conn: &Conn| conn.0 < 100)?;
//! let conn = pool.borrow()?;
//! assert!(pool.release(conn));
//! pool.close();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod pool;

pub use error::PoolError;
pub use pool::{Pool, PoolResource};
