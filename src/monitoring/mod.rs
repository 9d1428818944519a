/*!
 * Monitoring
 * Tracing setup shared by the binary, tests and benchmarks
 */

mod tracer;

pub use tracer::{init_tracing, ReclaimSpan};
