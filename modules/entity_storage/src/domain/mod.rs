//! Domain layer - setters, compilation and stamping

pub mod clock;
pub mod compiler;
pub mod setter;
pub mod stamper;
pub(crate) mod value;

pub use clock::{Clock, ManualClock, SystemClock};
pub use compiler::{check_shape, compile, CompiledSetter};
pub use setter::{current, now, val, BinaryOp, FieldBinding, Setter, SetterShape, ValueExpr};
pub use stamper::{stamp, Audited, Stamping, Untracked, Versioned, WriteGuard, WritePath};
