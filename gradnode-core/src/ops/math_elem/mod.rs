// Element-wise math kernels
pub mod exp;
pub mod sin_cos;
pub mod square;

pub use exp::{exp_op, Exp};
pub use sin_cos::{sin_cos_op, SinCos};
pub use square::{square_op, Square};
