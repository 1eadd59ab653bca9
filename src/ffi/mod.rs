//! Native Boundary: C ABI greeting helper
//!
//! Prinsip desain:
//! - Semua alokasi lintas boundary memakai `libc::malloc` / `libc::free`
//! - Setiap pointer native dibungkus `NativeString` yang membebaskan diri saat drop,
//!   jadi input dan output selalu di-release berpasangan di semua exit path
//! - Alokasi gagal = fatal (proses berhenti)

mod native;
mod string;

pub use native::{tome_greet, tome_string_free};
pub use string::{greet_native, with_greeting, NativeString};
