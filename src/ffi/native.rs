//! Fungsi `extern "C"` yang bisa dipanggil dari bahasa lain.
//!
//! Kontrak: caller memiliki string input dan output, dan harus melepas output
//! dengan `tome_string_free`.

use libc::c_char;
use std::ffi::CStr;
use std::ptr;

use super::NativeString;
use crate::greet::greet;

/// Buat greeting baru untuk `name`
///
/// Returns pointer NUL-terminated hasil `malloc`, atau null jika `name` null.
///
/// # Safety
/// `name` harus null atau menunjuk string NUL-terminated yang valid selama panggilan.
#[no_mangle]
pub unsafe extern "C" fn tome_greet(name: *const c_char) -> *mut c_char {
    if name.is_null() {
        return ptr::null_mut();
    }

    let name = CStr::from_ptr(name).to_string_lossy();
    match NativeString::new(&greet(&name)) {
        Ok(text) => text.into_raw(),
        // Input berasal dari CStr, jadi tidak ada interior NUL
        Err(_) => ptr::null_mut(),
    }
}

/// Lepas string yang dikembalikan `tome_greet`
///
/// # Safety
/// `ptr` harus null atau pointer yang dikembalikan `tome_greet` dan belum dilepas.
#[no_mangle]
pub unsafe extern "C" fn tome_string_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        libc::free(ptr.cast());
    }
}
