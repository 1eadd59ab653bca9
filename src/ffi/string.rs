use libc::c_char;
use std::alloc::{handle_alloc_error, Layout};
use std::ffi::CStr;
use std::mem::ManuallyDrop;
use std::ptr::{self, NonNull};
use tracing::error;

use super::native::tome_greet;
use crate::error::{Error, Result};

/// String NUL-terminated di heap native (`malloc`), dilepas otomatis saat drop
pub struct NativeString {
    ptr: NonNull<c_char>,
}

impl NativeString {
    /// Copy `text` ke alokasi native baru
    ///
    /// Gagal jika `text` mengandung NUL di tengah. Alokasi gagal = fatal.
    pub fn new(text: &str) -> Result<Self> {
        if let Some(pos) = text.bytes().position(|b| b == 0) {
            return Err(Error::InteriorNul(pos));
        }

        let size = text.len() + 1;
        // SAFETY: size > 0; hasil dicek null sebelum dipakai
        let raw = unsafe { libc::malloc(size) } as *mut c_char;
        let Some(ptr) = NonNull::new(raw) else {
            alloc_failed(size);
        };

        // SAFETY: region `size` bytes baru dialokasikan dan tidak overlap dengan `text`
        unsafe {
            ptr::copy_nonoverlapping(text.as_ptr(), ptr.as_ptr().cast::<u8>(), text.len());
            *ptr.as_ptr().add(text.len()) = 0;
        }

        Ok(Self { ptr })
    }

    /// Ambil alih pointer yang dialokasikan dengan `malloc`
    ///
    /// # Safety
    /// `raw` harus null atau pointer `malloc` ke string NUL-terminated yang
    /// belum dimiliki pihak lain.
    pub unsafe fn from_raw(raw: *mut c_char) -> Option<Self> {
        NonNull::new(raw).map(|ptr| Self { ptr })
    }

    /// Serahkan kepemilikan ke caller (harus dilepas dengan `tome_string_free`)
    pub fn into_raw(self) -> *mut c_char {
        ManuallyDrop::new(self).ptr.as_ptr()
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const c_char {
        self.ptr.as_ptr()
    }

    pub fn as_c_str(&self) -> &CStr {
        // SAFETY: pointer selalu NUL-terminated dan hidup selama `self`
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
    }

    pub fn to_str(&self) -> Result<&str> {
        self.as_c_str()
            .to_str()
            .map_err(|err| Error::InvalidUtf8(err.valid_up_to()))
    }
}

impl Drop for NativeString {
    fn drop(&mut self) {
        // SAFETY: pointer berasal dari malloc dan dimiliki eksklusif
        unsafe { libc::free(self.ptr.as_ptr().cast()) }
    }
}

// SAFETY: NativeString memiliki alokasinya secara eksklusif, tidak ada aliasing
unsafe impl Send for NativeString {}

impl std::fmt::Debug for NativeString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NativeString").field(&self.as_c_str()).finish()
    }
}

/// Panggil greeting native dan pinjamkan hasilnya ke `f`
///
/// Input dan output dimiliki guard `NativeString`, jadi keduanya dilepas
/// di setiap exit path, termasuk saat `f` atau konversi UTF-8 gagal.
pub fn with_greeting<R>(name: &str, f: impl FnOnce(&str) -> R) -> Result<R> {
    let input = NativeString::new(name)?;

    // SAFETY: input valid dan NUL-terminated selama panggilan
    let raw = unsafe { tome_greet(input.as_ptr()) };
    // SAFETY: tome_greet mengembalikan pointer malloc milik caller
    let Some(output) = (unsafe { NativeString::from_raw(raw) }) else {
        // Input non-null, jadi null berarti alokasi di sisi native gagal
        alloc_failed(name.len() + "Hello, !".len() + 1);
    };

    Ok(f(output.to_str()?))
}

/// Greeting lewat boundary native, hasil di-copy ke `String`
pub fn greet_native(name: &str) -> Result<String> {
    with_greeting(name, str::to_owned)
}

fn alloc_failed(size: usize) -> ! {
    error!(size, "native allocation failed");
    match Layout::from_size_align(size, 1) {
        Ok(layout) => handle_alloc_error(layout),
        Err(_) => std::process::abort(),
    }
}
