//! Raw native calls and memory access
//!
//! Nothing here validates an address. A bad target or address crashes the
//! process, which is the contract scripts opt into by using the bridge.

use std::ffi::CString;

/// Number of argument slots passed to every native call.
pub const NATIVE_ARG_SLOTS: usize = 8;

/// Signature every call target is invoked with: eight word-sized integer
/// arguments and a word-sized result.
type NativeTarget = unsafe extern "C" fn(
    isize,
    isize,
    isize,
    isize,
    isize,
    isize,
    isize,
    isize,
) -> isize;

/// One marshaled argument slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeArg {
    Integer(isize),
    /// Passed as the address of a NUL-terminated copy.
    Text(CString),
    /// Passed as 0.
    Absent,
}

impl NativeArg {
    /// Builds a text slot; the copy stops at an embedded NUL.
    pub fn text(s: &str) -> Self {
        let bytes = s.split('\0').next().unwrap_or_default();
        match CString::new(bytes) {
            Ok(text) => NativeArg::Text(text),
            Err(_) => NativeArg::Absent,
        }
    }

    fn as_word(&self) -> isize {
        match self {
            NativeArg::Integer(n) => *n,
            NativeArg::Text(text) => text.as_ptr() as isize,
            NativeArg::Absent => 0,
        }
    }
}

/// A call target plus its eight argument slots. Text slots own their
/// buffers, so they stay valid until the descriptor is dropped.
#[derive(Debug)]
pub struct NativeCallDescriptor {
    pub target: usize,
    pub args: [NativeArg; NATIVE_ARG_SLOTS],
}

impl NativeCallDescriptor {
    pub fn new(target: usize) -> Self {
        NativeCallDescriptor {
            target,
            args: std::array::from_fn(|_| NativeArg::Absent),
        }
    }

    /// Calls the target with every slot converted to a word.
    ///
    /// # Safety
    ///
    /// `target` must be the address of a C-ABI function that tolerates
    /// being called with eight word-sized integer arguments.
    pub unsafe fn invoke(&self) -> isize {
        let words: [isize; NATIVE_ARG_SLOTS] = std::array::from_fn(|i| self.args[i].as_word());
        native_call(self.target, words)
    }
}

/// Address of the dynamic linker's `dlsym`, or 0 where there is none.
pub fn resolve_symbol() -> usize {
    #[cfg(unix)]
    {
        libc::dlsym as usize
    }
    #[cfg(not(unix))]
    {
        0
    }
}

/// Calls `target` with eight integer arguments.
///
/// # Safety
///
/// `target` must be a valid C-ABI function address.
pub unsafe fn native_call(target: usize, args: [isize; NATIVE_ARG_SLOTS]) -> isize {
    let function: NativeTarget = std::mem::transmute::<usize, NativeTarget>(target);
    function(
        args[0], args[1], args[2], args[3], args[4], args[5], args[6], args[7],
    )
}

/// # Safety
///
/// `address` must be readable.
pub unsafe fn read_byte(address: usize) -> u8 {
    std::ptr::read_volatile(address as *const u8)
}

/// Stores the low 8 bits of `value`.
///
/// # Safety
///
/// `address` must be writable.
pub unsafe fn write_byte(address: usize, value: i64) {
    std::ptr::write_volatile(address as *mut u8, (value & 0xff) as u8);
}

/// Reads a C `int`; `address` need not be aligned.
///
/// # Safety
///
/// `address..address + 4` must be readable.
pub unsafe fn read_word(address: usize) -> i32 {
    std::ptr::read_unaligned(address as *const i32)
}

/// # Safety
///
/// `address..address + 4` must be writable.
pub unsafe fn write_word(address: usize, value: i32) {
    std::ptr::write_unaligned(address as *mut i32, value);
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn sum8(
        a: isize,
        b: isize,
        c: isize,
        d: isize,
        e: isize,
        f: isize,
        g: isize,
        h: isize,
    ) -> isize {
        a + b + c + d + e + f + g + h
    }

    extern "C" fn text_length(
        s: isize,
        _: isize,
        _: isize,
        _: isize,
        _: isize,
        _: isize,
        _: isize,
        _: isize,
    ) -> isize {
        let text = unsafe { std::ffi::CStr::from_ptr(s as *const std::ffi::c_char) };
        text.to_bytes().len() as isize
    }

    #[test]
    fn test_byte_round_trip() {
        let buffer = [0u8; 4];
        let address = buffer.as_ptr() as usize;
        unsafe {
            write_byte(address + 1, 0x1ff);
            assert_eq!(read_byte(address + 1), 0xff);
            assert_eq!(read_byte(address), 0);
        }
    }

    #[test]
    fn test_unaligned_word_round_trip() {
        let buffer = [0u8; 8];
        let address = buffer.as_ptr() as usize + 1;
        unsafe {
            write_word(address, -2);
            assert_eq!(read_word(address), -2);
        }
        assert_eq!(buffer[1], 0xfe);
    }

    #[test]
    fn test_descriptor_fills_absent_slots_with_zero() {
        let mut descriptor = NativeCallDescriptor::new(sum8 as usize);
        descriptor.args[0] = NativeArg::Integer(40);
        descriptor.args[7] = NativeArg::Integer(2);
        assert_eq!(unsafe { descriptor.invoke() }, 42);
    }

    #[test]
    fn test_text_argument_is_nul_terminated_copy() {
        let mut descriptor = NativeCallDescriptor::new(text_length as usize);
        descriptor.args[0] = NativeArg::text("puts\0ignored");
        assert_eq!(unsafe { descriptor.invoke() }, 4);
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_symbol_is_nonzero() {
        assert_ne!(resolve_symbol(), 0);
    }
}
