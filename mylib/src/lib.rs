//! Fixture library for exercising a C-ABI call path: three exported
//! functions with fixed, observable behavior.

use std::borrow::Cow;
use std::ffi::{c_char, c_int, CStr};

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Person {
    pub name: *const c_char,
    pub age: c_int,
    pub telephone: *const c_char,
}

pub const HELLO2_RESULT: &CStr = c"Hello Yock";

pub const OVERWRITTEN_NAME: &CStr = c"yock";
pub const OVERWRITTEN_AGE: c_int = -1;
pub const OVERWRITTEN_TELEPHONE: &CStr = c"000000";

unsafe fn lossy<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::Borrowed("(null)")
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn hello() {
    println!("Hello World!");
}

/// # Safety
/// `name` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hello2(name: *const c_char, age: c_int) -> *const c_char {
    println!("Hello {}, and your age is {age}?", lossy(name));
    HELLO2_RESULT.as_ptr()
}

/// Prints the record and returns it with every field overwritten
///
/// # Safety
/// The string fields of `p` must be null or NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hello3(mut p: Person) -> Person {
    println!(
        "name: {}, age: {}, telephone: {}",
        lossy(p.name),
        p.age,
        lossy(p.telephone)
    );

    p.name = OVERWRITTEN_NAME.as_ptr();
    p.age = OVERWRITTEN_AGE;
    p.telephone = OVERWRITTEN_TELEPHONE.as_ptr();
    p
}
