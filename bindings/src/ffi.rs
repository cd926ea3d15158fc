//! C ABI for plugins written in C. The matching declarations live in
//! `include/yocki.h`.
//!
//! Every string this library hands out is heap allocated and must be
//! released with [`yocki_string_free`]. A callback may return the result of
//! [`yocki_call_response_build`]; that string is freed after it has been
//! copied. Any other string a callback returns stays owned by the plugin.

use std::collections::HashSet;
use std::ffi::{c_char, c_int, CStr, CString};
use std::ptr;

use lazy_static::lazy_static;
use parking_lot::Mutex;

use yocki_protocol::{decode_request, encode_response, CallEnvelope, ResponseEnvelope};

use crate::{Handler, Plugin, PluginConfig};

/// A plugin function: takes a request string, returns a response string
pub type YockiCall = unsafe extern "C" fn(*const c_char) -> *const c_char;

#[repr(C)]
pub struct YockiCallRequest {
    pub fn_name: *mut c_char,
    pub arg: *mut c_char,
}

#[repr(C)]
pub struct YockiCallResponse {
    pub buf: *const c_char,
}

/// Opaque plugin handle for C callers
pub struct Yocki {
    plugin: Plugin,
}

lazy_static! {
    /// Responses built for C callbacks that have not been freed yet
    static ref BUILT_RESPONSES: Mutex<HashSet<usize>> = Mutex::new(HashSet::new());
}

/// Frees `ptr` if it came from [`yocki_call_response_build`]
unsafe fn release_built_response(ptr: *const c_char) -> bool {
    if ptr.is_null() || !BUILT_RESPONSES.lock().remove(&(ptr as usize)) {
        return false;
    }
    drop(CString::from_raw(ptr as *mut c_char));
    true
}

/// Adapts a C callback to [`Handler`]
pub struct CallbackHandler {
    cb: YockiCall,
}

impl CallbackHandler {
    /// # Safety
    /// `cb` must accept any NUL-terminated string and return either null or
    /// a NUL-terminated string that stays valid after it returns.
    pub unsafe fn new(cb: YockiCall) -> Self {
        Self { cb }
    }
}

impl Handler for CallbackHandler {
    fn call(&self, request: &str) -> String {
        let request = to_c_string(request);
        let result = unsafe { (self.cb)(request.as_ptr()) };
        let response = unsafe { from_c_str(result) }.unwrap_or_default();

        if unsafe { release_built_response(result) } {
            log::trace!("Freed response built by the callback");
        }
        response
    }
}

/// Truncates at the first interior NUL, which C could not see anyway
fn to_c_string(text: &str) -> CString {
    match CString::new(text) {
        Ok(text) => text,
        Err(err) => {
            let pos = err.nul_position();
            let mut bytes = err.into_vec();
            bytes.truncate(pos);
            CString::new(bytes).unwrap_or_default()
        }
    }
}

/// Null and non-UTF-8 input yield `None`
unsafe fn from_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(String::from)
}

fn into_raw(text: &str) -> *mut c_char {
    to_c_string(text).into_raw()
}

/// Calls `cb` with `req` and returns its result unchanged
///
/// # Safety
/// `req` must be valid for whatever `cb` does with it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn yocki_call(cb: Option<YockiCall>, req: *const c_char) -> *const c_char {
    match cb {
        Some(cb) => cb(req),
        None => ptr::null(),
    }
}

/// Parses a request JSON string; null or malformed input gives `{"err", ""}`
///
/// # Safety
/// `req` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn yocki_call_request_build(req: *const c_char) -> YockiCallRequest {
    let request = match from_c_str(req) {
        Some(text) => decode_request(&text),
        None => CallEnvelope::sentinel(),
    };

    YockiCallRequest {
        fn_name: into_raw(&request.fn_name),
        arg: into_raw(&request.arg),
    }
}

/// # Safety
/// `req` must come from [`yocki_call_request_build`] and not be freed twice.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn yocki_call_request_free(req: YockiCallRequest) {
    yocki_string_free(req.fn_name);
    yocki_string_free(req.arg);
}

/// Serializes a response to `{"Buf":..}`; a null buffer counts as empty
///
/// # Safety
/// `res.buf` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn yocki_call_response_build(res: YockiCallResponse) -> *mut c_char {
    let buf = from_c_str(res.buf).unwrap_or_default();
    let ptr = into_raw(&encode_response(&ResponseEnvelope::new(buf)));

    BUILT_RESPONSES.lock().insert(ptr as usize);
    ptr
}

#[unsafe(no_mangle)]
pub extern "C" fn yocki_new() -> *mut Yocki {
    Box::into_raw(Box::new(Yocki {
        plugin: Plugin::new(),
    }))
}

/// # Safety
/// `yock` must be null or come from [`yocki_new`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn yocki_free(yock: *mut Yocki) {
    if !yock.is_null() {
        drop(Box::from_raw(yock));
    }
}

/// Registers `cb` under `name`; returns 0 on success, -1 on bad arguments
///
/// # Safety
/// `yock` must come from [`yocki_new`], `name` must be a NUL-terminated
/// string and `cb` must satisfy [`CallbackHandler::new`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn yocki_register_call(
    yock: *mut Yocki,
    name: *const c_char,
    cb: Option<YockiCall>,
) -> c_int {
    let (Some(yock), Some(name), Some(cb)) = (yock.as_ref(), from_c_str(name), cb) else {
        log::error!("yocki_register_call got a null or invalid argument");
        return -1;
    };

    yock.plugin.register(name, CallbackHandler::new(cb));
    0
}

/// Serves calls on `localhost:<port>` until ctrl+c; returns 0 on a clean
/// shutdown and -1 on failure
///
/// # Safety
/// `yock` must come from [`yocki_new`] and `port` must be a NUL-terminated
/// string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn yocki_run(yock: *mut Yocki, port: *const c_char) -> c_int {
    let Some(yock) = yock.as_ref() else {
        return -1;
    };

    let port = match from_c_str(port).and_then(|port| port.trim().parse::<u16>().ok()) {
        Some(port) => port,
        None => {
            log::error!("yocki_run got an invalid port");
            return -1;
        }
    };

    let config = PluginConfig {
        port,
        ..Default::default()
    };

    match yock.plugin.run_blocking(&config) {
        Ok(()) => 0,
        Err(err) => {
            log::error!("Plugin stopped: {err}");
            -1
        }
    }
}

/// # Safety
/// `s` must be null or a string returned by this library.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn yocki_string_free(s: *mut c_char) {
    if !s.is_null() && !release_built_response(s) {
        drop(CString::from_raw(s));
    }
}
