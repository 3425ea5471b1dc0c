//! C ABI over [`MarkovModel`].
//!
//! Handles are opaque ids, not addresses. A process-global registry maps
//! live ids to their boxed model; ids are never reused, so a freed handle
//! stays poisoned and any later call on it returns `-EBADF`.
//!
//! The registry lock is only held to look up, insert or remove an id.
//! Distinct handles can be used from distinct threads at the same time;
//! calls on the same handle must be serialized by the caller.

use std::collections::BTreeMap;
use std::ptr::{self, NonNull};
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use libc::{c_int, c_uchar, c_uint, c_void};

use crate::error::{MarkovError, Result};
use crate::model::{Config, MarkovModel};

/// Owned model pointer stored in the registry.
struct Slot(NonNull<MarkovModel>);

// SAFETY: the pointee is `Send`; the slot is the only owner of the box.
unsafe impl Send for Slot {}

static LIVE: Mutex<BTreeMap<usize, Slot>> = Mutex::new(BTreeMap::new());

/// Next handle id. Zero is never handed out (null handle).
static NEXT_HANDLE: AtomicUsize = AtomicUsize::new(1);

/// Largest byte count representable in the return value.
const MAX_OUTPUT: usize = c_int::MAX as usize;

fn registry() -> MutexGuard<'static, BTreeMap<usize, Slot>> {
	// No code path panics while holding the lock; recover anyway
	LIVE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Boxes `value`, reporting exhaustion instead of aborting.
fn try_box<T>(value: T) -> Result<Box<T>> {
	let mut storage: Vec<T> = Vec::new();
	storage.try_reserve_exact(1)?;
	storage.push(value);
	let raw = Box::into_raw(storage.into_boxed_slice()).cast::<T>();
	// SAFETY: a one-element boxed slice has the layout of a `Box<T>`
	Ok(unsafe { Box::from_raw(raw) })
}

fn lookup(handle: *mut c_void) -> Result<NonNull<MarkovModel>> {
	registry()
		.get(&handle.addr())
		.map(|slot| slot.0)
		.ok_or(MarkovError::InvalidHandle)
}

fn with_model<T>(handle: *mut c_void, f: impl FnOnce(&mut MarkovModel) -> Result<T>) -> Result<T> {
	let model = lookup(handle)?;
	// SAFETY: the box lives until `markov_dealloc` removes it from the
	// registry; callers serialize all use of one handle.
	f(unsafe { &mut *model.as_ptr() })
}

/// Borrows an input span. Null is only accepted with a zero length.
///
/// # Safety
/// A non-null `ptr` must be valid for reads of `len` bytes.
unsafe fn input<'a>(ptr: *const c_uchar, len: c_uint) -> Result<&'a [u8]> {
	if len == 0 {
		return Ok(&[]);
	}
	if ptr.is_null() {
		return Err(MarkovError::InvalidInput("null input buffer with non-zero length"));
	}
	// SAFETY: guaranteed by the caller
	Ok(unsafe { slice::from_raw_parts(ptr, len as usize) })
}

/// Borrows an output span, clamped so the byte count fits in a `c_int`.
///
/// # Safety
/// A non-null `ptr` must be valid for writes of `len` bytes.
unsafe fn output<'a>(ptr: *mut c_uchar, len: c_uint) -> Result<&'a mut [u8]> {
	if len == 0 {
		return Ok(&mut []);
	}
	if ptr.is_null() {
		return Err(MarkovError::InvalidInput("null output buffer with non-zero capacity"));
	}
	// SAFETY: guaranteed by the caller
	Ok(unsafe { slice::from_raw_parts_mut(ptr, (len as usize).min(MAX_OUTPUT)) })
}

/// Folds a result into the ABI convention: `>= 0` success, `< 0` errno.
fn status(operation: &str, result: Result<usize>) -> c_int {
	match result {
		Ok(written) => c_int::try_from(written).unwrap_or(c_int::MAX),
		Err(e) => {
			log::debug!("[markov-ffi] {operation} failed: {e}");
			e.code()
		}
	}
}

/// Allocates an empty model.
///
/// The configuration comes from the environment (`MARKOV_SEED`,
/// `MARKOV_MAX_STEPS`). Returns null on allocation failure, or when the
/// OS random source needed to seed the model is unavailable.
#[unsafe(no_mangle)]
pub extern "C" fn markov_alloc() -> *mut c_void {
	let model = match MarkovModel::with_config(Config::from_env()).and_then(try_box) {
		Ok(model) => model,
		Err(e) => {
			log::debug!("[markov-ffi] alloc failed: {e}");
			return ptr::null_mut();
		}
	};

	let id = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
	registry().insert(id, Slot(NonNull::from(Box::leak(model))));
	log::debug!("[markov-ffi] Allocated handle {id}");
	ptr::without_provenance_mut(id)
}

/// Releases a model and everything it owns.
///
/// Returns 0, or `-EBADF` for a null, unknown or already released handle.
#[unsafe(no_mangle)]
pub extern "C" fn markov_dealloc(handle: *mut c_void) -> c_int {
	let slot = registry().remove(&handle.addr());
	match slot {
		Some(Slot(model)) => {
			// SAFETY: removed from the registry, so this is the last owner
			drop(unsafe { Box::from_raw(model.as_ptr()) });
			log::debug!("[markov-ffi] Released handle {}", handle.addr());
			0
		}
		None => status("dealloc", Err(MarkovError::InvalidHandle)),
	}
}

/// Learns `len` bytes of text.
///
/// Returns 0, or a negative errno (`ENOMEM`, `EBADF`, `EINVAL`).
///
/// # Safety
/// `buf` must be valid for reads of `len` bytes (or null with `len == 0`).
/// No other call may use `handle` concurrently.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn markov_learn(handle: *mut c_void, buf: *const c_uchar, len: c_uint) -> c_int {
	let result = with_model(handle, |model| {
		// SAFETY: forwarded from the caller
		let text = unsafe { input(buf, len) }?;
		model.learn(text).map(|()| 0)
	});
	status("learn", result)
}

/// Generates text into `buf`, returning the number of bytes written.
///
/// The output is not null-terminated. Errors: `ENODATA` (untrained),
/// `ENOBUFS` (first token does not fit), `EBADF`, `EINVAL`.
///
/// # Safety
/// `buf` must be valid for writes of `len` bytes (or null with `len == 0`).
/// No other call may use `handle` concurrently.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn markov_speak(handle: *mut c_void, buf: *mut c_uchar, len: c_uint) -> c_int {
	let result = with_model(handle, |model| {
		// SAFETY: forwarded from the caller
		let out = unsafe { output(buf, len) }?;
		model.speak_into(out)
	});
	status("speak", result)
}

/// Generates a continuation of the `ilen` bytes at `ibuf` into `obuf`.
///
/// Same return convention and errors as [`markov_speak`].
///
/// # Safety
/// `ibuf` must be valid for reads of `ilen` bytes and `obuf` for writes of
/// `olen` bytes (either may be null when its length is 0); the two spans
/// must not overlap. No other call may use `handle` concurrently.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn markov_reply(
	handle: *mut c_void,
	ibuf: *const c_uchar,
	ilen: c_uint,
	obuf: *mut c_uchar,
	olen: c_uint,
) -> c_int {
	let result = with_model(handle, |model| {
		// SAFETY: forwarded from the caller
		let message = unsafe { input(ibuf, ilen) }?;
		let out = unsafe { output(obuf, olen) }?;
		model.reply_into(message, out)
	});
	status("reply", result)
}
