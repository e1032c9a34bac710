use log::error;
use std::{
	alloc::{self, handle_alloc_error, Layout},
	collections::HashMap,
	mem, process,
	ptr::{self, NonNull},
	sync::{
		atomic::{AtomicU64, AtomicUsize, Ordering},
		Mutex,
	},
};

/// Every block handed out is aligned to this, which covers every SIMD type in use.
pub const MAX_ALIGNMENT: usize = 16;

/// A heap that callers must hand back the exact size they asked for when freeing.
pub trait Allocator: Send + Sync {
	/// Returns null when the underlying heap is exhausted.
	fn malloc(&self, size: usize) -> *mut u8;

	/// # Safety
	/// `ptr` must come from `malloc` on this allocator and `size` should be the size it was requested with.
	unsafe fn free(&self, ptr: *mut u8, size: usize);
}

pub trait AllocatorExt: Allocator {
	/// Allocates `size_of::<T>()` bytes and moves `value` into them.
	fn construct<T>(&self, value: T) -> NonNull<T> {
		assert!(mem::align_of::<T>() <= MAX_ALIGNMENT);

		let size = mem::size_of::<T>();
		let ptr = match NonNull::new(self.malloc(size)) {
			Some(ptr) => ptr.cast::<T>(),
			None => handle_alloc_error(Layout::new::<T>()),
		};
		unsafe { ptr.as_ptr().write(value) };
		ptr
	}

	/// # Safety
	/// `ptr` must come from `construct::<T>` on this allocator and must not be used afterwards.
	unsafe fn destroy<T>(&self, ptr: NonNull<T>) {
		ptr::drop_in_place(ptr.as_ptr());
		self.free(ptr.cast().as_ptr(), mem::size_of::<T>());
	}
}
impl<A: Allocator + ?Sized> AllocatorExt for A {}

/// Counts everything that goes through it, so a context can check for leaks once all its children are gone.
///
/// The three counters are updated independently; read them at quiescence.
#[derive(Debug, Default)]
pub struct LeakCheckAllocator {
	currently_allocated_bytes: AtomicUsize,
	total_allocated_bytes: AtomicU64,
	total_number_of_allocations: AtomicU64,
}
impl LeakCheckAllocator {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn currently_allocated_bytes(&self) -> usize {
		self.currently_allocated_bytes.load(Ordering::Relaxed)
	}

	pub fn total_allocated_bytes(&self) -> u64 {
		self.total_allocated_bytes.load(Ordering::Relaxed)
	}

	pub fn total_number_of_allocations(&self) -> u64 {
		self.total_number_of_allocations.load(Ordering::Relaxed)
	}
}
impl Allocator for LeakCheckAllocator {
	fn malloc(&self, size: usize) -> *mut u8 {
		self.currently_allocated_bytes.fetch_add(size, Ordering::Relaxed);
		self.total_allocated_bytes.fetch_add(size as u64, Ordering::Relaxed);
		self.total_number_of_allocations.fetch_add(1, Ordering::Relaxed);

		system_malloc(size)
	}

	unsafe fn free(&self, ptr: *mut u8, size: usize) {
		// a wrong size wraps the counter rather than being caught here
		self.currently_allocated_bytes.fetch_sub(size, Ordering::Relaxed);
		system_free(ptr);
	}
}

/// Wraps another allocator and aborts on any `free` whose size disagrees with the matching `malloc`.
pub struct CheckedAllocator<'a> {
	root: &'a dyn Allocator,
	allocations: Mutex<HashMap<usize, usize>>,
}
impl<'a> CheckedAllocator<'a> {
	pub fn new(root: &'a dyn Allocator) -> Self {
		Self { root, allocations: Mutex::default() }
	}

	pub fn live_allocations(&self) -> usize {
		self.allocations.lock().unwrap_or_else(|err| err.into_inner()).len()
	}
}
impl<'a> Allocator for CheckedAllocator<'a> {
	fn malloc(&self, size: usize) -> *mut u8 {
		let ptr = self.root.malloc(size);
		if !ptr.is_null() {
			self.allocations.lock().unwrap_or_else(|err| err.into_inner()).insert(ptr as usize, size);
		}
		ptr
	}

	unsafe fn free(&self, ptr: *mut u8, size: usize) {
		// a failed malloc was never recorded
		if ptr.is_null() {
			self.root.free(ptr, size);
			return;
		}

		let recorded = self.allocations.lock().unwrap_or_else(|err| err.into_inner()).remove(&(ptr as usize));
		match recorded {
			Some(recorded) if recorded == size => self.root.free(ptr, size),
			Some(recorded) => {
				error!("{:p} was allocated with {} bytes but freed with {}", ptr, recorded, size);
				log::logger().flush();
				process::abort();
			},
			None => {
				error!("{:p} freed with {} bytes was never allocated here", ptr, size);
				log::logger().flush();
				process::abort();
			},
		}
	}
}

// The real block size lives in a header in front of every block, so releasing memory never depends on
// what the caller claims.
const HEADER: usize = MAX_ALIGNMENT;

fn system_malloc(size: usize) -> *mut u8 {
	let layout = match size.checked_add(HEADER).map(|total| Layout::from_size_align(total, MAX_ALIGNMENT)) {
		Some(Ok(layout)) => layout,
		_ => return ptr::null_mut(),
	};

	unsafe {
		let base = alloc::alloc(layout);
		if base.is_null() {
			return base;
		}
		(base as *mut usize).write(layout.size());
		base.add(HEADER)
	}
}

unsafe fn system_free(ptr: *mut u8) {
	if ptr.is_null() {
		return;
	}

	let base = ptr.sub(HEADER);
	let total = (base as *const usize).read();
	alloc::dealloc(base, Layout::from_size_align_unchecked(total, MAX_ALIGNMENT));
}
