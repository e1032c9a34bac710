use crate::alloc::{Allocator, AllocatorExt};
use std::{
	fmt,
	marker::PhantomData,
	mem::{self, ManuallyDrop},
	ops::{Deref, DerefMut},
	ptr::{self, NonNull},
};

/// Owns one object built in a tracked allocator and gives its memory back with the size it was built with,
/// even after being cast to a trait object or a smaller view of itself.
pub struct Unique<'a, T: ?Sized> {
	ptr: NonNull<T>,
	allocator: &'a dyn Allocator,
	original_size: usize,
	_marker: PhantomData<T>,
}
impl<'a, T> Unique<'a, T> {
	pub fn new(allocator: &'a dyn Allocator, value: T) -> Self {
		let ptr = allocator.construct(value);
		Self { ptr, allocator, original_size: mem::size_of::<T>(), _marker: PhantomData }
	}
}
impl<'a, T: ?Sized> Unique<'a, T> {
	pub fn allocator(&self) -> &'a dyn Allocator {
		self.allocator
	}

	/// The size passed back to the allocator on drop, which is the size of the type this started as.
	pub fn original_size(&self) -> usize {
		self.original_size
	}

	pub fn as_ptr(&self) -> *const T {
		self.ptr.as_ptr()
	}

	/// Reinterprets the pointee, usually to unsize it. The original size is carried over.
	///
	/// # Safety
	/// `f` must return a pointer to the same object, or to a part of it that starts at the same address and whose
	/// destructor releases everything the original owned.
	pub unsafe fn cast<U: ?Sized>(self, f: impl FnOnce(NonNull<T>) -> NonNull<U>) -> Unique<'a, U> {
		let this = ManuallyDrop::new(self);
		Unique { ptr: f(this.ptr), allocator: this.allocator, original_size: this.original_size, _marker: PhantomData }
	}
}
impl<'a, T: ?Sized> Deref for Unique<'a, T> {
	type Target = T;

	fn deref(&self) -> &T {
		unsafe { self.ptr.as_ref() }
	}
}
impl<'a, T: ?Sized> DerefMut for Unique<'a, T> {
	fn deref_mut(&mut self) -> &mut T {
		unsafe { self.ptr.as_mut() }
	}
}
impl<'a, T: ?Sized> Drop for Unique<'a, T> {
	fn drop(&mut self) {
		unsafe {
			ptr::drop_in_place(self.ptr.as_ptr());
			self.allocator.free(self.ptr.cast::<u8>().as_ptr(), self.original_size);
		}
	}
}
impl<'a, T: ?Sized + fmt::Debug> fmt::Debug for Unique<'a, T> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		fmt::Debug::fmt(&**self, f)
	}
}

unsafe impl<'a, T: ?Sized + Send> Send for Unique<'a, T> {}
unsafe impl<'a, T: ?Sized + Sync> Sync for Unique<'a, T> {}

pub fn make_unique<T>(allocator: &dyn Allocator, value: T) -> Unique<'_, T> {
	Unique::new(allocator, value)
}
