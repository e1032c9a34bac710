use ash::vk;
use log::{error, info};
use std::{
	ffi::CStr,
	fmt,
	mem,
	ops::Deref,
	os::raw::c_char,
	process,
	sync::{Arc, OnceLock},
};

/// Looks up an entry point by name for a given owner handle.
pub trait Resolver<H>: Send + Sync {
	fn proc_addr(&self, handle: H, name: &CStr) -> vk::PFN_vkVoidFunction;
}

/// Resolves through a raw `vkGetInstanceProcAddr` or `vkGetDeviceProcAddr`.
pub struct ProcAddr<H> {
	get_proc_addr: unsafe extern "system" fn(H, *const c_char) -> vk::PFN_vkVoidFunction,
}
impl<H> ProcAddr<H> {
	/// # Safety
	/// `get_proc_addr` must stay callable for as long as any function table built from this resolver.
	pub unsafe fn new(get_proc_addr: unsafe extern "system" fn(H, *const c_char) -> vk::PFN_vkVoidFunction) -> Self {
		Self { get_proc_addr }
	}
}
impl<H> Resolver<H> for ProcAddr<H> {
	fn proc_addr(&self, handle: H, name: &CStr) -> vk::PFN_vkVoidFunction {
		unsafe { (self.get_proc_addr)(handle, name.as_ptr()) }
	}
}

/// A Vulkan entry point that is looked up the first time it's used and cached afterwards.
///
/// A missing entry point is unrecoverable: it gets logged and the process aborts.
pub struct LazyFunction<F, H> {
	handle: H,
	name: &'static CStr,
	resolver: Arc<dyn Resolver<H>>,
	ptr: OnceLock<F>,
}
impl<F: Copy, H: Copy + fmt::Debug> LazyFunction<F, H> {
	pub fn new(handle: H, name: &'static CStr, resolver: Arc<dyn Resolver<H>>) -> Self {
		assert_eq!(mem::size_of::<F>(), mem::size_of::<unsafe extern "system" fn()>());
		Self { handle, name, resolver, ptr: OnceLock::new() }
	}

	pub fn get(&self) -> F {
		**self
	}

	pub fn is_resolved(&self) -> bool {
		self.ptr.get().is_some()
	}

	pub fn name(&self) -> &'static CStr {
		self.name
	}

	fn resolve(&self) -> F {
		match self.resolver.proc_addr(self.handle, self.name) {
			Some(ptr) => {
				info!("{} for {:?} resolved", self.name.to_string_lossy(), self.handle);
				// F is always the PFN type this name refers to, checked to be pointer sized in `new`
				unsafe { mem::transmute_copy::<unsafe extern "system" fn(), F>(&ptr) }
			},
			None => {
				error!("{} for {:?} could not be resolved, crashing now", self.name.to_string_lossy(), self.handle);
				log::logger().flush();
				process::abort();
			},
		}
	}
}
impl<F: Copy, H: Copy + fmt::Debug> Deref for LazyFunction<F, H> {
	type Target = F;

	fn deref(&self) -> &F {
		self.ptr.get_or_init(|| self.resolve())
	}
}
impl<F, H: fmt::Debug> fmt::Debug for LazyFunction<F, H> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("LazyFunction")
			.field("name", &self.name)
			.field("handle", &self.handle)
			.field("resolved", &self.ptr.get().is_some())
			.finish()
	}
}
