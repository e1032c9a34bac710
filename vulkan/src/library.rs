use crate::{
	alloc::Allocator,
	function_table::LibraryFunctions,
	instance::Instance,
	lazy_function::Resolver,
	Error,
};
use ash::{vk, Entry};
use log::info;
use std::{ffi::CStr, ops::Deref, ptr, sync::Arc};

impl Resolver<vk::Instance> for Entry {
	fn proc_addr(&self, handle: vk::Instance, name: &CStr) -> vk::PFN_vkVoidFunction {
		unsafe { (self.static_fn().get_instance_proc_addr)(handle, name.as_ptr()) }
	}
}

/// The Vulkan loader and the handful of entry points that work without an instance.
pub struct Library {
	resolver: Arc<dyn Resolver<vk::Instance>>,
	functions: LibraryFunctions,
}
impl Library {
	pub fn new() -> Result<Self, Error> {
		let entry = unsafe { Entry::load() }?;
		info!("Successfully opened vulkan library");

		Ok(Self::with_resolver(Arc::new(entry)))
	}

	/// Uses `resolver` in place of the system loader's `vkGetInstanceProcAddr`.
	pub fn with_resolver(resolver: Arc<dyn Resolver<vk::Instance>>) -> Self {
		let functions = LibraryFunctions::new(vk::Instance::null(), resolver.clone());
		Self { resolver, functions }
	}

	/// The resolver every instance created from this library looks its functions up with.
	pub fn instance_resolver(&self) -> Arc<dyn Resolver<vk::Instance>> {
		self.resolver.clone()
	}

	pub fn create_instance<'a>(
		&'a self,
		container_allocator: &'a dyn Allocator,
		info: &vk::InstanceCreateInfo,
		allocator: Option<&vk::AllocationCallbacks>,
	) -> Result<Instance<'a>, vk::Result> {
		let mut raw = vk::Instance::null();
		let callbacks = allocator.map_or(ptr::null(), |callbacks| callbacks as *const _);
		unsafe { (self.functions.create_instance)(info, callbacks, &mut raw) }.result()?;

		Ok(Instance::new(container_allocator, raw, allocator, self))
	}

	pub fn layer_properties(&self) -> Result<Vec<vk::LayerProperties>, vk::Result> {
		let mut count = 0;
		unsafe { (self.functions.enumerate_instance_layer_properties)(&mut count, ptr::null_mut()) }.result()?;
		let mut layers = vec![vk::LayerProperties::default(); count as usize];
		unsafe { (self.functions.enumerate_instance_layer_properties)(&mut count, layers.as_mut_ptr()) }.result()?;
		layers.truncate(count as usize);
		Ok(layers)
	}

	pub fn extension_properties(&self) -> Result<Vec<vk::ExtensionProperties>, vk::Result> {
		let enumerate = self.functions.enumerate_instance_extension_properties.get();

		let mut count = 0;
		unsafe { enumerate(ptr::null(), &mut count, ptr::null_mut()) }.result()?;
		let mut extensions = vec![vk::ExtensionProperties::default(); count as usize];
		unsafe { enumerate(ptr::null(), &mut count, extensions.as_mut_ptr()) }.result()?;
		extensions.truncate(count as usize);
		Ok(extensions)
	}
}
impl Deref for Library {
	type Target = LibraryFunctions;

	fn deref(&self) -> &LibraryFunctions {
		&self.functions
	}
}
