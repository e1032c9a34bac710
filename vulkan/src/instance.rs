use crate::{
	alloc::Allocator,
	callbacks_ptr,
	device::Device,
	find_in_chain,
	function_table::InstanceFunctions,
	lazy_function::Resolver,
	library::Library,
	sub_object::Owner,
	unique::{make_unique, Unique},
	AllocationCallbacks,
};
use ash::vk;
use log::debug;
use std::{ops::Deref, ptr, sync::Arc};

/// Owns a `VkInstance` and the table its functions are resolved into.
pub struct Instance<'a> {
	vk: vk::Instance,
	allocator: Option<AllocationCallbacks>,
	functions: Unique<'a, InstanceFunctions>,
}
impl<'a> Instance<'a> {
	/// Adopts `raw`, which must have been created with `allocator`, and resolves its functions through `library`.
	pub fn new(
		container_allocator: &'a dyn Allocator,
		raw: vk::Instance,
		allocator: Option<&vk::AllocationCallbacks>,
		library: &'a Library,
	) -> Self {
		Self::with_resolver(container_allocator, raw, allocator, library.instance_resolver())
	}

	pub fn with_resolver(
		container_allocator: &'a dyn Allocator,
		raw: vk::Instance,
		allocator: Option<&vk::AllocationCallbacks>,
		resolver: Arc<dyn Resolver<vk::Instance>>,
	) -> Self {
		let functions = make_unique(container_allocator, InstanceFunctions::new(raw, resolver));
		Self { vk: raw, allocator: AllocationCallbacks::copied(allocator), functions }
	}

	pub fn raw(&self) -> vk::Instance {
		self.vk
	}

	pub fn is_null(&self) -> bool {
		self.vk == vk::Instance::null()
	}

	pub fn allocation_callbacks(&self) -> Option<&vk::AllocationCallbacks> {
		self.allocator.as_ref().map(|callbacks| &callbacks.0)
	}

	/// The allocator the function table lives in.
	pub fn container_allocator(&self) -> &'a dyn Allocator {
		self.functions.allocator()
	}

	pub fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>, vk::Result> {
		let enumerate = self.functions.enumerate_physical_devices.get();

		let mut count = 0;
		unsafe { enumerate(self.vk, &mut count, ptr::null_mut()) }.result()?;
		let mut devices = vec![vk::PhysicalDevice::null(); count as usize];
		unsafe { enumerate(self.vk, &mut count, devices.as_mut_ptr()) }.result()?;
		devices.truncate(count as usize);
		Ok(devices)
	}

	pub fn physical_device_properties(&self, physical_device: vk::PhysicalDevice) -> vk::PhysicalDeviceProperties {
		let mut properties = vk::PhysicalDeviceProperties::default();
		unsafe { (self.functions.get_physical_device_properties)(physical_device, &mut properties) };
		properties
	}

	pub fn queue_family_properties(&self, physical_device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
		let get = self.functions.get_physical_device_queue_family_properties.get();

		let mut count = 0;
		unsafe { get(physical_device, &mut count, ptr::null_mut()) };
		let mut families = vec![vk::QueueFamilyProperties::default(); count as usize];
		unsafe { get(physical_device, &mut count, families.as_mut_ptr()) };
		families.truncate(count as usize);
		families
	}

	/// Creates a device whose function table lives in `container_allocator`.
	///
	/// A `VkDeviceGroupDeviceCreateInfo` chained to `info` sets how many physical devices the device spans.
	pub fn create_device<'b>(
		&'b self,
		container_allocator: &'b dyn Allocator,
		physical_device: vk::PhysicalDevice,
		info: &vk::DeviceCreateInfo,
		allocator: Option<&vk::AllocationCallbacks>,
	) -> Result<Device<'b>, vk::Result> {
		let mut raw = vk::Device::null();
		let callbacks = allocator.map_or(ptr::null(), |callbacks| callbacks as *const _);
		unsafe { (self.functions.create_device)(physical_device, info, callbacks, &mut raw) }.result()?;

		let group = unsafe {
			find_in_chain::<vk::DeviceGroupDeviceCreateInfo>(
				info.p_next,
				vk::StructureType::DEVICE_GROUP_DEVICE_CREATE_INFO,
			)
		};
		let num_devices = group.map_or(1, |group| group.physical_device_count.max(1));
		let properties = self.physical_device_properties(physical_device);

		Ok(Device::new(container_allocator, raw, allocator, self, Some(&properties), physical_device, num_devices))
	}
}
impl<'a> Deref for Instance<'a> {
	type Target = InstanceFunctions;

	fn deref(&self) -> &InstanceFunctions {
		&self.functions
	}
}
impl<'a> Drop for Instance<'a> {
	fn drop(&mut self) {
		if self.is_null() {
			return;
		}

		debug!("destroying {:?}", self.vk);
		unsafe { (self.functions.destroy_instance)(self.vk, callbacks_ptr(&self.allocator)) };
	}
}
impl<'a> Owner for Instance<'a> {
	type Raw = vk::Instance;
	type Functions = InstanceFunctions;

	fn raw(&self) -> vk::Instance {
		self.vk
	}

	fn functions(&self) -> &InstanceFunctions {
		&self.functions
	}
}
impl<'a> From<&Instance<'a>> for vk::Instance {
	fn from(instance: &Instance<'a>) -> Self {
		instance.vk
	}
}
