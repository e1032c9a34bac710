use crate::{
	alloc::Allocator,
	callbacks_ptr,
	command::CommandBuffer,
	descriptor::DescriptorSet,
	function_table::{DeviceFunctions, QueueFunctions},
	instance::Instance,
	lazy_function::{ProcAddr, Resolver},
	sub_object::{CommandPool, DescriptorPool, DescriptorSetLayout, Event, Fence, Owner, Semaphore},
	swapchain::Swapchain,
	unique::{make_unique, Unique},
	AllocationCallbacks,
};
use ash::vk;
use log::debug;
use std::{ops::Deref, sync::Arc};

/// Owns a `VkDevice` and the table its functions, including queue and command buffer ones, are resolved into.
pub struct Device<'a> {
	vk: vk::Device,
	physical_device: vk::PhysicalDevice,
	allocator: Option<AllocationCallbacks>,
	functions: Unique<'a, DeviceFunctions>,
	device_id: u32,
	vendor_id: u32,
	driver_version: u32,
	num_devices: u32,
	memory_properties: vk::PhysicalDeviceMemoryProperties,
}
impl<'a> Device<'a> {
	/// Adopts `raw` and resolves its functions through the instance's `vkGetDeviceProcAddr`.
	///
	/// `num_devices` is the number of physical devices in the device group, 1 outside of one.
	pub fn new(
		container_allocator: &'a dyn Allocator,
		raw: vk::Device,
		allocator: Option<&vk::AllocationCallbacks>,
		instance: &'a Instance<'_>,
		properties: Option<&vk::PhysicalDeviceProperties>,
		physical_device: vk::PhysicalDevice,
		num_devices: u32,
	) -> Self {
		let resolver = unsafe { ProcAddr::new(instance.get_device_proc_addr.get()) };
		let mut device = Self::with_resolver(container_allocator, raw, allocator, Arc::new(resolver));
		device.physical_device = physical_device;
		device.num_devices = num_devices;

		if let Some(properties) = properties {
			device.device_id = properties.device_id;
			device.vendor_id = properties.vendor_id;
			device.driver_version = properties.driver_version;
		}
		if physical_device != vk::PhysicalDevice::null() {
			unsafe { (instance.get_physical_device_memory_properties)(physical_device, &mut device.memory_properties) };
		}

		device
	}

	pub fn with_resolver(
		container_allocator: &'a dyn Allocator,
		raw: vk::Device,
		allocator: Option<&vk::AllocationCallbacks>,
		resolver: Arc<dyn Resolver<vk::Device>>,
	) -> Self {
		Self {
			vk: raw,
			physical_device: vk::PhysicalDevice::null(),
			allocator: AllocationCallbacks::copied(allocator),
			functions: make_unique(container_allocator, DeviceFunctions::new(raw, resolver)),
			device_id: 0,
			vendor_id: 0,
			driver_version: 0,
			num_devices: 1,
			memory_properties: vk::PhysicalDeviceMemoryProperties::default(),
		}
	}

	pub fn raw(&self) -> vk::Device {
		self.vk
	}

	pub fn is_null(&self) -> bool {
		self.vk == vk::Device::null()
	}

	pub fn physical_device(&self) -> vk::PhysicalDevice {
		self.physical_device
	}

	pub fn allocation_callbacks(&self) -> Option<&vk::AllocationCallbacks> {
		self.allocator.as_ref().map(|callbacks| &callbacks.0)
	}

	pub fn device_id(&self) -> u32 {
		self.device_id
	}

	pub fn vendor_id(&self) -> u32 {
		self.vendor_id
	}

	pub fn driver_version(&self) -> u32 {
		self.driver_version
	}

	pub fn num_devices(&self) -> u32 {
		self.num_devices
	}

	pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
		&self.memory_properties
	}

	pub fn get_queue(&self, family_index: u32, index: u32) -> Queue<'_> {
		let mut vk = vk::Queue::null();
		unsafe { (self.functions.get_device_queue)(self.vk, family_index, index, &mut vk) };
		Queue { vk, family_index, functions: &self.functions.queue_functions }
	}

	pub fn create_fence(&self, signaled: bool) -> Result<Fence<'_>, vk::Result> {
		let mut flags = vk::FenceCreateFlags::empty();
		if signaled {
			flags |= vk::FenceCreateFlags::SIGNALED;
		}

		let ci = vk::FenceCreateInfo::builder().flags(flags);
		let mut vk = vk::Fence::null();
		unsafe { (self.functions.create_fence)(self.vk, &*ci, callbacks_ptr(&self.allocator), &mut vk) }.result()?;
		Ok(Fence::new(vk, self.allocation_callbacks(), self))
	}

	pub fn create_event(&self) -> Result<Event<'_>, vk::Result> {
		let ci = vk::EventCreateInfo::builder();
		let mut vk = vk::Event::null();
		unsafe { (self.functions.create_event)(self.vk, &*ci, callbacks_ptr(&self.allocator), &mut vk) }.result()?;
		Ok(Event::new(vk, self.allocation_callbacks(), self))
	}

	pub fn create_semaphore(&self) -> Result<Semaphore<'_>, vk::Result> {
		let ci = vk::SemaphoreCreateInfo::builder();
		let mut vk = vk::Semaphore::null();
		unsafe { (self.functions.create_semaphore)(self.vk, &*ci, callbacks_ptr(&self.allocator), &mut vk) }.result()?;
		Ok(Semaphore::new(vk, self.allocation_callbacks(), self))
	}

	pub fn create_command_pool(
		&self,
		queue_family_index: u32,
		flags: vk::CommandPoolCreateFlags,
	) -> Result<CommandPool<'_>, vk::Result> {
		let ci = vk::CommandPoolCreateInfo::builder().flags(flags).queue_family_index(queue_family_index);
		let mut vk = vk::CommandPool::null();
		unsafe { (self.functions.create_command_pool)(self.vk, &*ci, callbacks_ptr(&self.allocator), &mut vk) }
			.result()?;
		Ok(CommandPool::new(vk, self.allocation_callbacks(), self))
	}

	pub fn allocate_command_buffer<'b>(
		&'b self,
		pool: &'b CommandPool<'_>,
		level: vk::CommandBufferLevel,
	) -> Result<CommandBuffer<'b>, vk::Result> {
		let ci = vk::CommandBufferAllocateInfo::builder().command_pool(pool.raw()).level(level).command_buffer_count(1);
		let mut vk = vk::CommandBuffer::null();
		unsafe { (self.functions.allocate_command_buffers)(self.vk, &*ci, &mut vk) }.result()?;
		Ok(CommandBuffer::new(vk, pool, self))
	}

	pub fn create_descriptor_set_layout(
		&self,
		bindings: &[vk::DescriptorSetLayoutBinding],
	) -> Result<DescriptorSetLayout<'_>, vk::Result> {
		let ci = vk::DescriptorSetLayoutCreateInfo::builder().bindings(bindings);
		let mut vk = vk::DescriptorSetLayout::null();
		unsafe { (self.functions.create_descriptor_set_layout)(self.vk, &*ci, callbacks_ptr(&self.allocator), &mut vk) }
			.result()?;
		Ok(DescriptorSetLayout::new(vk, self.allocation_callbacks(), self))
	}

	/// The pool allows sets to be freed one by one, which `DescriptorSet` relies on.
	pub fn create_descriptor_pool(
		&self,
		max_sets: u32,
		sizes: &[vk::DescriptorPoolSize],
	) -> Result<DescriptorPool<'_>, vk::Result> {
		let ci = vk::DescriptorPoolCreateInfo::builder()
			.flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
			.max_sets(max_sets)
			.pool_sizes(sizes);
		let mut vk = vk::DescriptorPool::null();
		unsafe { (self.functions.create_descriptor_pool)(self.vk, &*ci, callbacks_ptr(&self.allocator), &mut vk) }
			.result()?;
		Ok(DescriptorPool::new(vk, self.allocation_callbacks(), self))
	}

	pub fn allocate_descriptor_set<'b>(
		&'b self,
		pool: &'b DescriptorPool<'_>,
		layout: &DescriptorSetLayout<'_>,
	) -> Result<DescriptorSet<'b>, vk::Result> {
		let layouts = [layout.raw()];
		let ci = vk::DescriptorSetAllocateInfo::builder().descriptor_pool(pool.raw()).set_layouts(&layouts);
		let mut vk = vk::DescriptorSet::null();
		unsafe { (self.functions.allocate_descriptor_sets)(self.vk, &*ci, &mut vk) }.result()?;
		Ok(DescriptorSet::new(vk, pool, self))
	}

	pub fn create_swapchain(&self, ci: &vk::SwapchainCreateInfoKHR) -> Result<Swapchain<'_>, vk::Result> {
		let mut vk = vk::SwapchainKHR::null();
		unsafe { (self.functions.create_swapchain_khr)(self.vk, ci, callbacks_ptr(&self.allocator), &mut vk) }
			.result()?;
		Ok(Swapchain::new(vk, self.allocation_callbacks(), self, ci))
	}

	pub fn wait_for_fence(&self, fence: &Fence<'_>, timeout: u64) -> Result<(), vk::Result> {
		let fences = [fence.raw()];
		unsafe { (self.functions.wait_for_fences)(self.vk, 1, fences.as_ptr(), vk::TRUE, timeout) }.result()
	}

	pub fn wait_idle(&self) -> Result<(), vk::Result> {
		unsafe { (self.functions.device_wait_idle)(self.vk) }.result()
	}
}
impl<'a> Deref for Device<'a> {
	type Target = DeviceFunctions;

	fn deref(&self) -> &DeviceFunctions {
		&self.functions
	}
}
impl<'a> Drop for Device<'a> {
	fn drop(&mut self) {
		if self.is_null() {
			return;
		}

		debug!("destroying {:?}", self.vk);
		unsafe { (self.functions.destroy_device)(self.vk, callbacks_ptr(&self.allocator)) };
	}
}
impl<'a> Owner for Device<'a> {
	type Raw = vk::Device;
	type Functions = DeviceFunctions;

	fn raw(&self) -> vk::Device {
		self.vk
	}

	fn functions(&self) -> &DeviceFunctions {
		&self.functions
	}
}
impl<'a> From<&Device<'a>> for vk::Device {
	fn from(device: &Device<'a>) -> Self {
		device.vk
	}
}

/// Queues belong to their device and are never destroyed, so this only carries the handle and its functions.
#[derive(Clone, Copy)]
pub struct Queue<'a> {
	vk: vk::Queue,
	family_index: u32,
	functions: &'a QueueFunctions,
}
impl<'a> Queue<'a> {
	pub fn raw(&self) -> vk::Queue {
		self.vk
	}

	pub fn family_index(&self) -> u32 {
		self.family_index
	}

	pub fn submit(&self, command_buffers: &[&CommandBuffer<'_>], fence: Option<&Fence<'_>>) -> Result<(), vk::Result> {
		let command_buffers: Vec<_> = command_buffers.iter().map(|cmd| cmd.raw()).collect();
		let submits = [vk::SubmitInfo::builder().command_buffers(&command_buffers).build()];
		let fence = fence.map_or(vk::Fence::null(), |fence| fence.raw());

		unsafe { (self.functions.queue_submit)(self.vk, submits.len() as u32, submits.as_ptr(), fence) }.result()
	}

	pub fn wait_idle(&self) -> Result<(), vk::Result> {
		unsafe { (self.functions.queue_wait_idle)(self.vk) }.result()
	}
}
impl<'a> Deref for Queue<'a> {
	type Target = QueueFunctions;

	fn deref(&self) -> &QueueFunctions {
		self.functions
	}
}
impl<'a> From<&Queue<'a>> for vk::Queue {
	fn from(queue: &Queue<'a>) -> Self {
		queue.vk
	}
}
