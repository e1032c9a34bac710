use crate::{
	device::Device,
	find_in_chain,
	function_table::CommandBufferFunctions,
	lazy_function::LazyFunction,
	sub_object::CommandPool,
};
use ash::vk;
use log::debug;
use std::{mem, ops::Deref};

/// Owns one command buffer and frees it back to its pool.
///
/// Also keeps track of which physical devices of the device group recorded commands will run on.
pub struct CommandBuffer<'a> {
	vk: vk::CommandBuffer,
	pool: vk::CommandPool,
	device: vk::Device,
	free: &'a LazyFunction<vk::PFN_vkFreeCommandBuffers, vk::Device>,
	functions: &'a CommandBufferFunctions,
	device_mask: u32,
	default_mask: u32,
}
impl<'a> CommandBuffer<'a> {
	pub fn new(raw: vk::CommandBuffer, pool: &'a CommandPool<'_>, device: &'a Device<'_>) -> Self {
		let default_mask = 1u32.checked_shl(device.num_devices()).map_or(u32::MAX, |bit| bit - 1);

		Self {
			vk: raw,
			pool: pool.raw(),
			device: device.raw(),
			free: &device.free_command_buffers,
			functions: &device.command_buffer_functions,
			device_mask: 0,
			default_mask,
		}
	}

	pub fn raw(&self) -> vk::CommandBuffer {
		self.vk
	}

	pub fn pool(&self) -> vk::CommandPool {
		self.pool
	}

	pub fn is_null(&self) -> bool {
		self.vk == vk::CommandBuffer::null()
	}

	/// Begins recording. The device mask goes back to every device in the group unless `info` chains a
	/// `VkDeviceGroupCommandBufferBeginInfo`, in which case its mask is used.
	pub fn begin(&mut self, info: &vk::CommandBufferBeginInfo) -> Result<(), vk::Result> {
		let group = unsafe {
			find_in_chain::<vk::DeviceGroupCommandBufferBeginInfo>(
				info.p_next,
				vk::StructureType::DEVICE_GROUP_COMMAND_BUFFER_BEGIN_INFO,
			)
		};
		self.device_mask = group.map_or(self.default_mask, |group| group.device_mask);

		unsafe { (self.functions.begin_command_buffer)(self.vk, info) }.result()
	}

	pub fn end(&mut self) -> Result<(), vk::Result> {
		unsafe { (self.functions.end_command_buffer)(self.vk) }.result()
	}

	pub fn set_device_mask(&mut self, device_mask: u32) {
		self.device_mask = device_mask;
		unsafe { (self.functions.cmd_set_device_mask)(self.vk, device_mask) };
	}

	pub fn device_mask(&self) -> u32 {
		self.device_mask
	}

	/// One bit for each physical device the owning device spans.
	pub fn default_mask(&self) -> u32 {
		self.default_mask
	}

	/// Moves the command buffer into a new wrapper and leaves this one empty.
	pub fn take(&mut self) -> Self {
		Self {
			vk: mem::replace(&mut self.vk, vk::CommandBuffer::null()),
			pool: self.pool,
			device: self.device,
			free: self.free,
			functions: self.functions,
			device_mask: self.device_mask,
			default_mask: self.default_mask,
		}
	}
}
impl<'a> Deref for CommandBuffer<'a> {
	type Target = CommandBufferFunctions;

	fn deref(&self) -> &CommandBufferFunctions {
		self.functions
	}
}
impl<'a> Drop for CommandBuffer<'a> {
	fn drop(&mut self) {
		if self.is_null() {
			return;
		}

		debug!("freeing {:?} from {:?}", self.vk, self.pool);
		unsafe { (self.free)(self.device, self.pool, 1, &self.vk) };
	}
}
impl<'a> From<&CommandBuffer<'a>> for vk::CommandBuffer {
	fn from(cmd: &CommandBuffer<'a>) -> Self {
		cmd.vk
	}
}
