use crate::{
	device::Device,
	function_table::DeviceFunctions,
	sub_object::{DestroyFunction, SubObject, SubObjectTraits},
};
use ash::vk;
use std::ops::{Deref, DerefMut};

pub enum SwapchainTraits {}
impl SubObjectTraits for SwapchainTraits {
	type Raw = vk::SwapchainKHR;
	type Owner = vk::Device;
	type Functions = DeviceFunctions;

	fn destruction_function(functions: &DeviceFunctions) -> &DestroyFunction<vk::Device, vk::SwapchainKHR> {
		&functions.destroy_swapchain_khr
	}
}

/// A device-owned swapchain that remembers the size and format of its images.
pub struct Swapchain<'a> {
	object: SubObject<'a, SwapchainTraits>,
	format: vk::Format,
	width: u32,
	height: u32,
	depth: u32,
}
impl<'a> Swapchain<'a> {
	/// `ci` is what `raw` was created from.
	pub fn new(
		raw: vk::SwapchainKHR,
		allocator: Option<&vk::AllocationCallbacks>,
		device: &'a Device<'_>,
		ci: &vk::SwapchainCreateInfoKHR,
	) -> Self {
		Self {
			object: SubObject::new(raw, allocator, device),
			format: ci.image_format,
			width: ci.image_extent.width,
			height: ci.image_extent.height,
			depth: ci.image_array_layers,
		}
	}

	pub fn format(&self) -> vk::Format {
		self.format
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	/// Array layers of every swapchain image.
	pub fn depth(&self) -> u32 {
		self.depth
	}

	pub fn take(&mut self) -> Self {
		Self {
			object: self.object.take(),
			format: self.format,
			width: self.width,
			height: self.height,
			depth: self.depth,
		}
	}
}
impl<'a> Deref for Swapchain<'a> {
	type Target = SubObject<'a, SwapchainTraits>;

	fn deref(&self) -> &Self::Target {
		&self.object
	}
}
impl<'a> DerefMut for Swapchain<'a> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.object
	}
}
impl<'a> From<&Swapchain<'a>> for vk::SwapchainKHR {
	fn from(swapchain: &Swapchain<'a>) -> Self {
		swapchain.object.raw()
	}
}
